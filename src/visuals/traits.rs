use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{audio::ReactiveFrame, error::Result, visuals::Surface};

/// Capability every visual renderer implements
///
/// The export pipeline drives a visualizer through a strict lifecycle:
/// `init` once, `update` once per output frame in index order, then
/// `dispose` exactly once, whether the export finished, failed or was cancelled.
pub trait Visualizer: Send {
    /// Returns the unique name of this visualizer
    fn name(&self) -> &str;

    /// Returns a human-readable description of this visualizer
    fn description(&self) -> &str;

    /// Allocate per-run state for a surface of the given size
    fn init(&mut self, surface: &Surface) -> Result<()>;

    /// Advance by `delta` seconds and draw the frame described by `input`
    ///
    /// The visualizer owns the whole surface: it is expected to clear or
    /// overdraw every pixel it cares about on each call.
    fn update(&mut self, surface: &mut Surface, input: &ReactiveInput, delta: f32) -> Result<()>;

    /// Release whatever `init` allocated
    fn dispose(&mut self) {}

    /// Describe the user-tunable parameters this visualizer reads from `params`
    fn controls_schema(&self) -> Vec<ControlSpec> {
        Vec::new()
    }
}

/// Everything a visualizer sees for one frame
#[derive(Debug, Clone)]
pub struct ReactiveInput {
    pub frame: ReactiveFrame,
    pub intensity_multiplier: f32,
    pub palette: Vec<String>,
    pub params: HashMap<String, ParamValue>,
}

impl ReactiveInput {
    /// Palette entry `index` as RGB, wrapping around, or `fallback` if unparsable
    pub fn palette_color(&self, index: usize, fallback: [u8; 3]) -> [u8; 3] {
        if self.palette.is_empty() {
            return fallback;
        }
        parse_hex_color(&self.palette[index % self.palette.len()]).unwrap_or(fallback)
    }

    pub fn get_f32_or(&self, key: &str, default: f32) -> f32 {
        self.params.get(key).and_then(ParamValue::as_f32).unwrap_or(default)
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.params.get(key).and_then(ParamValue::as_bool).unwrap_or(default)
    }
}

/// Palette, intensity and per-visualizer parameters shared by preview and export
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualParams {
    /// Scales how strongly the visuals respond (1.0 = as analyzed)
    pub intensity_multiplier: f32,

    /// Colors as `#rrggbb` strings
    pub palette: Vec<String>,

    /// Visualizer-specific parameters
    pub params: HashMap<String, ParamValue>,
}

impl Default for VisualParams {
    fn default() -> Self {
        Self {
            intensity_multiplier: 1.0,
            palette: vec![
                "#0b0a1f".to_string(),
                "#ff3e7f".to_string(),
                "#3ee8ff".to_string(),
                "#ffd23e".to_string(),
            ],
            params: HashMap::new(),
        }
    }
}

impl VisualParams {
    /// Set a parameter value
    pub fn set<K: Into<String>, V: Into<ParamValue>>(mut self, key: K, value: V) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Build the per-frame input handed to a visualizer
    pub fn input_for(&self, frame: ReactiveFrame) -> ReactiveInput {
        ReactiveInput {
            frame,
            intensity_multiplier: self.intensity_multiplier,
            palette: self.palette.clone(),
            params: self.params.clone(),
        }
    }
}

/// Flexible parameter value that can hold different types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i32),
    Float(f32),
    String(String),
}

impl ParamValue {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            ParamValue::Float(f) => Some(*f),
            ParamValue::Integer(i) => Some(*i as f32),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

/// One entry of a visualizer's controls schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlSpec {
    pub key: String,
    pub label: String,
    pub kind: ControlKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlKind {
    Range { min: f32, max: f32, step: f32, default: f32 },
    Toggle { default: bool },
}

impl ControlSpec {
    pub fn range(key: &str, label: &str, min: f32, max: f32, step: f32, default: f32) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind: ControlKind::Range { min, max, step, default },
        }
    }

    pub fn toggle(key: &str, label: &str, default: bool) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind: ControlKind::Toggle { default },
        }
    }
}

/// Parse `#rrggbb` (or `rrggbb`) into RGB
pub fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff8000"), Some([255, 128, 0]));
        assert_eq!(parse_hex_color("00ff00"), Some([0, 255, 0]));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn test_palette_wraps_and_falls_back() {
        let params = VisualParams {
            palette: vec!["#010203".to_string(), "bogus".to_string()],
            ..Default::default()
        };
        let input = params.input_for(ReactiveFrame::default());

        assert_eq!(input.palette_color(2, [9, 9, 9]), [1, 2, 3]);
        assert_eq!(input.palette_color(1, [9, 9, 9]), [9, 9, 9]);
    }

    #[test]
    fn test_param_lookup() {
        let params = VisualParams::default()
            .set("radius", 0.4f32)
            .set("count", 12)
            .set("flash", false);
        let input = params.input_for(ReactiveFrame::default());

        assert_eq!(input.get_f32_or("radius", 0.0), 0.4);
        assert_eq!(input.get_f32_or("count", 0.0), 12.0);
        assert!(!input.get_bool_or("flash", true));
        assert_eq!(input.get_f32_or("missing", 7.0), 7.0);
    }

    #[test]
    fn test_untagged_params_deserialize() {
        let params: VisualParams = toml::from_str(
            "intensity_multiplier = 1.5\n[params]\nradius = 0.3\nflash = true\ncount = 4\n",
        )
        .unwrap();

        assert_eq!(params.params["flash"], ParamValue::Bool(true));
        assert_eq!(params.params["count"], ParamValue::Integer(4));
        assert_eq!(params.params["radius"].as_f32(), Some(0.3));
        assert_eq!(params.palette.len(), 4);
    }
}
