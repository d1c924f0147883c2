use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::{
    audio::AnalysisConfig,
    error::{ConfigError, Result},
    export::{MuxAttempt, OutputFormat, Resolution},
    visuals::{parse_hex_color, Overlay, VisualParams},
};

/// Main configuration for reactive-reel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feature extraction and beat detection tunables
    pub analysis: AnalysisConfig,

    /// Export pipeline settings
    pub export: ExportSettings,

    /// External muxer settings
    pub transcode: TranscodeConfig,

    /// Visualizer selection and look
    pub visual: VisualConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            tracing::debug!("TOML error in {}: {}", path.display(), e);
            ConfigError::ParseFailed { path: path.display().to_string() }
        })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.analysis.validate().map_err(|reason| ConfigError::InvalidValue {
            key: "analysis".to_string(),
            value: reason,
        })?;
        self.export.validate()?;
        self.transcode.validate()?;
        self.visual.validate()?;
        Ok(())
    }
}

/// Export pipeline defaults and pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub resolution: Resolution,

    /// Preferred container; mp4 may degrade to webm
    pub format: OutputFormat,

    /// Frames rendered between cooperative yields and progress reports
    pub yield_every: usize,

    /// Pause after the last frame before the recorder is stopped (ms)
    pub flush_grace_ms: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::Portrait1080,
            format: OutputFormat::Mp4,
            yield_every: 5,
            flush_grace_ms: 250,
        }
    }
}

impl ExportSettings {
    fn validate(&self) -> Result<()> {
        if self.yield_every == 0 {
            return Err(ConfigError::InvalidValue {
                key: "export.yield_every".to_string(),
                value: self.yield_every.to_string()
            }.into());
        }

        if self.flush_grace_ms > 5_000 {
            return Err(ConfigError::InvalidValue {
                key: "export.flush_grace_ms".to_string(),
                value: self.flush_grace_ms.to_string()
            }.into());
        }

        Ok(())
    }
}

/// ffmpeg binary and codec pairings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    /// Path or name of the ffmpeg binary
    pub ffmpeg_path: PathBuf,

    /// Encoder used while capturing frames (webm)
    pub recorder_codec: String,

    /// Tried first when its container was requested
    pub primary: MuxAttempt,

    /// Tried when the primary fails or was not requested
    pub fallback: MuxAttempt,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            recorder_codec: "libvpx-vp9".to_string(),
            primary: MuxAttempt::mp4_default(),
            fallback: MuxAttempt::webm_default(),
        }
    }
}

impl TranscodeConfig {
    fn validate(&self) -> Result<()> {
        if self.ffmpeg_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "transcode.ffmpeg_path".to_string(),
                value: String::new()
            }.into());
        }

        if self.recorder_codec.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "transcode.recorder_codec".to_string(),
                value: String::new()
            }.into());
        }

        for (key, attempt) in [("transcode.primary", &self.primary), ("transcode.fallback", &self.fallback)] {
            if attempt.video_codec.is_empty() || attempt.audio_codec.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: format!("{}+{}", attempt.video_codec, attempt.audio_codec)
                }.into());
            }
        }

        // Passthrough delivers the captured webm, so the last muxed step must be webm too
        if self.fallback.format != OutputFormat::Webm {
            return Err(ConfigError::InvalidValue {
                key: "transcode.fallback.format".to_string(),
                value: self.fallback.format.to_string()
            }.into());
        }

        Ok(())
    }
}

/// Visualizer selection, look and overlay
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    /// Registry name of the visualizer
    pub visualizer: String,

    pub params: VisualParams,

    pub overlay: Overlay,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            visualizer: "pulse".to_string(),
            params: VisualParams::default(),
            overlay: Overlay::default(),
        }
    }
}

impl VisualConfig {
    fn validate(&self) -> Result<()> {
        if self.visualizer.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "visual.visualizer".to_string(),
                value: String::new()
            }.into());
        }

        if !self.params.intensity_multiplier.is_finite() || self.params.intensity_multiplier < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "visual.params.intensity_multiplier".to_string(),
                value: self.params.intensity_multiplier.to_string()
            }.into());
        }

        if let Some(bad) = self.params.palette.iter().find(|c| parse_hex_color(c).is_none()) {
            return Err(ConfigError::InvalidValue {
                key: "visual.params.palette".to_string(),
                value: bad.clone()
            }.into());
        }

        if !(0.0..=1.0).contains(&self.overlay.opacity) {
            return Err(ConfigError::InvalidValue {
                key: "visual.overlay.opacity".to_string(),
                value: self.overlay.opacity.to_string()
            }.into());
        }

        Ok(())
    }
}
