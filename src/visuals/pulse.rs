use crate::{
    error::Result,
    visuals::{scale_color, ControlSpec, ReactiveInput, Surface, Visualizer},
};

pub const BASE_RADIUS: &str = "base_radius";
pub const KICK_FLASH: &str = "kick_flash";

/// A central orb that swells with the bass and rings on every kick
pub struct PulseVisualizer {
    ring_radius: f32,
    ring_alpha: f32,
}

impl PulseVisualizer {
    pub fn new() -> Self {
        Self {
            ring_radius: 0.0,
            ring_alpha: 0.0,
        }
    }
}

impl Default for PulseVisualizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Visualizer for PulseVisualizer {
    fn name(&self) -> &str {
        "pulse"
    }

    fn description(&self) -> &str {
        "Bass-driven orb with expanding kick rings"
    }

    fn init(&mut self, _surface: &Surface) -> Result<()> {
        self.ring_radius = 0.0;
        self.ring_alpha = 0.0;
        Ok(())
    }

    fn update(&mut self, surface: &mut Surface, input: &ReactiveInput, delta: f32) -> Result<()> {
        let frame = &input.frame;
        let gain = input.intensity_multiplier.max(0.0);
        let width = surface.width() as f32;
        let height = surface.height() as f32;
        let (cx, cy) = (width / 2.0, height / 2.0);

        let background = input.palette_color(0, [8, 8, 20]);
        surface.fill(scale_color(background, 1.0 + frame.amplitude * 0.6 * gain));

        let base = input.get_f32_or(BASE_RADIUS, 0.18).clamp(0.05, 0.45) * width;
        let swell = 1.0 + (frame.bass * 0.5 + frame.kick_intensity * 0.3) * gain;
        let orb = input.palette_color(1, [255, 62, 127]);
        surface.fill_circle(cx, cy, base * swell * 1.25, orb, 0.25);
        surface.fill_circle(cx, cy, base * swell, orb, 0.9);

        // Rings expand outward and fade out over roughly half a second
        if frame.kick && input.get_bool_or(KICK_FLASH, true) {
            self.ring_radius = base * swell;
            self.ring_alpha = frame.kick_intensity.max(0.4);
        }
        if self.ring_alpha > 0.01 {
            let accent = input.palette_color(2, [62, 232, 255]);
            surface.stroke_circle(cx, cy, self.ring_radius, width * 0.012, accent, self.ring_alpha);
            self.ring_radius += width * 0.9 * delta;
            self.ring_alpha *= 1.0 - (2.0 * delta).min(1.0);
        }

        // Treble sparkles as a thin horizon line
        let line = input.palette_color(3, [255, 210, 62]);
        let line_width = (width * frame.treble * gain).min(width) as u32;
        surface.fill_rect(
            ((width - line_width as f32) / 2.0) as i64,
            (cy + height * 0.3) as i64,
            line_width,
            (height * 0.004).max(1.0) as u32,
            line,
            0.8,
        );

        Ok(())
    }

    fn controls_schema(&self) -> Vec<ControlSpec> {
        vec![
            ControlSpec::range(BASE_RADIUS, "Orb size", 0.05, 0.45, 0.01, 0.18),
            ControlSpec::toggle(KICK_FLASH, "Kick rings", true),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ReactiveFrame;
    use crate::visuals::VisualParams;

    #[test]
    fn test_bass_grows_orb() {
        let mut visualizer = PulseVisualizer::new();
        let mut surface = Surface::new_black(90, 160);
        visualizer.init(&surface).unwrap();

        let params = VisualParams::default();
        let quiet = params.input_for(ReactiveFrame::default());
        visualizer.update(&mut surface, &quiet, 1.0 / 30.0).unwrap();
        let edge_quiet = surface.get_pixel(45 + 22, 80);

        let loud = params.input_for(ReactiveFrame {
            bass: 1.0,
            ..Default::default()
        });
        visualizer.update(&mut surface, &loud, 1.0 / 30.0).unwrap();
        let edge_loud = surface.get_pixel(45 + 22, 80);

        assert_ne!(edge_quiet, edge_loud);
    }

    #[test]
    fn test_schema_lists_params() {
        let keys: Vec<String> = PulseVisualizer::new()
            .controls_schema()
            .into_iter()
            .map(|c| c.key)
            .collect();
        assert_eq!(keys, vec![BASE_RADIUS, KICK_FLASH]);
    }
}
