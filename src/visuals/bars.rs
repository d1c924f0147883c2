use crate::{
    error::Result,
    visuals::{scale_color, ControlSpec, ReactiveInput, Surface, Visualizer},
};

pub const GAP: &str = "gap";
pub const MIRROR: &str = "mirror";

/// Three vertical band meters with an amplitude strip underneath
pub struct BarsVisualizer {
    /// Peak-hold level per band, falls back slowly
    peaks: [f32; 3],
}

impl BarsVisualizer {
    pub fn new() -> Self {
        Self { peaks: [0.0; 3] }
    }
}

impl Default for BarsVisualizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Visualizer for BarsVisualizer {
    fn name(&self) -> &str {
        "bars"
    }

    fn description(&self) -> &str {
        "Bass, mid and treble meters with peak hold"
    }

    fn init(&mut self, _surface: &Surface) -> Result<()> {
        self.peaks = [0.0; 3];
        Ok(())
    }

    fn update(&mut self, surface: &mut Surface, input: &ReactiveInput, delta: f32) -> Result<()> {
        let frame = &input.frame;
        let gain = input.intensity_multiplier.max(0.0);
        let width = surface.width() as f32;
        let height = surface.height() as f32;

        let background = input.palette_color(0, [8, 8, 20]);
        let flash = if frame.kick { 1.4 } else { 1.0 };
        surface.fill(scale_color(background, flash));

        let gap = input.get_f32_or(GAP, 0.06).clamp(0.0, 0.2) * width;
        let bar_width = ((width - gap * 4.0) / 3.0).max(1.0);
        let max_height = height * 0.6;
        let baseline = height * 0.75;
        let mirror = input.get_bool_or(MIRROR, false);

        for (band, value) in [frame.bass, frame.mid, frame.treble].into_iter().enumerate() {
            let level = (value * gain).min(1.0);
            self.peaks[band] = if level > self.peaks[band] {
                level
            } else {
                (self.peaks[band] - delta * 0.5).max(level)
            };

            let color = input.palette_color(band + 1, [255, 255, 255]);
            let x = (gap + band as f32 * (bar_width + gap)) as i64;
            let bar_height = (level * max_height) as u32;

            surface.fill_rect(x, (baseline - bar_height as f32) as i64, bar_width as u32, bar_height, color, 0.9);
            if mirror {
                surface.fill_rect(x, baseline as i64, bar_width as u32, bar_height / 3, color, 0.3);
            }

            let peak_y = baseline - self.peaks[band] * max_height;
            surface.fill_rect(x, peak_y as i64 - 2, bar_width as u32, 4, [255, 255, 255], 0.8);
        }

        let strip = (frame.amplitude * gain).min(1.0) * width;
        surface.fill_rect(0, (height * 0.9) as i64, strip as u32, (height * 0.01).max(1.0) as u32, [255, 255, 255], 0.7);

        Ok(())
    }

    fn dispose(&mut self) {
        self.peaks = [0.0; 3];
    }

    fn controls_schema(&self) -> Vec<ControlSpec> {
        vec![
            ControlSpec::range(GAP, "Bar spacing", 0.0, 0.2, 0.01, 0.06),
            ControlSpec::toggle(MIRROR, "Reflection", false),
        ]
    }
}
