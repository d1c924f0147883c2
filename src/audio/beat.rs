//! Kick and onset detection over the smoothed band series.

use crate::audio::types::AnalysisConfig;

/// Per-frame beat markers produced by [`BeatDetector::detect`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BeatMarker {
    pub kick: bool,
    pub onset: bool,
    pub kick_intensity: f32,
}

/// Envelope values below this snap to zero
const INTENSITY_FLOOR: f32 = 1e-3;

/// Derives kick/onset triggers from frame-to-frame acceleration
#[derive(Debug, Clone)]
pub struct BeatDetector {
    kick_threshold: f32,
    onset_threshold: f32,
    cooldown_frames: usize,
    decay: f32,
}

impl BeatDetector {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            kick_threshold: config.kick_threshold,
            onset_threshold: config.onset_threshold,
            cooldown_frames: config.kick_cooldown_frames,
            decay: config.kick_decay,
        }
    }

    /// Run detection over equally long bass and amplitude series.
    ///
    /// The value before the first frame is taken as zero, so a clip that
    /// starts loud can trigger on frame 0.
    pub fn detect(&self, bass: &[f32], amplitude: &[f32]) -> Vec<BeatMarker> {
        let mut markers = Vec::with_capacity(bass.len());
        let mut last_kick: Option<usize> = None;
        let mut intensity = 0.0f32;
        let mut prev_bass = 0.0f32;
        let mut prev_amplitude = 0.0f32;

        for (f, (&b, &a)) in bass.iter().zip(amplitude).enumerate() {
            let bass_accel = b - prev_bass;
            let amp_accel = a - prev_amplitude;
            prev_bass = b;
            prev_amplitude = a;

            let cooled_down = last_kick.map_or(true, |last| f - last >= self.cooldown_frames);
            let kick = bass_accel > self.kick_threshold && cooled_down;

            if kick {
                last_kick = Some(f);
                intensity = bass_accel.min(1.0);
            } else {
                intensity *= self.decay;
                if intensity < INTENSITY_FLOOR {
                    intensity = 0.0;
                }
            }

            markers.push(BeatMarker {
                kick,
                onset: amp_accel > self.onset_threshold,
                kick_intensity: intensity,
            });
        }

        markers
    }
}
