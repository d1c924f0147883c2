use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AudioError, Result};

/// FFT window length used by the feature extractor
pub const FFT_SIZE: usize = 2048;

/// Output rate of the reactive frame sequence (frames per second)
pub const FPS: u32 = 30;

/// Band edges in Hz: bass [20, 250), mid [250, 4000), treble [4000, 16000)
pub const BAND_EDGES: [f32; 4] = [20.0, 250.0, 4000.0, 16000.0];

/// Longest clip the engine accepts, in seconds
pub const MAX_CLIP_DURATION: f64 = 30.0;

/// Raw audio data, interleaved `f32` samples in [-1, 1]
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Audio samples (interleaved for stereo, mono for single channel)
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl AudioData {
    /// Wrap interleaved samples, rejecting layouts the engine cannot handle
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(AudioError::InvalidParameters {
                details: format!("sample_rate={} channels={}", sample_rate, channels),
            }
            .into());
        }

        if samples.len() % channels as usize != 0 {
            return Err(AudioError::InvalidParameters {
                details: format!(
                    "{} samples do not divide evenly into {} channels",
                    samples.len(),
                    channels
                ),
            }
            .into());
        }

        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Number of sample frames (one sample per channel)
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Get mono mix of all channels
    pub fn mono_samples(&self) -> Vec<f32> {
        if self.channels == 1 {
            return self.samples.clone();
        }

        self.samples
            .chunks(self.channels as usize)
            .map(|chunk| chunk.iter().sum::<f32>() / self.channels as f32)
            .collect()
    }
}

/// Sub-range of a source buffer selected for analysis and export
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipRange {
    pub in_time: f64,
    pub out_time: f64,
}

impl ClipRange {
    /// Validate `0 <= in < out <= source_duration` and the maximum clip length
    pub fn new(in_time: f64, out_time: f64, source_duration: f64) -> Result<Self> {
        let invalid = |details: String| -> crate::error::ReelError {
            AudioError::InvalidClipRange { details }.into()
        };

        if !in_time.is_finite() || !out_time.is_finite() {
            return Err(invalid(format!("non-finite bounds {}..{}", in_time, out_time)));
        }
        if in_time < 0.0 {
            return Err(invalid(format!("in_time {:.3}s is negative", in_time)));
        }
        if in_time >= out_time {
            return Err(invalid(format!(
                "in_time {:.3}s must be before out_time {:.3}s",
                in_time, out_time
            )));
        }
        // Allow half a sample of slack so "whole file" ranges survive float rounding
        if out_time > source_duration + 1e-6 {
            return Err(invalid(format!(
                "out_time {:.3}s exceeds source duration {:.3}s",
                out_time, source_duration
            )));
        }
        if out_time - in_time > MAX_CLIP_DURATION + 1e-9 {
            return Err(invalid(format!(
                "clip length {:.3}s exceeds maximum of {}s",
                out_time - in_time,
                MAX_CLIP_DURATION
            )));
        }

        Ok(Self { in_time, out_time })
    }

    /// Clip length in seconds
    pub fn duration(&self) -> f64 {
        self.out_time - self.in_time
    }

    /// `ceil(duration * FPS)`, tolerant of float noise on exact multiples
    pub fn total_frames(&self) -> usize {
        total_frames_for(self.duration())
    }
}

/// Number of output frames for a clip of `duration` seconds
pub fn total_frames_for(duration: f64) -> usize {
    if duration.is_nan() || duration <= 0.0 {
        return 0;
    }
    let exact = duration * FPS as f64;
    let nearest = exact.round();
    // 0.1 * 30 lands a hair above 3; treat that as 3, not 4
    let frames = if (exact - nearest).abs() <= 1e-9 { nearest } else { exact.ceil() };
    (frames as usize).max(1)
}

/// One analysis sample of the reactive signal, at [`FPS`] frames per second
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReactiveFrame {
    /// Seconds from clip start
    pub time: f64,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub amplitude: f32,
    /// Cooldown-gated bass trigger
    pub kick: bool,
    /// Broadband transient trigger
    pub onset: bool,
    /// Decaying envelope started by the last kick
    pub kick_intensity: f32,
}

impl ReactiveFrame {
    /// Zeroed frame placed at `time`, used when a sequence is shorter than expected
    pub fn silent_at(time: f64) -> Self {
        Self {
            time,
            ..Self::default()
        }
    }
}

/// Read-only frame sequence shared between preview and export
pub type ReactiveFrames = Arc<[ReactiveFrame]>;

/// Tunables for feature extraction and beat detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Attack coefficient used when a signal rises
    pub attack: f32,

    /// Release coefficient used when a signal falls
    pub release: f32,

    /// Peak smoothed amplitude below which a clip counts as quiet
    pub quiet_threshold: f32,

    /// Level the loudest amplitude frame is lifted towards on quiet clips
    pub boost_target: f32,

    /// Upper bound on the quiet-clip boost factor
    pub max_boost: f32,

    /// Bass acceleration that triggers a kick
    pub kick_threshold: f32,

    /// Amplitude acceleration that triggers an onset
    pub onset_threshold: f32,

    /// Minimum distance between two kicks, in frames
    pub kick_cooldown_frames: usize,

    /// Per-frame multiplier applied to the kick envelope
    pub kick_decay: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            attack: 0.8,
            release: 0.3,
            quiet_threshold: 0.1,
            boost_target: 0.8,
            max_boost: 4.0,
            kick_threshold: 0.15,
            onset_threshold: 0.08,
            kick_cooldown_frames: 6, // 200ms at 30 fps
            kick_decay: 0.85,
        }
    }
}

impl AnalysisConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, value) in [("attack", self.attack), ("release", self.release)] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(format!("{} coefficient must be in (0, 1], got {}", name, value));
            }
        }

        if !(0.0..=1.0).contains(&self.quiet_threshold) {
            return Err("Quiet threshold must be between 0.0 and 1.0".to_string());
        }

        if !(self.boost_target > 0.0 && self.boost_target <= 1.0) {
            return Err("Boost target must be in (0, 1]".to_string());
        }

        if self.max_boost < 1.0 {
            return Err("Maximum boost must be at least 1.0".to_string());
        }

        if self.kick_threshold <= 0.0 || self.onset_threshold <= 0.0 {
            return Err("Kick and onset thresholds must be positive".to_string());
        }

        if self.kick_cooldown_frames == 0 {
            return Err("Kick cooldown must be at least one frame".to_string());
        }

        if !(0.0..1.0).contains(&self.kick_decay) {
            return Err("Kick decay must be in [0, 1)".to_string());
        }

        Ok(())
    }
}

/// Summary of one extraction run, mostly for logging
#[derive(Debug, Clone, Default)]
pub struct AnalysisSummary {
    pub frame_count: usize,
    pub kick_count: usize,
    pub onset_count: usize,
    /// Loudest smoothed amplitude before normalization
    pub peak_amplitude: f32,
    /// Whether the quiet-clip boost was applied
    pub boosted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_data_mono_conversion() {
        let stereo = AudioData::new(vec![1.0, 3.0, 2.0, 4.0, 5.0, 7.0], 44100, 2).unwrap();
        assert_eq!(stereo.mono_samples(), vec![2.0, 3.0, 6.0]);
        assert_eq!(stereo.frame_count(), 3);
    }

    #[test]
    fn test_audio_data_rejects_ragged_layout() {
        assert!(AudioData::new(vec![0.0; 5], 44100, 2).is_err());
        assert!(AudioData::new(vec![0.0; 4], 0, 2).is_err());
    }

    #[test]
    fn test_clip_range_validation() {
        assert!(ClipRange::new(0.0, 10.0, 12.0).is_ok());
        assert!(ClipRange::new(-1.0, 10.0, 12.0).is_err());
        assert!(ClipRange::new(5.0, 5.0, 12.0).is_err());
        assert!(ClipRange::new(0.0, 13.0, 12.0).is_err());
        assert!(ClipRange::new(0.0, 31.0, 60.0).is_err());
        assert!(ClipRange::new(10.0, 40.0, 60.0).is_ok());
    }

    #[test]
    fn test_total_frames() {
        assert_eq!(ClipRange::new(0.0, 10.0, 10.0).unwrap().total_frames(), 300);
        assert_eq!(ClipRange::new(0.0, 0.01, 1.0).unwrap().total_frames(), 1);
        assert_eq!(ClipRange::new(1.0, 2.05, 3.0).unwrap().total_frames(), 32);
        assert_eq!(ClipRange::new(0.1, 0.2, 1.0).unwrap().total_frames(), 3);
    }

    #[test]
    fn test_total_frames_tiny_and_near_boundary() {
        assert_eq!(ClipRange::new(0.0, 1e-8, 1.0).unwrap().total_frames(), 1);
        assert_eq!(total_frames_for(1e-12), 1);
        assert_eq!(total_frames_for(1.0 / 30.0 + 1e-9), 2);
        assert_eq!(total_frames_for(1.0 / 30.0), 1);
        assert_eq!(total_frames_for(0.0), 0);
    }

    #[test]
    fn test_default_analysis_config_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());

        let config = AnalysisConfig {
            kick_cooldown_frames: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
