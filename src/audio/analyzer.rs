use std::ops::Range;

use rayon::prelude::*;

use crate::audio::beat::BeatDetector;
use crate::audio::fft::{hann_window, Fft};
use crate::audio::types::{
    AnalysisConfig, AnalysisSummary, AudioData, ClipRange, ReactiveFrame, BAND_EDGES, FFT_SIZE,
    FPS,
};
use crate::error::{AudioError, Result};

/// Un-normalized per-frame measurements
#[derive(Debug, Clone, Copy, Default)]
struct RawFeatures {
    bass: f32,
    mid: f32,
    treble: f32,
    amplitude: f32,
}

/// Per-worker FFT buffers
struct Scratch {
    re: Vec<f32>,
    im: Vec<f32>,
}

impl Scratch {
    fn new() -> Self {
        Self {
            re: vec![0.0; FFT_SIZE],
            im: vec![0.0; FFT_SIZE],
        }
    }
}

/// Deterministic feature extractor turning audio into a 30 Hz reactive frame sequence
pub struct AudioAnalyzer {
    config: AnalysisConfig,
    fft: Fft,
    window: Vec<f32>,
}

impl AudioAnalyzer {
    /// Create a new analyzer with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(AnalysisConfig::default())
    }

    /// Create a new analyzer with custom configuration
    pub fn with_config(config: AnalysisConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|details| AudioError::InvalidParameters { details })?;

        Ok(Self {
            config,
            fft: Fft::new(FFT_SIZE)?,
            window: hann_window(FFT_SIZE),
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Extract the reactive frame sequence for `[in_time, out_time)` of `audio`
    pub fn extract(&self, audio: &AudioData, in_time: f64, out_time: f64) -> Result<Vec<ReactiveFrame>> {
        self.extract_with_summary(audio, in_time, out_time)
            .map(|(frames, _)| frames)
    }

    /// Same as [`extract`](Self::extract), also returning an [`AnalysisSummary`]
    pub fn extract_with_summary(
        &self,
        audio: &AudioData,
        in_time: f64,
        out_time: f64,
    ) -> Result<(Vec<ReactiveFrame>, AnalysisSummary)> {
        let range = ClipRange::new(in_time, out_time, audio.duration())?;
        let total_frames = range.total_frames();
        let sample_rate = audio.sample_rate;

        tracing::info!(
            "Extracting {} frames from {:.2}s-{:.2}s ({} Hz, {} channels)",
            total_frames,
            range.in_time,
            range.out_time,
            sample_rate,
            audio.channels
        );

        let mono = audio.mono_samples();
        let bands = band_bins(sample_rate);

        // Step 1: raw spectra, independent per frame
        let raw: Vec<RawFeatures> = (0..total_frames)
            .into_par_iter()
            .map_init(Scratch::new, |scratch, f| {
                let center_time = range.in_time + f as f64 / FPS as f64;
                self.raw_features(&mono, sample_rate, center_time, &bands, scratch)
            })
            .collect::<Result<Vec<_>>>()?;

        // Step 2: attack/release smoothing, state local to this call
        let mut bass = self.smooth(raw.iter().map(|r| r.bass));
        let mut mid = self.smooth(raw.iter().map(|r| r.mid));
        let mut treble = self.smooth(raw.iter().map(|r| r.treble));
        let mut amplitude = self.smooth(raw.iter().map(|r| r.amplitude));

        let peak_amplitude = amplitude.iter().copied().fold(0.0f32, f32::max);

        // Step 3: whole-sequence normalization
        for series in [&mut bass, &mut mid, &mut treble, &mut amplitude] {
            normalize_in_place(series);
        }

        // Step 4: keep quiet clips visually reactive
        let boosted = peak_amplitude > 0.0 && peak_amplitude < self.config.quiet_threshold;
        if boosted {
            let scale = (self.config.boost_target / peak_amplitude).min(self.config.max_boost);
            tracing::debug!(
                "Quiet clip (peak amplitude {:.4}), boosting by {:.2}",
                peak_amplitude,
                scale
            );
            for series in [&mut bass, &mut mid, &mut treble, &mut amplitude] {
                for value in series.iter_mut() {
                    *value = (*value * scale).min(1.0);
                }
            }
        }

        // Step 5: beat markers over the final smoothed series
        let markers = BeatDetector::new(&self.config).detect(&bass, &amplitude);

        let frames: Vec<ReactiveFrame> = markers
            .iter()
            .enumerate()
            .map(|(f, marker)| ReactiveFrame {
                time: f as f64 / FPS as f64,
                bass: bass[f],
                mid: mid[f],
                treble: treble[f],
                amplitude: amplitude[f],
                kick: marker.kick,
                onset: marker.onset,
                kick_intensity: marker.kick_intensity,
            })
            .collect();

        let summary = AnalysisSummary {
            frame_count: frames.len(),
            kick_count: frames.iter().filter(|f| f.kick).count(),
            onset_count: frames.iter().filter(|f| f.onset).count(),
            peak_amplitude,
            boosted,
        };

        tracing::info!(
            "Extraction complete: {} frames, {} kicks, {} onsets, peak amplitude {:.3}{}",
            summary.frame_count,
            summary.kick_count,
            summary.onset_count,
            summary.peak_amplitude,
            if boosted { " (boosted)" } else { "" }
        );

        Ok((frames, summary))
    }

    /// Window the mono signal around `center_time` and measure bands and RMS
    fn raw_features(
        &self,
        mono: &[f32],
        sample_rate: u32,
        center_time: f64,
        bands: &[Range<usize>; 3],
        scratch: &mut Scratch,
    ) -> Result<RawFeatures> {
        let center = (center_time * sample_rate as f64).round() as i64;
        let start = center - (FFT_SIZE / 2) as i64;

        let mut sum_squares = 0.0f32;
        for i in 0..FFT_SIZE {
            let index = start + i as i64;
            let sample = if index >= 0 && (index as usize) < mono.len() {
                mono[index as usize]
            } else {
                0.0 // zero-pad outside the source buffer
            };

            sum_squares += sample * sample;
            scratch.re[i] = sample * self.window[i];
            scratch.im[i] = 0.0;
        }

        self.fft.process(&mut scratch.re, &mut scratch.im)?;

        let scale = 2.0 / FFT_SIZE as f32;
        let band_energy = |bins: &Range<usize>| -> f32 {
            if bins.is_empty() {
                return 0.0;
            }
            let sum: f32 = bins
                .clone()
                .map(|k| (scratch.re[k] * scratch.re[k] + scratch.im[k] * scratch.im[k]).sqrt())
                .sum();
            sum * scale / bins.len() as f32
        };

        Ok(RawFeatures {
            bass: band_energy(&bands[0]),
            mid: band_energy(&bands[1]),
            treble: band_energy(&bands[2]),
            amplitude: (sum_squares / FFT_SIZE as f32).sqrt(),
        })
    }

    /// Asymmetric exponential smoothing: fast attack, slow release
    fn smooth(&self, raw: impl Iterator<Item = f32>) -> Vec<f32> {
        let mut state = 0.0f32;
        raw.map(|value| {
            let coefficient = if value > state {
                self.config.attack
            } else {
                self.config.release
            };
            state += coefficient * (value - state);
            state
        })
        .collect()
    }
}

/// FFT bin ranges for the bass, mid and treble bands at `sample_rate`.
/// Bins above Nyquist are never included.
fn band_bins(sample_rate: u32) -> [Range<usize>; 3] {
    let nyquist_bin = FFT_SIZE / 2;
    let to_bin = |hz: f32| -> usize {
        let bin = (hz as f64 * FFT_SIZE as f64 / sample_rate as f64).ceil() as usize;
        bin.min(nyquist_bin + 1)
    };

    [
        to_bin(BAND_EDGES[0])..to_bin(BAND_EDGES[1]),
        to_bin(BAND_EDGES[1])..to_bin(BAND_EDGES[2]),
        to_bin(BAND_EDGES[2])..to_bin(BAND_EDGES[3]),
    ]
}

/// Divide every value by the series maximum; a zero maximum leaves the series untouched
fn normalize_in_place(series: &mut [f32]) {
    let max = series.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        for value in series.iter_mut() {
            *value /= max;
        }
    }
}
