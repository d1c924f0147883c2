//! # Audio Analysis Module
//!
//! Turns a bounded audio clip into the reactive signal that drives the visuals,
//! and encodes the matching audio segment for muxing.
//!
//! ## Core Features
//!
//! - **Spectral Transform**: fixed-size radix-2 FFT ([`fft::Fft`])
//! - **Feature Extraction**: bass/mid/treble band energies and RMS amplitude at 30 Hz,
//!   smoothed with fast attack / slow release and normalized over the whole clip
//! - **Beat Detection**: cooldown-gated kicks, onsets, and a decaying kick envelope
//! - **Segment Encoding**: PCM16 WAV of exactly the trimmed sample range
//!
//! ## Usage
//!
//! ```rust,no_run
//! use reactive_reel::audio::{AudioAnalyzer, AudioLoader};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let audio = AudioLoader::load("song.wav").await?;
//!
//! let analyzer = AudioAnalyzer::new()?;
//! let frames = analyzer.extract(&audio, 12.0, 22.0)?;
//!
//! println!("{} frames, {} kicks", frames.len(), frames.iter().filter(|f| f.kick).count());
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod beat;
pub mod encoder;
pub mod fft;
pub mod loader;
pub mod types;

pub use analyzer::AudioAnalyzer;
pub use beat::{BeatDetector, BeatMarker};
pub use encoder::SegmentEncoder;
pub use loader::AudioLoader;
pub use types::{
    AnalysisConfig, AnalysisSummary, AudioData, ClipRange, ReactiveFrame, ReactiveFrames,
    FFT_SIZE, FPS, MAX_CLIP_DURATION,
};
