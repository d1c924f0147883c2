//! # Reactive-Reel
//!
//! Turn a short clip of a song into an audio-reactive vertical video.
//!
//! This library analyzes a bounded slice of an audio track into a 30 Hz
//! reactive signal (band energies, loudness, kicks, onsets), drives a
//! visualizer with it frame by frame, and muxes the rendered frames with the
//! matching audio into a 9:16 video.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reactive_reel::{
//!     audio::{AudioAnalyzer, AudioLoader, ClipRange},
//!     config::Config,
//!     export::{no_progress, CancelToken, ExportConfig, ExportOptions, ExportPipeline},
//!     visuals::VisualizerRegistry,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let audio = Arc::new(AudioLoader::load("song.wav").await?);
//! let range = ClipRange::new(30.0, 45.0, audio.duration())?;
//!
//! let frames = AudioAnalyzer::with_config(config.analysis.clone())?
//!     .extract(&audio, range.in_time, range.out_time)?;
//!
//! let export = ExportConfig {
//!     audio,
//!     range,
//!     frames: frames.into(),
//!     visualizer: VisualizerRegistry::new().create("pulse")?,
//!     visual: config.visual.params.clone(),
//!     overlay: config.visual.overlay.clone(),
//!     options: ExportOptions::default(),
//! };
//!
//! let outcome = ExportPipeline::from_config(&config)
//!     .run(export, no_progress(), &CancelToken::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`audio`] - Loading, feature extraction, beat detection and WAV segment encoding
//! - [`visuals`] - The [`Visualizer`](visuals::Visualizer) trait, built-in renderers and overlays
//! - [`export`] - Export pipeline, frame recorder and transcode fallback chain
//! - [`config`] - Configuration management
//!
//! ## Creating Custom Visualizers
//!
//! ```rust,no_run
//! use reactive_reel::visuals::{ReactiveInput, Surface, Visualizer};
//! use reactive_reel::Result;
//!
//! struct Strobe;
//!
//! impl Visualizer for Strobe {
//!     fn name(&self) -> &str {
//!         "strobe"
//!     }
//!
//!     fn description(&self) -> &str {
//!         "White flash on every kick"
//!     }
//!
//!     fn init(&mut self, _surface: &Surface) -> Result<()> {
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, surface: &mut Surface, input: &ReactiveInput, _delta: f32) -> Result<()> {
//!         let level = (input.frame.kick_intensity * 255.0) as u8;
//!         surface.fill([level, level, level]);
//!         Ok(())
//!     }
//! }
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod export;
pub mod visuals;

// Re-export commonly used types for convenience
pub use crate::{
    audio::{AudioAnalyzer, ReactiveFrame},
    config::Config,
    error::{ReelError, Result},
    export::{ExportPipeline, ExportOutcome},
    visuals::{Visualizer, VisualizerRegistry},
};
