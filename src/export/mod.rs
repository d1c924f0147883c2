//! # Export
//!
//! Turns a clip, its reactive frames and a visualizer into a finished
//! vertical video.
//!
//! ```text
//! Idle → Preparing → Rendering → Transcoding → Done
//!            │            │            │
//!            └────────────┴────────────┴──→ Error | Cancelled
//! ```
//!
//! - [`ExportPipeline`] runs the stages and owns cleanup
//! - [`FrameRecorder`] captures rendered surfaces into a silent webm
//! - [`TranscodeChain`] adds the audio, degrading mp4 → webm → silent video
//!   rather than failing
//!
//! Cancellation is cooperative: the [`CancelToken`] is polled at every frame
//! and around the transcode, and a cancelled run ends in
//! [`ExportOutcome::Cancelled`] with every resource released.

pub mod pipeline;
pub mod recorder;
pub mod transcode;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use pipeline::{generate_filename, ExportPipeline};
pub use recorder::{CapturedVideo, FfmpegRecorder, FfmpegRecorderFactory, FrameRecorder, RecorderFactory};
pub use transcode::{
    parse_progress_line, FfmpegEngine, MuxAttempt, MuxJob, TranscodeChain, TranscodeEngine,
    TranscodeOutput, AUDIO_DROPPED_WARNING,
};
pub use types::{
    no_progress, CancelToken, ExportConfig, ExportOptions, ExportOutcome, ExportProgress,
    ExportResult, ExportStage, OutputFormat, ProgressCallback, Resolution,
};
