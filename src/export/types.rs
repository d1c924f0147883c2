use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::audio::{AudioData, ClipRange, ReactiveFrames};
use crate::error::{ExportError, ReelError};
use crate::visuals::{Overlay, VisualParams, Visualizer};

/// Supported vertical output sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "1080x1920")]
    Portrait1080,
    #[serde(rename = "720x1280")]
    Portrait720,
}

impl Resolution {
    /// (width, height) in pixels
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::Portrait1080 => (1080, 1920),
            Resolution::Portrait720 => (720, 1280),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.dimensions();
        write!(f, "{}x{}", w, h)
    }
}

impl FromStr for Resolution {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1080x1920" | "1080p" => Ok(Resolution::Portrait1080),
            "720x1280" | "720p" => Ok(Resolution::Portrait720),
            other => Err(ExportError::InvalidOptions {
                details: format!("unsupported resolution '{}' (use 1080x1920 or 720x1280)", other),
            }
            .into()),
        }
    }
}

/// Container preference for the final file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Mp4,
    Webm,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Webm => "webm",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mp4" => Ok(OutputFormat::Mp4),
            "webm" => Ok(OutputFormat::Webm),
            other => Err(ExportError::InvalidOptions {
                details: format!("unsupported format '{}' (use mp4 or webm)", other),
            }
            .into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    pub resolution: Resolution,
    /// A preference; the transcode chain may substitute webm
    pub format: OutputFormat,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            resolution: Resolution::Portrait1080,
            format: OutputFormat::Mp4,
        }
    }
}

/// Immutable snapshot consumed by exactly one export run
pub struct ExportConfig {
    pub audio: Arc<AudioData>,
    pub range: ClipRange,
    pub frames: ReactiveFrames,
    /// Owned by the run; initialized in `preparing`, disposed when the run ends
    pub visualizer: Box<dyn Visualizer>,
    pub visual: VisualParams,
    pub overlay: Overlay,
    pub options: ExportOptions,
}

impl fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportConfig")
            .field("range", &self.range)
            .field("frames", &self.frames.len())
            .field("visualizer", &self.visualizer.name())
            .field("options", &self.options)
            .finish()
    }
}

/// Reported pipeline states, plus the orthogonal `Cancelled` outcome
///
/// A pipeline that has not been run is idle and reports nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStage {
    Preparing,
    Rendering,
    Transcoding,
    Done,
    Error,
    Cancelled,
}

impl ExportStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExportStage::Done | ExportStage::Error | ExportStage::Cancelled)
    }
}

/// Observational progress report; never authoritative state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportProgress {
    pub stage: ExportStage,
    /// Overall progress in [0, 1]
    pub progress: f32,
    pub message: String,
    pub current_frame: Option<usize>,
    pub total_frames: Option<usize>,
}

impl ExportProgress {
    pub fn new<S: Into<String>>(stage: ExportStage, progress: f32, message: S) -> Self {
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
            current_frame: None,
            total_frames: None,
        }
    }

    pub fn with_frames(mut self, current: usize, total: usize) -> Self {
        self.current_frame = Some(current);
        self.total_frames = Some(total);
        self
    }
}

/// Callback fired throughout an export
pub type ProgressCallback = Arc<dyn Fn(ExportProgress) + Send + Sync>;

/// Progress callback that discards every report
pub fn no_progress() -> ProgressCallback {
    Arc::new(|_| {})
}

/// Terminal success value
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub format: OutputFormat,
    /// Clip length in seconds
    pub duration: f64,
    /// Present when the result is degraded (substituted codec, dropped audio)
    pub warning: Option<String>,
}

/// How an export run ended, when it did not fail
#[derive(Debug, Clone)]
pub enum ExportOutcome {
    Done(ExportResult),
    Cancelled,
}

impl ExportOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExportOutcome::Cancelled)
    }

    pub fn into_result(self) -> Option<ExportResult> {
        match self {
            ExportOutcome::Done(result) => Some(result),
            ExportOutcome::Cancelled => None,
        }
    }
}

/// Cooperative cancellation flag polled at frame and await boundaries
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
