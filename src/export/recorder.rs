use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::{ExportError, Result};
use crate::export::OutputFormat;
use crate::visuals::Surface;

/// Silent video produced by a recorder
#[derive(Debug, Clone)]
pub struct CapturedVideo {
    pub bytes: Vec<u8>,
    /// Container the bytes are in
    pub format: OutputFormat,
    pub codec: String,
    pub frame_count: usize,
}

/// Frame sink for one export run
///
/// `stop` and `abort` are both terminal; calling either after the other is a no-op.
pub trait FrameRecorder: Send {
    fn capture(&mut self, surface: &Surface) -> Result<()>;

    /// Flush and return the encoded video
    fn stop(&mut self) -> Result<CapturedVideo>;

    /// Tear down without producing output
    fn abort(&mut self);
}

/// Creates recorders and reports whether this host can record at all
pub trait RecorderFactory: Send + Sync {
    fn is_supported(&self) -> bool;

    fn start(&self, width: u32, height: u32, fps: u32) -> Result<Box<dyn FrameRecorder>>;
}

/// Records raw RGB frames by piping them into an ffmpeg child
pub struct FfmpegRecorderFactory {
    ffmpeg: PathBuf,
    codec: String,
}

impl FfmpegRecorderFactory {
    pub fn new<P: Into<PathBuf>>(ffmpeg: P, codec: &str) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            codec: codec.to_string(),
        }
    }
}

impl RecorderFactory for FfmpegRecorderFactory {
    fn is_supported(&self) -> bool {
        let output = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();

        match output {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).contains(self.codec.as_str())
            }
            _ => false,
        }
    }

    fn start(&self, width: u32, height: u32, fps: u32) -> Result<Box<dyn FrameRecorder>> {
        let dir = tempfile::Builder::new()
            .prefix("reel-capture-")
            .tempdir()
            .map_err(|e| ExportError::RecorderUnavailable {
                reason: format!("cannot create capture directory: {}", e),
            })?;
        let output = dir.path().join("capture.webm");
        // stderr goes to a file so a chatty encoder can never stall on a full pipe
        let log = dir.path().join("ffmpeg.log");
        let log_file = fs::File::create(&log).map_err(|e| ExportError::RecorderUnavailable {
            reason: format!("cannot create recorder log: {}", e),
        })?;
        let size = format!("{}x{}", width, height);
        let rate = fps.to_string();

        let child = Command::new(&self.ffmpeg)
            .args([
                "-y", "-hide_banner",
                "-loglevel", "error",
                "-f", "rawvideo",
                "-pixel_format", "rgb24",
                "-video_size", size.as_str(),
                "-framerate", rate.as_str(),
                "-i", "pipe:0",
                "-c:v", self.codec.as_str(),
                "-deadline", "realtime",
                "-cpu-used", "8",
                "-b:v", "6M",
                "-pix_fmt", "yuv420p",
            ])
            .arg(&output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::from(log_file))
            .spawn()
            .map_err(|e| ExportError::RecorderUnavailable {
                reason: format!("failed to spawn ffmpeg: {}", e),
            })?;

        info!("Recorder started: {}x{} @ {}fps, codec={}", width, height, fps, self.codec);

        Ok(Box::new(FfmpegRecorder {
            child: Some(child),
            dir: Some(dir),
            output,
            log,
            width,
            height,
            codec: codec_label(&self.codec),
            frames: 0,
        }))
    }
}

/// Last few lines of the encoder log, for error messages
fn log_tail(path: &Path) -> String {
    const TAIL_LINES: usize = 10;

    match fs::read_to_string(path) {
        Ok(text) => {
            let lines: Vec<&str> = text.lines().collect();
            let start = lines.len().saturating_sub(TAIL_LINES);
            lines[start..].join("\n")
        }
        Err(e) => format!("(log unavailable: {})", e),
    }
}

fn codec_label(encoder: &str) -> String {
    match encoder {
        "libvpx-vp9" => "vp9".to_string(),
        "libvpx" => "vp8".to_string(),
        other => other.to_string(),
    }
}

pub struct FfmpegRecorder {
    child: Option<Child>,
    dir: Option<TempDir>,
    output: PathBuf,
    log: PathBuf,
    width: u32,
    height: u32,
    codec: String,
    frames: usize,
}

impl FrameRecorder for FfmpegRecorder {
    fn capture(&mut self, surface: &Surface) -> Result<()> {
        if surface.width() != self.width || surface.height() != self.height {
            return Err(ExportError::RecorderFailed {
                reason: format!(
                    "frame is {}x{}, recorder expects {}x{}",
                    surface.width(),
                    surface.height(),
                    self.width,
                    self.height
                ),
            }
            .into());
        }

        let stdin = self
            .child
            .as_mut()
            .and_then(|child| child.stdin.as_mut())
            .ok_or_else(|| ExportError::RecorderFailed {
                reason: "recorder is not running".to_string(),
            })?;

        stdin
            .write_all(surface.as_bytes())
            .map_err(|e| ExportError::RecorderFailed {
                reason: format!("failed to write frame {}: {}", self.frames, e),
            })?;

        self.frames += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<CapturedVideo> {
        let mut child = self.child.take().ok_or_else(|| ExportError::RecorderFailed {
            reason: "recorder already stopped".to_string(),
        })?;

        // EOF on stdin lets ffmpeg finalize the container
        drop(child.stdin.take());

        let status = child.wait().map_err(|e| ExportError::RecorderFailed {
            reason: format!("failed to wait for ffmpeg: {}", e),
        })?;

        if !status.success() {
            let log = log_tail(&self.log);
            self.dir = None;
            return Err(ExportError::RecorderFailed {
                reason: format!("ffmpeg exited with {}: {}", status, log),
            }
            .into());
        }

        let bytes = fs::read(&self.output);
        self.dir = None;
        let bytes = bytes.map_err(|e| ExportError::RecorderFailed {
            reason: format!("captured video unreadable: {}", e),
        })?;

        debug!("Recorder stopped: {} frames, {} bytes", self.frames, bytes.len());

        Ok(CapturedVideo {
            bytes,
            format: OutputFormat::Webm,
            codec: self.codec.clone(),
            frame_count: self.frames,
        })
    }

    fn abort(&mut self) {
        if let Some(mut child) = self.child.take() {
            drop(child.stdin.take());
            if let Err(e) = child.kill() {
                debug!("ffmpeg already exited: {}", e);
            }
            if let Err(e) = child.wait() {
                warn!("Failed to reap ffmpeg recorder: {}", e);
            }
            debug!("Recorder aborted after {} frames", self.frames);
        }
        self.dir = None;
    }
}

impl Drop for FfmpegRecorder {
    fn drop(&mut self) {
        self.abort();
    }
}
