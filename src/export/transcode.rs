use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ExportError, Result};
use crate::export::{CapturedVideo, OutputFormat};

pub const AUDIO_DROPPED_WARNING: &str =
    "Audio could not be added to the video; exported without sound (audio was dropped)";

/// One container/codec pairing the chain may try
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuxAttempt {
    pub format: OutputFormat,
    /// Encoder name, or `copy` to keep the captured stream
    pub video_codec: String,
    pub audio_codec: String,
}

impl MuxAttempt {
    pub fn new(format: OutputFormat, video_codec: &str, audio_codec: &str) -> Self {
        Self {
            format,
            video_codec: video_codec.to_string(),
            audio_codec: audio_codec.to_string(),
        }
    }

    /// H.264 + AAC in MP4
    pub fn mp4_default() -> Self {
        Self::new(OutputFormat::Mp4, "libx264", "aac")
    }

    /// Captured VP8/VP9 stream copied + Opus in WebM
    pub fn webm_default() -> Self {
        Self::new(OutputFormat::Webm, "copy", "libopus")
    }
}

/// Staged inputs for a single mux attempt
#[derive(Debug)]
pub struct MuxJob<'a> {
    pub video: &'a Path,
    pub audio: &'a Path,
    pub output: &'a Path,
    pub attempt: &'a MuxAttempt,
    /// Clip length in seconds, for progress mapping
    pub duration: f64,
}

/// Muxing backend
pub trait TranscodeEngine: Send + Sync {
    /// Make the engine ready; failure sends the chain straight to passthrough
    fn load(&self) -> Result<()>;

    /// Combine `job.video` and `job.audio` into `job.output`
    fn mux(&self, job: &MuxJob<'_>, on_progress: &dyn Fn(f32)) -> Result<()>;
}

/// What the chain delivered
#[derive(Debug, Clone)]
pub struct TranscodeOutput {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub warning: Option<String>,
}

impl TranscodeOutput {
    /// The captured video as-is, without audio
    pub fn passthrough(video: &CapturedVideo) -> Self {
        Self {
            bytes: video.bytes.clone(),
            format: video.format,
            warning: Some(AUDIO_DROPPED_WARNING.to_string()),
        }
    }
}

/// Ordered fallback over mux attempts, ending in passthrough
pub struct TranscodeChain {
    engine: Arc<dyn TranscodeEngine>,
    primary: MuxAttempt,
    fallback: MuxAttempt,
}

impl TranscodeChain {
    pub fn new(engine: Arc<dyn TranscodeEngine>, primary: MuxAttempt, fallback: MuxAttempt) -> Self {
        Self {
            engine,
            primary,
            fallback,
        }
    }

    /// Attempts tried for `requested`, in order
    ///
    /// The primary pairing only runs when it produces the requested container.
    pub fn attempts_for(&self, requested: OutputFormat) -> Vec<&MuxAttempt> {
        let mut attempts = Vec::with_capacity(2);
        if self.primary.format == requested {
            attempts.push(&self.primary);
        }
        attempts.push(&self.fallback);
        attempts
    }

    /// Mux `video` with `audio_wav`; never fails
    ///
    /// Blocking. Degraded results carry a warning instead of an error.
    pub fn transcode(
        &self,
        video: &CapturedVideo,
        audio_wav: &[u8],
        requested: OutputFormat,
        duration: f64,
        on_progress: &dyn Fn(f32),
    ) -> TranscodeOutput {
        if let Err(e) = self.engine.load() {
            warn!("Transcode engine unavailable ({}); delivering silent video", e);
            return TranscodeOutput::passthrough(video);
        }

        for attempt in self.attempts_for(requested) {
            info!(
                "Muxing {} ({} + {})",
                attempt.format, attempt.video_codec, attempt.audio_codec
            );

            match self.run_attempt(attempt, video, audio_wav, duration, on_progress) {
                Ok(bytes) => {
                    on_progress(1.0);
                    let warning = (attempt.format != requested).then(|| {
                        format!(
                            "{} export failed; delivered {} instead",
                            requested.extension().to_uppercase(),
                            attempt.format.extension().to_uppercase()
                        )
                    });
                    return TranscodeOutput {
                        bytes,
                        format: attempt.format,
                        warning,
                    };
                }
                Err(e) => warn!("{} mux failed, falling back: {}", attempt.format, e),
            }
        }

        warn!("All mux attempts failed; delivering silent video");
        TranscodeOutput::passthrough(video)
    }

    fn run_attempt(
        &self,
        attempt: &MuxAttempt,
        video: &CapturedVideo,
        audio_wav: &[u8],
        duration: f64,
        on_progress: &dyn Fn(f32),
    ) -> Result<Vec<u8>> {
        // Dropped on every return path, taking the staged files with it
        let staging = tempfile::Builder::new().prefix("reel-mux-").tempdir()?;

        let video_path = staging.path().join(format!("capture.{}", video.format.extension()));
        let audio_path = staging.path().join("audio.wav");
        let output_path = staging.path().join(format!("output.{}", attempt.format.extension()));

        fs::write(&video_path, &video.bytes)?;
        fs::write(&audio_path, audio_wav)?;

        let job = MuxJob {
            video: &video_path,
            audio: &audio_path,
            output: &output_path,
            attempt,
            duration,
        };
        self.engine.mux(&job, on_progress)?;

        let bytes = fs::read(&output_path).map_err(|e| ExportError::TranscodeFailed {
            reason: format!("no output produced: {}", e),
        })?;
        if bytes.is_empty() {
            return Err(ExportError::TranscodeFailed {
                reason: "muxer produced an empty file".to_string(),
            }
            .into());
        }

        debug!("Mux produced {} bytes", bytes.len());
        Ok(bytes)
    }
}

/// Muxes through an external `ffmpeg` binary
pub struct FfmpegEngine {
    ffmpeg: PathBuf,
}

impl FfmpegEngine {
    pub fn new<P: Into<PathBuf>>(ffmpeg: P) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    fn build_args(job: &MuxJob<'_>) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-y".into(), "-hide_banner".into(),
            "-loglevel".into(), "error".into(),
            "-nostats".into(),
            "-i".into(), job.video.display().to_string(),
            "-i".into(), job.audio.display().to_string(),
            "-map".into(), "0:v:0".into(),
            "-map".into(), "1:a:0".into(),
            "-c:v".into(), job.attempt.video_codec.clone(),
        ];

        if job.attempt.video_codec != "copy" {
            args.extend([
                "-pix_fmt".to_string(), "yuv420p".to_string(),
                "-preset".to_string(), "veryfast".to_string(),
                "-crf".to_string(), "20".to_string(),
            ]);
        }

        args.extend([
            "-c:a".to_string(), job.attempt.audio_codec.clone(),
            "-b:a".to_string(), "192k".to_string(),
            "-shortest".to_string(),
        ]);

        if job.attempt.format == OutputFormat::Mp4 {
            args.extend(["-movflags".to_string(), "+faststart".to_string()]);
        }

        args.extend([
            "-progress".to_string(), "pipe:1".to_string(),
            job.output.display().to_string(),
        ]);
        args
    }
}

impl TranscodeEngine for FfmpegEngine {
    fn load(&self) -> Result<()> {
        let available = Command::new(&self.ffmpeg)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false);

        if available {
            Ok(())
        } else {
            Err(ExportError::TranscodeFailed {
                reason: format!("{} not found. Please install FFmpeg.", self.ffmpeg.display()),
            }
            .into())
        }
    }

    fn mux(&self, job: &MuxJob<'_>, on_progress: &dyn Fn(f32)) -> Result<()> {
        let mut child = Command::new(&self.ffmpeg)
            .args(Self::build_args(job))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExportError::TranscodeFailed {
                reason: format!("failed to spawn ffmpeg: {}", e),
            })?;

        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines().map_while(|line| line.ok()) {
                if let Some(fraction) = parse_progress_line(&line, job.duration) {
                    on_progress(fraction);
                }
            }
        }

        let output = child.wait_with_output().map_err(|e| ExportError::TranscodeFailed {
            reason: format!("failed to wait for ffmpeg: {}", e),
        })?;

        if !output.status.success() {
            return Err(ExportError::TranscodeFailed {
                reason: format!("ffmpeg failed: {}", String::from_utf8_lossy(&output.stderr).trim()),
            }
            .into());
        }

        Ok(())
    }
}

/// Map an ffmpeg `-progress` line to a fraction of `duration`
///
/// `out_time_ms` is reported in microseconds despite its name.
pub fn parse_progress_line(line: &str, duration: f64) -> Option<f32> {
    let (key, value) = line.trim().split_once('=')?;
    if key != "out_time_ms" && key != "out_time_us" {
        return None;
    }
    if duration <= 0.0 {
        return None;
    }
    let micros: f64 = value.trim().parse().ok()?;
    Some((micros / 1_000_000.0 / duration).clamp(0.0, 1.0) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::testing::{captured_video, MockEngine};

    fn chain(engine: MockEngine) -> TranscodeChain {
        TranscodeChain::new(Arc::new(engine), MuxAttempt::mp4_default(), MuxAttempt::webm_default())
    }

    #[test]
    fn test_primary_success_has_no_warning() {
        let output = chain(MockEngine::default()).transcode(
            &captured_video(),
            b"RIFF",
            OutputFormat::Mp4,
            10.0,
            &|_| {},
        );

        assert_eq!(output.format, OutputFormat::Mp4);
        assert!(output.warning.is_none());
        assert_eq!(output.bytes, b"muxed:mp4");
    }

    #[test]
    fn test_primary_failure_falls_back_to_webm() {
        let engine = MockEngine::default().failing_on(OutputFormat::Mp4);
        let output = chain(engine).transcode(&captured_video(), b"RIFF", OutputFormat::Mp4, 10.0, &|_| {});

        assert_eq!(output.format, OutputFormat::Webm);
        assert!(output.warning.as_deref().is_some_and(|w| !w.is_empty()));
    }

    #[test]
    fn test_webm_request_skips_primary() {
        let engine = MockEngine::default();
        let attempts = engine.attempts.clone();
        let output = chain(engine).transcode(&captured_video(), b"RIFF", OutputFormat::Webm, 10.0, &|_| {});

        assert_eq!(output.format, OutputFormat::Webm);
        assert!(output.warning.is_none());
        assert_eq!(*attempts.lock().unwrap(), vec![OutputFormat::Webm]);
    }

    #[test]
    fn test_all_failures_pass_through_captured_bytes() {
        let engine = MockEngine::default()
            .failing_on(OutputFormat::Mp4)
            .failing_on(OutputFormat::Webm);
        let video = captured_video();
        let output = chain(engine).transcode(&video, b"RIFF", OutputFormat::Mp4, 10.0, &|_| {});

        assert_eq!(output.bytes, video.bytes);
        assert_eq!(output.format, OutputFormat::Webm);
        assert!(output.warning.unwrap().contains("audio was dropped"));
    }

    #[test]
    fn test_load_failure_goes_straight_to_passthrough() {
        let engine = MockEngine::default().unloadable();
        let attempts = engine.attempts.clone();
        let output = chain(engine).transcode(&captured_video(), b"RIFF", OutputFormat::Mp4, 10.0, &|_| {});

        assert!(output.warning.unwrap().contains("audio was dropped"));
        assert!(attempts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_staging_directories_are_removed() {
        let engine = MockEngine::default().failing_on(OutputFormat::Mp4);
        let staged = engine.staged.clone();
        chain(engine).transcode(&captured_video(), b"RIFF", OutputFormat::Mp4, 10.0, &|_| {});

        let staged = staged.lock().unwrap();
        assert_eq!(staged.len(), 2);
        assert!(staged.iter().all(|dir| !dir.exists()));
    }

    #[test]
    fn test_parse_progress_line() {
        assert_eq!(parse_progress_line("out_time_ms=5000000", 10.0), Some(0.5));
        assert_eq!(parse_progress_line("out_time_us=20000000", 10.0), Some(1.0));
        assert_eq!(parse_progress_line("frame=12", 10.0), None);
        assert_eq!(parse_progress_line("out_time_ms=N/A", 10.0), None);
        assert_eq!(parse_progress_line("out_time_ms=100", 0.0), None);
    }

    #[test]
    fn test_ffmpeg_args_for_mp4() {
        let attempt = MuxAttempt::mp4_default();
        let job = MuxJob {
            video: Path::new("/tmp/in.webm"),
            audio: Path::new("/tmp/in.wav"),
            output: Path::new("/tmp/out.mp4"),
            attempt: &attempt,
            duration: 5.0,
        };
        let args = FfmpegEngine::build_args(&job);

        assert!(args.windows(2).any(|w| w[0] == "-c:v" && w[1] == "libx264"));
        assert!(args.windows(2).any(|w| w[0] == "-c:a" && w[1] == "aac"));
        assert!(args.contains(&"+faststart".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out.mp4"));
    }

    #[test]
    fn test_missing_ffmpeg_fails_to_load() {
        assert!(FfmpegEngine::new("/definitely/not/ffmpeg").load().is_err());
    }
}
