use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::audio::{ClipRange, ReactiveFrame, SegmentEncoder, FPS};
use crate::config::{Config, ExportSettings};
use crate::error::{ExportError, Result};
use crate::export::{
    CancelToken, CapturedVideo, ExportConfig, ExportOutcome, ExportProgress, ExportResult,
    ExportStage, FfmpegEngine, FfmpegRecorderFactory, FrameRecorder, OutputFormat,
    ProgressCallback, RecorderFactory, TranscodeChain, TranscodeOutput,
};
use crate::visuals::{Surface, Visualizer};

const PREPARE_END: f32 = 0.05;
const RENDER_END: f32 = 0.80;
const TRANSCODE_END: f32 = 0.99;

/// Drives one export from a config snapshot to a finished file
///
/// The pipeline itself is stateless between runs; every run owns its
/// visualizer, recorder and staging directories.
pub struct ExportPipeline {
    settings: ExportSettings,
    recorders: Arc<dyn RecorderFactory>,
    chain: Arc<TranscodeChain>,
}

impl ExportPipeline {
    pub fn new(
        settings: ExportSettings,
        recorders: Arc<dyn RecorderFactory>,
        chain: Arc<TranscodeChain>,
    ) -> Self {
        Self {
            settings,
            recorders,
            chain,
        }
    }

    /// Pipeline backed by the ffmpeg recorder and muxer named in `config`
    pub fn from_config(config: &Config) -> Self {
        let transcode = &config.transcode;
        let recorders = Arc::new(FfmpegRecorderFactory::new(
            &transcode.ffmpeg_path,
            &transcode.recorder_codec,
        ));
        let engine = Arc::new(FfmpegEngine::new(&transcode.ffmpeg_path));
        let chain = TranscodeChain::new(engine, transcode.primary.clone(), transcode.fallback.clone());

        Self::new(config.export.clone(), recorders, Arc::new(chain))
    }

    /// Run an export to completion, cancellation or failure
    ///
    /// Resources acquired along the way are released exactly once before this
    /// returns, on every path.
    pub async fn run(
        &self,
        config: ExportConfig,
        progress: ProgressCallback,
        cancel: &CancelToken,
    ) -> Result<ExportOutcome> {
        let started = Instant::now();
        let mut reporter = Reporter::new(progress);
        let mut resources = ExportResources::default();

        info!("🎬 Starting export");
        info!("   Clip: {:.2}s - {:.2}s", config.range.in_time, config.range.out_time);
        info!("   Visualizer: {}", config.visualizer.name());
        info!("   Output: {} @ {}", config.options.format, config.options.resolution);

        let outcome = self.run_stages(config, &mut resources, &mut reporter, cancel).await;
        resources.release();

        match &outcome {
            Ok(ExportOutcome::Done(result)) => {
                info!(
                    "🎉 Export complete in {:.1}s: {} ({} KB)",
                    started.elapsed().as_secs_f64(),
                    result.filename,
                    result.bytes.len() / 1024
                );
                if let Some(warning) = &result.warning {
                    warn!("Export degraded: {}", warning);
                }
                reporter.finish(ExportStage::Done, "Export complete");
            }
            Ok(ExportOutcome::Cancelled) => {
                info!("Export cancelled after {:.1}s", started.elapsed().as_secs_f64());
                reporter.finish(ExportStage::Cancelled, "Export cancelled");
            }
            Err(e) => {
                warn!("Export failed: {}", e);
                reporter.finish(ExportStage::Error, e.user_message());
            }
        }

        outcome
    }

    async fn run_stages(
        &self,
        config: ExportConfig,
        resources: &mut ExportResources,
        reporter: &mut Reporter,
        cancel: &CancelToken,
    ) -> Result<ExportOutcome> {
        let ExportConfig {
            audio,
            range,
            frames,
            visualizer,
            visual,
            overlay,
            options,
        } = config;

        // Preparing
        reporter.emit(ExportProgress::new(ExportStage::Preparing, 0.0, "Preparing export"));
        info!("⚙️  Step 1: Preparing...");

        let range = ClipRange::new(range.in_time, range.out_time, audio.duration())?;
        let total_frames = range.total_frames();
        if frames.len() < total_frames {
            debug!(
                "Frame sequence has {} of {} frames; padding with silence",
                frames.len(),
                total_frames
            );
        }

        if !self.recorders.is_supported() {
            return Err(ExportError::RecorderUnavailable {
                reason: "no frame recorder available on this host".to_string(),
            }
            .into());
        }

        let (width, height) = options.resolution.dimensions();
        let mut surface = Surface::new_black(width, height);

        resources.visualizer = Some(visualizer);
        if let Some(visualizer) = resources.visualizer.as_mut() {
            visualizer.init(&surface)?;
        }
        resources.visualizer_ready = true;

        let overlay_layer = overlay.prerender(width, height)?;
        let audio_wav = SegmentEncoder::encode(&audio, range.in_time, range.out_time)?;
        debug!("Audio segment encoded: {} bytes", audio_wav.len());

        if cancel.is_cancelled() {
            return Ok(ExportOutcome::Cancelled);
        }

        resources.recorder = Some(self.recorders.start(width, height, FPS)?);
        reporter.emit(ExportProgress::new(ExportStage::Preparing, PREPARE_END, "Recorder started"));
        info!("   ✅ Ready: {}x{}, {} frames", width, height, total_frames);

        // Rendering
        info!("🎨 Step 2: Rendering {} frames...", total_frames);
        let delta = 1.0 / FPS as f32;
        let yield_every = self.settings.yield_every.max(1);
        {
            let (visualizer, recorder) = resources.active()?;

            for index in 0..total_frames {
                if cancel.is_cancelled() {
                    debug!("Cancellation observed at frame {}", index);
                    return Ok(ExportOutcome::Cancelled);
                }

                let frame = frames
                    .get(index)
                    .copied()
                    .unwrap_or_else(|| ReactiveFrame::silent_at(index as f64 / FPS as f64));

                visualizer.update(&mut surface, &visual.input_for(frame), delta)?;
                if let Some(layer) = &overlay_layer {
                    layer.composite(&mut surface);
                }
                recorder.capture(&surface)?;

                let done = index + 1;
                if done % yield_every == 0 || done == total_frames {
                    tokio::task::yield_now().await;
                    let fraction = done as f32 / total_frames as f32;
                    reporter.emit(
                        ExportProgress::new(
                            ExportStage::Rendering,
                            PREPARE_END + (RENDER_END - PREPARE_END) * fraction,
                            format!("Rendering frame {}/{}", done, total_frames),
                        )
                        .with_frames(done, total_frames),
                    );
                }
            }
        }

        // Flush
        tokio::time::sleep(Duration::from_millis(self.settings.flush_grace_ms)).await;
        let captured = resources.stop_recorder()?;
        info!("   ✅ Captured {} frames ({} KB)", captured.frame_count, captured.bytes.len() / 1024);

        if cancel.is_cancelled() {
            return Ok(ExportOutcome::Cancelled);
        }

        // Transcoding
        info!("🔊 Step 3: Adding audio...");
        reporter.emit(ExportProgress::new(ExportStage::Transcoding, RENDER_END, "Adding audio"));

        let duration = range.duration();
        let output = self
            .transcode(Arc::new(captured), audio_wav, options.format, duration, reporter)
            .await;
        reporter.last = reporter.last.max(TRANSCODE_END);

        if cancel.is_cancelled() {
            return Ok(ExportOutcome::Cancelled);
        }

        info!("   ✅ Delivered {} ({} KB)", output.format, output.bytes.len() / 1024);

        // Done
        Ok(ExportOutcome::Done(ExportResult {
            filename: generate_filename(output.format),
            bytes: output.bytes,
            format: output.format,
            duration,
            warning: output.warning,
        }))
    }

    async fn transcode(
        &self,
        captured: Arc<CapturedVideo>,
        audio_wav: Vec<u8>,
        requested: OutputFormat,
        duration: f64,
        reporter: &Reporter,
    ) -> TranscodeOutput {
        let chain = Arc::clone(&self.chain);
        let video = Arc::clone(&captured);
        let callback = Arc::clone(&reporter.callback);
        let floor = reporter.last;

        let task = tokio::task::spawn_blocking(move || {
            // Each fallback attempt restarts at 0; report the high-water mark
            let high_water = AtomicU32::new(floor.to_bits());
            let forward = |fraction: f32| {
                let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
                let value = RENDER_END + (TRANSCODE_END - RENDER_END) * fraction;
                // Non-negative f32 bit patterns order like the values
                let previous = f32::from_bits(high_water.fetch_max(value.to_bits(), Ordering::Relaxed));
                callback(ExportProgress::new(
                    ExportStage::Transcoding,
                    value.max(previous),
                    "Muxing audio and video",
                ))
            };
            chain.transcode(&video, &audio_wav, requested, duration, &forward)
        });

        match task.await {
            Ok(output) => output,
            Err(e) => {
                warn!("Transcode task failed ({}); delivering silent video", e);
                TranscodeOutput::passthrough(&captured)
            }
        }
    }
}

/// `reel-YYYYMMDD-HHMMSS.<ext>` in local time
pub fn generate_filename(format: OutputFormat) -> String {
    format!(
        "reel-{}.{}",
        chrono::Local::now().format("%Y%m%d-%H%M%S"),
        format.extension()
    )
}

/// Tracks the last reported fraction so terminal reports never go backwards
struct Reporter {
    callback: ProgressCallback,
    last: f32,
}

impl Reporter {
    fn new(callback: ProgressCallback) -> Self {
        Self {
            callback,
            last: 0.0,
        }
    }

    fn emit(&mut self, mut update: ExportProgress) {
        update.progress = update.progress.max(self.last);
        self.last = update.progress;
        (self.callback)(update);
    }

    fn finish<S: Into<String>>(&mut self, stage: ExportStage, message: S) {
        let progress = if stage == ExportStage::Done { 1.0 } else { self.last };
        self.emit(ExportProgress::new(stage, progress, message));
    }
}

/// Everything a run acquires that needs explicit teardown
#[derive(Default)]
struct ExportResources {
    visualizer: Option<Box<dyn Visualizer>>,
    visualizer_ready: bool,
    recorder: Option<Box<dyn FrameRecorder>>,
}

impl ExportResources {
    fn active(&mut self) -> Result<(&mut Box<dyn Visualizer>, &mut Box<dyn FrameRecorder>)> {
        match (self.visualizer.as_mut(), self.recorder.as_mut()) {
            (Some(visualizer), Some(recorder)) => Ok((visualizer, recorder)),
            _ => Err(ExportError::RecorderFailed {
                reason: "render started without an initialized visualizer and recorder".to_string(),
            }
            .into()),
        }
    }

    /// Stop the recorder and hand back its video; the recorder is gone either way
    fn stop_recorder(&mut self) -> Result<CapturedVideo> {
        let mut recorder = self.recorder.take().ok_or_else(|| ExportError::RecorderFailed {
            reason: "recorder was not started".to_string(),
        })?;

        let captured = recorder.stop();
        if captured.is_err() {
            recorder.abort();
        }
        captured
    }

    /// Idempotent
    fn release(&mut self) {
        if let Some(mut recorder) = self.recorder.take() {
            recorder.abort();
            debug!("Recorder aborted during cleanup");
        }

        if let Some(mut visualizer) = self.visualizer.take() {
            if std::mem::take(&mut self.visualizer_ready) {
                visualizer.dispose();
                debug!("Visualizer '{}' disposed", visualizer.name());
            }
        }
    }
}

impl Drop for ExportResources {
    fn drop(&mut self) {
        self.release();
    }
}
