//! Mock visualizer, recorder and muxer that count live handles

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{ExportError, RenderError, Result};
use crate::export::{
    CancelToken, CapturedVideo, FrameRecorder, MuxJob, OutputFormat, RecorderFactory,
    TranscodeEngine,
};
use crate::visuals::{ControlSpec, ReactiveInput, Surface, Visualizer};

pub const CAPTURED_BYTES: &[u8] = b"webm-capture";

pub fn captured_video() -> CapturedVideo {
    CapturedVideo {
        bytes: CAPTURED_BYTES.to_vec(),
        format: OutputFormat::Webm,
        codec: "vp9".to_string(),
        frame_count: 0,
    }
}

/// Shared bookkeeping for everything a run acquires
#[derive(Debug, Clone, Default)]
pub struct Handles {
    live: Arc<AtomicIsize>,
    pub disposals: Arc<AtomicUsize>,
    pub aborts: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
    pub frames_drawn: Arc<AtomicUsize>,
    pub frames_captured: Arc<AtomicUsize>,
}

impl Handles {
    pub fn live(&self) -> isize {
        self.live.load(Ordering::SeqCst)
    }

    fn acquire(&self) {
        self.live.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct MockVisualizer {
    handles: Handles,
    initialized: bool,
    fail_init: bool,
    cancel_at: Option<(usize, CancelToken)>,
}

impl MockVisualizer {
    pub fn new(handles: &Handles) -> Self {
        Self {
            handles: handles.clone(),
            initialized: false,
            fail_init: false,
            cancel_at: None,
        }
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Trip `token` while drawing frame `index`
    pub fn cancelling_at(mut self, index: usize, token: &CancelToken) -> Self {
        self.cancel_at = Some((index, token.clone()));
        self
    }
}

impl Visualizer for MockVisualizer {
    fn name(&self) -> &str {
        "mock"
    }

    fn description(&self) -> &str {
        "Counts init/update/dispose"
    }

    fn init(&mut self, _surface: &Surface) -> Result<()> {
        if self.fail_init {
            return Err(RenderError::InitFailed {
                name: "mock".to_string(),
                reason: "refused".to_string(),
            }
            .into());
        }
        self.initialized = true;
        self.handles.acquire();
        Ok(())
    }

    fn update(&mut self, surface: &mut Surface, input: &ReactiveInput, _delta: f32) -> Result<()> {
        let index = self.handles.frames_drawn.fetch_add(1, Ordering::SeqCst);
        if let Some((at, token)) = &self.cancel_at {
            if *at == index {
                token.cancel();
            }
        }
        let level = (input.frame.amplitude * 255.0) as u8;
        surface.set_pixel(0, 0, [level, 0, 0]);
        Ok(())
    }

    fn dispose(&mut self) {
        self.handles.disposals.fetch_add(1, Ordering::SeqCst);
        if self.initialized {
            self.initialized = false;
            self.handles.release();
        }
    }

    fn controls_schema(&self) -> Vec<ControlSpec> {
        Vec::new()
    }
}

pub struct MockRecorderFactory {
    handles: Handles,
    supported: bool,
    fail_capture_at: Option<usize>,
}

impl MockRecorderFactory {
    pub fn new(handles: &Handles) -> Self {
        Self {
            handles: handles.clone(),
            supported: true,
            fail_capture_at: None,
        }
    }

    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }

    pub fn failing_capture_at(mut self, index: usize) -> Self {
        self.fail_capture_at = Some(index);
        self
    }
}

impl RecorderFactory for MockRecorderFactory {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn start(&self, _width: u32, _height: u32, _fps: u32) -> Result<Box<dyn FrameRecorder>> {
        self.handles.acquire();
        Ok(Box::new(MockRecorder {
            handles: self.handles.clone(),
            running: true,
            frames: 0,
            fail_at: self.fail_capture_at,
        }))
    }
}

/// No `Drop` impl: a recorder the pipeline forgets shows up as a live handle
struct MockRecorder {
    handles: Handles,
    running: bool,
    frames: usize,
    fail_at: Option<usize>,
}

impl FrameRecorder for MockRecorder {
    fn capture(&mut self, _surface: &Surface) -> Result<()> {
        if !self.running {
            return Err(ExportError::RecorderFailed {
                reason: "not running".to_string(),
            }
            .into());
        }
        if self.fail_at == Some(self.frames) {
            return Err(ExportError::RecorderFailed {
                reason: format!("capture failed at frame {}", self.frames),
            }
            .into());
        }
        self.frames += 1;
        self.handles.frames_captured.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<CapturedVideo> {
        if !self.running {
            return Err(ExportError::RecorderFailed {
                reason: "already stopped".to_string(),
            }
            .into());
        }
        self.running = false;
        self.handles.stops.fetch_add(1, Ordering::SeqCst);
        self.handles.release();
        Ok(CapturedVideo {
            frame_count: self.frames,
            ..captured_video()
        })
    }

    fn abort(&mut self) {
        if self.running {
            self.running = false;
            self.handles.aborts.fetch_add(1, Ordering::SeqCst);
            self.handles.release();
        }
    }
}

type MuxHook = Box<dyn Fn() + Send + Sync>;

/// Writes `muxed:<ext>` for every attempt not marked as failing
#[derive(Default)]
pub struct MockEngine {
    failing: Vec<OutputFormat>,
    load_fails: bool,
    fail_after: Option<f32>,
    on_mux: Option<MuxHook>,
    pub attempts: Arc<Mutex<Vec<OutputFormat>>>,
    pub staged: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockEngine {
    pub fn failing_on(mut self, format: OutputFormat) -> Self {
        self.failing.push(format);
        self
    }

    /// Failing attempts report `fraction` before giving up
    pub fn failing_after(mut self, fraction: f32) -> Self {
        self.fail_after = Some(fraction);
        self
    }

    pub fn unloadable(mut self) -> Self {
        self.load_fails = true;
        self
    }

    pub fn on_mux<F: Fn() + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.on_mux = Some(Box::new(hook));
        self
    }
}

impl TranscodeEngine for MockEngine {
    fn load(&self) -> Result<()> {
        if self.load_fails {
            return Err(ExportError::TranscodeFailed {
                reason: "engine missing".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn mux(&self, job: &MuxJob<'_>, on_progress: &dyn Fn(f32)) -> Result<()> {
        let format = job.attempt.format;
        self.attempts.lock().unwrap().push(format);
        if let Some(dir) = job.output.parent() {
            self.staged.lock().unwrap().push(dir.to_path_buf());
        }
        if let Some(hook) = &self.on_mux {
            hook();
        }

        assert!(job.video.exists(), "video input was not staged");
        assert!(job.audio.exists(), "audio input was not staged");
        if self.failing.contains(&format) {
            on_progress(self.fail_after.unwrap_or(0.5));
            return Err(ExportError::TranscodeFailed {
                reason: format!("{} encoder missing", format),
            }
            .into());
        }

        on_progress(0.5);
        fs::write(job.output, format!("muxed:{}", format.extension()))?;
        Ok(())
    }
}
