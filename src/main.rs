use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use reactive_reel::{
    audio::{AudioAnalyzer, AudioLoader, ClipRange, MAX_CLIP_DURATION},
    config::Config,
    export::{
        CancelToken, ExportConfig, ExportOptions, ExportOutcome, ExportPipeline, ExportProgress,
        ExportStage, OutputFormat, ProgressCallback, Resolution,
    },
    visuals::VisualizerRegistry,
};

#[derive(Parser)]
#[command(
    name = "reactive-reel",
    version,
    about = "Turn a slice of a song into an audio-reactive vertical video",
    long_about = "Reactive-Reel analyzes a clip of an audio track, drives a visualizer with its bass, mids, treble, loudness and beats, and exports a 9:16 video with the clip's audio."
)]
struct Cli {
    /// Audio file path (WAV, MP3, FLAC, OGG, M4A)
    #[arg(short, long)]
    audio: PathBuf,

    /// Clip start in seconds
    #[arg(short, long, default_value_t = 0.0)]
    start: f64,

    /// Clip end in seconds (defaults to start + 15s, capped at the track end)
    #[arg(short, long)]
    end: Option<f64>,

    /// Output video file path
    #[arg(short, long)]
    output: PathBuf,

    /// Visualizer to use (pulse, bars, particles)
    #[arg(long)]
    visualizer: Option<String>,

    /// Output resolution (1080x1920 or 720x1280)
    #[arg(short, long)]
    resolution: Option<Resolution>,

    /// Preferred container (mp4 or webm)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!("Starting Reactive-Reel v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => {
            debug!("Using default configuration");
            Config::default()
        }
    };
    if let Some(name) = &cli.visualizer {
        config.visual.visualizer = name.clone();
    }
    config.validate()?;

    let registry = VisualizerRegistry::new();
    let visualizer = registry.create(&config.visual.visualizer).map_err(|e| {
        anyhow::anyhow!("{} (available: {})", e, registry.available().join(", "))
    })?;

    let audio = Arc::new(
        AudioLoader::load(&cli.audio)
            .await
            .map_err(|e| anyhow::anyhow!(e.user_message()))?,
    );
    info!(
        "Loaded {:?}: {:.1}s, {} Hz, {} channels",
        cli.audio,
        audio.duration(),
        audio.sample_rate,
        audio.channels
    );

    let end = cli
        .end
        .unwrap_or_else(|| (cli.start + MAX_CLIP_DURATION / 2.0).min(audio.duration()));
    let range = ClipRange::new(cli.start, end, audio.duration())
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    let analyzer = AudioAnalyzer::with_config(config.analysis.clone())?;
    let (frames, summary) = analyzer.extract_with_summary(&audio, range.in_time, range.out_time)?;
    info!(
        "Analyzed {} frames: {} kicks, {} onsets{}",
        summary.frame_count,
        summary.kick_count,
        summary.onset_count,
        if summary.boosted { " (quiet clip boosted)" } else { "" }
    );

    let options = ExportOptions {
        resolution: cli.resolution.unwrap_or(config.export.resolution),
        format: cli.format.unwrap_or(config.export.format),
    };

    let export = ExportConfig {
        audio,
        range,
        frames: frames.into(),
        visualizer,
        visual: config.visual.params.clone(),
        overlay: config.visual.overlay.clone(),
        options,
    };

    // Ctrl-C cancels cooperatively; the pipeline cleans up before returning
    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling export...");
            on_interrupt.cancel();
        }
    });

    let progress: ProgressCallback = Arc::new(log_progress);
    let pipeline = ExportPipeline::from_config(&config);
    let outcome = pipeline.run(export, progress, &cancel).await.map_err(|e| {
        if e.is_recoverable() {
            anyhow::anyhow!("{} Running the export again may succeed.", e.user_message())
        } else {
            anyhow::anyhow!(e.user_message())
        }
    })?;

    let result = match outcome {
        ExportOutcome::Done(result) => result,
        ExportOutcome::Cancelled => {
            info!("Export cancelled; nothing written");
            return Ok(());
        }
    };

    let mut output = cli.output.clone();
    if output.extension().and_then(|e| e.to_str()) != Some(result.format.extension()) {
        output.set_extension(result.format.extension());
        warn!("Writing {} output to {:?}", result.format, output);
    }
    if let Some(warning) = &result.warning {
        warn!("{}", warning);
    }

    tokio::fs::write(&output, &result.bytes)
        .await
        .with_context(|| format!("failed to write {:?}", output))?;

    info!(
        "Export complete! {:.1}s {} saved to {:?} ({})",
        result.duration, result.format, output, result.filename
    );
    Ok(())
}

fn log_progress(update: ExportProgress) {
    match update.stage {
        ExportStage::Rendering => {
            if let (Some(current), Some(total)) = (update.current_frame, update.total_frames) {
                if current % 30 == 0 || current == total {
                    info!("   {:>3.0}% {}", update.progress * 100.0, update.message);
                }
            }
        }
        _ => debug!("[{:?}] {:>3.0}% {}", update.stage, update.progress * 100.0, update.message),
    }
}
