// src/main.rs
mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ConfigAction};
use skeletal_input::recording::{read_frames, FrameRecorder};
use skeletal_input::{
    AlwaysArmed, DispatchOutcome, GesturePipeline, HandsAboveHeadGate, JointId, KeyStateSink,
    PipelineConfig, RecognitionGate, SkeletalFrame, SkeletonBuilder, TracingInjector,
};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_thread_names(true)
        .init();

    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PipelineConfig::load_default().context("loading default config")?,
    };

    match cli.command {
        Commands::Replay { input, realtime, armed } => run_replay(&input, realtime, armed, config),
        Commands::Demo { output, name } => run_demo(output, name),
        Commands::Config { action } => run_config(action, cli.config.as_deref(), &config),
    }
}

#[derive(Debug, Default)]
struct ReplayCounts {
    dispatched: u64,
    disarmed: u64,
    untracked: u64,
}

fn run_replay(input: &Path, realtime: bool, armed: bool, mut config: PipelineConfig) -> Result<()> {
    let frames = read_frames(input).with_context(|| format!("reading {}", input.display()))?;
    if frames.is_empty() {
        bail!("{} contains no frames", input.display());
    }

    // Nothing draws frames here, so the render queue would only fill up.
    config.visual_output_stopped = true;

    let sink = KeyStateSink::new(TracingInjector::new(), config.key_bindings.clone());
    let gate: Box<dyn RecognitionGate> = if armed {
        Box::new(AlwaysArmed)
    } else {
        Box::new(HandsAboveHeadGate::new())
    };
    let mut pipeline = GesturePipeline::start(&config, sink, gate)?;

    info!(frames = frames.len(), input = %input.display(), "replaying session");
    let mut counts = ReplayCounts::default();
    let mut last_timestamp: Option<f64> = None;

    for frame in frames {
        if realtime {
            if let Some(previous) = last_timestamp {
                let gap = (frame.timestamp_ms - previous).max(0.0);
                thread::sleep(Duration::from_secs_f64(gap / 1000.0));
            }
            last_timestamp = Some(frame.timestamp_ms);
        }

        match pipeline.submit(frame)? {
            DispatchOutcome::Dispatched { .. } => counts.dispatched += 1,
            DispatchOutcome::Disarmed => counts.disarmed += 1,
            DispatchOutcome::NullTrackedSkeleton => counts.untracked += 1,
        }
    }

    let report = pipeline.shutdown()?;

    println!("Replay of {}", input.display());
    println!(
        "  frames: {} dispatched, {} disarmed, {} untracked",
        counts.dispatched, counts.disarmed, counts.untracked
    );
    for worker in &report.workers {
        println!(
            "  {:<16} frames {:>6}  detections {:>4}  releases {:>4}  faults {}",
            worker.kind.as_str(),
            worker.frames,
            worker.detections,
            worker.cancellations,
            worker.faults
        );
    }
    println!("  events forwarded: {}", report.events.forwarded);
    if counts.dispatched == 0 && !armed {
        warn!("recognition never armed; raise the right hand above the head or pass --armed");
    }
    Ok(())
}

/// Start pose, a one-second stride to the right, feet back together, then
/// a jump. 30 fps.
fn demo_session() -> Vec<SkeletalFrame> {
    const FRAME_MS: f64 = 1000.0 / 30.0;
    let mut poses = Vec::new();

    // Right hand over the head arms recognition.
    for _ in 0..5 {
        poses.push(SkeletonBuilder::standing().joint(JointId::HandRight, 0.25, 0.95, 2.0));
    }
    for _ in 0..10 {
        poses.push(SkeletonBuilder::standing());
    }
    for i in 1..=30 {
        let dx = 0.45 * i as f32 / 30.0;
        poses.push(
            SkeletonBuilder::standing()
                .offset(JointId::AnkleRight, dx, 0.0, 0.0)
                .offset(JointId::FootRight, dx, 0.0, 0.0),
        );
    }
    for _ in 0..10 {
        poses.push(SkeletonBuilder::standing());
    }
    for i in 1..=12 {
        poses.push(SkeletonBuilder::standing().offset(JointId::HipCenter, 0.0, 0.04 * i as f32, 0.0));
    }
    for _ in 0..10 {
        poses.push(SkeletonBuilder::standing());
    }

    poses
        .into_iter()
        .enumerate()
        .map(|(n, pose)| SkeletalFrame::single(n as u64, n as f64 * FRAME_MS, pose.build()))
        .collect()
}

fn run_demo(output: Option<PathBuf>, name: Option<String>) -> Result<()> {
    let output = output.unwrap_or_else(FrameRecorder::default_output_dir);
    let mut recorder = FrameRecorder::new(&output, name);
    for frame in demo_session() {
        recorder.add_frame(&frame);
    }

    let path = recorder.export_csv().context("writing demo session")?;
    println!("Wrote {} frames to {}", recorder.len(), path.display());
    println!("Replay with: skeletal-input replay --input {}", path.display());
    Ok(())
}

fn run_config(action: ConfigAction, explicit: Option<&Path>, config: &PipelineConfig) -> Result<()> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => PipelineConfig::default_path().context("no config directory on this platform")?,
    };

    match action {
        ConfigAction::Show => println!("{}", config.to_json()?),
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            PipelineConfig::default().save(&path)?;
            println!("Wrote default config to {}", path.display());
        }
    }
    Ok(())
}
