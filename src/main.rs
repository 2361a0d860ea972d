//! Hand Gesture Agent CLI
//!
//! Runs the gesture pipeline against simulated hand tracking.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use glam::Vec3;
use hand_gesture_agent::{
    config::Config,
    core::{
        extract_features, ClassifierAdapter, GestureLabel, GestureModel, GesturePipeline,
        InteractableObject, ModelError, PipelineEvent, ReportBuilder, TemplateModel,
    },
    core::labels::label_name,
    tracking::{parse_script, synthetic_pose, Handedness, ScriptedTracker, SimulatedTracker},
    VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const DEFAULT_SCRIPT: &str = "open_hand:0.5,pinch:0.6,pinch:0.4:0.5/0/0,fist:0.5:0.5/0/0";

#[derive(Parser)]
#[command(name = "hand-gesture")]
#[command(version = VERSION)]
#[command(about = "Hand gesture recognition and interaction pipeline", long_about = None)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Template model file (defaults to the built-in reference templates)
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted session as fast as possible
    Simulate {
        /// Right hand script: gesture:seconds[:vx/vy/vz],...
        #[arg(long, default_value = DEFAULT_SCRIPT)]
        script: String,

        /// Left hand script (left hand untracked when omitted)
        #[arg(long)]
        left: Option<String>,

        /// Write a JSON session report to this file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Stream a scripted session in real time until it ends or Ctrl+C
    Run {
        /// Right hand script: gesture:seconds[:vx/vy/vz],...
        #[arg(long, default_value = DEFAULT_SCRIPT)]
        script: String,

        /// Left hand script (left hand untracked when omitted)
        #[arg(long)]
        left: Option<String>,
    },

    /// Print the feature vector of a synthetic gesture pose
    Features {
        /// Gesture name (open_hand, fist, pinch, point, thumbs_up)
        #[arg(long)]
        gesture: String,
    },

    /// Show configuration
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hand_gesture_agent=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    if cli.model.is_some() {
        config.model_path = cli.model;
    }

    match cli.command {
        Commands::Simulate {
            script,
            left,
            output,
        } => cmd_simulate(&config, &script, left.as_deref(), output),
        Commands::Run { script, left } => cmd_run(&config, &script, left.as_deref()),
        Commands::Features { gesture } => cmd_features(&gesture),
        Commands::Config => cmd_config(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load().context("loading config")?,
    };
    config.validate()?;
    Ok(config)
}

/// Classifier from the configured model file, or the reference templates.
fn build_classifier(config: &Config) -> ClassifierAdapter {
    let labels = config.labels.clone();
    let model: Result<Box<dyn GestureModel>, ModelError> = match &config.model_path {
        Some(path) => {
            TemplateModel::load(path, &labels).map(|m| Box::new(m) as Box<dyn GestureModel>)
        }
        None => Ok(Box::new(TemplateModel::from_reference_poses(&labels))),
    };
    ClassifierAdapter::from_load(model, labels)
}

fn build_pipeline(config: &Config) -> GesturePipeline {
    let mut pipeline = GesturePipeline::new(config, build_classifier(config));
    // One object just in front of each hand's palm.
    pipeline.add_object(InteractableObject::new(
        "cube",
        ScriptedTracker::RIGHT_HOME + Vec3::new(0.0, 0.0, 0.06),
    ));
    pipeline.add_object(InteractableObject::new(
        "sphere",
        ScriptedTracker::LEFT_HOME + Vec3::new(0.0, 0.0, 0.06),
    ));
    pipeline
}

fn build_tracker(config: &Config, right: &str, left: Option<&str>) -> Result<ScriptedTracker> {
    let right = parse_script(right).map_err(anyhow::Error::msg)?;
    let left = match left {
        Some(script) => parse_script(script).map_err(anyhow::Error::msg)?,
        None => Vec::new(),
    };
    if right.is_empty() && left.is_empty() {
        bail!("both hand scripts are empty");
    }
    Ok(ScriptedTracker::new(left, right, config.tick_rate_hz))
}

fn cmd_simulate(
    config: &Config,
    script: &str,
    left: Option<&str>,
    output: Option<PathBuf>,
) -> Result<()> {
    println!("Hand Gesture Agent v{VERSION}");
    println!();

    let tracker = build_tracker(config, script, left)?;
    let mut pipeline = build_pipeline(config);
    let mut report = ReportBuilder::new().with_session_label("simulate");
    println!("Instance ID: {}", report.instance_id());
    println!();

    for frame in tracker {
        let events = pipeline.tick(&frame);
        for event in &events {
            print_event(frame.timestamp, event);
        }
        report.record_tick(frame.timestamp, &events);
    }

    finish(&pipeline, &report, config, output)
}

fn cmd_run(config: &Config, script: &str, left: Option<&str>) -> Result<()> {
    println!("Hand Gesture Agent v{VERSION}");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let mut tracker = SimulatedTracker::new(build_tracker(config, script, left)?);
    let mut pipeline = build_pipeline(config);
    let mut report = ReportBuilder::new().with_session_label("run");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")?;

    tracker.start()?;
    info!("Simulated tracker started");
    let receiver = tracker.receiver().clone();

    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(frame) => {
                let events = pipeline.tick(&frame);
                for event in &events {
                    print_event(frame.timestamp, event);
                }
                report.record_tick(frame.timestamp, &events);
            }
            Err(RecvTimeoutError::Timeout) => {
                if !tracker.is_running() && receiver.is_empty() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                eprintln!("Tracker disconnected unexpectedly");
                break;
            }
        }
    }

    println!();
    println!("Stopping...");
    tracker.stop();
    finish(&pipeline, &report, config, None)
}

fn finish(
    pipeline: &GesturePipeline,
    report: &ReportBuilder,
    config: &Config,
    output: Option<PathBuf>,
) -> Result<()> {
    let latency = pipeline.latency().summary();
    println!();
    println!("{}", pipeline.stats().summary());
    println!(
        "Tick latency: mean {:.3} ms, p95 {:.3} ms, max {:.3} ms ({} over {} ms budget)",
        latency.mean_ms, latency.p95_ms, latency.max_ms, latency.over_budget, latency.budget_ms
    );

    if let Some(path) = output {
        let session = report.build(config, pipeline.stats().snapshot(), latency);
        session
            .write_to(&path)
            .with_context(|| format!("writing report to {}", path.display()))?;
        println!("Report written to {path:?}");
    }
    Ok(())
}

fn print_event(time: f64, event: &PipelineEvent) {
    let text = match event {
        PipelineEvent::GestureChanged {
            hand,
            label,
            previous,
            confidence,
        } => format!(
            "{hand} gesture {} -> {} ({confidence:.2})",
            label_name(*previous),
            label_name(*label)
        ),
        PipelineEvent::ObjectGrabbed { hand, object } => format!("{hand} hand grabbed {object}"),
        PipelineEvent::ObjectReleased {
            hand,
            object,
            velocity,
        } => format!(
            "{hand} hand released {object} at ({:.2}, {:.2}, {:.2}) m/s",
            velocity.x, velocity.y, velocity.z
        ),
        PipelineEvent::ScaleSessionStarted {
            object,
            baseline_distance,
        } => format!("two-hand scaling of {object} started at {baseline_distance:.3} m"),
        PipelineEvent::ScaleSessionEnded { object } => {
            format!("two-hand scaling of {object} ended")
        }
        PipelineEvent::MenuShown => "menu shown".to_string(),
        PipelineEvent::MenuHidden => "menu hidden".to_string(),
        PipelineEvent::MenuHoverChanged { index } => match index {
            Some(i) => format!("menu hover {i}"),
            None => "menu hover none".to_string(),
        },
        PipelineEvent::MenuItemSelected { index, item_id } => {
            format!("menu item {index} ({item_id}) selected")
        }
        PipelineEvent::ModelUnavailable { reason } => format!("model unavailable: {reason}"),
        PipelineEvent::TrackingLost { hand } => format!("{hand} hand tracking lost"),
    };
    println!("[{time:7.3}s] {text}");
}

fn cmd_features(gesture: &str) -> Result<()> {
    let Some(label) = GestureLabel::parse(gesture) else {
        bail!("unknown gesture '{gesture}'");
    };
    let pose = synthetic_pose(label, Handedness::Right, Vec3::ZERO, 1.0);
    let features = extract_features(&pose.joints)?.features;

    println!("Features for {label}");
    println!("=============");
    println!();
    println!("Inter-joint distances: {:.3?}", features.inter_joint());
    println!("Fingertip distances:   {:.3?}", features.fingertip());
    println!("Bend angles (rad):     {:.3?}", features.angles());
    println!("Pinch distance:        {:.3}", features.pinch());
    println!();
    println!("{}", serde_json::to_string(&features)?);
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
