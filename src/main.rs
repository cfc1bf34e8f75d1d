// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use pose_tracker::data::{self, AngleLogger};
use pose_tracker::{PoseTracker, SessionReader, TrackerConfig};

#[derive(Parser)]
#[command(name = "pose_tracker")]
#[command(about = "3D pose tracking from recorded landmarks and aligned depth frames")]
struct Args {
    /// Session directory (intrinsics.json, landmarks.jsonl, depth/)
    #[arg(short, long)]
    session: PathBuf,

    /// Enable Kalman filter smoothing for joint coordinates
    #[arg(long)]
    use_kalman: bool,

    /// Log per-joint 3D coordinates
    #[arg(long)]
    show_depth: bool,

    /// Print per-joint angle values for every frame
    #[arg(long)]
    show_angles: bool,

    /// Angle CSV file (appended to if it exists)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Tracker configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Depth sampling patch radius in pixels
    #[arg(long)]
    patch_radius: Option<u32>,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => TrackerConfig::load(path)?,
        // Smoothing is opt-in on the command line
        None => TrackerConfig {
            use_kalman: false,
            ..Default::default()
        },
    };
    config.use_kalman |= args.use_kalman;
    if let Some(r) = args.patch_radius {
        config.patch_radius = r;
    }

    let reader = SessionReader::open(&args.session)
        .with_context(|| format!("Failed to open session {}", args.session.display()))?;
    let intrinsics = reader.intrinsics().clone();

    let mut logger = match &args.output {
        Some(path) => AngleLogger::open(path)?,
        None => AngleLogger::in_dir(data::default_output_dir())?,
    };

    tracing::info!("Kalman filter {}", if config.use_kalman { "ENABLED" } else { "DISABLED" });

    let mut tracker = PoseTracker::new(config);
    let mut processed = 0usize;
    let mut failed = 0usize;

    for frame in reader {
        let frame = match frame {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Skipping frame: {}", e);
                failed += 1;
                continue;
            }
        };

        let result = tracker.process_frame(&frame.landmarks, &frame.depth, &intrinsics);

        if args.show_depth {
            let mut ids: Vec<_> = result.joints.keys().copied().collect();
            ids.sort_unstable();
            for id in ids {
                let p = result.joints[&id];
                tracing::info!("frame {} joint {}: ({:.2}, {:.2}, {:.2})", frame.index, id, p.x, p.y, p.z);
            }
        }

        if args.show_angles {
            let line: Vec<String> = result
                .angles
                .iter()
                .filter_map(|(angle, value)| value.map(|v| format!("{}: {:.1}", angle, v)))
                .collect();
            println!("[{}] {}", frame.index, line.join("  "));
        }

        logger.log(&result.angles)?;
        processed += 1;
    }

    let metrics = tracker.metrics();
    tracing::info!(
        "Processed {} frames ({} skipped), avg {:.2} ms/frame, {} joints tracked",
        processed,
        failed,
        metrics.avg_processing_time * 1000.0,
        tracker.filters().len()
    );
    tracing::info!("Angles written to {}", logger.path().display());

    Ok(())
}
