//! check_vehicle_roi - Is a target object inside a camera's region of interest?
//!
//! 1. Looks up the camera's stream URL
//! 2. Has the NVR take a snapshot and downloads it
//! 3. Runs object detection on the snapshot
//! 4. Keeps objects of the configured types (default: car)
//! 5. Checks each object's center against the ROI bounding rectangle

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use ainvr_kit::config::split_csv;
use ainvr_kit::{run_roi_check, AinvrClient, AinvrConfig, RoiCheckRequest};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Check whether detected vehicles fall inside an AINVR region of interest"
)]
struct Args {
    /// Camera ID.
    #[arg(short = 'c', long)]
    camera_id: u64,

    /// ROI ID.
    #[arg(short = 'r', long)]
    roi_id: u64,

    /// Path to a JSON or TOML config file.
    #[arg(long, env = "AINVR_CONFIG")]
    config: Option<PathBuf>,

    /// Comma-separated object types to check (overrides config).
    #[arg(long)]
    targets: Option<String>,

    /// Write the downloaded snapshot to this path.
    #[arg(long)]
    save_snapshot: Option<PathBuf>,

    /// Print the report as JSON on stdout.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = AinvrConfig::load_from(args.config.as_deref())?;
    if let Some(targets) = &args.targets {
        let parsed = split_csv(targets);
        if !parsed.is_empty() {
            cfg.object_targets = parsed;
        }
    }
    log::debug!("config: {:?}", cfg);

    let mut client = AinvrClient::connect(&cfg)?;
    let request = RoiCheckRequest {
        camera_id: args.camera_id,
        roi_id: args.roi_id,
        object_targets: cfg.object_targets.clone(),
    };
    let outcome = match run_roi_check(&mut client, &request) {
        Ok(outcome) => outcome,
        Err(err) => {
            log::error!("roi check failed: {:#}", err);
            return Err(err);
        }
    };

    if let Some(path) = &args.save_snapshot {
        std::fs::write(path, &outcome.snapshot)
            .with_context(|| format!("write snapshot to {}", path.display()))?;
        log::info!("snapshot written to {}", path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    } else {
        println!("{}", outcome.report.any_inside);
    }
    Ok(())
}
