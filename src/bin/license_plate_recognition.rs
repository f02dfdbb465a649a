//! license_plate_recognition - Print AINVR plate detections for a still image.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use ainvr_kit::{recognize_plates, AinvrClient, AinvrConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run AINVR licence plate recognition on an image")]
struct Args {
    /// Image to analyse.
    #[arg(long, default_value = "lpr.jpg")]
    image: PathBuf,

    /// Path to a JSON or TOML config file.
    #[arg(long, env = "AINVR_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = AinvrConfig::load_from(args.config.as_deref())?;
    let image = std::fs::read(&args.image)
        .with_context(|| format!("read image {}", args.image.display()))?;

    let mut client = AinvrClient::connect(&cfg)?;
    let plates = recognize_plates(&mut client, &image)?;
    println!("{}", serde_json::to_string_pretty(&plates)?);
    Ok(())
}
