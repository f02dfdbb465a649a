//! facial_recognition - Identify the first face in a still image.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use ainvr_kit::{identify_face, AinvrClient, AinvrConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run AINVR facial recognition on an image")]
struct Args {
    /// Image to analyse.
    #[arg(long, default_value = "person.jpg")]
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
    match identify_face(&mut client, &image)? {
        Some(identity) => {
            println!("{}", identity.name.as_deref().unwrap_or("<unknown>"));
            println!("{}", identity.confidence);
            println!("{}", identity.age);
            println!("{}", identity.gender);
        }
        None => println!("no face detected"),
    }
    Ok(())
}
