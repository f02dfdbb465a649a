//! alert_receiver - Listen for AINVR alert webhooks and log them.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ainvr_kit::{AinvrConfig, AlertConfig, AlertReceiver};

#[derive(Parser, Debug)]
#[command(author, version, about = "Receive AINVR alert webhooks")]
struct Args {
    /// Listen address (overrides config, default 0.0.0.0:7777).
    #[arg(long)]
    addr: Option<String>,

    /// Path to a JSON or TOML config file.
    #[arg(long, env = "AINVR_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = AinvrConfig::load_from(args.config.as_deref())?;
    let alert_config = AlertConfig {
        addr: args.addr.unwrap_or(cfg.alert_addr),
        ..AlertConfig::default()
    };
    let handle = AlertReceiver::new(alert_config).spawn()?;
    log::info!("started alert receiver on {}", handle.addr);

    let running = Arc::new(AtomicBool::new(true));
    let running_handler = running.clone();
    ctrlc::set_handler(move || {
        running_handler.store(false, Ordering::SeqCst);
    })?;

    while running.load(Ordering::SeqCst) {
        if let Some(alert) = handle.recv_timeout(Duration::from_millis(250)) {
            log::debug!(
                "alert delivered: path={} params={}",
                alert.path,
                alert.query.len()
            );
        }
    }
    log::info!("^C received, shutting down the alert receiver");
    handle.stop()?;
    Ok(())
}
