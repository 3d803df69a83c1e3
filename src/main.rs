mod availability;
mod config;
mod error;
mod market;
mod notify;
mod runpod;
mod watch;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use crate::config::secrets::Secrets;
use crate::config::watch_config::WatchConfig;
use crate::watch::watcher::{WatchOutcome, Watcher};

pub const USER_AGENT: &str = concat!("gpuwatch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Run a single availability check and exit: 0 when any watched GPU is
    /// available, 1 when none are.
    #[arg(long)]
    pub once: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("gpuwatch=info".parse().unwrap()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tokio::select! {
        outcome = run(args.once) => match outcome {
            Ok(WatchOutcome::AvailableNow) => ExitCode::SUCCESS,
            Ok(WatchOutcome::NothingAvailable) => ExitCode::from(1),
            Err(error) => {
                eprintln!("Error: {error:#}");
                ExitCode::from(2)
            }
        },
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                eprintln!();
                eprintln!("Stopped.");
                ExitCode::from(130)
            }
            Err(error) => {
                eprintln!("Error: failed to listen for ctrl-c: {error}");
                ExitCode::from(2)
            }
        },
    }
}

async fn run(once: bool) -> Result<WatchOutcome> {
    let config = WatchConfig::load()?;
    let secrets = Secrets::resolve(config)?;

    print_banner(config);

    let mut watcher = Watcher::initialize(config, &secrets).await?;
    watcher.run(once).await
}

fn print_banner(config: &WatchConfig) {
    println!(
        "gpuwatch v{} - watching RunPod GPU availability ({} market).",
        env!("CARGO_PKG_VERSION"),
        config.market_mode
    );

    if config.print_on_availability_change_only {
        println!(
            "Checking every {} seconds, printing on availability change.",
            config.refresh_seconds
        );
    }

    if config.enable_pushover {
        if config.notify_on_availability_change_only {
            println!(
                "Pushover enabled, notifying on availability change ({}s cooldown).",
                config.state_change_notify_cooldown_seconds
            );
        } else {
            println!(
                "Pushover enabled, notifying every {}s while available.",
                config.pushover_cooldown_seconds
            );
        }
    }

    println!();
}
