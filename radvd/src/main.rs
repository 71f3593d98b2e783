// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The IPv6 Router Advertisement daemon executable.

use radv::{Config, Daemon};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod args;

use args::{CmdArgs, Parser};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CmdArgs::parse();
    init_tracing();

    let config = match Config::from_yaml_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load config {}: {e}", args.config.display());
            return ExitCode::FAILURE;
        }
    };

    let daemon = match Daemon::new(&config) {
        Ok(daemon) => Arc::new(daemon),
        Err(e) => {
            error!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(drive_shutdown(shutdown_tx));

    let api = tokio::spawn(api::serve(args.listen, daemon.clone(), shutdown_rx.clone()));

    daemon.run(shutdown_rx).await;

    match api.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("admin API failed: {e}");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("admin API panicked: {e}");
            return ExitCode::FAILURE;
        }
    }

    info!("daemon exited cleanly");
    ExitCode::SUCCESS
}

/// Flip the root shutdown flag on SIGINT or SIGTERM.
async fn drive_shutdown(shutdown: watch::Sender<bool>) {
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = sigint.recv() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }
    let _ = shutdown.send(true);
}
