//! Binary entry point: logging, configuration, signals, run.

use std::process::ExitCode;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use quotagate::{Config, Metrics, Server};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "fatal startup error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let metrics = Metrics::shared();
    let server = Server::bind(&config, metrics).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        termination_signal().await;
        info!("termination signal received");
        let _ = shutdown_tx.send(true);
    });

    server.run(shutdown_rx).await;
    info!("shutdown complete");
    Ok(())
}

/// Resolve when the process is asked to terminate (interrupt or, on unix,
/// SIGTERM).
async fn termination_signal() {
    let interrupt = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = interrupt => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                let _ = interrupt.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = interrupt.await;
    }
}
