use atrium_core::PollConfig;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::commands::common::{format_timestamp, open_console};
use crate::error::CliError;

/// Poll the shared medium and print every applied change until interrupted.
pub async fn run_watch(config: &PollConfig) -> Result<(), CliError> {
    let engine = open_console(config).await?;
    let mut events = engine.service().subscribe();
    let poller = engine.start();

    let status = engine.status();
    println!(
        "Watching {} every {} ms (press Ctrl-C to stop)",
        status.shared_path, status.poll_interval_ms
    );

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => println!(
                    "{}  {} changed",
                    format_timestamp(event.timestamp),
                    event.collection
                ),
                Err(RecvError::Lagged(missed)) => warn!("Dropped {missed} change events"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    poller.stop();
    println!("Stopped");
    Ok(())
}
