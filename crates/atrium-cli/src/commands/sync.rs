use atrium_core::PollConfig;

use crate::commands::common::open_console;
use crate::error::CliError;

pub async fn run_sync(config: &PollConfig) -> Result<(), CliError> {
    let engine = open_console(config).await?;
    let changed = engine.sync_now().await?;

    if changed.is_empty() {
        println!("Already up to date");
    } else {
        let keys = changed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!("Applied changes: {keys}");
    }

    Ok(())
}
