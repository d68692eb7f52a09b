use atrium_core::PollConfig;

use crate::commands::common::open_console;
use crate::error::CliError;

pub async fn run_status(as_json: bool, config: &PollConfig) -> Result<(), CliError> {
    let engine = open_console(config).await?;
    let status = engine.status();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Storage:        {}", status.shared_path);
    println!(
        "Shared medium:  {}",
        if status.has_native_storage {
            "yes"
        } else {
            "no (single instance)"
        }
    );
    println!("Poll interval:  {} ms", status.poll_interval_ms);
    println!("Instance:       {}", status.system_id);
    println!(
        "Collections:    {}",
        status
            .registered
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );

    if !status.errors.is_empty() {
        println!("Recent errors:");
        for error in &status.errors {
            println!("  {error}");
        }
    }

    Ok(())
}
