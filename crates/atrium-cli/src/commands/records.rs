use atrium_core::{CollectionKey, PollConfig, Record};

use crate::commands::common::{
    format_record_lines, open_console, parse_record_fields, resolve_record,
};
use crate::error::CliError;

pub async fn run_list(
    collection: &str,
    as_json: bool,
    config: &PollConfig,
) -> Result<(), CliError> {
    let key: CollectionKey = collection.parse()?;
    let engine = open_console(config).await?;
    let records = engine.service().records(key).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("No records in '{key}'");
    } else {
        for line in format_record_lines(&records) {
            println!("{line}");
        }
    }

    Ok(())
}

pub async fn run_add(
    collection: &str,
    payload: &str,
    config: &PollConfig,
) -> Result<(), CliError> {
    let key: CollectionKey = collection.parse()?;
    let fields = parse_record_fields(payload)?;

    let engine = open_console(config).await?;
    let record = engine.service().create(key, Record::new(fields)).await?;

    println!("{}", record.id);
    Ok(())
}

pub async fn run_remove(
    collection: &str,
    id: &str,
    config: &PollConfig,
) -> Result<(), CliError> {
    let key: CollectionKey = collection.parse()?;
    let engine = open_console(config).await?;

    let record = resolve_record(engine.service(), key, id).await?;
    engine.service().delete(key, record.id).await?;

    println!("{}", record.id);
    Ok(())
}
