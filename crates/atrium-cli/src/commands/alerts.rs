use atrium_core::{Alert, CollectionKey, Error, PollConfig};
use chrono::{Duration, Utc};

use crate::commands::common::{
    format_alert_lines, normalize_alert_title, open_console, resolve_record, AlertListItem,
};
use crate::error::CliError;

pub async fn run_list(
    include_all: bool,
    as_json: bool,
    config: &PollConfig,
) -> Result<(), CliError> {
    let engine = open_console(config).await?;
    let alerts = if include_all {
        engine.service().alerts().await?
    } else {
        engine.service().active_alerts().await?
    };

    if as_json {
        let now = Utc::now();
        let items = alerts
            .iter()
            .map(|(id, alert)| AlertListItem {
                id: id.to_string(),
                live: alert.is_live(now),
                alert: alert.clone(),
            })
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if alerts.is_empty() {
        if include_all {
            println!("No alerts");
        } else {
            println!("No active alerts");
        }
    } else {
        for line in format_alert_lines(&alerts, Utc::now()) {
            println!("{line}");
        }
    }

    Ok(())
}

pub async fn run_post(
    title: &str,
    message_parts: &[String],
    expires_in: Option<i64>,
    config: &PollConfig,
) -> Result<(), CliError> {
    let title = normalize_alert_title(title)?;
    let message = message_parts.join(" ");
    let message = message.trim();
    if message.is_empty() {
        return Err(CliError::EmptyAlertMessage);
    }

    let mut alert = Alert::new(title, message);
    if let Some(minutes) = expires_in {
        let lifetime = Duration::try_minutes(minutes)
            .filter(|lifetime| *lifetime > Duration::zero())
            .ok_or_else(|| {
                Error::InvalidInput("alert expiry must be a positive number of minutes".to_string())
            })?;
        alert = alert.with_expiry(Utc::now() + lifetime);
    }

    let engine = open_console(config).await?;
    let record = engine.service().post_alert(alert).await?;

    println!("{}", record.id);
    Ok(())
}

pub async fn run_close(id: &str, config: &PollConfig) -> Result<(), CliError> {
    let engine = open_console(config).await?;
    let record = resolve_record(engine.service(), CollectionKey::Alerts, id).await?;
    let alert = engine.service().close_alert(record.id).await?;

    println!("Closed '{}'", alert.title);
    Ok(())
}
