use atrium_core::{Error, PollConfig};
use chrono::Duration;

use crate::commands::common::{format_room_lines, format_timestamp, open_console, RoomListItem};
use crate::error::CliError;

pub async fn run_list(as_json: bool, config: &PollConfig) -> Result<(), CliError> {
    let engine = open_console(config).await?;
    let rooms = engine.service().rooms().await?;

    if as_json {
        let items = rooms
            .iter()
            .map(|(id, room)| RoomListItem {
                id: id.to_string(),
                room: room.clone(),
            })
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if rooms.is_empty() {
        println!("No meeting rooms. Run `atrium rooms init` to seed the defaults.");
    } else {
        for line in format_room_lines(&rooms) {
            println!("{line}");
        }
    }

    Ok(())
}

pub async fn run_init(config: &PollConfig) -> Result<(), CliError> {
    let engine = open_console(config).await?;
    let created = engine.service().ensure_default_rooms().await?;

    if created == 0 {
        println!("Meeting rooms already initialized");
    } else {
        println!("Seeded {created} default meeting room(s)");
    }

    Ok(())
}

pub async fn run_book(
    room_id: &str,
    employee: &str,
    minutes: i64,
    config: &PollConfig,
) -> Result<(), CliError> {
    let duration = Duration::try_minutes(minutes)
        .ok_or_else(|| Error::InvalidInterval("booking length out of range".to_string()))?;

    let engine = open_console(config).await?;
    let room = engine.service().book_now(room_id, employee, duration).await?;

    if let Some(booking) = room.current_booking.as_ref() {
        println!(
            "Booked {} for {} until {}",
            room.name,
            booking.employee,
            format_timestamp(booking.end_time)
        );
    }

    Ok(())
}

pub async fn run_cancel(room_id: &str, config: &PollConfig) -> Result<(), CliError> {
    let engine = open_console(config).await?;
    let room = engine.service().cancel(room_id).await?;

    println!("Cancelled booking for {}", room.name);
    Ok(())
}
