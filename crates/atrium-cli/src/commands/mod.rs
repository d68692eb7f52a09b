pub mod alerts;
pub mod common;
pub mod completions;
pub mod org;
pub mod records;
pub mod rooms;
pub mod status;
pub mod sync;
pub mod watch;
