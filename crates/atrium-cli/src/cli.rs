use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "atrium")]
#[command(about = "Operate the shared-state employee console from the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Shared folder used as the sync rendezvous point
    #[arg(long, global = true, value_name = "PATH")]
    pub shared_root: Option<PathBuf>,

    /// Seconds between poll passes
    #[arg(long, global = true, value_name = "SECONDS", default_value = "5")]
    pub poll_interval: u64,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show storage, polling, and collection status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pull remote changes from the shared medium once
    #[command(alias = "refresh")]
    Sync,
    /// Poll continuously and print every change applied
    Watch,
    /// Meeting room occupancy and booking
    Rooms {
        #[command(subcommand)]
        command: RoomCommands,
    },
    /// Console-wide alert banners
    Alerts {
        #[command(subcommand)]
        command: AlertCommands,
    },
    /// Reporting lines between employees
    Org {
        #[command(subcommand)]
        command: OrgCommands,
    },
    /// Raw records in any synchronized collection
    Records {
        #[command(subcommand)]
        command: RecordCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum RoomCommands {
    /// List rooms with their current occupancy
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Seed the default meeting rooms
    Init,
    /// Book a room starting now
    Book {
        /// Room identifier (e.g. conference-a)
        room: String,
        /// Employee holding the booking
        #[arg(short, long, value_name = "NAME")]
        employee: String,
        /// Booking length in minutes
        #[arg(short, long, default_value = "30")]
        minutes: i64,
    },
    /// Cancel a room's active booking
    Cancel {
        /// Room identifier (e.g. conference-a)
        room: String,
    },
}

#[derive(Subcommand)]
pub enum AlertCommands {
    /// List alerts currently shown on the console
    List {
        /// Include closed and expired alerts
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Post a new alert
    Post {
        /// Alert headline
        title: String,
        /// Alert body
        message: Vec<String>,
        /// Minutes until the alert expires (never when omitted)
        #[arg(long, value_name = "MINUTES")]
        expires_in: Option<i64>,
    },
    /// Close an alert
    Close {
        /// Alert record ID or unique ID prefix
        id: String,
    },
}

#[derive(Subcommand)]
pub enum OrgCommands {
    /// Record who an employee reports to
    Set {
        /// Employee name
        employee: String,
        /// Manager the employee reports to
        manager: String,
    },
    /// Remove an employee's reporting line
    Remove {
        /// Employee name
        employee: String,
    },
    /// List all reporting lines
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the reporting hierarchy as an indented tree
    Tree,
    /// Show the chain of managers above an employee
    Chain {
        /// Employee name
        employee: String,
    },
    /// List everyone reporting directly to a manager
    Reports {
        /// Manager name
        manager: String,
    },
}

#[derive(Subcommand)]
pub enum RecordCommands {
    /// List the records of a collection
    List {
        /// Collection name (e.g. tasks, news, meetingRooms)
        collection: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a record to a collection
    Add {
        /// Collection name (e.g. tasks, news)
        collection: String,
        /// Record payload as a JSON object
        fields: String,
    },
    /// Remove a record from a collection
    Remove {
        /// Collection name (e.g. tasks, news)
        collection: String,
        /// Record ID or unique ID prefix
        id: String,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
