//! Command-line grammar
//!
//! The same clap definitions parse the process arguments and every line
//! typed into the console.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use clap::{CommandFactory, Parser, Subcommand};
use common::{ClientConfig, ClientResult};

use crate::models::reservation::wall_clock;

/// Process arguments
#[derive(Debug, Parser)]
#[command(
    name = "bandroom",
    version,
    about = "Console client for band management and rehearsal room reservations"
)]
pub struct Args {
    /// Configuration file (defaults to ./bandroom.toml when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Backend origin, overriding the configuration
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,
    /// Room used for slot reservations, overriding the configuration
    #[arg(long, value_name = "ROOM_ID")]
    pub room: Option<String>,
}

impl Args {
    /// Load the configuration, apply the flag overrides, then validate
    pub fn load_config(&self) -> ClientResult<ClientConfig> {
        let mut config = ClientConfig::load(self.config.as_deref())?;
        if let Some(api_url) = &self.api_url {
            config.api_url = api_url.clone();
        }
        if let Some(room) = &self.room {
            config.default_room = Some(room.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

/// One console line
#[derive(Debug, Parser)]
#[command(
    name = "bandroom",
    no_binary_name = true,
    disable_help_subcommand = true,
    disable_version_flag = true
)]
pub struct ConsoleLine {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Sign in
    Login {
        username: String,
        /// Prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Create an account
    Register {
        username: String,
        email: String,
        /// National id (RUT)
        #[arg(value_name = "RUT")]
        national_id: String,
        /// Prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Dashboard statistics
    Stats,
    /// Band management
    Bands {
        #[command(subcommand)]
        command: BandCommand,
    },
    /// Members of your current band
    Members {
        #[command(subcommand)]
        command: Option<MemberCommand>,
    },
    /// User lookup
    Users {
        #[command(subcommand)]
        command: UserCommand,
    },
    /// List rehearsal rooms
    Rooms,
    /// List reservations
    Reservations,
    /// Show this week's calendar
    Week,
    /// Show the slots of the selected day
    Slots,
    /// Select a day of this week ("today" or YYYY-MM-DD)
    Select { date: String },
    /// Reserve a one-hour slot on the selected day
    Reserve {
        /// Slot start, e.g. 18:00
        hour: String,
        #[arg(long, value_name = "ROOM_ID")]
        room: Option<String>,
    },
    /// Reserve an arbitrary window, optionally with guests
    Book {
        /// Start, e.g. 2026-10-15T18:00
        start: String,
        /// End, e.g. 2026-10-15T20:00
        end: String,
        #[arg(long, value_name = "ROOM_ID")]
        room: Option<String>,
        /// Guest national id (RUT); repeatable
        #[arg(long = "guest", value_name = "RUT")]
        guests: Vec<String>,
    },
    /// List commands
    Help,
    /// Leave the console
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum BandCommand {
    List,
    Search {
        #[arg(required = true, num_args = 1..)]
        term: Vec<String>,
    },
    Show { id: String },
    /// Create a band (university accounts only)
    Create {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    Rename {
        id: String,
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    Delete { id: String },
    Join { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum MemberCommand {
    List,
    /// Add the user with this national id
    Add {
        #[arg(value_name = "RUT")]
        national_id: String,
    },
    /// Remove the user with this id
    Remove { user_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum UserCommand {
    Search {
        #[arg(required = true, num_args = 1..)]
        term: Vec<String>,
    },
}

impl Command {
    /// Whether the command needs a signed-in session
    pub fn requires_session(&self) -> bool {
        !matches!(
            self,
            Command::Login { .. }
                | Command::Register { .. }
                | Command::Whoami
                | Command::Help
                | Command::Quit
        )
    }
}

/// Parse one console line
pub fn parse_line(line: &str) -> Result<Command, clap::Error> {
    ConsoleLine::try_parse_from(line.split_whitespace()).map(|parsed| parsed.command)
}

/// Console help text
pub fn help() -> String {
    ConsoleLine::command().render_help().to_string()
}

/// Words of a multi-word argument joined back together
pub fn join_words(words: &[String]) -> String {
    words.join(" ")
}

/// "today" or an ISO date
pub fn parse_day(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    if raw.eq_ignore_ascii_case("today") {
        return Some(today);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Local wall-clock time, with or without seconds
pub fn parse_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .ok()
        .or_else(|| wall_clock::parse(raw))
}
