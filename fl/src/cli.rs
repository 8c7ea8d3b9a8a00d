//! CLI command definitions and subcommands

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::clock::Clock;
use crate::progression::MAX_UPCOMING_DAYS;

/// Flourish - grow a plant by completing wellness tasks
#[derive(Parser)]
#[command(
    name = "flourish",
    about = "Task and plant-care progression for the Flourish wellness app",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// User whose tasks and plants are used
    #[arg(short, long, global = true, env = "FLOURISH_USER", default_value = "local")]
    pub user: String,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create missing catalog templates and nutrients
    Seed,

    /// List catalog task templates
    Templates,

    /// Show today's tasks
    Today {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show tasks grouped by day
    Upcoming {
        /// Number of days, starting today
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_UPCOMING_DAYS)))]
        days: Option<u32>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Schedule a task from a catalog template
    Schedule {
        /// Template id
        template: String,

        /// When the task is due: RFC 3339 timestamp or local date (YYYY-MM-DD); defaults to now
        #[arg(short, long)]
        at: Option<String>,

        /// Plant that receives the care update on completion
        #[arg(short, long)]
        plant: Option<String>,
    },

    /// Complete a pending task
    Complete {
        /// Task id
        id: String,
    },

    /// Skip a pending task
    Skip {
        /// Task id
        id: String,

        /// Why the task was skipped
        #[arg(short, long, default_value = "")]
        reason: String,
    },

    /// Delete a task
    Delete {
        /// Task id
        id: String,
    },

    /// Show completion statistics
    Stats {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage plants
    Plant {
        #[command(subcommand)]
        command: PlantCommand,
    },

    /// Apply a nutrient to a plant
    ApplyNutrient {
        /// Plant id
        plant: String,

        /// Nutrient id
        nutrient: String,
    },

    /// Count down a plant's active nutrients until they expire
    Watch {
        /// Plant id
        plant: String,

        /// Stop after this many seconds
        #[arg(short, long)]
        seconds: Option<u64>,
    },
}

/// Plant management subcommands
#[derive(Debug, Subcommand)]
pub enum PlantCommand {
    /// Add a plant for the current user
    Add {
        /// Species catalog id
        species: String,

        /// Plant id; generated when omitted
        #[arg(long)]
        id: Option<String>,
    },

    /// Show a plant and its active nutrients
    Show {
        /// Plant id
        id: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List the current user's plants
    List,
}

/// Output format for list and stats commands
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flourish")
        .join("logs")
        .join("flourish.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Parse a due time: an RFC 3339 timestamp, or a local date meaning its local midnight
pub fn parse_when(input: &str, clock: &dyn Clock) -> Result<DateTime<Utc>, String> {
    debug!(%input, "parse_when: called");
    let input = input.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Ok(at.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(clock.start_of_day(date));
    }
    Err(format!("Invalid time '{}'. Use RFC 3339 or YYYY-MM-DD", input))
}
