use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tomtimer_core::models::ConflictDecision;

use crate::config_profiles::ProviderKind;

#[derive(Parser)]
#[command(name = "tomtimer")]
#[command(about = "Time tasks from the command line and keep them in sync with a shared checklist")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name for sync configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,

    /// Quick add: tomtimer "write the report"
    #[arg(trailing_var_arg = true)]
    pub title: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new task
    #[command(alias = "new")]
    Add {
        /// Task title
        title: Vec<String>,
        /// Estimate in minutes (defaults to the configured estimate)
        #[arg(short, long, value_name = "MINUTES")]
        estimate: Option<u32>,
    },
    /// List tasks
    #[command(alias = "ls")]
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a task's title or estimates
    Edit {
        /// Task ID or unique ID prefix
        id: String,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        /// New total estimate in minutes
        #[arg(short, long, value_name = "MINUTES")]
        estimate: Option<u32>,
        /// New remaining minutes (clamped to the estimate)
        #[arg(short, long, value_name = "MINUTES")]
        remaining: Option<u32>,
    },
    /// Make a task the active one
    Start {
        /// Task ID or unique ID prefix
        id: String,
    },
    /// Deactivate a task
    Stop {
        /// Task ID or unique ID prefix
        id: String,
    },
    /// Log minutes from a finished timer session
    Log {
        /// Task ID or unique ID prefix
        id: String,
        /// Minutes worked
        minutes: u32,
    },
    /// Delete a task, including its remote copy when synced
    Delete {
        /// Task ID or unique ID prefix
        id: String,
    },
    /// Sync tasks with the profile's remote collection
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
        /// Settle every conflict in favour of one side (default: skip and report)
        #[arg(long, value_enum, value_name = "SIDE")]
        resolve: Option<ResolveSide>,
        /// Output the sync report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
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

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ResolveSide {
    /// Keep local values and push them
    Local,
    /// Take the remote values
    Remote,
}

impl ResolveSide {
    pub const fn decision(self) -> ConflictDecision {
        match self {
            Self::Local => ConflictDecision::KeepLocal,
            Self::Remote => ConflictDecision::KeepRemote,
        }
    }
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// List collections available on the provider
    Collections {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Task provider kind
        #[arg(long, value_enum)]
        provider: Option<ProviderKind>,
        /// Location of the provider's store (the JSON task file)
        #[arg(long, value_name = "PATH")]
        store_path: Option<PathBuf>,
        /// Remote collection to sync with
        #[arg(long, value_name = "ID")]
        collection: Option<String>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Show the resolved profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
