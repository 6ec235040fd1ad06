//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// RankDaemon - search ranking monitor
#[derive(Parser)]
#[command(
    name = "rankdaemon",
    about = "Monitors search result rankings for tracked keywords",
    version = env!("GIT_DESCRIBE"),
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

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the rankdaemon daemon
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },

    /// Internal: Run as daemon process (used by `daemon start`)
    #[command(hide = true)]
    RunDaemon,

    /// Track a new keyword
    Add {
        /// Keyword to search for
        keyword: String,

        /// URL fragment (or title fragment) identifying your result
        target_url: String,
    },

    /// Track keywords in bulk from a file (one `keyword<TAB>target-url` per line)
    Import {
        /// File to read
        file: PathBuf,
    },

    /// List tracked keywords with their last known rank
    List,

    /// Stop tracking keywords
    Delete {
        /// Keyword ids to delete
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Show recorded rank observations
    History {
        /// Restrict to a single keyword id
        #[arg(short, long)]
        id: Option<i64>,

        /// Maximum rows to show
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },

    /// Change the polling interval of the running daemon
    Interval {
        /// New interval in milliseconds (floor 1000)
        ms: u64,
    },

    /// Show the pending check order, next keyword first
    Queue,

    /// Show the scheduler's interval and running flag
    State,

    /// Show daemon logs
    Logs {
        /// Follow log output (like tail -f)
        #[arg(short, long)]
        follow: bool,

        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
    },
}

/// Daemon management subcommands
#[derive(Debug, Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon
    Start {
        /// Don't fork to background (run in foreground)
        #[arg(long)]
        foreground: bool,
    },

    /// Stop the daemon
    Stop,

    /// Check daemon status
    Status {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Ping the daemon over IPC
    Ping,
}

/// Output format for status commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Path of the daemon log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rankdaemon")
        .join("logs")
        .join("rankdaemon.log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_add_command() {
        let cli = Cli::try_parse_from(["rd", "add", "coffee beans", "shop.example.com"]).unwrap();
        match cli.command {
            Command::Add { keyword, target_url } => {
                assert_eq!(keyword, "coffee beans");
                assert_eq!(target_url, "shop.example.com");
            }
            other => panic!("Expected Add, got {other:?}"),
        }
    }

    #[test]
    fn test_interval_command() {
        let cli = Cli::try_parse_from(["rd", "interval", "30000"]).unwrap();
        match cli.command {
            Command::Interval { ms } => assert_eq!(ms, 30_000),
            other => panic!("Expected Interval, got {other:?}"),
        }
    }

    #[test]
    fn test_delete_requires_ids() {
        assert!(Cli::try_parse_from(["rd", "delete"]).is_err());
        let cli = Cli::try_parse_from(["rd", "delete", "1", "2"]).unwrap();
        match cli.command {
            Command::Delete { ids } => assert_eq!(ids, vec![1, 2]),
            other => panic!("Expected Delete, got {other:?}"),
        }
    }

    #[test]
    fn test_log_path_ends_with_log_file() {
        assert!(get_log_path().ends_with("rankdaemon/logs/rankdaemon.log"));
    }
}
