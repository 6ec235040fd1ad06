//! CLI argument parsing for keywordstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ks")]
#[command(author, version, about = "Inspect the rank monitor keyword store", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the database file (overrides config)
    #[arg(short, long)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List tracked keywords with their last known rank
    List,

    /// Show recorded observations, most recent first
    History {
        /// Restrict to a single keyword id
        #[arg(short, long)]
        id: Option<i64>,

        /// Maximum rows to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show row counts
    Stats,
}
