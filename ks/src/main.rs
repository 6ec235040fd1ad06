use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use keywordstore::KeywordStore;
use keywordstore::cli::{Cli, Command};
use keywordstore::config::Config;

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn format_rank(rank: Option<u32>) -> String {
    match rank {
        Some(n) => n.to_string().green().to_string(),
        None => "-".dimmed().to_string(),
    }
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let db_path = cli.db.unwrap_or(config.db_path);

    info!("keywordstore opening {}", db_path.display());
    let store = KeywordStore::open(&db_path)?;

    match cli.command {
        Command::List => {
            let keywords = store.list()?;
            if keywords.is_empty() {
                println!("No tracked keywords");
            } else {
                for kw in keywords {
                    let checked = kw
                        .last_checked_at
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string());
                    println!(
                        "{:>4}  {}  {}  rank {}  checked {}",
                        kw.id.to_string().yellow(),
                        kw.keyword,
                        kw.target_url.cyan(),
                        format_rank(kw.last_rank),
                        checked.dimmed()
                    );
                }
            }
        }
        Command::History { id, limit } => match id {
            Some(keyword_id) => {
                let observations = store.observations_for(keyword_id)?;
                if observations.is_empty() {
                    println!("No observations for keyword {}", keyword_id);
                }
                for obs in observations.iter().rev().take(limit) {
                    println!("{}  rank {}", obs.checked_at.to_rfc3339(), format_rank(obs.rank));
                }
            }
            None => {
                for row in store.history(limit)? {
                    println!(
                        "{}  {:>4}  {}  rank {}",
                        row.checked_at.to_rfc3339().dimmed(),
                        row.keyword_id.to_string().yellow(),
                        row.keyword,
                        format_rank(row.rank)
                    );
                }
            }
        },
        Command::Stats => {
            let stats = store.stats()?;
            println!("Keywords: {}", stats.keyword_count);
            println!("Observations: {}", stats.observation_count);
        }
    }

    Ok(())
}
