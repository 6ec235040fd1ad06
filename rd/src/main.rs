//! RankDaemon - search ranking monitor
//!
//! CLI entry point for the daemon and its control surface.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use keywordstore::KeywordStore;
use rankdaemon::cli::{Cli, Command, DaemonCommand, OutputFormat, get_log_path};
use rankdaemon::config::Config;
use rankdaemon::daemon::{DaemonManager, VERSION};
use rankdaemon::fetcher::{BrowserFetcher, PageFetcher};
use rankdaemon::ipc;
use rankdaemon::ipc::{DaemonClient, DaemonMessage, DaemonResponse};
use rankdaemon::scheduler::Scheduler;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Daemon { command } => match command {
            DaemonCommand::Start { foreground } => cmd_start(&config, foreground).await,
            DaemonCommand::Stop => cmd_stop().await,
            DaemonCommand::Status { format } => cmd_status(format).await,
            DaemonCommand::Ping => cmd_ping().await,
        },
        Command::RunDaemon => run_daemon(&config).await,
        Command::Add { keyword, target_url } => cmd_add(&config, &keyword, &target_url).await,
        Command::Import { file } => cmd_import(&config, &file).await,
        Command::List => cmd_list(&config),
        Command::Delete { ids } => cmd_delete(&config, &ids).await,
        Command::History { id, limit } => cmd_history(&config, id, limit),
        Command::Interval { ms } => cmd_interval(ms).await,
        Command::Queue => cmd_queue().await,
        Command::State => cmd_state().await,
        Command::Logs { follow, lines } => cmd_logs(follow, lines).await,
    }
}

/// Start the daemon
async fn cmd_start(config: &Config, foreground: bool) -> Result<()> {
    let daemon = DaemonManager::new();

    if daemon.is_running() {
        if let Some(pid) = daemon.running_pid() {
            println!("RankDaemon is already running (PID: {})", pid);
        } else {
            println!("RankDaemon is already running");
        }
        return Ok(());
    }

    if foreground {
        println!("Starting RankDaemon in foreground mode...");
        run_daemon(config).await
    } else {
        let pid = daemon.start()?;
        println!("RankDaemon started (PID: {})", pid);
        Ok(())
    }
}

/// Stop the daemon
///
/// Tries IPC shutdown first for graceful stop, falls back to SIGTERM if IPC fails.
async fn cmd_stop() -> Result<()> {
    let daemon = DaemonManager::new();

    if !daemon.is_running() {
        println!("RankDaemon is not running");
        return Ok(());
    }

    let pid = daemon.running_pid();

    // Try graceful IPC shutdown first
    let client = DaemonClient::new();
    if client.socket_exists() {
        match client.shutdown().await {
            Ok(()) => {
                // Wait for process to exit
                let mut attempts = 0;
                while daemon.is_running() && attempts < 50 {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    attempts += 1;
                }
                if !daemon.is_running() {
                    if let Some(pid) = pid {
                        println!("RankDaemon stopped gracefully via IPC (was PID: {})", pid);
                    } else {
                        println!("RankDaemon stopped gracefully via IPC");
                    }
                    return Ok(());
                }
                debug!("cmd_stop: IPC shutdown timed out, falling back to SIGTERM");
            }
            Err(e) => {
                debug!(error = %e, "cmd_stop: IPC shutdown failed, falling back to SIGTERM");
            }
        }
    }

    daemon.stop()?;
    if let Some(pid) = pid {
        println!("RankDaemon stopped (was PID: {})", pid);
    } else {
        println!("RankDaemon stopped");
    }
    Ok(())
}

/// Ping the daemon via IPC to check if it's alive and responsive
async fn cmd_ping() -> Result<()> {
    let daemon = DaemonManager::new();
    if !daemon.is_running() {
        println!("RankDaemon is not running");
        return Ok(());
    }

    let client = DaemonClient::new();
    if !client.socket_exists() {
        println!("Daemon PID file exists but IPC socket not found");
        println!("The daemon may be starting up or in an inconsistent state");
        return Ok(());
    }

    match client.ping().await {
        Ok(version) => {
            println!("Daemon is alive and responsive");
            println!("Version: {}", version);
        }
        Err(e) => {
            println!("Daemon PID file exists but not responding to IPC");
            println!("Error: {}", e);
            println!("The daemon may be hung or the IPC socket may be stale");
        }
    }

    Ok(())
}

/// Show daemon status, including scheduler state when reachable
async fn cmd_status(format: OutputFormat) -> Result<()> {
    let daemon = DaemonManager::new();
    let status = daemon.status();

    let client = DaemonClient::new();
    let scheduler_state = if status.running && client.socket_exists() {
        client.get_state().await.ok()
    } else {
        None
    };

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "running": status.running,
                "pid": status.pid,
                "pid_file": status.pid_file.to_string_lossy(),
                "scheduler": scheduler_state.map(|(interval_ms, running)| serde_json::json!({
                    "interval_ms": interval_ms,
                    "running": running,
                })),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("RankDaemon Status");
            println!("-----------------");
            if status.running {
                println!("Status: running");
                if let Some(pid) = status.pid {
                    println!("PID: {}", pid);
                }
            } else {
                println!("Status: stopped");
            }
            println!("PID file: {}", status.pid_file.display());

            if let Some((interval_ms, running)) = scheduler_state {
                println!();
                println!("Scheduler: {}", if running { "running" } else { "stopped" });
                println!("Interval: {}ms", interval_ms);
            }
        }
    }

    Ok(())
}

/// The daemon process: store + fetcher + scheduler wired together, an IPC
/// listener in front, running until Shutdown or SIGTERM/SIGINT.
async fn run_daemon(config: &Config) -> Result<()> {
    info!(version = VERSION, "Daemon starting");

    let daemon = DaemonManager::new();
    daemon.register_self()?;

    let store = Arc::new(KeywordStore::open(&config.storage.db_path).context("Failed to open keyword store")?);
    let fetcher: Arc<dyn PageFetcher> =
        Arc::new(BrowserFetcher::from_config(&config.fetcher).context("Failed to build page fetcher")?);
    let scheduler = Arc::new(Scheduler::new(Arc::clone(&store), fetcher, config.scheduler.clone()));

    // Load the rotation, then start checking right away
    scheduler.refresh().context("Failed initial keyword load")?;
    scheduler.start(None);

    let (listener, socket_path) = ipc::create_listener()?;
    info!(socket = %socket_path.display(), "Daemon ready");

    let mut sigterm =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down");
                break;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((mut stream, _)) => {
                        if handle_connection(&mut stream, &scheduler).await {
                            info!("Received shutdown request, shutting down");
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "IPC accept failed"),
                }
            }
        }
    }

    scheduler.stop();
    ipc::cleanup_socket(&socket_path);
    info!("Daemon exited");
    Ok(())
}

/// Handle one IPC connection. Returns true when the daemon should shut down.
async fn handle_connection(stream: &mut tokio::net::UnixStream, scheduler: &Scheduler) -> bool {
    let msg = match ipc::read_message(stream).await {
        Ok(msg) => msg,
        Err(e) => {
            debug!(error = %e, "Dropping unreadable IPC connection");
            return false;
        }
    };

    let (response, shutdown) = handle_message(msg, scheduler);
    if let Err(e) = ipc::send_response(stream, response).await {
        warn!(error = %e, "Failed to send IPC response");
    }
    shutdown
}

/// Map a control message onto the scheduler. All handlers are synchronous
/// and return promptly; a tick's fetch happens in the background.
fn handle_message(msg: DaemonMessage, scheduler: &Scheduler) -> (DaemonResponse, bool) {
    match msg {
        DaemonMessage::Ping => (
            DaemonResponse::Pong {
                version: VERSION.to_string(),
            },
            false,
        ),
        DaemonMessage::Shutdown => (DaemonResponse::Ok, true),
        DaemonMessage::Start { interval_ms } => {
            scheduler.start(interval_ms.map(Duration::from_millis));
            (DaemonResponse::Ok, false)
        }
        DaemonMessage::Stop => {
            scheduler.stop();
            (DaemonResponse::Ok, false)
        }
        DaemonMessage::SetInterval { interval_ms } => {
            scheduler.set_interval(interval_ms);
            (DaemonResponse::Ok, false)
        }
        DaemonMessage::GetState => {
            let state = scheduler.state();
            (
                DaemonResponse::State {
                    interval_ms: state.interval.as_millis() as u64,
                    running: state.running,
                },
                false,
            )
        }
        DaemonMessage::GetQueue => (
            DaemonResponse::Queue {
                keywords: scheduler.queue(),
            },
            false,
        ),
        DaemonMessage::Refresh => match scheduler.refresh() {
            Ok(()) => (DaemonResponse::Ok, false),
            Err(e) => (
                DaemonResponse::Error {
                    message: e.to_string(),
                },
                false,
            ),
        },
    }
}

/// Nudge a running daemon to re-read the keyword set after a mutation.
///
/// Best-effort: the daemon re-reads at every tick anyway, so a missed
/// notification only delays the pickup.
async fn notify_refresh() {
    let client = DaemonClient::new();
    if !client.socket_exists() {
        return;
    }
    if let Err(e) = client.refresh().await {
        debug!(error = %e, "Refresh notification failed");
    }
}

async fn cmd_add(config: &Config, keyword: &str, target_url: &str) -> Result<()> {
    let store = KeywordStore::open(&config.storage.db_path)?;
    let added = store.add(keyword, target_url)?;
    notify_refresh().await;
    println!("{} Tracking keyword {}: {} -> {}", "✓".green(), added.id, added.keyword, added.target_url.cyan());
    Ok(())
}

async fn cmd_import(config: &Config, file: &PathBuf) -> Result<()> {
    let content = fs::read_to_string(file).context(format!("Failed to read {}", file.display()))?;

    let mut items = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (keyword, target_url) = line
            .split_once('\t')
            .or_else(|| line.split_once(','))
            .ok_or_else(|| eyre::eyre!("Line {}: expected `keyword<TAB>target-url`", line_no + 1))?;
        items.push((keyword.trim().to_string(), target_url.trim().to_string()));
    }

    if items.is_empty() {
        println!("Nothing to import");
        return Ok(());
    }

    let store = KeywordStore::open(&config.storage.db_path)?;
    let added = store.add_bulk(&items)?;
    notify_refresh().await;
    println!("{} Imported {} keywords", "✓".green(), added.len());
    Ok(())
}

fn cmd_list(config: &Config) -> Result<()> {
    let store = KeywordStore::open(&config.storage.db_path)?;
    let keywords = store.list()?;

    if keywords.is_empty() {
        println!("No tracked keywords. Add one with: rd add <keyword> <target-url>");
        return Ok(());
    }

    for kw in keywords {
        let rank = match kw.last_rank {
            Some(n) => format!("rank {}", n).green().to_string(),
            None => "not found".dimmed().to_string(),
        };
        let checked = kw
            .last_checked_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never checked".to_string());
        println!(
            "{:>4}  {}  {}  {}  {}",
            kw.id.to_string().yellow(),
            kw.keyword,
            kw.target_url.cyan(),
            rank,
            checked.dimmed()
        );
    }
    Ok(())
}

async fn cmd_delete(config: &Config, ids: &[i64]) -> Result<()> {
    let store = KeywordStore::open(&config.storage.db_path)?;
    let deleted = store.delete_bulk(ids)?;
    notify_refresh().await;
    println!("{} Deleted {} keywords", "✓".green(), deleted);
    Ok(())
}

fn cmd_history(config: &Config, id: Option<i64>, limit: usize) -> Result<()> {
    let store = KeywordStore::open(&config.storage.db_path)?;

    match id {
        Some(keyword_id) => {
            let observations = store.observations_for(keyword_id)?;
            if observations.is_empty() {
                println!("No observations for keyword {}", keyword_id);
                return Ok(());
            }
            for obs in observations.iter().rev().take(limit) {
                let rank = match obs.rank {
                    Some(n) => n.to_string().green().to_string(),
                    None => "-".dimmed().to_string(),
                };
                println!("{}  rank {}", obs.checked_at.to_rfc3339(), rank);
            }
        }
        None => {
            let rows = store.history(limit)?;
            if rows.is_empty() {
                println!("No observations recorded yet");
                return Ok(());
            }
            for row in rows {
                let rank = match row.rank {
                    Some(n) => n.to_string().green().to_string(),
                    None => "-".dimmed().to_string(),
                };
                println!(
                    "{}  {:>4}  {}  rank {}",
                    row.checked_at.to_rfc3339().dimmed(),
                    row.keyword_id.to_string().yellow(),
                    row.keyword,
                    rank
                );
            }
        }
    }
    Ok(())
}

async fn cmd_interval(ms: u64) -> Result<()> {
    let client = DaemonClient::new();
    if !client.socket_exists() {
        println!("RankDaemon is not running; start it with: rd daemon start");
        return Ok(());
    }

    client.set_interval(ms).await?;
    let (interval_ms, _) = client.get_state().await?;
    if interval_ms != ms {
        println!("Interval clamped to {}ms (floor)", interval_ms);
    } else {
        println!("Interval set to {}ms", interval_ms);
    }
    Ok(())
}

async fn cmd_queue() -> Result<()> {
    let client = DaemonClient::new();
    if !client.socket_exists() {
        println!("RankDaemon is not running; start it with: rd daemon start");
        return Ok(());
    }

    let keywords = client.get_queue().await?;
    if keywords.is_empty() {
        println!("Queue is empty");
        return Ok(());
    }

    for (position, kw) in keywords.iter().enumerate() {
        let marker = if position == 0 { "next".green().to_string() } else { format!("{:>4}", position + 1) };
        println!("{}  {}  {}", marker, kw.keyword, kw.target_url.cyan());
    }
    Ok(())
}

async fn cmd_state() -> Result<()> {
    let client = DaemonClient::new();
    if !client.socket_exists() {
        println!("RankDaemon is not running; start it with: rd daemon start");
        return Ok(());
    }

    let (interval_ms, running) = client.get_state().await?;
    println!("Scheduler: {}", if running { "running" } else { "stopped" });
    println!("Interval: {}ms", interval_ms);
    Ok(())
}

/// Show logs
async fn cmd_logs(follow: bool, lines: usize) -> Result<()> {
    let log_path = get_log_path();

    if !log_path.exists() {
        println!("No log file found at: {}", log_path.display());
        println!("The daemon may not have been started yet.");
        return Ok(());
    }

    if follow {
        println!("Following log file: {} (Ctrl+C to stop)", log_path.display());
        println!();

        // Use tail -f for following
        let mut child = std::process::Command::new("tail")
            .args(["-f", "-n", &lines.to_string()])
            .arg(&log_path)
            .spawn()
            .context("Failed to run tail -f")?;

        child.wait()?;
    } else {
        let file = fs::File::open(&log_path).context("Failed to open log file")?;
        let reader = BufReader::new(file);
        let all_lines: Vec<String> = reader.lines().map_while(Result::ok).collect();

        let start = all_lines.len().saturating_sub(lines);
        for line in &all_lines[start..] {
            println!("{}", line);
        }
    }

    Ok(())
}
