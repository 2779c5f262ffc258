//! `infinitui` — terminal control panel for an infinitive HVAC daemon.
//!
//! Built on [ratatui](https://ratatui.rs) with reactive data from
//! `infinitui-core`'s [`Panel`](infinitui_core::Panel). One dashboard
//! screen: per-zone thermostat cards plus blower and heat pump panes,
//! updated live from the daemon's status stream.
//!
//! Logs are written to a file (default `/tmp/infinitui.log`) to avoid
//! corrupting the terminal UI. A background data bridge task forwards
//! state changes from the panel into the TUI action loop.
//!
//! Entry point: CLI argument parsing, tracing setup, panic hooks, and
//! app launch.

mod action;
mod app;
mod config;
mod data_bridge;
mod event;
mod theme;
mod tui;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use infinitui_core::Panel;

use crate::app::App;

/// Terminal control panel for infinitive-managed HVAC systems.
#[derive(Parser, Debug)]
#[command(name = "infinitui", version, about)]
struct Cli {
    /// Daemon URL (e.g., http://192.168.1.4:8080)
    #[arg(short = 'u', long, env = "INFINITUI_URL")]
    url: Option<String>,

    /// Log file path (defaults to /tmp/infinitui.log)
    #[arg(long, default_value = "/tmp/infinitui.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Set up file-based tracing. We MUST NOT log to stdout/stderr — that
/// would corrupt the TUI output. Returns a guard that must be held for
/// the lifetime of the application to ensure logs are flushed.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "infinitui={log_level},infinitui_core={log_level},infinitui_api={log_level}"
        ))
    });

    let log_dir = cli
        .log_file
        .parent()
        .unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("infinitui.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Install panic/error hooks BEFORE entering the terminal
    tui::install_hooks()?;

    // Tracing to file — hold the guard so logs flush on exit
    let _log_guard = setup_tracing(&cli);

    // Priority: CLI flag > env > config file > default
    let panel_config =
        config::load(cli.url.as_deref()).wrap_err("failed to load configuration")?;

    info!(url = %panel_config.url, "starting infinitui");

    let panel = Panel::new(panel_config)?;
    let mut app = App::new(panel);
    app.run().await?;

    Ok(())
}
