//! Posting Agent TUI - a terminal client for the Posting Agent scheduler.
//!
//! Signs in against the Posting Agent API, keeps the session between runs and
//! lets you move between the app's pages from the keyboard.

mod app;
mod cli;
mod ui;

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use postagent_core::auth::MemorySessionStore;
use postagent_core::{AppShell, Config, SessionStore};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const LOG_FILE_PREFIX: &str = "postagent.log";

const USAGE: &str = "\
Usage: postagent [OPTION]

Without an option the terminal UI starts.

Options:
  --login        Log in from the command line
  --register     Create an account and log in
  --whoami       Show the signed-in user
  --ephemeral    Start the UI without reading or saving the session
  --help         Show this message";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to a daily file in `log_dir` since the terminal belongs to the UI.
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug).
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    guard
}

/// Config file plus environment overrides
fn load_config() -> Result<Config> {
    let mut config = Config::load()?;
    if let Ok(url) = std::env::var("POSTAGENT_API_URL") {
        config.api_base_url = Some(url);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str);
    if args.len() > 1 {
        bail!("Unexpected arguments: {}\n\n{}", args[1..].join(" "), USAGE);
    }
    if command == Some("--help") {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = load_config()?;
    let _log_guard = init_tracing(&config.cache_dir()?);
    info!(command = ?command, "Posting Agent starting");

    let store: Arc<dyn SessionStore> = match command {
        Some("--ephemeral") => Arc::new(MemorySessionStore::new()),
        _ => AppShell::open_session_store(&config)?,
    };
    let shell = Arc::new(AppShell::new(config, store)?);

    match command {
        Some("--login") => cli::login(&shell).await,
        Some("--register") => cli::register(&shell).await,
        Some("--whoami") => cli::whoami(&shell).await,
        None | Some("--ephemeral") => run_tui(shell),
        Some(other) => bail!("Unknown option: {}\n\n{}", other, USAGE),
    }
}

fn run_tui(shell: Arc<AppShell>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::with_shell(shell);
    app.load_current_user();

    // Main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("Posting Agent shutting down");
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout so toasts expire and background results land
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key)? {
                    return Ok(());
                }
            }
        }

        // Check for completed background tasks
        app.check_background_tasks();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
