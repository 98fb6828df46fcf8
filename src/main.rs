mod app;
mod block;
mod chat;
mod clock;
mod commands;
mod config;
mod editor;
mod error;
mod events;
mod gallery;
mod guides;
mod logging;
mod modal_ui;
mod modals;
mod quota;
mod render;
mod store;
mod suggest;
mod template;
mod ui;
mod validators;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use chrono::TimeDelta;
use clap::Parser;
use crossterm::event::{Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::{DefaultTerminal, Terminal};
use tokio::runtime::{Handle, Runtime};
use tracing::{debug, info, warn};

use crate::app::App;
use crate::clock::{Clock, SystemClock};
use crate::commands::Command;
use crate::config::{Config, LoadedConfig};
use crate::quota::{FileUsageStore, QuotaTracker};
use crate::store::Database;
use crate::suggest::{OpenAiBackend, SuggestionService};
use crate::ui::draw_ui;

/// Build prompt templates from blocks, preview them, and ask an AI to improve them.
///
/// Runs the interactive builder when no subcommand is given.
#[derive(Parser, Debug)]
#[command(name = "promptforge", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

fn build_service(config: &Config, clock: Arc<dyn Clock>) -> Result<SuggestionService> {
    let usage = FileUsageStore::open(&config.usage_path()).with_context(|| {
        format!(
            "Failed to open usage file {}",
            config.usage_path().display()
        )
    })?;
    let quota = QuotaTracker::new(Box::new(usage), clock.clone(), config.ai.daily_limit);

    let backend = OpenAiBackend::new(
        config.ai.api_url.clone(),
        config.ai.model.clone(),
        config.ai.api_key_env.clone(),
        Duration::from_secs(config.ai.timeout_secs),
    )?;
    if !backend.has_api_key() {
        warn!(env = %config.ai.api_key_env, "ai_api_key_missing");
    }

    let ttl = TimeDelta::seconds(i64::try_from(config.ai.cache_ttl_secs).unwrap_or(i64::MAX));
    Ok(SuggestionService::new(Arc::new(backend), quota, clock, ttl))
}

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();

    // Initialize logging before anything else
    let (logging, logging_error) = match logging::init() {
        Ok(ctx) => (Some(ctx), None),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            (None, Some(e.message))
        }
    };
    let session_id = logging
        .as_ref()
        .map(|ctx| ctx.session_id.clone())
        .unwrap_or_else(|| "unknown".to_string());
    let log_directory = logging.as_ref().map(|ctx| ctx.log_directory.clone());

    let loaded_config = config::load_config();
    debug!(
        config_path = %loaded_config.config_path.display(),
        status = ?loaded_config.status,
        "config_loaded"
    );
    if let Some(ctx) = &logging {
        if let Err(e) = ctx.set_level(&loaded_config.config.logging.level) {
            warn!(error = %e, "log_level_rejected");
        }
        logging::cleanup_old_logs(&ctx.log_directory);
    }
    for warning in loaded_config.config.warnings() {
        warn!(warning = %warning, "config_warning");
    }

    let config = &loaded_config.config;
    config
        .ensure_storage_dirs()
        .context("Failed to create storage directories")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let db = Database::open(&config.database_path(), clock.clone()).with_context(|| {
        format!(
            "Failed to open database {}",
            config.database_path().display()
        )
    })?;
    let service = build_service(config, clock)?;
    let runtime = Runtime::new().context("Failed to start async runtime")?;

    let result = match cli.command {
        Some(command) => {
            info!(session_id = %session_id, command = ?command, "command_start");
            let owner = config.owner();
            let ctx = commands::Context {
                db: &db,
                owner: &owner,
                service: &service,
                runtime: &runtime,
            };
            commands::run(command, &ctx, &mut io::stdout().lock())
        }
        None => run_tui(
            session_id.clone(),
            log_directory,
            logging_error,
            loaded_config,
            db,
            Arc::new(service),
            runtime.handle().clone(),
        ),
    };

    info!(
        session_id = %session_id,
        duration_secs = start_time.elapsed().as_secs_f64(),
        "session_end"
    );

    result
}

fn run_tui(
    session_id: String,
    log_directory: Option<PathBuf>,
    logging_error: Option<String>,
    loaded_config: LoadedConfig,
    db: Database,
    service: Arc<SuggestionService>,
    runtime: Handle,
) -> Result<()> {
    let mut app = App::new(
        session_id,
        log_directory,
        loaded_config,
        db,
        service,
        runtime,
    );
    if let Some(e) = logging_error {
        app.notify_error(format!("Logging disabled: {}", e));
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal = Terminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

    let result = run_app(terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;

    result
}

fn run_app(mut terminal: DefaultTerminal, app: &mut App) -> Result<()> {
    loop {
        app.poll_ai();
        app.tick(Instant::now());

        terminal.draw(|f| draw_ui(f, app))?;

        if app.should_quit {
            return Ok(());
        }

        // Short timeout so AI results and the autocomplete debounce are picked up
        if crossterm::event::poll(Duration::from_millis(50))?
            && let Event::Key(key) = crossterm::event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.handle_key(key);
        }
    }
}
