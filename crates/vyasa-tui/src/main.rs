use std::time::Duration;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use vyasa_core::Config;

mod app;
mod handler;
mod palette;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

const DEFAULT_LOG_FILTER: &str = "vyasa=info,vyasa_core=info";

/// Log to a file next to the config; the terminal belongs to the UI.
/// The guard must live until exit so buffered lines get flushed.
fn init_logging() -> Option<WorkerGuard> {
    let dir = Config::config_dir().ok()?;
    std::fs::create_dir_all(&dir).ok()?;

    let file_appender = tracing_appender::rolling::never(&dir, "vyasa.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_env_filter(filter)
        .init();

    Some(guard)
}

async fn run(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(250));

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event);
        app.poll_query_task().await;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_logging();
    tracing::info!("Starting Veda Vyasa AI v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });

    let mut app = App::new(&config);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let res = run(&mut terminal, &mut app).await;

    tui::restore()?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        tracing::error!("Exited with error: {:?}", err);
    }
    res
}
