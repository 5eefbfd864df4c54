pub mod app;
pub mod event;
pub mod ui;

use std::sync::Arc;

use anyhow::{Context, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing::info;

use bantay_client::{config, RealtimeClient};

use app::App;
use event::EventHandler;

/// Run the dispatch console. Call this from main or from the
/// `bantay tui` subcommand.
pub async fn run() -> Result<()> {
    let cfg = config::load_config().context("Failed to load config")?;

    let client = Arc::new(RealtimeClient::new(cfg));
    let event_handler = EventHandler::new(client.subscribe_alerts(), client.subscribe_connection());
    client.connect();
    info!("realtime client started");

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(Arc::clone(&client));

    // Main loop
    let result = run_loop(&mut terminal, &mut app, &event_handler).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // Session teardown: closes the link and cancels pending timers
    client.disconnect().await;

    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
    event_handler: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::render(f, app))?;
        event_handler.handle(app).await?;
        if app.should_quit {
            return Ok(());
        }
    }
}
