use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::broadcast;
use tracing::warn;

use bantay_types::alert::AlertUpdate;
use bantay_types::connection::ConnectionState;

use crate::app::App;

pub struct EventHandler {
    alert_rx: tokio::sync::Mutex<broadcast::Receiver<AlertUpdate>>,
    conn_rx: tokio::sync::Mutex<broadcast::Receiver<ConnectionState>>,
}

impl EventHandler {
    pub fn new(
        alert_rx: broadcast::Receiver<AlertUpdate>,
        conn_rx: broadcast::Receiver<ConnectionState>,
    ) -> Self {
        Self {
            alert_rx: tokio::sync::Mutex::new(alert_rx),
            conn_rx: tokio::sync::Mutex::new(conn_rx),
        }
    }

    /// Poll for terminal input and realtime events.
    /// Called once per frame from the main loop.
    pub async fn handle(&self, app: &mut App) -> Result<()> {
        // Drain all available alert updates (non-blocking)
        {
            let mut rx = self.alert_rx.lock().await;
            loop {
                match rx.try_recv() {
                    Ok(update) => app.handle_alert_update(update),
                    Err(broadcast::error::TryRecvError::Empty) => break,
                    Err(broadcast::error::TryRecvError::Lagged(n)) => {
                        warn!("Alert feed lagged by {n} updates");
                        app.refresh_alerts();
                    }
                    Err(broadcast::error::TryRecvError::Closed) => break,
                }
            }
        }

        // Drain connection-state transitions
        {
            let mut rx = self.conn_rx.lock().await;
            loop {
                match rx.try_recv() {
                    Ok(state) => app.handle_connection_change(state),
                    Err(broadcast::error::TryRecvError::Empty) => break,
                    Err(broadcast::error::TryRecvError::Lagged(_)) => {
                        app.handle_connection_change(app.client.connection_state());
                    }
                    Err(broadcast::error::TryRecvError::Closed) => break,
                }
            }
        }

        // Poll for terminal input with a short timeout so realtime events
        // keep draining while idle
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events — ignore release/repeat
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key);
                }
            }
        }

        Ok(())
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global quit
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    // Composer overlay captures keystrokes while open
    if app.composer_open() {
        handle_composer_key(app, key);
        return;
    }

    if app.show_help {
        // Any key dismisses help
        app.show_help = false;
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Up | KeyCode::Char('k') => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if !app.alerts.is_empty() {
                app.cursor = (app.cursor + 1).min(app.alerts.len() - 1);
            }
        }
        KeyCode::Enter | KeyCode::Char('d') => {
            if let Some(alert) = app.selected_alert() {
                let id = alert.id.clone();
                app.client.dismiss_alert(&id);
                app.refresh_alerts();
            }
        }
        KeyCode::Char('D') => {
            app.client.dismiss_all_alerts();
            app.refresh_alerts();
        }
        KeyCode::Char('s') => {
            let enabled = !app.client.sound_enabled();
            app.client.set_sound_enabled(enabled);
            app.status_line = if enabled {
                "Sound on".to_string()
            } else {
                "Sound muted".to_string()
            };
        }
        KeyCode::Char('b') => {
            app.composer_input.clear();
            app.client.notifications().open_composer();
        }
        KeyCode::Char('r') => {
            // Manual retry; a no-op unless Disconnected or Failed
            app.client.connect();
        }
        _ => {}
    }
}

fn handle_composer_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.client.notifications().close_composer();
            app.composer_input.clear();
        }
        KeyCode::Enter => {
            // Delivery belongs to the dispatch REST layer, not this core
            app.status_line = format!("Broadcast queued: {}", app.composer_input.trim());
            app.client.notifications().close_composer();
            app.composer_input.clear();
        }
        KeyCode::Char(c) => app.composer_input.push(c),
        KeyCode::Backspace => {
            app.composer_input.pop();
        }
        _ => {}
    }
}
