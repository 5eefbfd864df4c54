use std::sync::Arc;

use bantay_client::RealtimeClient;
use bantay_types::alert::{Alert, AlertUpdate};
use bantay_types::connection::ConnectionState;

/// Main application state. Everything here is a read model over the
/// realtime client; mutations go back through the client's methods.
pub struct App {
    pub client: Arc<RealtimeClient>,
    pub should_quit: bool,

    // Read models refreshed from client snapshots
    pub connection: ConnectionState,
    pub alerts: Vec<Alert>,

    // Panel state
    pub cursor: usize,
    pub show_help: bool,

    // Broadcast composer overlay (visibility lives in the shared
    // notification store so other surfaces see the same flag)
    pub composer_input: String,

    /// One-line transient note shown in the footer (last alert, chime).
    pub status_line: String,
}

impl App {
    pub fn new(client: Arc<RealtimeClient>) -> Self {
        let connection = client.connection_state();
        let alerts = client.alerts();
        Self {
            client,
            should_quit: false,
            connection,
            alerts,
            cursor: 0,
            show_help: false,
            composer_input: String::new(),
            status_line: String::new(),
        }
    }

    pub fn refresh_alerts(&mut self) {
        self.alerts = self.client.alerts();
        if self.cursor >= self.alerts.len() {
            self.cursor = self.alerts.len().saturating_sub(1);
        }
    }

    pub fn handle_alert_update(&mut self, update: AlertUpdate) {
        match &update {
            AlertUpdate::Created { alert, chime } | AlertUpdate::Replaced { alert, chime } => {
                let bell = if *chime { "\u{7}" } else { "" };
                self.status_line = format!("{bell}[{}] {}", alert.severity, alert.title);
            }
            AlertUpdate::Dismissed { .. } => {}
            AlertUpdate::Cleared => self.status_line = "All alerts dismissed".to_string(),
        }
        self.refresh_alerts();
    }

    pub fn handle_connection_change(&mut self, state: ConnectionState) {
        self.connection = state;
    }

    pub fn selected_alert(&self) -> Option<&Alert> {
        self.alerts.get(self.cursor)
    }

    pub fn composer_open(&self) -> bool {
        self.client.notifications().is_composer_open()
    }
}
