pub mod alerts;
pub mod config;
pub mod connection;
pub mod demux;
pub mod error;
pub mod notify;
pub mod transport;

pub use alerts::AlertAggregator;
pub use connection::ConnectionManager;
pub use demux::{EventDemuxer, EventHandler, SubscriptionHandle};
pub use notify::NotificationStore;
pub use transport::{TcpTransport, Transport, TransportLink};

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use bantay_types::alert::{Alert, AlertUpdate};
use bantay_types::channel::ChannelPattern;
use bantay_types::config::BantayConfig;
use bantay_types::connection::ConnectionState;
use bantay_types::event::{ChannelGap, RefetchRequest};

const REFETCH_BUS_CAPACITY: usize = 64;

/// The realtime core — wires the connection manager, event demuxer, alert
/// aggregator, and notification store into one session-scoped client.
/// Presentation surfaces hold an `Arc<RealtimeClient>` and observe it; they
/// mutate only through the methods here.
pub struct RealtimeClient {
    config: BantayConfig,
    connection: ConnectionManager,
    demux: Arc<EventDemuxer>,
    alerts: Arc<AlertAggregator>,
    notifications: NotificationStore,
    refetch_tx: broadcast::Sender<RefetchRequest>,
    /// Keeps the aggregator fed for the lifetime of the client.
    _alert_feed: SubscriptionHandle,
}

impl RealtimeClient {
    /// Production client over TCP.
    pub fn new(config: BantayConfig) -> Self {
        Self::with_transport(config, Arc::new(TcpTransport))
    }

    /// Client over any transport; tests inject scripted ones.
    pub fn with_transport(config: BantayConfig, transport: Arc<dyn Transport>) -> Self {
        let (refetch_tx, _) = broadcast::channel(REFETCH_BUS_CAPACITY);
        let demux = Arc::new(EventDemuxer::new(refetch_tx.clone()));
        let alerts = Arc::new(AlertAggregator::new(config.realtime.max_alerts));

        // The aggregator is just another demux consumer, registered before
        // any frame can arrive.
        let feed = {
            let alerts = Arc::clone(&alerts);
            demux.register(
                ChannelPattern::any(),
                Arc::new(move |event| {
                    alerts.ingest(event);
                }),
            )
        };

        let connection = ConnectionManager::new(
            transport,
            config.realtime.clone(),
            Arc::clone(&demux),
            refetch_tx.clone(),
        );

        Self {
            config,
            connection,
            demux,
            alerts,
            notifications: NotificationStore::new(),
            refetch_tx,
            _alert_feed: feed,
        }
    }

    // ─── Connection lifecycle ─────────────────────────────────────────────

    /// Open the realtime link using the configured URL. The token comes
    /// from the `BANTAY_TOKEN` env var first, then config. Idempotent.
    pub fn connect(&self) {
        let token = std::env::var("BANTAY_TOKEN")
            .ok()
            .or_else(|| self.config.server.auth_token.clone());
        self.connection.connect(&self.config.server.url, token);
    }

    /// Session teardown: close the link, cancel timers, forget sequence
    /// continuity. Alert state stays until the client itself is dropped.
    pub async fn disconnect(&self) {
        self.connection.disconnect().await;
        self.demux.reset_sequences();
        info!("realtime session closed");
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn subscribe_connection(&self) -> broadcast::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    // ─── Demux surface for the CRUD collaborator ──────────────────────────

    /// Register an event handler (cache invalidation, list refreshes).
    /// Unregister the handle on surface teardown.
    pub fn register(
        &self,
        pattern: impl Into<ChannelPattern>,
        handler: EventHandler,
    ) -> SubscriptionHandle {
        self.demux.register(pattern, handler)
    }

    pub fn subscribe_gaps(&self) -> broadcast::Receiver<ChannelGap> {
        self.demux.subscribe_gaps()
    }

    /// Refetch signals: `*` on initial mount, then one per detected gap.
    pub fn subscribe_refetch(&self) -> broadcast::Receiver<RefetchRequest> {
        self.refetch_tx.subscribe()
    }

    // ─── Alerts ───────────────────────────────────────────────────────────

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.alerts()
    }

    pub fn urgent_alert_count(&self) -> usize {
        self.alerts.urgent_count()
    }

    pub fn subscribe_alerts(&self) -> broadcast::Receiver<AlertUpdate> {
        self.alerts.subscribe()
    }

    pub fn dismiss_alert(&self, alert_id: &str) {
        self.alerts.dismiss(alert_id);
    }

    pub fn dismiss_all_alerts(&self) {
        self.alerts.dismiss_all();
    }

    pub fn set_sound_enabled(&self, enabled: bool) {
        self.alerts.set_sound_enabled(enabled);
    }

    pub fn sound_enabled(&self) -> bool {
        self.alerts.sound_enabled()
    }

    // ─── Shared UI flags ──────────────────────────────────────────────────

    pub fn notifications(&self) -> &NotificationStore {
        &self.notifications
    }

    pub fn config(&self) -> &BantayConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    use crate::error::TransportError;

    /// Transport whose single link replays a fixed frame script.
    struct ReplayTransport {
        frames: Mutex<Vec<String>>,
        /// Keeps the link open after the script is exhausted.
        hold: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    }

    struct ReplayLink {
        frames: Vec<String>,
        hold: Option<mpsc::UnboundedReceiver<String>>,
    }

    #[async_trait]
    impl Transport for ReplayTransport {
        async fn connect(
            &self,
            _url: &str,
            _auth_token: Option<&str>,
        ) -> Result<Box<dyn TransportLink>, TransportError> {
            let mut frames = self.frames.lock().unwrap().clone();
            frames.reverse();
            Ok(Box::new(ReplayLink {
                frames,
                hold: self.hold.lock().unwrap().take(),
            }))
        }
    }

    #[async_trait]
    impl TransportLink for ReplayLink {
        async fn recv(&mut self) -> Result<Option<String>, TransportError> {
            if let Some(frame) = self.frames.pop() {
                return Ok(Some(frame));
            }
            match self.hold.as_mut() {
                Some(rx) => Ok(rx.recv().await),
                None => Ok(None),
            }
        }

        async fn send(&mut self, _frame: &str) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn frame(kind: &str, channel: &str, seq: u64, payload: serde_json::Value) -> String {
        serde_json::json!({
            "kind": kind,
            "channel": channel,
            "payload": payload,
            "serverSeq": seq,
            "timestamp": "2026-08-01T03:20:00Z",
        })
        .to_string()
    }

    #[tokio::test]
    async fn end_to_end_frames_become_alerts() {
        let (_hold_tx, hold_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(ReplayTransport {
            frames: Mutex::new(vec![
                frame(
                    "IncidentCreated",
                    "incidents.7",
                    1,
                    serde_json::json!({ "id": "7", "priority": "CRITICAL", "summary": "Vehicular collision" }),
                ),
                "this is not a frame".to_string(),
                frame(
                    "BroadcastMessage",
                    "broadcasts",
                    1,
                    serde_json::json!({ "message": "Shift change 18:00", "urgent": false }),
                ),
            ]),
            hold: Mutex::new(Some(hold_rx)),
        });

        let client = RealtimeClient::with_transport(BantayConfig::default(), transport);
        let mut updates = client.subscribe_alerts();

        client.connect();

        // Two alert-worthy frames; the malformed one is dropped in between.
        let first = tokio::time::timeout(Duration::from_secs(5), updates.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(first, AlertUpdate::Created { .. }));
        let second = tokio::time::timeout(Duration::from_secs(5), updates.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(second, AlertUpdate::Created { .. }));

        let list = client.alerts();
        assert_eq!(list.len(), 2);
        // Critical incident sorts above the info broadcast
        assert_eq!(list[0].incident_id.as_deref(), Some("7"));
        assert_eq!(client.urgent_alert_count(), 1);

        client.dismiss_all_alerts();
        assert!(client.alerts().is_empty());

        client.disconnect().await;
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn composer_flag_roundtrip() {
        let (_hold_tx, hold_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(ReplayTransport {
            frames: Mutex::new(vec![]),
            hold: Mutex::new(Some(hold_rx)),
        });
        let client = RealtimeClient::with_transport(BantayConfig::default(), transport);

        assert!(!client.notifications().is_composer_open());
        client.notifications().open_composer();
        assert!(client.notifications().is_composer_open());
        client.notifications().close_composer();
        assert!(!client.notifications().is_composer_open());
    }
}
