//! Connection manager — exclusive owner of the realtime transport link,
//! with a serialized connection-lifecycle state machine and exponential
//! backoff reconnection.
//!
//! State lives behind one mutex and every transition is broadcast while the
//! lock is held, so listeners observe each transition exactly once, in
//! order, and never re-entrantly.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use bantay_types::config::RealtimeConfig;
use bantay_types::connection::ConnectionState;
use bantay_types::event::RefetchRequest;

use crate::demux::EventDemuxer;
use crate::transport::Transport;

const STATE_BUS_CAPACITY: usize = 64;

struct Shared {
    state: Mutex<ConnectionState>,
    state_tx: broadcast::Sender<ConnectionState>,
}

impl Shared {
    fn transition(&self, next: ConnectionState) {
        let mut state = self.state.lock().unwrap();
        if *state == next {
            return;
        }
        debug!("connection: {} -> {next}", *state);
        *state = next;
        let _ = self.state_tx.send(next);
    }
}

struct RunHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

pub struct ConnectionManager {
    shared: Arc<Shared>,
    transport: Arc<dyn Transport>,
    config: RealtimeConfig,
    demux: Arc<EventDemuxer>,
    refetch_tx: broadcast::Sender<RefetchRequest>,
    run: Mutex<Option<RunHandle>>,
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        config: RealtimeConfig,
        demux: Arc<EventDemuxer>,
        refetch_tx: broadcast::Sender<RefetchRequest>,
    ) -> Self {
        let (state_tx, _) = broadcast::channel(STATE_BUS_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ConnectionState::Disconnected),
                state_tx,
            }),
            transport,
            config,
            demux,
            refetch_tx,
            run: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock().unwrap()
    }

    /// Every state transition, in order. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Start the supervisor task. Idempotent: a no-op while the connection
    /// is already connecting, connected, or reconnecting.
    pub fn connect(&self, url: &str, auth_token: Option<String>) {
        {
            let mut state = self.shared.state.lock().unwrap();
            if state.is_active() {
                debug!("connect() ignored, already {}", *state);
                return;
            }
            *state = ConnectionState::Connecting;
            let _ = self.shared.state_tx.send(ConnectionState::Connecting);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(supervise(
            Arc::clone(&self.shared),
            Arc::clone(&self.transport),
            self.config.clone(),
            Arc::clone(&self.demux),
            self.refetch_tx.clone(),
            url.to_string(),
            auth_token,
            stop_rx,
        ));
        *self.run.lock().unwrap() = Some(RunHandle {
            stop: stop_tx,
            task,
        });
    }

    /// Explicit teardown: cancels any pending reconnect timer, closes the
    /// link, and settles in `Disconnected`.
    pub async fn disconnect(&self) {
        let handle = self.run.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.stop.send(true);
            let _ = handle.task.await;
        }
        // The supervisor transitions on cancellation; this covers teardown
        // from Failed or when nothing was running.
        self.shared.transition(ConnectionState::Disconnected);
    }
}

/// Owns the link for the lifetime of one `connect()` call: handshake, read
/// loop, heartbeat watchdog, and reconnection with backoff.
#[allow(clippy::too_many_arguments)]
async fn supervise(
    shared: Arc<Shared>,
    transport: Arc<dyn Transport>,
    config: RealtimeConfig,
    demux: Arc<EventDemuxer>,
    refetch_tx: broadcast::Sender<RefetchRequest>,
    url: String,
    auth_token: Option<String>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let heartbeat_timeout = config.heartbeat_timeout();
    let mut attempt: u32 = 0;
    let mut first_link = true;

    loop {
        let connected = tokio::select! {
            _ = stop_rx.changed() => {
                shared.transition(ConnectionState::Disconnected);
                return;
            }
            result = transport.connect(&url, auth_token.as_deref()) => result,
        };

        match connected {
            Ok(mut link) => {
                attempt = 0;
                shared.transition(ConnectionState::Connected);
                info!("realtime link up: {url}");

                if first_link {
                    // Initial mount: the CRUD layer loads everything once;
                    // afterwards, sequence gaps drive targeted refetches.
                    let _ = refetch_tx.send(RefetchRequest {
                        resource: "*".to_string(),
                    });
                    first_link = false;
                }

                loop {
                    let frame = tokio::select! {
                        _ = stop_rx.changed() => {
                            shared.transition(ConnectionState::Disconnected);
                            return;
                        }
                        frame = tokio::time::timeout(heartbeat_timeout, link.recv()) => frame,
                    };
                    match frame {
                        // No frame of any kind within the window: the link
                        // is silently hung, reconnect even though the
                        // transport reported nothing.
                        Err(_) => {
                            warn!(
                                "no frame for {}s, treating link as dead",
                                heartbeat_timeout.as_secs()
                            );
                            break;
                        }
                        Ok(Ok(Some(frame))) => demux.dispatch_frame(&frame),
                        Ok(Ok(None)) => {
                            info!("server closed the realtime link");
                            break;
                        }
                        Ok(Err(e)) => {
                            warn!("realtime link dropped: {e}");
                            break;
                        }
                    }
                }
            }
            Err(e) => warn!("connect to {url} failed: {e}"),
        }

        attempt += 1;
        if let Some(cap) = config.max_attempts {
            if attempt > cap {
                warn!("giving up after {cap} reconnect attempts");
                shared.transition(ConnectionState::Failed);
                return;
            }
        }
        shared.transition(ConnectionState::Reconnecting);

        let delay = backoff_delay(&config, attempt - 1);
        debug!("reconnect attempt {attempt} in {}ms", delay.as_millis());
        tokio::select! {
            _ = stop_rx.changed() => {
                shared.transition(ConnectionState::Disconnected);
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// `min(max_delay, base_delay * 2^attempt)` with 0.5–1.5x jitter.
fn backoff_delay(config: &RealtimeConfig, attempt: u32) -> Duration {
    let exp = config
        .base_delay_ms
        .saturating_mul(2u64.saturating_pow(attempt.min(16)));
    let capped = exp.min(config.max_delay_ms) as f64;
    let jitter = rand::thread_rng().gen_range(0.5..1.5);
    Duration::from_millis((capped * jitter) as u64)
}
