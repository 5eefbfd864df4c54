//! Event demuxer — classifies inbound frames by channel and fans each one
//! out to every matching registered handler, exactly once per event.
//!
//! The push stream is an accelerator, not the source of truth: whenever a
//! per-channel sequence number skips, the demuxer emits a `ChannelGap` and
//! a matching `RefetchRequest` so the CRUD layer can re-sync that resource
//! from the REST API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use bantay_types::channel::ChannelPattern;
use bantay_types::event::{ChannelGap, EventKind, RefetchRequest, ServerEvent};

use crate::error::MalformedEventError;

const GAP_BUS_CAPACITY: usize = 64;

/// A handler registered against a channel pattern.
pub type EventHandler = Arc<dyn Fn(&ServerEvent) + Send + Sync>;

struct Registration {
    id: u64,
    pattern: ChannelPattern,
    handler: EventHandler,
}

struct DemuxInner {
    next_id: u64,
    registrations: Vec<Registration>,
    /// Last seen `server_seq` per channel, for gap detection.
    last_seq: HashMap<String, u64>,
}

pub struct EventDemuxer {
    inner: Arc<Mutex<DemuxInner>>,
    gap_tx: broadcast::Sender<ChannelGap>,
    refetch_tx: broadcast::Sender<RefetchRequest>,
}

impl EventDemuxer {
    pub fn new(refetch_tx: broadcast::Sender<RefetchRequest>) -> Self {
        let (gap_tx, _) = broadcast::channel(GAP_BUS_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(DemuxInner {
                next_id: 0,
                registrations: Vec::new(),
                last_seq: HashMap::new(),
            })),
            gap_tx,
            refetch_tx,
        }
    }

    /// Register a handler for every event whose channel matches `pattern`.
    /// The returned handle must be unregistered on consumer teardown;
    /// removal synchronously stops further invocations.
    pub fn register(
        &self,
        pattern: impl Into<ChannelPattern>,
        handler: EventHandler,
    ) -> SubscriptionHandle {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.registrations.push(Registration {
            id,
            pattern: pattern.into(),
            handler,
        });
        SubscriptionHandle {
            id,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Observe detected sequence gaps.
    pub fn subscribe_gaps(&self) -> broadcast::Receiver<ChannelGap> {
        self.gap_tx.subscribe()
    }

    /// Decode and dispatch one raw frame. A frame that cannot be decoded
    /// is dropped and logged; it never stops the pipeline.
    pub fn dispatch_frame(&self, frame: &str) {
        match decode(frame) {
            Ok(event) => self.dispatch(event),
            Err(e) => warn!("dropping frame: {e}"),
        }
    }

    /// Dispatch an already-decoded event.
    pub fn dispatch(&self, event: ServerEvent) {
        // Heartbeats only prove the link is alive; they are not fanned out
        // and do not participate in gap tracking.
        if event.kind == EventKind::Heartbeat {
            debug!("heartbeat on {}", event.channel);
            return;
        }

        let handlers: Vec<EventHandler> = {
            let mut inner = self.inner.lock().unwrap();

            if let Some(&prev) = inner.last_seq.get(&event.channel) {
                if event.server_seq != prev + 1 {
                    let gap = ChannelGap {
                        channel: event.channel.clone(),
                        from_seq: prev,
                        to_seq: event.server_seq,
                    };
                    warn!(
                        "sequence gap on {}: {} -> {}",
                        gap.channel, gap.from_seq, gap.to_seq
                    );
                    let _ = self.gap_tx.send(gap);
                    let _ = self.refetch_tx.send(RefetchRequest {
                        resource: event.channel.clone(),
                    });
                }
            }
            inner.last_seq.insert(event.channel.clone(), event.server_seq);

            inner
                .registrations
                .iter()
                .filter(|r| r.pattern.matches(&event.channel))
                .map(|r| Arc::clone(&r.handler))
                .collect()
        };

        // Invoke outside the lock so a handler may register or unregister.
        for handler in handlers {
            handler(&event);
        }
    }

    /// Forget per-channel sequence tracking. Called on explicit session
    /// teardown; continuity is deliberately kept across reconnects so that
    /// frames missed while down surface as gaps.
    pub fn reset_sequences(&self) {
        self.inner.lock().unwrap().last_seq.clear();
    }
}

fn decode(frame: &str) -> Result<ServerEvent, MalformedEventError> {
    serde_json::from_str(frame).map_err(|e| MalformedEventError {
        reason: e.to_string(),
    })
}

/// Handle for one `(pattern, handler)` registration.
pub struct SubscriptionHandle {
    id: u64,
    inner: Arc<Mutex<DemuxInner>>,
}

impl SubscriptionHandle {
    /// Remove the registration. No handler invocation happens after this
    /// returns.
    pub fn unregister(self) {
        let mut inner = self.inner.lock().unwrap();
        inner.registrations.retain(|r| r.id != self.id);
    }
}
