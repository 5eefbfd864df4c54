//! Alert aggregator — turns push events into the deduplicated, ordered
//! list of notifications a dispatcher sees.
//!
//! Invariants enforced here, never by UI code:
//! - at most one live alert per source event id
//! - at most one live alert per incident for escalation-class alerts
//!   (a new escalation replaces the old alert)
//! - list order is always (severity rank desc, timestamp desc)

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::warn;

use bantay_types::alert::{Alert, AlertSeverity, AlertUpdate};
use bantay_types::event::{
    BroadcastPayload, EventKind, IncidentPayload, IncidentPriority, PersonnelPayload, ServerEvent,
};

const UPDATE_BUS_CAPACITY: usize = 256;

struct AggregatorInner {
    /// Live alerts, kept sorted (severity rank desc, timestamp desc).
    alerts: Vec<Alert>,
    /// Every source event id ever ingested this session, live or not.
    /// Dedup survives dismissal: re-delivered frames stay no-ops.
    seen_sources: HashSet<String>,
    /// incident id -> live alert id, for escalation replacement.
    incident_alerts: HashMap<String, String>,
    sound_enabled: bool,
}

pub struct AlertAggregator {
    inner: Mutex<AggregatorInner>,
    update_tx: broadcast::Sender<AlertUpdate>,
    /// Optional cap on the live list; eviction is lowest-severity-oldest
    /// first so an event storm cannot stall rendering.
    max_alerts: Option<usize>,
}

impl AlertAggregator {
    pub fn new(max_alerts: Option<usize>) -> Self {
        let (update_tx, _) = broadcast::channel(UPDATE_BUS_CAPACITY);
        Self {
            inner: Mutex::new(AggregatorInner {
                alerts: Vec::new(),
                seen_sources: HashSet::new(),
                incident_alerts: HashMap::new(),
                sound_enabled: true,
            }),
            update_tx,
            max_alerts,
        }
    }

    /// Subscribe to list-change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<AlertUpdate> {
        self.update_tx.subscribe()
    }

    /// Ingest one push event. Returns the created alert, or `None` for
    /// events that do not map to a human-facing alert or are duplicates.
    pub fn ingest(&self, event: &ServerEvent) -> Option<Alert> {
        let draft = map_event(event)?;
        let source_id = event.source_event_id();

        let mut inner = self.inner.lock().unwrap();
        if !inner.seen_sources.insert(source_id.clone()) {
            return None;
        }

        let alert = Alert {
            id: Alert::id_for(&source_id),
            severity: draft.severity,
            title: draft.title,
            message: draft.message,
            timestamp: event.timestamp,
            source_event_id: source_id,
            incident_id: draft.incident_id.clone(),
            action_url: draft.action_url,
            dismissed: false,
        };

        // A new alert for an incident that already has a live one replaces
        // it; the replacement surfaces as newest.
        let mut replaced_old: Option<String> = None;
        if let Some(incident_id) = &draft.incident_id {
            if let Some(old_id) = inner.incident_alerts.remove(incident_id) {
                inner.alerts.retain(|a| a.id != old_id);
                replaced_old = Some(old_id);
            }
            inner
                .incident_alerts
                .insert(incident_id.clone(), alert.id.clone());
        }

        inner.alerts.push(alert.clone());
        sort_alerts(&mut inner.alerts);

        let mut newcomer_evicted = false;
        if let Some(cap) = self.max_alerts {
            while inner.alerts.len() > cap {
                // Sorted desc, so the tail is the lowest-severity oldest.
                if let Some(evicted) = inner.alerts.pop() {
                    if let Some(incident_id) = &evicted.incident_id {
                        inner.incident_alerts.remove(incident_id);
                    }
                    newcomer_evicted |= evicted.id == alert.id;
                }
            }
        }

        // The newcomer itself can be the sorted tail when the list is full
        // of higher-ranked alerts. It never existed for subscribers, so
        // nothing is announced and nothing chimes.
        if newcomer_evicted {
            if let Some(old_id) = replaced_old {
                let _ = self.update_tx.send(AlertUpdate::Dismissed { id: old_id });
            }
            return None;
        }

        // Sound gating is decided at creation time; toggling later must not
        // affect alerts that already exist.
        let chime = inner.sound_enabled && alert.severity.is_audible();
        let update = if replaced_old.is_some() {
            AlertUpdate::Replaced {
                alert: alert.clone(),
                chime,
            }
        } else {
            AlertUpdate::Created {
                alert: alert.clone(),
                chime,
            }
        };
        let _ = self.update_tx.send(update);

        Some(alert)
    }

    /// Snapshot of the live list, ordered for display.
    pub fn alerts(&self) -> Vec<Alert> {
        self.inner.lock().unwrap().alerts.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count of live alerts at or above Warning, for the header badge.
    pub fn urgent_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap()
            .alerts
            .iter()
            .filter(|a| a.severity >= AlertSeverity::Warning)
            .count()
    }

    /// Remove one alert. Idempotent: dismissing an unknown id is a no-op.
    pub fn dismiss(&self, alert_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.alerts.len();
        inner.alerts.retain(|a| a.id != alert_id);
        if inner.alerts.len() == before {
            return;
        }
        inner.incident_alerts.retain(|_, id| id.as_str() != alert_id);
        let _ = self.update_tx.send(AlertUpdate::Dismissed {
            id: alert_id.to_string(),
        });
    }

    /// "Mark all read."
    pub fn dismiss_all(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.alerts.is_empty() {
            return;
        }
        inner.alerts.clear();
        inner.incident_alerts.clear();
        let _ = self.update_tx.send(AlertUpdate::Cleared);
    }

    pub fn set_sound_enabled(&self, enabled: bool) {
        self.inner.lock().unwrap().sound_enabled = enabled;
    }

    pub fn sound_enabled(&self) -> bool {
        self.inner.lock().unwrap().sound_enabled
    }
}

fn sort_alerts(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(b.timestamp.cmp(&a.timestamp))
    });
}

struct AlertDraft {
    severity: AlertSeverity,
    title: String,
    message: String,
    incident_id: Option<String>,
    action_url: Option<String>,
}

/// Fixed severity policy — not configurable per user.
fn map_event(event: &ServerEvent) -> Option<AlertDraft> {
    match event.kind {
        EventKind::Heartbeat | EventKind::IncidentUpdated => None,
        EventKind::IncidentCreated => {
            let payload: IncidentPayload = parse_payload(event)?;
            let message = match &payload.barangay {
                Some(b) => format!("{} — {b}", payload.summary),
                None => payload.summary.clone(),
            };
            Some(AlertDraft {
                severity: priority_severity(payload.priority),
                title: "New incident".to_string(),
                message,
                action_url: Some(format!("/incidents/{}", payload.id)),
                incident_id: Some(payload.id),
            })
        }
        EventKind::IncidentEscalated => {
            let payload: IncidentPayload = parse_payload(event)?;
            Some(AlertDraft {
                severity: priority_severity(payload.priority),
                title: format!("Incident escalated to {:?}", payload.priority),
                message: payload.summary.clone(),
                action_url: Some(format!("/incidents/{}", payload.id)),
                incident_id: Some(payload.id),
            })
        }
        EventKind::PersonnelStatusChanged => {
            let payload: PersonnelPayload = parse_payload(event)?;
            if !payload.status.is_emergency() {
                return None;
            }
            Some(AlertDraft {
                severity: AlertSeverity::Critical,
                title: "Personnel emergency".to_string(),
                message: format!("{} requests assistance", payload.name),
                action_url: Some(format!("/personnel/{}", payload.id)),
                incident_id: None,
            })
        }
        EventKind::BroadcastMessage => {
            let payload: BroadcastPayload = parse_payload(event)?;
            let title = match &payload.sender {
                Some(sender) => format!("Broadcast from {sender}"),
                None => "Broadcast".to_string(),
            };
            Some(AlertDraft {
                severity: if payload.urgent {
                    AlertSeverity::Critical
                } else {
                    AlertSeverity::Info
                },
                title,
                message: payload.message,
                incident_id: None,
                action_url: None,
            })
        }
    }
}

fn priority_severity(priority: IncidentPriority) -> AlertSeverity {
    match priority {
        IncidentPriority::Critical => AlertSeverity::Critical,
        IncidentPriority::High => AlertSeverity::Warning,
        IncidentPriority::Low | IncidentPriority::Medium => AlertSeverity::Info,
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(event: &ServerEvent) -> Option<T> {
    match serde_json::from_value(event.payload.clone()) {
        Ok(payload) => Some(payload),
        Err(e) => {
            // Frame-isolated: a bad payload downgrades to "not alert-worthy".
            warn!("undecodable {:?} payload on {}: {e}", event.kind, event.channel);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn incident_created(seq: u64, id: &str, priority: &str, at_secs: i64) -> ServerEvent {
        ServerEvent {
            kind: EventKind::IncidentCreated,
            channel: format!("incidents.{id}"),
            payload: json!({ "id": id, "priority": priority, "summary": "Structure fire" }),
            server_seq: seq,
            timestamp: Utc.timestamp_opt(at_secs, 0).unwrap(),
        }
    }

    fn escalation(seq: u64, id: &str, priority: &str, at_secs: i64) -> ServerEvent {
        ServerEvent {
            kind: EventKind::IncidentEscalated,
            channel: format!("incidents.{id}"),
            payload: json!({ "id": id, "priority": priority, "summary": "Structure fire" }),
            server_seq: seq,
            timestamp: Utc.timestamp_opt(at_secs, 0).unwrap(),
        }
    }

    fn broadcast(seq: u64, urgent: bool, at_secs: i64) -> ServerEvent {
        ServerEvent {
            kind: EventKind::BroadcastMessage,
            channel: "broadcasts".to_string(),
            payload: json!({ "message": "Typhoon signal raised", "urgent": urgent }),
            server_seq: seq,
            timestamp: Utc.timestamp_opt(at_secs, 0).unwrap(),
        }
    }

    #[test]
    fn live_count_matches_alert_mapped_events() {
        let agg = AlertAggregator::new(None);
        assert!(agg.ingest(&incident_created(1, "1", "LOW", 10)).is_some());
        assert!(agg.ingest(&broadcast(2, false, 11)).is_some());

        // Not alert-worthy: routine update and heartbeat
        let mut update = incident_created(3, "1", "LOW", 12);
        update.kind = EventKind::IncidentUpdated;
        assert!(agg.ingest(&update).is_none());
        let hb = ServerEvent {
            kind: EventKind::Heartbeat,
            channel: "system".to_string(),
            payload: serde_json::Value::Null,
            server_seq: 4,
            timestamp: Utc::now(),
        };
        assert!(agg.ingest(&hb).is_none());

        assert_eq!(agg.len(), 2);
    }

    #[test]
    fn double_ingest_same_source_is_idempotent() {
        let agg = AlertAggregator::new(None);
        let event = incident_created(1, "1", "HIGH", 10);
        assert!(agg.ingest(&event).is_some());
        assert!(agg.ingest(&event).is_none());
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn dedup_survives_dismissal() {
        let agg = AlertAggregator::new(None);
        let event = incident_created(1, "1", "HIGH", 10);
        let alert = agg.ingest(&event).unwrap();
        agg.dismiss(&alert.id);
        assert!(agg.ingest(&event).is_none());
        assert!(agg.is_empty());
    }

    #[test]
    fn severity_outranks_recency() {
        let agg = AlertAggregator::new(None);
        // warning at t=1, critical at t=5
        agg.ingest(&incident_created(1, "w", "HIGH", 1)).unwrap();
        agg.ingest(&incident_created(1, "c", "CRITICAL", 5)).unwrap();

        let list = agg.alerts();
        assert_eq!(list[0].severity, AlertSeverity::Critical);
        assert_eq!(list[1].severity, AlertSeverity::Warning);

        // And recency breaks ties within a severity
        agg.ingest(&incident_created(1, "w2", "HIGH", 9)).unwrap();
        let list = agg.alerts();
        assert_eq!(list[1].incident_id.as_deref(), Some("w2"));
        assert_eq!(list[2].incident_id.as_deref(), Some("w"));
    }

    #[test]
    fn escalation_replaces_live_incident_alert() {
        let agg = AlertAggregator::new(None);
        agg.ingest(&incident_created(1, "x", "HIGH", 10)).unwrap();
        agg.ingest(&escalation(2, "x", "CRITICAL", 20)).unwrap();

        let list = agg.alerts();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].severity, AlertSeverity::Critical);
        assert_eq!(list[0].incident_id.as_deref(), Some("x"));
    }

    #[test]
    fn escalation_replacement_is_surfaced_as_replaced() {
        let agg = AlertAggregator::new(None);
        let mut rx = agg.subscribe();
        agg.ingest(&incident_created(1, "x", "HIGH", 10)).unwrap();
        agg.ingest(&escalation(2, "x", "CRITICAL", 20)).unwrap();

        assert!(matches!(rx.try_recv().unwrap(), AlertUpdate::Created { .. }));
        match rx.try_recv().unwrap() {
            AlertUpdate::Replaced { alert, .. } => {
                assert_eq!(alert.severity, AlertSeverity::Critical)
            }
            other => panic!("expected Replaced, got {other:?}"),
        }
    }

    #[test]
    fn dismiss_is_idempotent() {
        let agg = AlertAggregator::new(None);
        let alert = agg.ingest(&incident_created(1, "1", "LOW", 10)).unwrap();
        let mut rx = agg.subscribe();

        agg.dismiss(&alert.id);
        agg.dismiss(&alert.id);
        agg.dismiss("alert-never-existed");

        assert!(agg.is_empty());
        assert!(matches!(
            rx.try_recv().unwrap(),
            AlertUpdate::Dismissed { .. }
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dismiss_all_clears() {
        let agg = AlertAggregator::new(None);
        agg.ingest(&incident_created(1, "1", "LOW", 10)).unwrap();
        agg.ingest(&broadcast(2, true, 11)).unwrap();
        agg.dismiss_all();
        assert!(agg.is_empty());

        // After a clear, a dismissed incident may alert again on escalation
        agg.ingest(&escalation(3, "1", "CRITICAL", 12)).unwrap();
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn cap_evicts_lowest_severity_oldest_first() {
        let agg = AlertAggregator::new(Some(2));
        agg.ingest(&broadcast(1, false, 10)).unwrap(); // info, oldest
        agg.ingest(&incident_created(2, "a", "HIGH", 20)).unwrap();
        agg.ingest(&incident_created(3, "b", "CRITICAL", 30)).unwrap();

        let list = agg.alerts();
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|a| a.severity >= AlertSeverity::Warning));
    }

    #[test]
    fn newcomer_below_the_live_floor_is_not_announced() {
        let agg = AlertAggregator::new(Some(1));
        agg.ingest(&incident_created(1, "c", "CRITICAL", 10)).unwrap();
        let mut rx = agg.subscribe();

        // A full list of higher-ranked alerts squeezes the newcomer out in
        // the same call; no snapshot change, so no toast and no chime.
        assert!(agg.ingest(&broadcast(2, false, 20)).is_none());
        assert!(rx.try_recv().is_err());

        let list = agg.alerts();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn personnel_emergency_maps_to_critical() {
        let agg = AlertAggregator::new(None);
        let event = ServerEvent {
            kind: EventKind::PersonnelStatusChanged,
            channel: "personnel.9".to_string(),
            payload: json!({ "id": "9", "name": "Cpl. Reyes", "status": "needs_assistance" }),
            server_seq: 1,
            timestamp: Utc::now(),
        };
        let alert = agg.ingest(&event).unwrap();
        assert_eq!(alert.severity, AlertSeverity::Critical);

        // Routine status churn is not an alert
        let event = ServerEvent {
            kind: EventKind::PersonnelStatusChanged,
            channel: "personnel.9".to_string(),
            payload: json!({ "id": "9", "name": "Cpl. Reyes", "status": "dispatched" }),
            server_seq: 2,
            timestamp: Utc::now(),
        };
        assert!(agg.ingest(&event).is_none());
    }

    #[test]
    fn creation_severity_follows_priority() {
        let agg = AlertAggregator::new(None);
        let info = agg.ingest(&incident_created(1, "1", "MEDIUM", 1)).unwrap();
        let warning = agg.ingest(&incident_created(1, "2", "HIGH", 2)).unwrap();
        let critical = agg.ingest(&incident_created(1, "3", "CRITICAL", 3)).unwrap();
        assert_eq!(info.severity, AlertSeverity::Info);
        assert_eq!(warning.severity, AlertSeverity::Warning);
        assert_eq!(critical.severity, AlertSeverity::Critical);
    }

    #[test]
    fn sound_toggle_gates_new_chimes_only() {
        let agg = AlertAggregator::new(None);
        let mut rx = agg.subscribe();

        agg.ingest(&incident_created(1, "1", "CRITICAL", 1)).unwrap();
        agg.set_sound_enabled(false);
        agg.ingest(&incident_created(1, "2", "CRITICAL", 2)).unwrap();
        agg.ingest(&broadcast(3, false, 3)).unwrap();

        match rx.try_recv().unwrap() {
            AlertUpdate::Created { chime, .. } => assert!(chime),
            other => panic!("unexpected {other:?}"),
        }
        match rx.try_recv().unwrap() {
            AlertUpdate::Created { chime, .. } => assert!(!chime),
            other => panic!("unexpected {other:?}"),
        }
        // Info never chimes regardless of the toggle
        agg.set_sound_enabled(true);
        match rx.try_recv().unwrap() {
            AlertUpdate::Created { chime, alert } => {
                assert_eq!(alert.severity, AlertSeverity::Info);
                assert!(!chime);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn undecodable_payload_is_not_alert_worthy() {
        let agg = AlertAggregator::new(None);
        let event = ServerEvent {
            kind: EventKind::IncidentCreated,
            channel: "incidents.1".to_string(),
            payload: json!({ "id": "1" }),
            server_seq: 1,
            timestamp: Utc::now(),
        };
        assert!(agg.ingest(&event).is_none());
        assert!(agg.is_empty());
    }
}
