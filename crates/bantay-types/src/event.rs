use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One event pushed by the server over the realtime channel.
///
/// Wire format is one JSON object per NDJSON line. `server_seq` is
/// monotonically increasing per channel and is the only mechanism the
/// client has for spotting dropped frames after a reconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEvent {
    pub kind: EventKind,
    pub channel: String,
    /// Opaque resource payload; only the alert aggregator looks inside.
    #[serde(default)]
    pub payload: serde_json::Value,
    pub server_seq: u64,
    pub timestamp: DateTime<Utc>,
}

impl ServerEvent {
    /// Stable identifier for dedup: one alert per (channel, seq) at most.
    pub fn source_event_id(&self) -> String {
        format!("{}#{}", self.channel, self.server_seq)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    IncidentCreated,
    IncidentUpdated,
    IncidentEscalated,
    PersonnelStatusChanged,
    BroadcastMessage,
    Heartbeat,
}

/// Incident priority tiers as assigned by dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncidentPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// Duty status of a personnel unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonnelStatus {
    Available,
    Dispatched,
    OnScene,
    OffDuty,
    /// Officer-down / assistance-requested. Always alert-worthy.
    NeedsAssistance,
}

impl PersonnelStatus {
    pub fn is_emergency(&self) -> bool {
        matches!(self, Self::NeedsAssistance)
    }
}

/// Payload shape for `IncidentCreated` / `IncidentUpdated` / `IncidentEscalated`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentPayload {
    pub id: String,
    pub priority: IncidentPriority,
    pub summary: String,
    #[serde(default)]
    pub barangay: Option<String>,
}

/// Payload shape for `PersonnelStatusChanged`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonnelPayload {
    pub id: String,
    pub name: String,
    pub status: PersonnelStatus,
}

/// Payload shape for `BroadcastMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastPayload {
    pub message: String,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub sender: Option<String>,
}

/// A missing range of sequence numbers on one channel.
///
/// Not an error: the CRUD layer consumes this as a signal to refetch the
/// affected resource from the REST API, which stays authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelGap {
    pub channel: String,
    pub from_seq: u64,
    pub to_seq: u64,
}

/// Ask the external CRUD layer to refetch a resource.
///
/// `resource = "*"` means "resync everything" and is emitted once per
/// (re)connect, since any number of frames may have been missed while down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefetchRequest {
    pub resource: String,
}
