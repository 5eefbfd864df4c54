use serde::{Deserialize, Serialize};

/// Lifecycle state of the single realtime connection.
///
/// Exactly one instance exists per client session. Only the connection
/// manager mutates it; everything else observes transitions through a
/// broadcast subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Terminal: the retry budget is exhausted. Requires a manual connect.
    Failed,
}

impl ConnectionState {
    /// Whether a `connect()` call should be a no-op in this state.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected | Self::Reconnecting)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ConnectionState {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disconnected" => Ok(Self::Disconnected),
            "connecting" => Ok(Self::Connecting),
            "connected" => Ok(Self::Connected),
            "reconnecting" => Ok(Self::Reconnecting),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("unknown connection state: {s}")),
        }
    }
}
