use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a dispatcher-facing alert.
///
/// Rank drives list ordering: critical alerts always surface above older
/// lower-severity ones regardless of arrival time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info = 0,
    Warning = 1,
    Critical = 2,
}

impl AlertSeverity {
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// Whether a freshly created alert of this severity should chime.
    pub fn is_audible(&self) -> bool {
        matches!(self, Self::Warning | Self::Critical)
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A deduplicated, dispatcher-facing notification.
///
/// Alerts are created only by the alert aggregator from a `ServerEvent`,
/// never by UI code, and never outlive the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Derived from the source event, not server-assigned.
    pub id: String,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub source_event_id: String,
    /// Set for incident-class alerts; the escalation dedup key.
    #[serde(default)]
    pub incident_id: Option<String>,
    #[serde(default)]
    pub action_url: Option<String>,
    pub dismissed: bool,
}

impl Alert {
    /// Derive the alert id from the event that produced it.
    pub fn id_for(source_event_id: &str) -> String {
        format!("alert-{source_event_id}")
    }
}

/// Change notification fanned out to every UI surface watching the
/// alert list (badge, panel, toasts). Consumers re-read the snapshot;
/// the update itself carries just enough for a toast.
#[derive(Debug, Clone)]
pub enum AlertUpdate {
    Created { alert: Alert, chime: bool },
    /// An escalation replaced an earlier live alert for the same incident.
    Replaced { alert: Alert, chime: bool },
    Dismissed { id: String },
    Cleared,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_rank_ordering() {
        assert!(AlertSeverity::Critical > AlertSeverity::Warning);
        assert!(AlertSeverity::Warning > AlertSeverity::Info);
        assert_eq!(AlertSeverity::Critical.rank(), 2);
        assert_eq!(AlertSeverity::Info.rank(), 0);
    }

    #[test]
    fn audible_severities() {
        assert!(AlertSeverity::Critical.is_audible());
        assert!(AlertSeverity::Warning.is_audible());
        assert!(!AlertSeverity::Info.is_audible());
    }

    #[test]
    fn derived_id() {
        assert_eq!(Alert::id_for("incidents.7#3"), "alert-incidents.7#3");
    }
}
