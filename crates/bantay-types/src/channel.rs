use serde::{Deserialize, Serialize};

/// Matches event channels either exactly, by namespace prefix
/// (`incidents.*`), or universally (`*`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPattern(String);

impl ChannelPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// Match everything, including future channels.
    pub fn any() -> Self {
        Self("*".to_string())
    }

    pub fn matches(&self, channel: &str) -> bool {
        if self.0 == "*" {
            return true;
        }
        match self.0.strip_suffix(".*") {
            Some(prefix) => channel
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('.')),
            None => self.0 == channel,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChannelPattern {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for ChannelPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        let p = ChannelPattern::new("incidents.123");
        assert!(p.matches("incidents.123"));
        assert!(!p.matches("incidents.1234"));
        assert!(!p.matches("personnel.123"));
    }

    #[test]
    fn prefix_match() {
        let p = ChannelPattern::new("incidents.*");
        assert!(p.matches("incidents.123"));
        assert!(p.matches("incidents.123.notes"));
        assert!(!p.matches("incidents"));
        assert!(!p.matches("incidentsarchive.123"));
    }

    #[test]
    fn wildcard_matches_all() {
        let p = ChannelPattern::any();
        assert!(p.matches("incidents.1"));
        assert!(p.matches("system"));
    }
}
