use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BantayConfig {
    pub server: ServerConfig,
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// host:port of the dispatch event stream.
    pub url: String,
    /// Optional token stored in config (env var takes priority at runtime).
    #[serde(default)]
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// First reconnect delay; doubles per attempt.
    pub base_delay_ms: u64,
    /// Ceiling for the backoff delay, pre-jitter.
    pub max_delay_ms: u64,
    /// Reconnect attempts before giving up. `None` = retry forever;
    /// availability beats giving up for an operator-facing console.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Interval at which the server promises heartbeat frames.
    pub heartbeat_interval_secs: u64,
    /// Silence threshold after which the link is treated as dead.
    /// Default is 3x the heartbeat interval.
    pub heartbeat_timeout_secs: u64,
    /// Cap on the live alert list. `None` = unbounded.
    #[serde(default)]
    pub max_alerts: Option<usize>,
}

impl Default for BantayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                url: "127.0.0.1:18750".to_string(),
                auth_token: None,
            },
            realtime: RealtimeConfig {
                base_delay_ms: 500,
                max_delay_ms: 30_000,
                max_attempts: None,
                heartbeat_interval_secs: 10,
                heartbeat_timeout_secs: 30,
                max_alerts: None,
            },
        }
    }
}

impl RealtimeConfig {
    pub fn heartbeat_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.heartbeat_timeout_secs)
    }
}
