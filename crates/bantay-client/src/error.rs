use thiserror::Error;

/// Connection-level failure. Consumed entirely by the reconnect policy;
/// UI code only ever sees the resulting `ConnectionState`, never the error.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to reach {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("connection lost: {0}")]
    Io(#[from] std::io::Error),
}

/// A single inbound frame that could not be decoded. The frame is dropped
/// and logged; the stream and the connection are unaffected.
#[derive(Debug, Error)]
#[error("malformed event frame: {reason}")]
pub struct MalformedEventError {
    pub reason: String,
}
