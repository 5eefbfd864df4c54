//! Transport seam — NDJSON frames over a bidirectional byte stream.
//!
//! The connection manager is the only owner of a live link; every other
//! component observes connection state or receives demuxed events. The
//! trait exists so tests can drive the state machine with a scripted
//! transport instead of a socket.

use async_trait::async_trait;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::net::TcpStream;

use crate::error::TransportError;

/// Opens one link per call. Handshake = reaching the server and writing
/// the auth frame; anything after that is the frame stream.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(
        &self,
        url: &str,
        auth_token: Option<&str>,
    ) -> Result<Box<dyn TransportLink>, TransportError>;
}

/// One established bidirectional frame channel.
#[async_trait]
pub trait TransportLink: Send {
    /// Next inbound frame. `None` means the server closed the link cleanly.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;

    /// Send one outbound frame (protocol-level only; the core sends no
    /// application messages).
    async fn send(&mut self, frame: &str) -> Result<(), TransportError>;
}

/// Production transport: NDJSON over TCP.
pub struct TcpTransport;

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(
        &self,
        url: &str,
        auth_token: Option<&str>,
    ) -> Result<Box<dyn TransportLink>, TransportError> {
        let addr = url.strip_prefix("tcp://").unwrap_or(url);
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| TransportError::Connect {
                url: url.to_string(),
                source,
            })?;

        let (read_half, write_half) = tokio::io::split(stream);
        let mut link = TcpLink {
            reader: BufReader::new(read_half),
            writer: write_half,
        };

        if let Some(token) = auth_token {
            let hello = json!({ "type": "auth", "token": token }).to_string();
            link.send(&hello).await?;
        }

        Ok(Box::new(link))
    }
}

struct TcpLink {
    reader: BufReader<ReadHalf<TcpStream>>,
    writer: WriteHalf<TcpStream>,
}

#[async_trait]
impl TransportLink for TcpLink {
    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    async fn send(&mut self, frame: &str) -> Result<(), TransportError> {
        self.writer.write_all(frame.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}
