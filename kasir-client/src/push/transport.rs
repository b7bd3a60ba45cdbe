use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, broadcast};

use super::PushError;
use shared::message::{ChangeEvent, FRAME_HEADER_LEN, decode_frame, frame_len};

/// Transport abstraction for the push channel
#[async_trait]
pub trait PushTransport: Send + Sync + std::fmt::Debug {
    /// Next event; an error means the connection is gone or out of sync
    async fn next_event(&self) -> Result<ChangeEvent, PushError>;
    async fn close(&self) -> Result<(), PushError>;
}

/// Opens push transports; called again on every reconnect
#[async_trait]
pub trait PushConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn PushTransport>, PushError>;
}

/// TCP Transport Implementation
///
/// Each event is a length-prefixed JSON frame.
#[derive(Debug, Clone)]
pub struct TcpPushTransport {
    reader: Arc<Mutex<OwnedReadHalf>>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
}

impl TcpPushTransport {
    pub async fn connect(addr: &str) -> Result<Self, PushError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| PushError::Connection(format!("{addr}: {e}")))?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: Arc::new(Mutex::new(reader)),
            writer: Arc::new(Mutex::new(writer)),
        })
    }
}

#[async_trait]
impl PushTransport for TcpPushTransport {
    async fn next_event(&self) -> Result<ChangeEvent, PushError> {
        let mut reader = self.reader.lock().await;

        // Read payload length (4 bytes)
        let mut len_buf = [0u8; FRAME_HEADER_LEN];
        reader.read_exact(&mut len_buf).await.map_err(PushError::Io)?;
        let len = frame_len(len_buf)?;

        // Read payload
        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + len);
        frame.extend_from_slice(&len_buf);
        frame.resize(FRAME_HEADER_LEN + len, 0);
        reader
            .read_exact(&mut frame[FRAME_HEADER_LEN..])
            .await
            .map_err(PushError::Io)?;

        Ok(decode_frame(&frame)?)
    }

    async fn close(&self) -> Result<(), PushError> {
        let mut writer = self.writer.lock().await;
        writer.shutdown().await.map_err(PushError::Io)
    }
}

/// Connects to a TCP push endpoint
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl PushConnector for TcpConnector {
    async fn connect(&self) -> Result<Box<dyn PushTransport>, PushError> {
        Ok(Box::new(TcpPushTransport::connect(&self.addr).await?))
    }
}

/// Memory Transport Implementation (for in-process backends)
#[derive(Debug)]
pub struct MemoryPushTransport {
    rx: Mutex<broadcast::Receiver<ChangeEvent>>,
}

impl MemoryPushTransport {
    pub fn new(feed: &broadcast::Sender<ChangeEvent>) -> Self {
        Self {
            rx: Mutex::new(feed.subscribe()),
        }
    }
}

#[async_trait]
impl PushTransport for MemoryPushTransport {
    async fn next_event(&self) -> Result<ChangeEvent, PushError> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Lagged(n) => PushError::Lagged(n),
            broadcast::error::RecvError::Closed => PushError::Closed,
        })
    }

    async fn close(&self) -> Result<(), PushError> {
        Ok(())
    }
}

/// Subscribes to an in-process push feed
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    feed: broadcast::Sender<ChangeEvent>,
}

impl MemoryConnector {
    pub fn new(feed: broadcast::Sender<ChangeEvent>) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl PushConnector for MemoryConnector {
    async fn connect(&self) -> Result<Box<dyn PushTransport>, PushError> {
        Ok(Box::new(MemoryPushTransport::new(&self.feed)))
    }
}
