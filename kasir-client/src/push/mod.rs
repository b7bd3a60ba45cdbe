//! Push channel
//!
//! Transports deliver row-change events; [`PushChannel`] keeps one
//! connected, reconnects with exponential backoff and forwards everything
//! into the synchronizer queue. Delivery is treated as at-least-once and
//! unordered: the synchronizer, not the channel, decides what an event means.

mod transport;

pub use transport::{
    MemoryConnector, MemoryPushTransport, PushConnector, PushTransport, TcpConnector,
    TcpPushTransport,
};

use crate::ClientError;
use crate::config::PushConfig;
use crate::sync::SyncInput;
use shared::error::ErrorCode;
use shared::message::FrameError;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Push channel errors
#[derive(Debug, Error)]
pub enum PushError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// Receiver fell behind and events were dropped
    #[error("Push feed lagged by {0} events")]
    Lagged(u64),

    #[error("Push feed closed")]
    Closed,
}

impl PushError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::ChannelUnavailable
    }
}

impl From<PushError> for ClientError {
    fn from(err: PushError) -> Self {
        ClientError::TransientNetwork(err.to_string())
    }
}

/// Reconnecting push channel pump
pub struct PushChannel<C> {
    connector: C,
    config: PushConfig,
    queue: mpsc::Sender<SyncInput>,
    cancel: CancellationToken,
}

enum Session {
    /// Connection lost; reconnect
    Dropped,
    /// Cancelled or the synchronizer is gone
    Finished,
}

impl<C: PushConnector + 'static> PushChannel<C> {
    pub fn new(
        connector: C,
        config: PushConfig,
        queue: mpsc::Sender<SyncInput>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            connector,
            config,
            queue,
            cancel,
        }
    }

    /// Run the pump on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) {
        let mut attempt: u32 = 0;

        loop {
            let connected = tokio::select! {
                _ = self.cancel.cancelled() => return,
                result = self.connector.connect() => result,
            };

            match connected {
                Ok(transport) => {
                    attempt = 0;
                    tracing::info!("Push channel connected");
                    if self.queue.send(SyncInput::ChannelUp).await.is_err() {
                        return;
                    }
                    match self.pump(transport.as_ref()).await {
                        Session::Finished => {
                            let _ = transport.close().await;
                            return;
                        }
                        Session::Dropped => {
                            let _ = transport.close().await;
                            if self.queue.send(SyncInput::ChannelDown).await.is_err() {
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt = attempt + 1, "Push channel connect failed");
                }
            }

            attempt += 1;
            if !self.config.may_retry(attempt) {
                tracing::error!(attempts = attempt, "Push channel gave up reconnecting");
                return;
            }
            let delay = self.config.backoff(attempt);
            tracing::debug!(delay_ms = delay.as_millis() as u64, "Push channel reconnecting");
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn pump(&self, transport: &dyn PushTransport) -> Session {
        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => return Session::Finished,
                next = transport.next_event() => next,
            };

            let input = match next {
                Ok(event) => SyncInput::Push(event),
                Err(PushError::Lagged(missed)) => {
                    tracing::warn!(missed, "Push channel lagged, requesting refresh");
                    SyncInput::Resync
                }
                Err(PushError::Frame(FrameError::Json(e))) => {
                    // Length prefix was valid, payload was not; stream is still aligned
                    tracing::warn!(error = %e, "Undecodable push frame skipped");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Push channel disconnected");
                    return Session::Dropped;
                }
            };

            if self.queue.send(input).await.is_err() {
                return Session::Finished;
            }
        }
    }
}
