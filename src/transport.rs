//! Transport binding: one live duplex connection to a chat endpoint.
//!
//! DESIGN
//! ======
//! A `Dialer` produces a raw `Socket` (a pair of text channels). The binding
//! wraps it with a pump task that decodes each inbound frame and forwards it
//! to the single `on_message` slot, tagged with the binding's id. The
//! controller re-points that slot on every switch by opening a new binding;
//! deliveries still queued from an old binding carry its id and are dropped
//! by the receiver.
//!
//! ERROR HANDLING
//! ==============
//! - `send` on a closed binding fails with `ConnectionClosed`.
//! - `close` on a closed binding is a no-op.
//! - Undecodable frames are logged and skipped; they do not close the binding.
//! - The binding never reconnects on its own. When the remote end goes away
//!   the pump emits one `Delivery::Closed` and exits.

use std::time::Duration;

use async_trait::async_trait;
use frames::{Message, OutboundFrame};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::SessionError;

pub type BindingId = Uuid;

// =============================================================================
// DIALER
// =============================================================================

/// Raw text channels of an open connection.
pub struct Socket {
    /// Frames to write to the remote end.
    pub outgoing: mpsc::UnboundedSender<String>,
    /// Frames read from the remote end. Ends when the connection does.
    pub incoming: mpsc::UnboundedReceiver<String>,
}

/// Opens raw connections to live endpoints.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, endpoint: &str) -> Result<Socket, SessionError>;
}

/// Websocket dialer over `tokio-tungstenite`.
pub struct WsDialer {
    connect_timeout: Duration,
}

impl WsDialer {
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self { connect_timeout: Duration::from_secs(config.timeouts.connect_secs) }
    }
}

#[async_trait]
impl Dialer for WsDialer {
    async fn dial(&self, endpoint: &str) -> Result<Socket, SessionError> {
        let failed = |reason: String| SessionError::ConnectionFailed { endpoint: endpoint.to_owned(), reason };

        let (stream, _response) = tokio::time::timeout(self.connect_timeout, connect_async(endpoint))
            .await
            .map_err(|_| failed(format!("timed out after {}s", self.connect_timeout.as_secs())))?
            .map_err(|e| failed(e.to_string()))?;
        let (mut sink, mut source) = stream.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();

        // Writer: drains outbound text until the binding drops its sender.
        let writer_endpoint = endpoint.to_owned();
        tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if let Err(e) = sink.send(WsMessage::text(text)).await {
                    tracing::warn!(endpoint = %writer_endpoint, error = %e, "websocket write failed");
                    break;
                }
            }
            if let Err(e) = sink.close().await {
                tracing::debug!(endpoint = %writer_endpoint, error = %e, "websocket close failed");
            }
        });

        // Reader: forwards text frames until close, error, or the binding goes away.
        let reader_endpoint = endpoint.to_owned();
        tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => {
                        if in_tx.send(text.as_str().to_owned()).is_err() {
                            break;
                        }
                    }
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(endpoint = %reader_endpoint, error = %e, "websocket read failed");
                        break;
                    }
                }
            }
        });

        Ok(Socket { outgoing: out_tx, incoming: in_rx })
    }
}

// =============================================================================
// BINDING
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum Delivery {
    Message(Message),
    /// The remote end went away. Sent at most once per binding.
    Closed,
}

/// A delivery tagged with the binding that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Inbound {
    pub binding: BindingId,
    pub delivery: Delivery,
}

pub struct TransportBinding {
    id: BindingId,
    endpoint: String,
    outgoing: Option<mpsc::UnboundedSender<String>>,
    pump: Option<JoinHandle<()>>,
}

impl TransportBinding {
    /// Dial `endpoint` and start forwarding decoded messages to `on_message`.
    ///
    /// # Errors
    ///
    /// Whatever the dialer reports, typically `ConnectionFailed`.
    pub async fn open(
        dialer: &dyn Dialer,
        endpoint: &str,
        on_message: mpsc::UnboundedSender<Inbound>,
    ) -> Result<Self, SessionError> {
        let Socket { outgoing, mut incoming } = dialer.dial(endpoint).await?;
        let id = Uuid::new_v4();
        let pump_endpoint = endpoint.to_owned();

        let pump = tokio::spawn(async move {
            while let Some(text) = incoming.recv().await {
                match frames::decode_message(&text) {
                    Ok(message) => {
                        let inbound = Inbound { binding: id, delivery: Delivery::Message(message) };
                        if on_message.send(inbound).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        let err = SessionError::malformed(pump_endpoint.as_str(), e);
                        tracing::warn!(binding = %id, code = err.code(), error = %err, "skipping inbound frame");
                    }
                }
            }
            tracing::info!(binding = %id, endpoint = %pump_endpoint, "remote end closed");
            if on_message.send(Inbound { binding: id, delivery: Delivery::Closed }).is_err() {
                tracing::debug!(binding = %id, "close notice dropped; receiver gone");
            }
        });

        tracing::info!(binding = %id, %endpoint, "binding opened");
        Ok(Self { id, endpoint: endpoint.to_owned(), outgoing: Some(outgoing), pump: Some(pump) })
    }

    #[must_use]
    pub fn id(&self) -> BindingId {
        self.id
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `true` until `close` is called or the connection drops.
    #[must_use]
    pub fn is_open(&self) -> bool {
        let writable = self.outgoing.as_ref().is_some_and(|tx| !tx.is_closed());
        let reading = self.pump.as_ref().is_some_and(|pump| !pump.is_finished());
        writable && reading
    }

    /// Queue one outbound frame.
    ///
    /// # Errors
    ///
    /// `ConnectionClosed` when the binding is closed.
    pub fn send(&self, frame: &OutboundFrame) -> Result<(), SessionError> {
        if !self.is_open() {
            return Err(SessionError::ConnectionClosed);
        }
        let tx = self.outgoing.as_ref().ok_or(SessionError::ConnectionClosed)?;
        tx.send(frames::encode_outbound(frame)).map_err(|_| SessionError::ConnectionClosed)
    }

    /// Tear the binding down. Idempotent.
    pub fn close(&mut self) {
        let was_open = self.outgoing.take().is_some();
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        if was_open {
            tracing::info!(binding = %self.id, endpoint = %self.endpoint, "binding closed");
        }
    }
}

impl Drop for TransportBinding {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
