//! Persistent connection to the chatbot backend
//!
//! [`TransportConnection`] owns one connection at a time, produced by a
//! [`Connector`]. It never reconnects on its own; the runtime consults a
//! [`ReconnectPolicy`] and calls [`TransportConnection::reconnect`].

pub mod policy;
pub mod websocket;

pub use policy::{ExponentialBackoff, FixedDelay, ReconnectPolicy};
pub use websocket::WsConnector;

use crate::protocol::OutboundRequest;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("not connected")]
    NotConnected,
    #[error("no endpoint to reconnect to")]
    NoEndpoint,
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("connection closed: {0}")]
    Closed(String),
    #[error("could not encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Opens connections to an endpoint
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: Connection;

    async fn connect(&self, url: &str) -> Result<Self::Conn, TransportError>;
}

/// One open, bidirectional text connection
#[async_trait]
pub trait Connection: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Next inbound text frame; `None` once the peer has closed
    async fn recv_text(&mut self) -> Option<Result<String, TransportError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// `open` has not succeeded yet
    Idle,
    Open,
    /// The connection dropped; waiting for a reconnect
    Closed,
}

pub struct TransportConnection<C: Connector> {
    connector: C,
    url: Option<String>,
    connection: Option<C::Conn>,
    state: ConnectionState,
}

impl<C: Connector> TransportConnection<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            url: None,
            connection: None,
            state: ConnectionState::Idle,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Connect to `url` and remember it for later reconnects
    pub async fn open(&mut self, url: &str) -> Result<(), TransportError> {
        self.url = Some(url.to_string());
        self.connect().await
    }

    /// Connect again to the last endpoint passed to `open`
    pub async fn reconnect(&mut self) -> Result<(), TransportError> {
        if self.url.is_none() {
            return Err(TransportError::NoEndpoint);
        }
        self.connect().await
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        let url = self.url.as_deref().ok_or(TransportError::NoEndpoint)?;
        self.connection = None;
        match self.connector.connect(url).await {
            Ok(connection) => {
                tracing::info!(%url, "Connected");
                self.connection = Some(connection);
                self.state = ConnectionState::Open;
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Closed;
                Err(e)
            }
        }
    }

    /// Serialize and transmit a request. Fails with `NotConnected` unless the
    /// connection is open, including when the write reveals a dead socket.
    pub async fn send(&mut self, request: &OutboundRequest) -> Result<(), TransportError> {
        if self.state != ConnectionState::Open {
            return Err(TransportError::NotConnected);
        }
        let Some(connection) = self.connection.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        let text = request.to_json()?;
        if let Err(e) = connection.send_text(text).await {
            tracing::warn!(error = %e, "Send failed, marking connection closed");
            self.mark_closed();
            return Err(TransportError::NotConnected);
        }
        Ok(())
    }

    /// Wait for the next inbound frame. Returns `None` when the connection
    /// closes or fails; the transport is then `Closed`. Never resolves while
    /// no connection is open.
    pub async fn recv(&mut self) -> Option<String> {
        let Some(connection) = self.connection.as_mut() else {
            return std::future::pending().await;
        };
        match connection.recv_text().await {
            Some(Ok(text)) => Some(text),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Read failed, closing connection");
                self.mark_closed();
                None
            }
            None => {
                self.mark_closed();
                None
            }
        }
    }

    fn mark_closed(&mut self) {
        self.connection = None;
        self.state = ConnectionState::Closed;
    }
}
