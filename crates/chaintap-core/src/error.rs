//! Transport error types

use thiserror::Error;

/// Errors surfaced by the streaming transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// Operation requires an open connection
    #[error("not connected")]
    NotConnected,

    /// WebSocket handshake or I/O failure
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The socket task is gone and cannot accept frames
    #[error("socket task stopped")]
    TaskStopped,
}
