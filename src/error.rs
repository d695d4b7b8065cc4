//! Error types for the relay hub

use tokio_tungstenite::tungstenite;

/// Errors produced by the relay server and its connections
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WebSocket handshake timed out")]
    HandshakeTimeout,

    #[error("closing handshake timed out")]
    CloseTimeout,

    #[error("connection limit reached")]
    ConnectionLimit,
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
