//! WebSocket server
//!
//! Accepts connections, performs the WebSocket handshake and wires each
//! connection into the shared [`RelayHub`](crate::registry::RelayHub).

pub mod config;
pub mod connection;
pub mod listener;

pub use config::{parse_bind_addr, ServerConfig, DEFAULT_PORT};
pub use listener::RelayServer;
