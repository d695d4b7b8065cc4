//! Single-producer WebSocket relay hub
//!
//! One connection registers as the producer (`{"type":"streamer"}`), any
//! number register as consumers (`{"type":"viewer"}`), and every binary frame
//! the producer sends is relayed unmodified to all consumers. Stream lifecycle
//! is signalled over JSON text frames on the same connection.
//!
//! # Example
//! ```no_run
//! use relay_hub::{RelayServer, ServerConfig};
//!
//! # async fn example() -> relay_hub::error::Result<()> {
//! let server = RelayServer::new(ServerConfig::default());
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! }).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod stats;

pub use error::{Error, Result};
pub use registry::{ConnectionId, RelayHub, Role};
pub use server::{RelayServer, ServerConfig};
