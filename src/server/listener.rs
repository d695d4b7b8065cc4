//! Relay server listener
//!
//! Handles TCP accept loop and spawns connection handlers.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Error, Result};
use crate::registry::{ConnectionId, RelayHub};
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;

/// WebSocket relay server
pub struct RelayServer {
    config: ServerConfig,
    hub: Arc<RelayHub>,
    next_connection_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl RelayServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self::with_hub(config, Arc::new(RelayHub::new()))
    }

    /// Create a new server around an existing hub
    pub fn with_hub(config: ServerConfig, hub: Arc<RelayHub>) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            hub,
            next_connection_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Get a reference to the relay hub
    pub fn hub(&self) -> &Arc<RelayHub> {
        &self.hub
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.bind_addr()).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// Connections accepted before shutdown keep running on their own tasks.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Relay hub listening");

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        }
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        let permit = match self.acquire_permit() {
            Ok(permit) => permit,
            Err(e) => {
                tracing::warn!(peer = %peer_addr, error = %e, "Connection rejected");
                return;
            }
        };

        let id = ConnectionId(self.next_connection_id.fetch_add(1, Ordering::Relaxed));

        tracing::debug!(connection_id = %id, peer = %peer_addr, "New connection");

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }

        let config = self.config.clone();
        let hub = Arc::clone(&self.hub);

        tokio::spawn(async move {
            // Held for the lifetime of the connection
            let _permit = permit;
            let connection = Connection::new(id, socket, peer_addr, config, hub);

            if let Err(e) = connection.run().await {
                tracing::debug!(connection_id = %id, error = %e, "Connection error");
            }

            tracing::debug!(connection_id = %id, "Connection closed");
        });
    }

    fn acquire_permit(&self) -> Result<Option<OwnedSemaphorePermit>> {
        match self.connection_semaphore {
            Some(ref sem) => sem
                .clone()
                .try_acquire_owned()
                .map(Some)
                .map_err(|_| Error::ConnectionLimit),
            None => Ok(None),
        }
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}
