//! Server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default listening port
pub const DEFAULT_PORT: u16 = 8080;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Frames that may wait for a slow connection before new ones are dropped
    pub outbound_queue_capacity: usize,

    /// Largest WebSocket message accepted from a client
    pub max_message_size: usize,

    /// WebSocket handshake must complete within this time
    pub handshake_timeout: Duration,

    /// Longest wait for a closing handshake (or an eviction notice) to go out
    pub close_timeout: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            max_connections: 0, // Unlimited
            outbound_queue_capacity: 256,
            max_message_size: 16 * 1024 * 1024, // 16MB
            handshake_timeout: Duration::from_secs(10),
            close_timeout: Duration::from_secs(5),
            tcp_nodelay: true, // Important for low latency
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the per-connection outbound queue capacity (at least 1)
    pub fn outbound_queue_capacity(mut self, capacity: usize) -> Self {
        self.outbound_queue_capacity = capacity.max(1);
        self
    }

    /// Set the maximum inbound message size
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set handshake timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set close timeout
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }
}

/// Parse a bind address argument
///
/// Accepts `IP:PORT`, a bare IP, a bare port, or `localhost` with or without
/// a port.
pub fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    if let Ok(port) = normalized.parse::<u16>() {
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT, IP, PORT or 'localhost'",
        arg
    ))
}
