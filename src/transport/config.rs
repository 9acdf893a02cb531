//! Push server configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5080";

/// Push server configuration options
#[derive(Debug, Clone)]
pub struct PushServerConfig {
    /// Listen address for subscriber connections
    pub bind_addr: SocketAddr,

    /// Open socket limit; extra sockets are dropped before the handshake (0 = no limit)
    pub max_connections: usize,

    /// Push frames without Nagle batching
    pub tcp_nodelay: bool,

    /// Longest a single frame write may block before the connection is dropped
    pub write_timeout: Duration,
}

impl Default for PushServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5080)),
            max_connections: 0,
            tcp_nodelay: true,
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl PushServerConfig {
    /// Default config listening on `addr`
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

    /// Limit concurrent sockets
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the per-frame write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set TCP_NODELAY
    pub fn tcp_nodelay(mut self, nodelay: bool) -> Self {
        self.tcp_nodelay = nodelay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_listen_on_5080() {
        let config = PushServerConfig::default();

        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR.parse().unwrap());
        assert_eq!(config.max_connections, 0);
        assert!(config.tcp_nodelay);
        assert_eq!(config.write_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_builders_override_defaults() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = PushServerConfig::default()
            .bind(addr)
            .max_connections(10)
            .tcp_nodelay(false)
            .write_timeout(Duration::from_millis(250));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_connections, 10);
        assert!(!config.tcp_nodelay);
        assert_eq!(config.write_timeout, Duration::from_millis(250));
        assert_eq!(PushServerConfig::with_addr(addr).bind_addr, addr);
    }
}
