//! Link configuration from environment variables.

use std::env;
use std::sync::Arc;

use crate::transport::{DatagramTransport, StreamTransport, Transport};
use crate::types::{TransportKind, DEFAULT_PORT};

/// Where and how to reach the opponent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub transport: TransportKind,
    pub host: String,
    pub port: u16,
    /// Port assumed for peers given without one.
    pub peer_port: u16,
    /// Append every payload to this file as JSON lines.
    pub log_path: Option<String>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Datagram,
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            peer_port: DEFAULT_PORT,
            log_path: None,
        }
    }
}

impl LinkConfig {
    /// Create from `CHECKERS_LINK_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let transport = lookup("CHECKERS_LINK_TRANSPORT")
            .and_then(|s| TransportKind::from_str(s.trim()))
            .unwrap_or(defaults.transport);
        let host = lookup("CHECKERS_LINK_HOST")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.host);
        let port = lookup("CHECKERS_LINK_PORT")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.port);
        let peer_port = lookup("CHECKERS_LINK_PEER_PORT")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(port);
        let log_path = lookup("CHECKERS_LINK_LOG_PATH")
            .map(|s| s.trim().to_string())
            .and_then(|s| if s.is_empty() { None } else { Some(s) });

        Self {
            transport,
            host,
            port,
            peer_port,
            log_path,
        }
    }

    /// Check if networking is disabled via environment.
    pub fn is_disabled() -> bool {
        env::var("CHECKERS_LINK_DISABLED")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the configured transport, not yet connected.
    pub fn build_transport(&self) -> Arc<dyn Transport> {
        match self.transport {
            TransportKind::Datagram => {
                Arc::new(DatagramTransport::new(self.bind_addr(), self.peer_port))
            }
            TransportKind::Stream => Arc::new(StreamTransport::new(self.bind_addr(), self.peer_port)),
        }
    }
}
