use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tracing::{debug, info};

use super::{CloseSignal, PeerLock, Transport};
use crate::error::TransportError;
use crate::types::{PeerId, TransportKind};

/// Largest payload carried in one datagram.
pub const MAX_DATAGRAM_LEN: usize = 1024;

const SCHEME: &str = "udp://";

/// UDP transport: one payload per datagram.
pub struct DatagramTransport {
    bind_addr: String,
    rendezvous_port: u16,
    socket: Mutex<Option<Arc<UdpSocket>>>,
    local: Mutex<Option<SocketAddr>>,
    peer: Mutex<PeerLock>,
    closed: CloseSignal,
}

impl DatagramTransport {
    /// `bind_addr` is the local `host:port`; `rendezvous_port` is used for
    /// peers given without a port.
    pub fn new(bind_addr: impl Into<String>, rendezvous_port: u16) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            rendezvous_port,
            socket: Mutex::new(None),
            local: Mutex::new(None),
            peer: Mutex::new(PeerLock::new()),
            closed: CloseSignal::new(),
        }
    }

    async fn bind(&self) -> Result<Arc<UdpSocket>, TransportError> {
        if let Some(socket) = self.socket.lock().clone() {
            return Ok(socket);
        }
        // Reopen on the same port so a resumed game stays reachable.
        let addr = match self.local_addr() {
            Some(local) => local.to_string(),
            None => self.bind_addr.clone(),
        };
        let socket = Arc::new(UdpSocket::bind(&addr).await?);
        let local = socket.local_addr()?;
        info!(addr = %local, "datagram socket bound");
        *self.local.lock() = Some(local);
        *self.socket.lock() = Some(socket.clone());
        Ok(socket)
    }

    async fn resolve(&self, peer: &PeerId) -> Result<PeerId, TransportError> {
        let target = PeerId::with_default_port(peer.as_str(), self.rendezvous_port);
        let addr = tokio::net::lookup_host(target.as_str())
            .await
            .map_err(|_| TransportError::Resolve(target.to_string()))?
            .next()
            .ok_or_else(|| TransportError::Resolve(target.to_string()))?;
        Ok(PeerId::new(addr.to_string()))
    }
}

#[async_trait]
impl Transport for DatagramTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Datagram
    }

    async fn connect(&self, peer: Option<PeerId>) -> Result<bool, TransportError> {
        self.closed.reset();
        if let Some(peer) = peer {
            let resolved = self.resolve(&peer).await?;
            debug!(peer = %resolved, "datagram peer resolved");
            self.peer.lock().lock_to(resolved);
        }
        self.bind().await?;
        // The peer only shows up with its first datagram.
        Ok(false)
    }

    async fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        if payload.len() > MAX_DATAGRAM_LEN {
            return Err(TransportError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_DATAGRAM_LEN,
            });
        }
        let socket = self
            .socket
            .lock()
            .clone()
            .ok_or(TransportError::NotConnected)?;
        let peer = self
            .peer
            .lock()
            .peer()
            .cloned()
            .ok_or(TransportError::NoPeer)?;
        socket.send_to(payload, peer.as_str()).await?;
        Ok(())
    }

    async fn receive(&self) -> Result<Vec<u8>, TransportError> {
        let socket = self.socket.lock().clone().ok_or(TransportError::Closed)?;
        let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
        loop {
            let (len, from) = tokio::select! {
                res = socket.recv_from(&mut buf) => res?,
                _ = self.closed.closed() => return Err(TransportError::Closed),
            };
            let raw = format!("{SCHEME}{from}");
            if !self.peer.lock().admit(&raw) {
                debug!(from = %raw, "dropping datagram from unknown sender");
                continue;
            }
            buf.truncate(len);
            return Ok(buf);
        }
    }

    fn close(&self) {
        self.closed.close();
        if self.socket.lock().take().is_some() {
            debug!("datagram socket closed");
        }
    }

    fn peer(&self) -> Option<PeerId> {
        self.peer.lock().peer().cloned()
    }

    fn resumable(&self) -> bool {
        true
    }

    fn max_payload_len(&self) -> Option<usize> {
        Some(MAX_DATAGRAM_LEN)
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        *self.local.lock()
    }
}
