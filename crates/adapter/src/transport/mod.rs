//! Transports - the byte carriers under a session
//!
//! A [`Transport`] moves whole payloads between this device and one opponent.
//! Two variants exist:
//!
//! - [`DatagramTransport`]: each payload is one independent UDP datagram.
//!   Closing and reconnecting is cheap, so a paused game can resume.
//! - [`StreamTransport`]: one TCP connection. Units are recovered from the
//!   byte stream by scanning for the flag byte; taunts are not carried.
//!
//! Both variants lock onto the first peer they exchange with. Inbound data
//! from any other address is dropped before it reaches the session.

mod datagram;
mod stream;

pub use datagram::{DatagramTransport, MAX_DATAGRAM_LEN};
pub use stream::StreamTransport;

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::types::{PeerId, TransportKind};

/// A connection to one opponent.
///
/// `receive` blocks until a whole payload arrives and is expected to be driven
/// by a single task. `send` may run concurrently with a blocked `receive`.
#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Bring the transport up.
    ///
    /// With `Some(peer)` the transport targets that opponent. With `None` it
    /// waits for one (or reopens after a pause, keeping the locked peer).
    /// Returns true when the remote side initiated, which means an invitation
    /// is waiting to be read.
    async fn connect(&self, peer: Option<PeerId>) -> Result<bool, TransportError>;

    /// Deliver one complete payload to the locked peer.
    async fn send(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// Wait for the next payload from the locked peer.
    ///
    /// Returns [`TransportError::Closed`] once [`close`](Self::close) is called.
    async fn receive(&self) -> Result<Vec<u8>, TransportError>;

    /// Release the socket. A blocked `receive` wakes up with `Closed`.
    fn close(&self);

    /// The opponent this transport is locked to, if any.
    fn peer(&self) -> Option<PeerId>;

    /// Whether `close` followed by `connect(None)` continues the same game.
    fn resumable(&self) -> bool;

    /// Largest payload one `send` can carry, or `None` when unbounded.
    fn max_payload_len(&self) -> Option<usize> {
        None
    }

    /// Local address, when bound.
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}

/// First-contact peer lock.
///
/// The first address seen (or the invited address) becomes the peer; every
/// later exchange must come from the same normalized address.
#[derive(Debug, Clone, Default)]
pub struct PeerLock {
    locked: Option<PeerId>,
}

impl PeerLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock onto an opponent we are about to contact.
    pub fn lock_to(&mut self, peer: PeerId) {
        self.locked = Some(peer);
    }

    /// Whether data from `raw` may reach the session. Locks on first contact.
    pub fn admit(&mut self, raw: &str) -> bool {
        let from = PeerId::from_raw(raw);
        match &self.locked {
            Some(peer) => *peer == from,
            None => {
                debug!(peer = %from, "locked onto first peer");
                self.locked = Some(from);
                true
            }
        }
    }

    pub fn peer(&self) -> Option<&PeerId> {
        self.locked.as_ref()
    }
}

/// Close notification shared by a transport and its blocked receiver.
#[derive(Debug)]
pub(crate) struct CloseSignal {
    tx: watch::Sender<bool>,
}

impl CloseSignal {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub(crate) fn close(&self) {
        self.tx.send_replace(true);
    }

    pub(crate) fn reset(&self) {
        self.tx.send_replace(false);
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub(crate) async fn closed(&self) {
        let mut rx = self.tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Drive `transport.receive()` until the transport is closed or fails.
///
/// Every payload goes to `on_payload`. A local close ends the loop quietly;
/// any other error is handed to `on_error` once and ends the loop.
pub fn spawn_receive_loop<P, E>(
    transport: Arc<dyn Transport>,
    on_payload: P,
    on_error: E,
) -> JoinHandle<()>
where
    P: Fn(Vec<u8>) + Send + 'static,
    E: FnOnce(TransportError) + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match transport.receive().await {
                Ok(payload) => on_payload(payload),
                Err(TransportError::Closed) => {
                    debug!(kind = transport.kind().as_str(), "receiver stopped");
                    break;
                }
                Err(err) => {
                    warn!(kind = transport.kind().as_str(), error = %err, "receive failed");
                    on_error(err);
                    break;
                }
            }
        }
    })
}
