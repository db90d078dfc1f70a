use std::net::SocketAddr;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use super::{CloseSignal, PeerLock, Transport};
use crate::core::{frame_len, strip_taunt};
use crate::error::TransportError;
use crate::types::{PeerId, TransportKind, EOF_FLAG, START_GAME_FLAG};

const SCHEME: &str = "tcp://";
const READ_CHUNK: usize = 256;

/// Splits a byte stream into protocol units.
///
/// A unit is a run of moves terminated by its flag byte. On an accepted
/// connection the first byte is the invitation and is surfaced as a lone
/// START_GAME unit. End of stream becomes a lone EOF unit.
pub(crate) struct UnitReader<R> {
    inner: R,
    buf: Vec<u8>,
    awaiting_invitation: bool,
    eof: bool,
}

impl<R: AsyncRead + Unpin> UnitReader<R> {
    pub(crate) fn new(inner: R, awaiting_invitation: bool) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(READ_CHUNK),
            awaiting_invitation,
            eof: false,
        }
    }

    pub(crate) async fn next_unit(&mut self) -> Result<Vec<u8>, TransportError> {
        loop {
            if self.awaiting_invitation {
                if !self.buf.is_empty() {
                    self.buf.remove(0);
                    self.awaiting_invitation = false;
                    return Ok(vec![START_GAME_FLAG as u8]);
                }
            } else if let Some(len) = frame_len(&self.buf)? {
                return Ok(self.buf.drain(..len).collect());
            }

            if self.eof {
                return Err(TransportError::Closed);
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                self.eof = true;
                if !self.buf.is_empty() {
                    warn!(bytes = self.buf.len(), "stream ended mid-unit");
                    self.buf.clear();
                }
                return Ok(vec![EOF_FLAG as u8]);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

/// TCP transport over one persistent connection.
///
/// Units are delimited by their flag byte, so taunts are dropped on send.
/// Closing tears the connection down for good; there is no resume.
pub struct StreamTransport {
    bind_addr: String,
    rendezvous_port: u16,
    local: Mutex<Option<SocketAddr>>,
    listener: tokio::sync::Mutex<Option<TcpListener>>,
    reader: tokio::sync::Mutex<Option<UnitReader<OwnedReadHalf>>>,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    peer: Mutex<PeerLock>,
    closed: CloseSignal,
}

impl StreamTransport {
    pub fn new(bind_addr: impl Into<String>, rendezvous_port: u16) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            rendezvous_port,
            local: Mutex::new(None),
            listener: tokio::sync::Mutex::new(None),
            reader: tokio::sync::Mutex::new(None),
            writer: tokio::sync::Mutex::new(None),
            peer: Mutex::new(PeerLock::new()),
            closed: CloseSignal::new(),
        }
    }

    /// Open the listening socket ahead of [`Transport::connect`] and report
    /// where it is bound.
    pub async fn bind(&self) -> Result<SocketAddr, TransportError> {
        let mut slot = self.listener.lock().await;
        if let Some(listener) = slot.as_ref() {
            return Ok(listener.local_addr()?);
        }
        let listener = TcpListener::bind(&self.bind_addr).await?;
        let addr = listener.local_addr()?;
        *self.local.lock() = Some(addr);
        *slot = Some(listener);
        Ok(addr)
    }

    async fn install(&self, socket: TcpStream, accepted: bool) {
        if let Err(err) = socket.set_nodelay(true) {
            debug!(error = %err, "could not disable nagle on stream");
        }
        if let Ok(addr) = socket.local_addr() {
            *self.local.lock() = Some(addr);
        }
        let (read, write) = socket.into_split();
        *self.reader.lock().await = Some(UnitReader::new(read, accepted));
        *self.writer.lock().await = Some(write);
    }
}

#[async_trait]
impl Transport for StreamTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Stream
    }

    async fn connect(&self, peer: Option<PeerId>) -> Result<bool, TransportError> {
        if self.closed.is_closed() {
            return Err(TransportError::Closed);
        }
        match peer {
            Some(peer) => {
                let target = PeerId::with_default_port(peer.as_str(), self.rendezvous_port);
                let socket = TcpStream::connect(target.as_str()).await?;
                let remote = socket.peer_addr()?;
                info!(peer = %remote, "connected to opponent");
                self.peer.lock().lock_to(PeerId::new(remote.to_string()));
                self.install(socket, false).await;
                Ok(false)
            }
            None => {
                self.bind().await?;
                let listener = self
                    .listener
                    .lock()
                    .await
                    .take()
                    .ok_or(TransportError::NotConnected)?;
                info!(addr = %listener.local_addr()?, "waiting for opponent");
                let (socket, remote) = tokio::select! {
                    res = listener.accept() => res?,
                    _ = self.closed.closed() => return Err(TransportError::Closed),
                };
                if !self.peer.lock().admit(&format!("{SCHEME}{remote}")) {
                    return Err(TransportError::NoPeer);
                }
                info!(peer = %remote, "opponent connected");
                self.install(socket, true).await;
                Ok(true)
            }
        }
    }

    async fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        let mut slot = self.writer.lock().await;
        let writer = slot.as_mut().ok_or(TransportError::NotConnected)?;
        let unit = strip_taunt(payload);
        if unit.len() < payload.len() {
            debug!(dropped = payload.len() - unit.len(), "taunt not carried on stream");
        }
        let res = tokio::select! {
            res = async {
                writer.write_all(unit).await?;
                writer.flush().await
            } => res.map_err(TransportError::from),
            _ = self.closed.closed() => Err(TransportError::Closed),
        };
        if res.is_err() || self.closed.is_closed() {
            slot.take();
        }
        res
    }

    async fn receive(&self) -> Result<Vec<u8>, TransportError> {
        let mut slot = self.reader.lock().await;
        let reader = slot.as_mut().ok_or(TransportError::Closed)?;
        let res = tokio::select! {
            res = reader.next_unit() => res,
            _ = self.closed.closed() => Err(TransportError::Closed),
        };
        if matches!(res, Err(TransportError::Closed)) {
            slot.take();
        }
        res
    }

    fn close(&self) {
        self.closed.close();
        if let Ok(mut writer) = self.writer.try_lock() {
            if writer.take().is_some() {
                debug!("stream writer closed");
            }
        }
        if let Ok(mut listener) = self.listener.try_lock() {
            listener.take();
        }
    }

    fn peer(&self) -> Option<PeerId> {
        self.peer.lock().peer().cloned()
    }

    fn resumable(&self) -> bool {
        false
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        *self.local.lock()
    }
}
