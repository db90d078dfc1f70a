//! Session - one game against one opponent
//!
//! A [`Session`] ties a [`TurnMachine`] to a [`Transport`], a [`SenderWorker`]
//! and a receive task, and forwards what happens to a [`GameFrontend`].
//!
//! All mutable state sits behind one coarse lock. Local operations, inbound
//! payloads and send completions each take the lock, run one transition and
//! carry out its effects before releasing it, so they never interleave.
//! Nothing blocks on the network while the lock is held: payloads go to the
//! sender's mailbox and the receive task only waits outside the lock.
//!
//! # Lifecycle
//!
//! ```text
//! listen/invite -> connect transport -> start receive task
//!                                        |
//!      move_piece / end_turn  <-> inbound END_TURN   (turns alternate)
//!                                        |
//!      quit / END_GAME / EOF / transport error -> game over -> finished
//! ```

use std::net::SocketAddr;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::{decode, taunt_within, Effect, TurnMachine};
use crate::error::{LinkError, TransportError};
use crate::frontend::GameFrontend;
use crate::sender::SenderWorker;
use crate::transport::{spawn_receive_loop, Transport};
use crate::types::{Move, PeerId, SessionState, MOVE_LEN};
use crate::wire_log::{Direction, WireLog};

/// Taunt sent along with END_GAME when the local player concedes.
pub const WIN_TAUNT: &str = "You Win!";

struct Inner {
    machine: TurnMachine,
    error_reported: bool,
}

struct Shared {
    inner: Mutex<Inner>,
    transport: Arc<dyn Transport>,
    frontend: Arc<dyn GameFrontend>,
    sender: SenderWorker,
    receiver: Mutex<Option<JoinHandle<()>>>,
    retired: Mutex<Vec<JoinHandle<()>>>,
    finished: watch::Sender<bool>,
    wire_log: Option<WireLog>,
}

/// A running game session.
///
/// Must be created inside a tokio runtime. The synchronous operations may be
/// called from any thread.
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    /// Wait for an opponent to contact us.
    ///
    /// For the stream transport this returns once a connection is accepted.
    pub async fn listen(
        transport: Arc<dyn Transport>,
        frontend: Arc<dyn GameFrontend>,
        wire_log: Option<WireLog>,
    ) -> Result<Self, LinkError> {
        Self::open(transport, frontend, wire_log, None).await
    }

    /// Connect to `peer` and send it an invitation.
    pub async fn invite(
        transport: Arc<dyn Transport>,
        frontend: Arc<dyn GameFrontend>,
        wire_log: Option<WireLog>,
        peer: PeerId,
    ) -> Result<Self, LinkError> {
        let session = Self::open(transport, frontend, wire_log, Some(peer)).await?;
        session.send_invitation()?;
        Ok(session)
    }

    async fn open(
        transport: Arc<dyn Transport>,
        frontend: Arc<dyn GameFrontend>,
        wire_log: Option<WireLog>,
        peer: Option<PeerId>,
    ) -> Result<Self, LinkError> {
        let shared = Shared::new(transport, frontend, wire_log);
        let accepted = match shared.transport.connect(peer).await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(kind = shared.transport.kind().as_str(), error = %err, "connect failed");
                shared.frontend.transport_error(&err.to_string());
                return Err(err.into());
            }
        };
        {
            let mut inner = shared.inner.lock();
            let before = inner.machine.state();
            inner.machine.connected(accepted);
            shared.apply(&mut inner, "connected", before, Vec::new());
        }
        shared.start_receiver();
        info!(
            kind = shared.transport.kind().as_str(),
            peer = ?shared.transport.peer().map(|p| p.to_string()),
            "session open"
        );
        Ok(Self { shared })
    }

    /// Send START_GAME, with the frontend's taunt if any.
    pub fn send_invitation(&self) -> Result<(), LinkError> {
        let shared = &self.shared;
        let mut inner = shared.inner.lock();
        let before = inner.machine.state();
        let taunt = match before {
            SessionState::NotStarted | SessionState::FoundPeer => {
                shared.frontend.take_outgoing_taunt()
            }
            _ => None,
        };
        let taunt = shared.fit_taunt(taunt, 0);
        let effects = inner.machine.send_invitation(taunt.as_deref())?;
        shared.apply(&mut inner, "invite", before, effects);
        Ok(())
    }

    /// Record one local move. Nothing is sent until [`end_turn`](Self::end_turn).
    pub fn move_piece(&self, mv: Move) -> Result<(), LinkError> {
        let mut inner = self.shared.inner.lock();
        inner.machine.local_move(mv)?;
        debug!(%mv, queued = inner.machine.pending_moves().len(), "local move");
        Ok(())
    }

    /// Finish the local turn and hand its moves to the sender.
    pub fn end_turn(&self) -> Result<(), LinkError> {
        let shared = &self.shared;
        let mut inner = shared.inner.lock();
        let before = inner.machine.state();
        let taunt = if before == SessionState::LocalTurn && !inner.machine.pending_moves().is_empty()
        {
            let taunt = shared.frontend.take_outgoing_taunt();
            shared.fit_taunt(taunt, inner.machine.pending_moves().len())
        } else {
            None
        };
        let effects = inner.machine.end_turn(taunt.as_deref())?;
        shared.apply(&mut inner, "end_turn", before, effects);
        Ok(())
    }

    /// Leave the game, telling the opponent with END_GAME.
    pub fn quit(&self) {
        let taunt = self.shared.frontend.take_outgoing_taunt();
        self.leave(taunt);
    }

    /// Leave the game with the "You Win!" taunt.
    pub fn concede(&self) {
        self.leave(Some(WIN_TAUNT.to_string()));
    }

    fn leave(&self, taunt: Option<String>) {
        let shared = &self.shared;
        let taunt = shared.fit_taunt(taunt, 0);
        let mut inner = shared.inner.lock();
        let before = inner.machine.state();
        let effects = inner.machine.quit(taunt.as_deref());
        shared.apply(&mut inner, "quit", before, effects);
    }

    /// Suspend the game and release the transport.
    ///
    /// A transport that cannot resume (the stream variant) quits instead.
    pub fn pause(&self) -> Result<(), LinkError> {
        let shared = &self.shared;
        if !shared.transport.resumable() {
            info!(
                kind = shared.transport.kind().as_str(),
                "transport cannot resume; pausing ends the game"
            );
            self.quit();
            return Ok(());
        }
        let mut inner = shared.inner.lock();
        let before = inner.machine.state();
        let effects = inner.machine.pause()?;
        shared.apply(&mut inner, "pause", before, effects);
        Ok(())
    }

    /// Reopen the transport and continue where [`pause`](Self::pause) left off.
    pub async fn resume(&self) -> Result<SessionState, LinkError> {
        let shared = &self.shared;
        let state = {
            let mut inner = shared.inner.lock();
            let before = inner.machine.state();
            let state = inner.machine.resume()?;
            shared.apply(&mut inner, "resume", before, Vec::new());
            state
        };

        let retired: Vec<JoinHandle<()>> = std::mem::take(&mut *shared.retired.lock());
        for handle in retired {
            let _ = handle.await;
        }

        match shared.transport.connect(None).await {
            Ok(_) => {
                shared.start_receiver();
                Ok(state)
            }
            Err(err) => {
                let mut inner = shared.inner.lock();
                let before = inner.machine.state();
                let effects = inner.machine.receive_failed(&err.to_string());
                shared.apply(&mut inner, "resume", before, effects);
                Err(err.into())
            }
        }
    }

    /// Best-effort END_GAME on application teardown.
    pub fn shutdown(&self) {
        let finished = self.shared.inner.lock().machine.is_finished();
        if !finished {
            self.leave(None);
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().machine.state()
    }

    /// Moves of the local turn in progress.
    pub fn pending_moves(&self) -> Vec<Move> {
        self.shared.inner.lock().machine.pending_moves().to_vec()
    }

    pub fn peer(&self) -> Option<PeerId> {
        self.shared.transport.peer()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.shared.transport.local_addr()
    }

    pub fn is_finished(&self) -> bool {
        *self.shared.finished.borrow()
    }

    /// Resolves once the session has finished.
    pub async fn wait_finished(&self) {
        let mut rx = self.shared.finished.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Shared {
    fn new(
        transport: Arc<dyn Transport>,
        frontend: Arc<dyn GameFrontend>,
        wire_log: Option<WireLog>,
    ) -> Arc<Self> {
        let (finished, _) = watch::channel(false);
        Arc::new_cyclic(|weak: &Weak<Shared>| {
            let on_outcome = {
                let weak = weak.clone();
                move |payload: &[u8], outcome: Result<(), TransportError>| {
                    if let Some(shared) = weak.upgrade() {
                        shared.on_send_outcome(payload, outcome);
                    }
                }
            };
            Shared {
                inner: Mutex::new(Inner {
                    machine: TurnMachine::new(),
                    error_reported: false,
                }),
                sender: SenderWorker::spawn(transport.clone(), on_outcome),
                transport,
                frontend,
                receiver: Mutex::new(None),
                retired: Mutex::new(Vec::new()),
                finished,
                wire_log,
            }
        })
    }

    fn start_receiver(self: &Arc<Self>) {
        let on_payload = {
            let weak = Arc::downgrade(self);
            move |payload: Vec<u8>| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_inbound(payload);
                }
            }
        };
        let on_error = {
            let weak = Arc::downgrade(self);
            move |err: TransportError| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_receive_error(err);
                }
            }
        };
        let handle = spawn_receive_loop(self.transport.clone(), on_payload, on_error);
        if let Some(old) = self.receiver.lock().replace(handle) {
            old.abort();
        }
    }

    /// Abort the receive task. A paused session keeps the handle so `resume`
    /// can wait for it to wind down before reconnecting.
    fn stop_receiver(&self, retire: bool) {
        if let Some(handle) = self.receiver.lock().take() {
            handle.abort();
            if retire {
                self.retired.lock().push(handle);
            }
        }
    }

    /// Drop a taunt that would push a payload of `moves` moves past the
    /// transport's limit. The moves and flag still go out.
    fn fit_taunt(&self, taunt: Option<String>, moves: usize) -> Option<String> {
        let Some(max_len) = self.transport.max_payload_len() else {
            return taunt;
        };
        let header_len = moves * MOVE_LEN + 1;
        match taunt {
            Some(text) if taunt_within(Some(&text), header_len, max_len).is_none() => {
                warn!(len = text.len(), max_len, "taunt does not fit in one payload; dropped");
                None
            }
            other => other,
        }
    }

    fn peer_label(&self) -> Option<String> {
        self.transport.peer().map(|p| p.to_string())
    }

    fn on_inbound(&self, payload: Vec<u8>) {
        if let Some(log) = &self.wire_log {
            log.record(Direction::In, self.peer_label(), &payload);
        }
        let msg = match decode(&payload) {
            Ok(msg) => msg,
            Err(err) => {
                warn!(error = %err, bytes = payload.len(), "discarding undecodable payload");
                return;
            }
        };
        let flag = msg.flag;
        let mut inner = self.inner.lock();
        let before = inner.machine.state();
        let effects = inner.machine.receive(msg);
        if effects.is_empty() {
            debug!(%flag, state = %before, "ignoring message not expected now");
        }
        self.apply(&mut inner, "receive", before, effects);
    }

    fn on_receive_error(&self, err: TransportError) {
        let mut inner = self.inner.lock();
        let before = inner.machine.state();
        let effects = inner.machine.receive_failed(&err.to_string());
        self.apply(&mut inner, "receive_failed", before, effects);
    }

    fn on_send_outcome(&self, payload: &[u8], outcome: Result<(), TransportError>) {
        let mut inner = self.inner.lock();
        let before = inner.machine.state();
        let effects = match outcome {
            Ok(()) => {
                if let Some(log) = &self.wire_log {
                    log.record(Direction::Out, self.peer_label(), payload);
                }
                if self.sender.is_pending() {
                    // A newer payload is queued; its completion drives the machine.
                    return;
                }
                inner.machine.send_completed()
            }
            Err(err) if before == SessionState::Paused => {
                debug!(error = %err, "send dropped while paused");
                return;
            }
            Err(err) => {
                warn!(error = %err, bytes = payload.len(), "send failed");
                inner.machine.send_failed(&err.to_string())
            }
        };
        self.apply(&mut inner, "send_done", before, effects);
    }

    /// Carry out the effects of one transition. Runs under the session lock.
    fn apply(
        &self,
        inner: &mut Inner,
        event: &'static str,
        before: SessionState,
        effects: Vec<Effect>,
    ) {
        let after = inner.machine.state();
        if before != after {
            info!(event, from = %before, to = %after, "session state changed");
        }

        for effect in effects {
            match effect {
                Effect::Send(payload) => {
                    self.sender.enqueue(payload);
                }
                Effect::ApplyRemoteMove(mv) => self.frontend.apply_remote_move(mv),
                Effect::EndOfRemoteTurn { taunt } => {
                    self.frontend.apply_end_of_remote_turn(taunt.as_deref())
                }
                Effect::Invitation { taunt } => {
                    let peer = self.peer_label().unwrap_or_else(|| "unknown".to_string());
                    info!(peer = %peer, "invitation received");
                    self.frontend.invitation_received(taunt.as_deref(), &peer);
                }
                Effect::GameOver { taunt } => self.frontend.game_over(taunt.as_deref()),
                Effect::TransportError(message) => {
                    if !inner.error_reported {
                        inner.error_reported = true;
                        self.frontend.transport_error(&message);
                    }
                }
                Effect::StopReceiving => self.stop_receiver(false),
                Effect::CloseTransport => {
                    self.stop_receiver(after == SessionState::Paused);
                    self.transport.close();
                }
                Effect::Finished => {
                    info!("session finished");
                    self.finished.send_replace(true);
                    self.frontend.session_finished();
                }
            }
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(handle) = self.receiver.get_mut().take() {
            handle.abort();
        }
        self.transport.close();
    }
}
