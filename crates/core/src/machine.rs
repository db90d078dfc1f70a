//! Turn machine - whose turn it is, and what has to happen next
//!
//! [`TurnMachine`] is the transition table of a two-player session with no I/O
//! of its own. Every operation mutates the state and returns the [`Effect`]s the
//! caller must carry out (payloads to enqueue, collaborator notifications,
//! transport teardown). The adapter's `Session` runs these methods under its
//! coarse lock, so local calls and inbound messages are applied one at a time.
//!
//! # Turn order
//!
//! The invitee moves first. The inviter sends START_GAME and waits in
//! [`SessionState::RemoteTurn`] once the invitation is on the wire; the invitee
//! enters [`SessionState::LocalTurn`] when the invitation arrives.
//!
//! ```
//! use checkers_link_core::machine::{Effect, TurnMachine};
//! use checkers_link_core::types::{Move, SessionState};
//!
//! let mut invitee = TurnMachine::new();
//! let invitation = checkers_link_core::codec::decode(&[0xFC]).unwrap();
//! invitee.receive(invitation);
//! assert_eq!(invitee.state(), SessionState::LocalTurn);
//!
//! invitee.local_move(Move::new(2, 5, 3, 4).unwrap()).unwrap();
//! let effects = invitee.end_turn(None).unwrap();
//! assert!(matches!(effects.as_slice(), [Effect::Send(_)]));
//! assert_eq!(invitee.state(), SessionState::SendingLocalTurn);
//!
//! invitee.send_completed();
//! assert_eq!(invitee.state(), SessionState::RemoteTurn);
//! ```

use crate::accumulator::MoveAccumulator;
use crate::codec::{encode_control, DecodedMessage};
use crate::error::TurnError;
use crate::types::{ControlFlag, Move, SessionState};

/// Work the session must perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Enqueue this payload on the sender worker.
    Send(Vec<u8>),
    /// Hand one opponent move to the game logic.
    ApplyRemoteMove(Move),
    /// The opponent finished moving.
    EndOfRemoteTurn { taunt: Option<String> },
    /// An invitation arrived.
    Invitation { taunt: Option<String> },
    /// The game ended (remotely, or by local quit).
    GameOver { taunt: Option<String> },
    /// Surface a transport failure to the user.
    TransportError(String),
    /// Stop the receiver but keep the sender alive for a final payload.
    StopReceiving,
    /// Tear the transport down.
    CloseTransport,
    /// The session is over; nothing else will happen.
    Finished,
}

/// Authoritative turn state for one session.
#[derive(Debug, Clone, Default)]
pub struct TurnMachine {
    state: SessionState,
    resume_to: SessionState,
    accumulator: MoveAccumulator,
    invitation_sent: bool,
    has_peer: bool,
    finished: bool,
}

impl TurnMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True once the session has nothing left to send or receive.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Moves queued for the local turn in progress.
    pub fn pending_moves(&self) -> &[Move] {
        self.accumulator.moves()
    }

    /// The transport came up. `accepted_invitation` is true when the connection
    /// was opened by the remote side.
    pub fn connected(&mut self, accepted_invitation: bool) {
        if accepted_invitation {
            self.has_peer = true;
            if self.state == SessionState::NotStarted {
                self.state = SessionState::FoundPeer;
            }
        }
    }

    /// Invite the opponent to play.
    pub fn send_invitation(&mut self, taunt: Option<&str>) -> Result<Vec<Effect>, TurnError> {
        match self.state {
            SessionState::NotStarted => {}
            SessionState::FoundPeer => self.state = SessionState::LocalTurn,
            state => {
                return Err(TurnError::IllegalState {
                    op: "invite",
                    state,
                })
            }
        }
        self.invitation_sent = true;
        self.has_peer = true;
        Ok(vec![Effect::Send(encode_control(
            ControlFlag::StartGame,
            taunt,
        ))])
    }

    /// Record one local move of the current turn.
    pub fn local_move(&mut self, mv: Move) -> Result<(), TurnError> {
        if self.state != SessionState::LocalTurn {
            return Err(TurnError::IllegalState {
                op: "move",
                state: self.state,
            });
        }
        self.accumulator.push(mv)
    }

    /// Close the local turn and produce its payload.
    pub fn end_turn(&mut self, taunt: Option<&str>) -> Result<Vec<Effect>, TurnError> {
        if self.state != SessionState::LocalTurn {
            return Err(TurnError::IllegalState {
                op: "end_turn",
                state: self.state,
            });
        }
        let payload = self.accumulator.finish(taunt).ok_or(TurnError::EmptyTurn)?;
        self.state = SessionState::SendingLocalTurn;
        Ok(vec![Effect::Send(payload)])
    }

    /// The sender put the last enqueued payload on the wire.
    pub fn send_completed(&mut self) -> Vec<Effect> {
        match self.state {
            SessionState::SendingLocalTurn => {
                self.state = SessionState::RemoteTurn;
                Vec::new()
            }
            SessionState::NotStarted if self.invitation_sent => {
                self.state = SessionState::RemoteTurn;
                Vec::new()
            }
            SessionState::GameOver => self.finish(),
            _ => Vec::new(),
        }
    }

    /// The sender failed. No retry: the session ends.
    pub fn send_failed(&mut self, message: &str) -> Vec<Effect> {
        if self.finished {
            return Vec::new();
        }
        if self.state == SessionState::GameOver {
            // The farewell did not make it; the game is over either way.
            return self.finish();
        }
        self.fail(message)
    }

    /// The receiver failed for a reason other than a local close.
    pub fn receive_failed(&mut self, message: &str) -> Vec<Effect> {
        if self.finished || !self.state.is_active() {
            return Vec::new();
        }
        self.fail(message)
    }

    /// Apply one decoded inbound payload.
    ///
    /// Messages that make no sense in the current state are ignored and produce
    /// no effects.
    pub fn receive(&mut self, msg: DecodedMessage) -> Vec<Effect> {
        match msg.flag {
            ControlFlag::StartGame => match self.state {
                SessionState::NotStarted | SessionState::FoundPeer => {
                    self.state = SessionState::LocalTurn;
                    self.has_peer = true;
                    vec![Effect::Invitation { taunt: msg.taunt }]
                }
                _ => Vec::new(),
            },
            ControlFlag::EndTurn => {
                let expecting = match self.state {
                    SessionState::RemoteTurn | SessionState::SendingLocalTurn => true,
                    SessionState::NotStarted => self.invitation_sent,
                    _ => false,
                };
                if !expecting {
                    return Vec::new();
                }
                let mut effects: Vec<Effect> =
                    msg.moves.into_iter().map(Effect::ApplyRemoteMove).collect();
                effects.push(Effect::EndOfRemoteTurn { taunt: msg.taunt });
                self.state = SessionState::LocalTurn;
                effects
            }
            ControlFlag::EndGame | ControlFlag::Eof => {
                if !self.state.is_active() {
                    return Vec::new();
                }
                self.state = SessionState::GameOver;
                self.accumulator.clear();
                let mut effects = vec![Effect::GameOver { taunt: msg.taunt }];
                effects.extend(self.finish());
                effects
            }
        }
    }

    /// The local player leaves the game.
    ///
    /// If a peer is known an END_GAME payload is produced; the session finishes
    /// once that send completes. Quitting again after game over finishes at once.
    pub fn quit(&mut self, taunt: Option<&str>) -> Vec<Effect> {
        if self.finished {
            return Vec::new();
        }
        match self.state {
            SessionState::GameOver => self.finish(),
            SessionState::Paused => {
                self.state = SessionState::GameOver;
                let mut effects = vec![Effect::GameOver { taunt: None }];
                effects.extend(self.finish());
                effects
            }
            SessionState::NotStarted if !self.has_peer => {
                self.state = SessionState::GameOver;
                let mut effects = vec![Effect::GameOver { taunt: None }];
                effects.extend(self.finish());
                effects
            }
            _ => {
                self.state = SessionState::GameOver;
                self.accumulator.clear();
                vec![
                    Effect::StopReceiving,
                    Effect::Send(encode_control(ControlFlag::EndGame, taunt)),
                    Effect::GameOver { taunt: None },
                ]
            }
        }
    }

    /// Suspend play. The turn in progress, if any, is dropped.
    pub fn pause(&mut self) -> Result<Vec<Effect>, TurnError> {
        match self.state {
            SessionState::LocalTurn | SessionState::RemoteTurn => {
                self.resume_to = self.state;
                self.state = SessionState::Paused;
                self.accumulator.clear();
                Ok(vec![Effect::CloseTransport])
            }
            state => Err(TurnError::IllegalState { op: "pause", state }),
        }
    }

    /// Return to the state held before [`pause`](Self::pause). The caller
    /// reconnects the transport.
    pub fn resume(&mut self) -> Result<SessionState, TurnError> {
        if self.state != SessionState::Paused {
            return Err(TurnError::IllegalState {
                op: "resume",
                state: self.state,
            });
        }
        self.state = self.resume_to;
        Ok(self.state)
    }

    fn fail(&mut self, message: &str) -> Vec<Effect> {
        self.state = SessionState::GameOver;
        self.accumulator.clear();
        let mut effects = vec![Effect::TransportError(message.to_string())];
        effects.extend(self.finish());
        effects
    }

    fn finish(&mut self) -> Vec<Effect> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;
        vec![Effect::CloseTransport, Effect::Finished]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode_control, encode_turn};

    fn mv(a: i8, b: i8, c: i8, d: i8) -> Move {
        Move::new(a, b, c, d).unwrap()
    }

    fn inbound(moves: &[Move], flag: ControlFlag, taunt: Option<&str>) -> DecodedMessage {
        decode(&encode_turn(moves, flag, taunt)).unwrap()
    }

    fn invitee() -> TurnMachine {
        let mut m = TurnMachine::new();
        m.receive(inbound(&[], ControlFlag::StartGame, None));
        m
    }

    fn waiting_inviter() -> TurnMachine {
        let mut m = TurnMachine::new();
        m.send_invitation(None).unwrap();
        m.send_completed();
        m
    }

    #[test]
    fn test_new_machine_is_not_started() {
        let m = TurnMachine::new();
        assert_eq!(m.state(), SessionState::NotStarted);
        assert!(!m.is_finished());
    }

    #[test]
    fn test_accepted_connection_finds_peer() {
        let mut m = TurnMachine::new();
        m.connected(false);
        assert_eq!(m.state(), SessionState::NotStarted);
        m.connected(true);
        assert_eq!(m.state(), SessionState::FoundPeer);
    }

    #[test]
    fn test_invitation_from_not_started_waits_for_send() {
        let mut m = TurnMachine::new();
        let effects = m.send_invitation(Some("let's go")).unwrap();
        assert_eq!(
            effects,
            vec![Effect::Send(encode_control(
                ControlFlag::StartGame,
                Some("let's go")
            ))]
        );
        assert_eq!(m.state(), SessionState::NotStarted);
        m.send_completed();
        assert_eq!(m.state(), SessionState::RemoteTurn);
    }

    #[test]
    fn test_invitation_after_found_peer_is_local_turn() {
        let mut m = TurnMachine::new();
        m.connected(true);
        m.send_invitation(None).unwrap();
        assert_eq!(m.state(), SessionState::LocalTurn);
    }

    #[test]
    fn test_invitation_rejected_mid_game() {
        let mut m = invitee();
        assert_eq!(
            m.send_invitation(None),
            Err(TurnError::IllegalState {
                op: "invite",
                state: SessionState::LocalTurn
            })
        );
    }

    #[test]
    fn test_inbound_invitation_starts_local_turn() {
        let mut m = TurnMachine::new();
        let effects = m.receive(inbound(&[], ControlFlag::StartGame, Some("play me")));
        assert_eq!(
            effects,
            vec![Effect::Invitation {
                taunt: Some("play me".into())
            }]
        );
        assert_eq!(m.state(), SessionState::LocalTurn);
    }

    #[test]
    fn test_move_rejected_outside_local_turn() {
        let mut m = TurnMachine::new();
        assert!(matches!(
            m.local_move(mv(0, 0, 1, 1)),
            Err(TurnError::IllegalState { op: "move", .. })
        ));
        let mut m = waiting_inviter();
        assert!(m.local_move(mv(0, 0, 1, 1)).is_err());
        assert!(m.pending_moves().is_empty());
    }

    #[test]
    fn test_end_turn_only_from_local_turn() {
        let mut m = waiting_inviter();
        assert!(matches!(
            m.end_turn(None),
            Err(TurnError::IllegalState { op: "end_turn", .. })
        ));
        assert_eq!(m.state(), SessionState::RemoteTurn);

        let mut m = invitee();
        assert_eq!(m.end_turn(None), Err(TurnError::EmptyTurn));
        assert_eq!(m.state(), SessionState::LocalTurn);

        m.local_move(mv(0, 0, 1, 1)).unwrap();
        m.local_move(mv(1, 1, 2, 2)).unwrap();
        let effects = m.end_turn(Some("haha")).unwrap();
        assert_eq!(
            effects,
            vec![Effect::Send(encode_turn(
                &[mv(0, 0, 1, 1), mv(1, 1, 2, 2)],
                ControlFlag::EndTurn,
                Some("haha")
            ))]
        );
        assert_eq!(m.state(), SessionState::SendingLocalTurn);
        assert!(m.pending_moves().is_empty());
    }

    #[test]
    fn test_remote_turn_applies_moves_then_hands_over() {
        let mut m = waiting_inviter();
        let effects = m.receive(inbound(
            &[mv(2, 5, 4, 3), mv(4, 3, 6, 1)],
            ControlFlag::EndTurn,
            Some("ouch"),
        ));
        assert_eq!(
            effects,
            vec![
                Effect::ApplyRemoteMove(mv(2, 5, 4, 3)),
                Effect::ApplyRemoteMove(mv(4, 3, 6, 1)),
                Effect::EndOfRemoteTurn {
                    taunt: Some("ouch".into())
                },
            ]
        );
        assert_eq!(m.state(), SessionState::LocalTurn);
    }

    #[test]
    fn test_reply_before_send_completion_is_accepted() {
        let mut m = invitee();
        m.local_move(mv(0, 0, 1, 1)).unwrap();
        m.end_turn(None).unwrap();
        m.receive(inbound(&[mv(7, 7, 6, 6)], ControlFlag::EndTurn, None));
        assert_eq!(m.state(), SessionState::LocalTurn);
        // Late completion must not steal the new local turn.
        m.send_completed();
        assert_eq!(m.state(), SessionState::LocalTurn);
    }

    #[test]
    fn test_end_turn_ignored_during_local_turn() {
        let mut m = invitee();
        let effects = m.receive(inbound(&[mv(0, 0, 1, 1)], ControlFlag::EndTurn, None));
        assert!(effects.is_empty());
        assert_eq!(m.state(), SessionState::LocalTurn);
    }

    #[test]
    fn test_remote_end_game_finishes_session() {
        let mut m = waiting_inviter();
        let effects = m.receive(inbound(&[], ControlFlag::EndGame, None));
        assert_eq!(
            effects,
            vec![
                Effect::GameOver { taunt: None },
                Effect::CloseTransport,
                Effect::Finished
            ]
        );
        assert_eq!(m.state(), SessionState::GameOver);
        assert!(m.is_finished());
        assert!(m.receive(inbound(&[], ControlFlag::Eof, None)).is_empty());
    }

    #[test]
    fn test_quit_sends_end_game_and_finishes_after_send() {
        let mut m = invitee();
        let effects = m.quit(Some("You Win!"));
        assert_eq!(
            effects,
            vec![
                Effect::StopReceiving,
                Effect::Send(encode_control(ControlFlag::EndGame, Some("You Win!"))),
                Effect::GameOver { taunt: None },
            ]
        );
        assert_eq!(m.state(), SessionState::GameOver);
        assert!(!m.is_finished());
        assert_eq!(
            m.send_completed(),
            vec![Effect::CloseTransport, Effect::Finished]
        );
        assert!(m.is_finished());
    }

    #[test]
    fn test_quit_without_peer_finishes_immediately() {
        let mut m = TurnMachine::new();
        let effects = m.quit(None);
        assert!(effects.contains(&Effect::Finished));
        assert!(!effects.iter().any(|e| matches!(e, Effect::Send(_))));
    }

    #[test]
    fn test_quit_twice_finishes_without_second_send() {
        let mut m = invitee();
        m.quit(None);
        assert_eq!(m.quit(None), vec![Effect::CloseTransport, Effect::Finished]);
        assert!(m.quit(None).is_empty());
    }

    #[test]
    fn test_pause_during_remote_turn_resumes_remote_turn() {
        let mut m = waiting_inviter();
        assert_eq!(m.pause().unwrap(), vec![Effect::CloseTransport]);
        assert_eq!(m.state(), SessionState::Paused);
        assert_eq!(m.resume().unwrap(), SessionState::RemoteTurn);
        assert_eq!(m.state(), SessionState::RemoteTurn);
    }

    #[test]
    fn test_pause_drops_turn_in_progress() {
        let mut m = invitee();
        m.local_move(mv(0, 0, 1, 1)).unwrap();
        m.pause().unwrap();
        assert!(m.pending_moves().is_empty());
        assert_eq!(m.resume().unwrap(), SessionState::LocalTurn);
        assert_eq!(m.end_turn(None), Err(TurnError::EmptyTurn));
    }

    #[test]
    fn test_pause_from_game_over_is_rejected() {
        let mut m = waiting_inviter();
        m.receive(inbound(&[], ControlFlag::EndGame, None));
        assert!(matches!(
            m.pause(),
            Err(TurnError::IllegalState { op: "pause", .. })
        ));
        assert!(m.resume().is_err());
    }

    #[test]
    fn test_send_failure_reports_once_and_ends_game() {
        let mut m = invitee();
        m.local_move(mv(0, 0, 1, 1)).unwrap();
        m.end_turn(None).unwrap();
        let effects = m.send_failed("connection refused");
        assert_eq!(
            effects,
            vec![
                Effect::TransportError("connection refused".into()),
                Effect::CloseTransport,
                Effect::Finished
            ]
        );
        assert_eq!(m.state(), SessionState::GameOver);
        assert!(m.send_failed("again").is_empty());
        assert!(m.receive_failed("again").is_empty());
    }

    #[test]
    fn test_failed_farewell_still_finishes() {
        let mut m = invitee();
        m.quit(None);
        assert_eq!(
            m.send_failed("peer gone"),
            vec![Effect::CloseTransport, Effect::Finished]
        );
    }
}
