//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the link.
//! All types are pure data structures with no external dependencies, making them
//! usable in any context (codec, state machine, transports, front ends).
//!
//! # Wire Constants
//!
//! A turn payload is made of 4-byte move blocks followed by one control flag byte
//! and an optional UTF-8 taunt:
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `START_GAME_FLAG` | -4 | Invitation to start a game |
//! | `END_GAME_FLAG` | -3 | Sender has left the game |
//! | `END_TURN_FLAG` | -2 | Sender's turn is over |
//! | `EOF_FLAG` | -1 | Stream peer closed (stream transport only) |
//! | `MOVE_LEN` | 4 | Bytes per move block |
//! | `DEFAULT_PORT` | 16474 | Rendezvous port for datagram play |
//!
//! Flags are negative and board coordinates are not, so a byte at the start of a
//! block is either a flag or the first coordinate of a move, never both.
//!
//! # Examples
//!
//! ```
//! use checkers_link_types::{ControlFlag, Move, SessionState};
//!
//! let mv = Move::new(0, 0, 1, 1).unwrap();
//! assert_eq!(mv.to_bytes(), [0, 0, 1, 1]);
//!
//! assert_eq!(ControlFlag::from_byte(-2), Some(ControlFlag::EndTurn));
//! assert_eq!(ControlFlag::from_byte(3), None);
//!
//! assert_eq!(SessionState::from_str("remote_turn"), Some(SessionState::RemoteTurn));
//! ```

use std::fmt;

/// Flag byte: invitation to start a game.
pub const START_GAME_FLAG: i8 = -4;

/// Flag byte: the sender has ended the game.
pub const END_GAME_FLAG: i8 = -3;

/// Flag byte: the sender's turn is over.
pub const END_TURN_FLAG: i8 = -2;

/// Flag byte: the stream peer closed its end.
pub const EOF_FLAG: i8 = -1;

/// Bytes per move block on the wire.
pub const MOVE_LEN: usize = 4;

/// Largest valid board coordinate.
pub const MAX_COORD: i8 = i8::MAX;

/// Board edge length for standard checkers.
pub const BOARD_SIZE: i8 = 8;

/// Upper bound on moves in one turn (a long multi-jump chain).
pub const MAX_MOVES_PER_TURN: usize = 16;

/// Default rendezvous port for the datagram transport.
pub const DEFAULT_PORT: u16 = 16474;

/// One piece movement: source square to destination square.
///
/// Coordinates are signed bytes on the wire but must be non-negative; the negative
/// range is reserved for [`ControlFlag`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub src_x: i8,
    pub src_y: i8,
    pub dst_x: i8,
    pub dst_y: i8,
}

impl Move {
    /// Create a move, or `None` if any coordinate is outside `0..=MAX_COORD`.
    ///
    /// # Examples
    ///
    /// ```
    /// use checkers_link_types::Move;
    ///
    /// assert!(Move::new(2, 5, 3, 4).is_some());
    /// assert!(Move::new(-2, 5, 3, 4).is_none());
    /// ```
    pub fn new(src_x: i8, src_y: i8, dst_x: i8, dst_y: i8) -> Option<Self> {
        if [src_x, src_y, dst_x, dst_y].iter().all(|&c| is_valid_coord(c)) {
            Some(Self {
                src_x,
                src_y,
                dst_x,
                dst_y,
            })
        } else {
            None
        }
    }

    /// Build a move from a wire block.
    pub fn from_bytes(bytes: [i8; MOVE_LEN]) -> Option<Self> {
        Self::new(bytes[0], bytes[1], bytes[2], bytes[3])
    }

    /// Wire representation `[src_x, src_y, dst_x, dst_y]`.
    pub fn to_bytes(&self) -> [i8; MOVE_LEN] {
        [self.src_x, self.src_y, self.dst_x, self.dst_y]
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{})->({},{})",
            self.src_x, self.src_y, self.dst_x, self.dst_y
        )
    }
}

/// Whether `c` may appear as a board coordinate.
pub fn is_valid_coord(c: i8) -> bool {
    (0..=MAX_COORD).contains(&c)
}

/// Session-level signal carried by exactly one byte per payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlFlag {
    StartGame,
    EndGame,
    EndTurn,
    /// Only produced by the stream transport when the peer hangs up.
    Eof,
}

impl ControlFlag {
    pub const ALL: [ControlFlag; 4] = [
        ControlFlag::StartGame,
        ControlFlag::EndGame,
        ControlFlag::EndTurn,
        ControlFlag::Eof,
    ];

    /// Wire byte for this flag.
    pub fn as_byte(&self) -> i8 {
        match self {
            ControlFlag::StartGame => START_GAME_FLAG,
            ControlFlag::EndGame => END_GAME_FLAG,
            ControlFlag::EndTurn => END_TURN_FLAG,
            ControlFlag::Eof => EOF_FLAG,
        }
    }

    /// Parse a wire byte; `None` if the byte is not a flag.
    pub fn from_byte(b: i8) -> Option<Self> {
        match b {
            START_GAME_FLAG => Some(ControlFlag::StartGame),
            END_GAME_FLAG => Some(ControlFlag::EndGame),
            END_TURN_FLAG => Some(ControlFlag::EndTurn),
            EOF_FLAG => Some(ControlFlag::Eof),
            _ => None,
        }
    }

    /// True for any byte value reserved for flags.
    pub fn is_reserved(b: i8) -> bool {
        Self::from_byte(b).is_some()
    }

    /// Flags that end the game for the receiver.
    pub fn ends_game(&self) -> bool {
        matches!(self, ControlFlag::EndGame | ControlFlag::Eof)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlFlag::StartGame => "start_game",
            ControlFlag::EndGame => "end_game",
            ControlFlag::EndTurn => "end_turn",
            ControlFlag::Eof => "eof",
        }
    }
}

impl fmt::Display for ControlFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turn-synchronization state of one session.
///
/// The invitee moves first: receiving START_GAME leads to `LocalTurn`, while the
/// inviter waits in `RemoteTurn` once its invitation is on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No opponent yet.
    #[default]
    NotStarted,
    /// The transport accepted an inbound connection; invitation not yet read.
    FoundPeer,
    /// Local player is moving.
    LocalTurn,
    /// Local turn handed to the sender, not yet on the wire.
    SendingLocalTurn,
    /// Waiting for the opponent.
    RemoteTurn,
    /// Terminal.
    GameOver,
    /// Transport torn down, board kept.
    Paused,
}

impl SessionState {
    /// States in which the session still talks to a peer.
    pub fn is_active(&self) -> bool {
        !matches!(self, SessionState::GameOver | SessionState::Paused)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::NotStarted => "not_started",
            SessionState::FoundPeer => "found_peer",
            SessionState::LocalTurn => "local_turn",
            SessionState::SendingLocalTurn => "sending_local_turn",
            SessionState::RemoteTurn => "remote_turn",
            SessionState::GameOver => "game_over",
            SessionState::Paused => "paused",
        }
    }

    /// Parse from the snake_case name (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "not_started" => Some(SessionState::NotStarted),
            "found_peer" => Some(SessionState::FoundPeer),
            "local_turn" => Some(SessionState::LocalTurn),
            "sending_local_turn" => Some(SessionState::SendingLocalTurn),
            "remote_turn" => Some(SessionState::RemoteTurn),
            "game_over" => Some(SessionState::GameOver),
            "paused" => Some(SessionState::Paused),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which transport carries the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportKind {
    /// Independent fire-and-forget messages (UDP).
    #[default]
    Datagram,
    /// One persistent byte stream (TCP).
    Stream,
}

impl TransportKind {
    /// Parse from string (case-insensitive). Accepts "datagram" | "udp" | "sms"
    /// and "stream" | "tcp" | "bluetooth".
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "datagram" | "udp" | "sms" => Some(TransportKind::Datagram),
            "stream" | "tcp" | "bluetooth" => Some(TransportKind::Stream),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Datagram => "datagram",
            TransportKind::Stream => "stream",
        }
    }
}

/// Normalized transport address of the opponent (`host:port`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerId(String);

impl PeerId {
    /// Wrap an already-normalized address.
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// Normalize a raw transport address by stripping any `scheme://` prefix.
    ///
    /// # Examples
    ///
    /// ```
    /// use checkers_link_types::PeerId;
    ///
    /// assert_eq!(PeerId::from_raw("udp://10.0.0.2:16474").as_str(), "10.0.0.2:16474");
    /// assert_eq!(PeerId::from_raw("10.0.0.2:16474").as_str(), "10.0.0.2:16474");
    /// ```
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.split_once("://") {
            Some((_, rest)) => Self(rest.to_string()),
            None => Self(trimmed.to_string()),
        }
    }

    /// Normalize and append `default_port` when the address has none.
    ///
    /// # Examples
    ///
    /// ```
    /// use checkers_link_types::PeerId;
    ///
    /// assert_eq!(PeerId::with_default_port("10.0.0.2", 16474).as_str(), "10.0.0.2:16474");
    /// assert_eq!(PeerId::with_default_port("10.0.0.2:9000", 16474).as_str(), "10.0.0.2:9000");
    /// ```
    pub fn with_default_port(raw: &str, default_port: u16) -> Self {
        let peer = Self::from_raw(raw);
        let has_port = peer
            .0
            .rsplit_once(':')
            .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
            .unwrap_or(false);
        if has_port {
            peer
        } else {
            Self(format!("{}:{}", peer.0, default_port))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
