//! Core protocol logic - pure, deterministic, and testable
//!
//! This crate contains the turn-synchronization rules of a two-player checkers
//! link. It has **zero dependencies** on sockets, threads, or the UI, making it:
//!
//! - **Deterministic**: the same calls always produce the same bytes and states
//! - **Testable**: every transition is covered by unit tests
//! - **Portable**: usable behind any transport that can carry a byte payload
//!
//! # Module Structure
//!
//! - [`codec`]: turn payload encoding, decoding, and stream framing
//! - [`accumulator`]: the local turn in progress (multi-jump chains)
//! - [`machine`]: the session state machine and the effects it asks for
//! - [`error`]: decode and turn errors
//!
//! # Wire Format
//!
//! ```text
//! [srcX srcY dstX dstY]* FLAG [taunt UTF-8]?
//! ```
//!
//! Flags (`START_GAME`, `END_GAME`, `END_TURN`, `EOF`) use negative byte values
//! that no board coordinate may take, so a decoder always knows whether the next
//! byte opens a move block or closes the message.
//!
//! # Example
//!
//! ```
//! use checkers_link_core::{decode, MoveAccumulator};
//! use checkers_link_core::types::{ControlFlag, Move};
//!
//! let mut turn = MoveAccumulator::new();
//! turn.push(Move::new(0, 0, 1, 1).unwrap()).unwrap();
//! turn.push(Move::new(1, 1, 2, 2).unwrap()).unwrap();
//! let payload = turn.finish(Some("haha")).unwrap();
//!
//! let msg = decode(&payload).unwrap();
//! assert_eq!(msg.moves.len(), 2);
//! assert_eq!(msg.flag, ControlFlag::EndTurn);
//! assert_eq!(msg.taunt.as_deref(), Some("haha"));
//! ```

pub mod accumulator;
pub mod codec;
pub mod error;
pub mod machine;

pub use checkers_link_types as types;

// Re-export commonly used items for convenience
pub use accumulator::MoveAccumulator;
pub use codec::{
    decode, encode_control, encode_turn, frame_len, strip_taunt, taunt_within, DecodedMessage,
};
pub use error::{DecodeError, TurnError};
pub use machine::{Effect, TurnMachine};
