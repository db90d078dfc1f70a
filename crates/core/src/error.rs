//! Error types for the pure protocol logic.

use thiserror::Error;

use crate::types::SessionState;

/// A payload that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty payload")]
    Empty,
    /// Fewer than four bytes were left and none of them was a flag.
    #[error("truncated move block at offset {offset}: {remaining} byte(s) left")]
    Truncated { offset: usize, remaining: usize },
    #[error("invalid coordinate {value} at offset {offset}")]
    InvalidCoordinate { offset: usize, value: i8 },
}

/// A local turn operation the state machine refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("{op} is not allowed in state {state}")]
    IllegalState {
        op: &'static str,
        state: SessionState,
    },
    #[error("cannot end a turn without moves")]
    EmptyTurn,
    #[error("turn already holds the maximum number of moves")]
    TurnFull,
    #[error("move has a coordinate outside the board range")]
    InvalidMove,
}
