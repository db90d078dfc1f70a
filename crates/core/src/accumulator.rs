//! Move accumulator - the local turn in progress
//!
//! A checkers turn can be a chain of jumps. Every jump is recorded here and the
//! whole chain leaves as one END_TURN payload when the turn finishes; nothing is
//! ever flushed part-way.

use arrayvec::ArrayVec;

use crate::codec::encode_turn;
use crate::error::TurnError;
use crate::types::{ControlFlag, Move, MAX_MOVES_PER_TURN};

/// Pending outbound moves for the current local turn.
#[derive(Debug, Clone, Default)]
pub struct MoveAccumulator {
    moves: ArrayVec<Move, MAX_MOVES_PER_TURN>,
}

impl MoveAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a move, keeping the ones already queued.
    pub fn push(&mut self, mv: Move) -> Result<(), TurnError> {
        self.moves.try_push(mv).map_err(|_| TurnError::TurnFull)
    }

    /// Terminate the turn with END_TURN and hand back the payload.
    ///
    /// Returns `None` (and leaves nothing behind) when no move was queued.
    pub fn finish(&mut self, taunt: Option<&str>) -> Option<Vec<u8>> {
        if self.moves.is_empty() {
            return None;
        }
        let payload = encode_turn(&self.moves, ControlFlag::EndTurn, taunt);
        self.moves.clear();
        Some(payload)
    }

    /// Drop the turn in progress.
    pub fn clear(&mut self) {
        self.moves.clear();
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}
