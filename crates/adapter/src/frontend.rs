//! The game-facing side of a session.

use crate::types::Move;

/// Callbacks from a session into the game UI and rules.
///
/// Callbacks run while the session holds its lock, on whichever task produced
/// the event. Implementations must return promptly and must not call back into
/// the session from inside a callback.
pub trait GameFrontend: Send + Sync {
    /// Apply one opponent move to the board.
    fn apply_remote_move(&self, mv: Move);

    /// The opponent finished their turn; it is the local player's turn now.
    fn apply_end_of_remote_turn(&self, taunt: Option<&str>);

    /// An opponent invited us. The local player moves first.
    fn invitation_received(&self, taunt: Option<&str>, peer: &str);

    /// The game ended, remotely or by local quit.
    fn game_over(&self, taunt: Option<&str>);

    /// A send or receive failed. Reported at most once per session.
    fn transport_error(&self, message: &str);

    /// The text the player typed into the taunt box, consumed on read.
    fn take_outgoing_taunt(&self) -> Option<String>;

    /// Nothing more will happen in this session.
    fn session_finished(&self) {}
}
