//! Session Outcomes
//!
//! Results produced by a session when it changes state. The network layer
//! turns these into outbound messages.

use serde::{Deserialize, Serialize};

use crate::game::state::PlayerId;

/// The cell a move just revealed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedCell {
    /// Row index.
    pub row: usize,
    /// Column index.
    pub col: usize,
    /// Whether the cell held a mine.
    pub is_mine: bool,
}

/// State after a successfully resolved move.
///
/// Both players receive the same outcome.
#[derive(Clone, Debug, PartialEq)]
pub struct MoveOutcome {
    /// Full reveal matrix after the move.
    pub revealed_cells: Vec<Vec<bool>>,
    /// Turn holder after the move. Unchanged when a mine ended the game.
    pub current_player: PlayerId,
    /// Whether the move ended the session.
    pub game_over: bool,
    /// Winner, set only when the game ended.
    pub winner: Option<PlayerId>,
    /// The cell just revealed.
    pub last_revealed: RevealedCell,
}

/// A session ended because one player left.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForfeitOutcome {
    /// The player who disconnected.
    pub leaver: PlayerId,
    /// The remaining player, awarded the win.
    pub winner: PlayerId,
}
