//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Messages are JSON objects tagged by a `type` field with camelCase names.

use serde::{Deserialize, Serialize};

use crate::game::events::{MoveOutcome, RevealedCell};
use crate::game::state::{PlayerId, Stake};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Enter the waiting pool.
    JoinQueue {
        /// Wager attached to the entry. Zero when omitted.
        #[serde(default, alias = "bet")]
        stake: Stake,
    },

    /// Leave the waiting pool.
    LeaveQueue,

    /// Reveal a cell. Coordinates are signed so that off-grid input parses
    /// and is ignored by the game rather than rejected as malformed.
    SelectCell {
        /// Row index.
        row: i64,
        /// Column index.
        col: i64,
    },
}

/// Everything the core can be told about a participant.
///
/// `Disconnect` has no wire form; the transport raises it when a socket closes.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Enter the waiting pool.
    JoinQueue {
        /// Wager attached to the entry.
        stake: Stake,
    },
    /// Leave the waiting pool.
    LeaveQueue,
    /// Reveal a cell.
    SelectCell {
        /// Row index.
        row: i64,
        /// Column index.
        col: i64,
    },
    /// Connection closed.
    Disconnect,
}

impl From<ClientMessage> for InboundEvent {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::JoinQueue { stake } => InboundEvent::JoinQueue { stake },
            ClientMessage::LeaveQueue => InboundEvent::LeaveQueue,
            ClientMessage::SelectCell { row, col } => InboundEvent::SelectCell { row, col },
        }
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Paired with an opponent. Each side gets its own copy.
    MatchFound(MatchFound),

    /// State after a resolved move, identical for both players.
    UpdateGame(UpdateGame),

    /// Opponent disconnected; the recipient wins.
    GameOver(GameOverInfo),

    /// Malformed frame.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown {
        /// Human-readable reason.
        reason: String,
    },
}

/// Opening state of a new session, addressed to one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFound {
    /// Mine layout.
    pub grid: Vec<Vec<bool>>,
    /// Reveal matrix (all hidden).
    pub revealed_cells: Vec<Vec<bool>>,
    /// Player who moves first.
    pub current_player: PlayerId,
    /// The recipient's opponent.
    pub opponent: PlayerId,
}

/// Session state after a move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGame {
    /// Reveal matrix.
    pub revealed_cells: Vec<Vec<bool>>,
    /// Turn holder.
    pub current_player: PlayerId,
    /// Whether the session ended.
    pub game_over: bool,
    /// Winner (null while playing).
    pub winner: Option<PlayerId>,
    /// Cell the move revealed.
    pub last_revealed_cell: RevealedCell,
}

impl From<MoveOutcome> for UpdateGame {
    fn from(outcome: MoveOutcome) -> Self {
        Self {
            revealed_cells: outcome.revealed_cells,
            current_player: outcome.current_player,
            game_over: outcome.game_over,
            winner: outcome.winner,
            last_revealed_cell: outcome.last_revealed,
        }
    }
}

/// Forfeit notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOverInfo {
    /// The remaining player.
    pub winner: PlayerId,
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Frame did not parse as a client message.
    InvalidMessage,
    /// Binary frames are not supported.
    UnsupportedFrame,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
