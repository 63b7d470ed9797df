//! Match Session State
//!
//! The authoritative state of one duel: the two players, the mine grid, the
//! reveal matrix and the turn pointer.
//!
//! ```text
//! Active ──mine hit──▶ ConcludedByMine
//!    │
//!    └───disconnect──▶ ConcludedByForfeit
//! ```
//!
//! Only `Active` accepts moves. Both concluded phases are terminal.

use std::fmt;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, GridConfig};
use crate::core::rng::SessionRng;
use crate::game::events::{ForfeitOutcome, MoveOutcome, RevealedCell};
use crate::game::grid::{create_grid, Grid, RevealState};

// =============================================================================
// PLAYER ID
// =============================================================================

/// Stable per-connection player identifier (UUID as bytes).
///
/// Serialized as a UUID string on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PlayerId(pub [u8; 16]);

impl PlayerId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Fresh random identifier.
    pub fn random() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s).ok().map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Short hex prefix for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uuid_string())
    }
}

impl From<PlayerId> for String {
    fn from(id: PlayerId) -> Self {
        id.to_uuid_string()
    }
}

impl TryFrom<String> for PlayerId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_uuid_str(&value).ok_or_else(|| format!("invalid player id: {}", value))
    }
}

/// Caller-supplied wager attached to a queue entry. Never interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stake(pub f64);

/// Unique session identifier.
pub type SessionId = [u8; 16];

// =============================================================================
// PLAYER PAIR
// =============================================================================

/// The two players of a session, in pairing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlayerPair([PlayerId; 2]);

impl PlayerPair {
    /// Pair two players.
    pub const fn new(first: PlayerId, second: PlayerId) -> Self {
        Self([first, second])
    }

    /// First player (earlier in the queue).
    pub fn first(&self) -> PlayerId {
        self.0[0]
    }

    /// Second player.
    pub fn second(&self) -> PlayerId {
        self.0[1]
    }

    /// Both players.
    pub fn both(&self) -> [PlayerId; 2] {
        self.0
    }

    /// Whether the player belongs to this pair.
    pub fn contains(&self, player: PlayerId) -> bool {
        self.0[0] == player || self.0[1] == player
    }

    /// The opponent of `player`, or None if `player` is not in the pair.
    pub fn other(&self, player: PlayerId) -> Option<PlayerId> {
        match self.0 {
            [a, b] if a == player => Some(b),
            [a, b] if b == player => Some(a),
            _ => None,
        }
    }
}

// =============================================================================
// MATCH SESSION
// =============================================================================

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Moves are accepted.
    Active,
    /// A player revealed a mine.
    ConcludedByMine,
    /// A player disconnected.
    ConcludedByForfeit,
}

impl MatchPhase {
    /// Whether the phase is terminal.
    pub fn is_concluded(self) -> bool {
        !matches!(self, MatchPhase::Active)
    }
}

/// One duel.
#[derive(Debug, Clone)]
pub struct MatchSession {
    id: SessionId,
    players: PlayerPair,
    grid: Grid,
    revealed: RevealState,
    current_turn: PlayerId,
    phase: MatchPhase,
    winner: Option<PlayerId>,
}

impl MatchSession {
    /// Start a session: place mines and flip a coin for the first turn.
    ///
    /// The grid config is validated before any state is built.
    pub fn start(
        id: SessionId,
        players: PlayerPair,
        config: &GridConfig,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        let mut rng = SessionRng::new(seed);
        let grid = create_grid(config, &mut rng)?;
        let first_turn = if rng.next_bool() {
            players.first()
        } else {
            players.second()
        };

        Ok(Self::with_grid(id, players, grid, first_turn))
    }

    /// Build a session from a known grid and opening player.
    ///
    /// If `first_turn` is not one of the pair, the first player opens.
    pub fn with_grid(id: SessionId, players: PlayerPair, grid: Grid, first_turn: PlayerId) -> Self {
        let current_turn = if players.contains(first_turn) {
            first_turn
        } else {
            players.first()
        };

        Self {
            id,
            players,
            revealed: RevealState::hidden(grid.side_length()),
            grid,
            current_turn,
            phase: MatchPhase::Active,
            winner: None,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Both players.
    pub fn players(&self) -> PlayerPair {
        self.players
    }

    /// Mine layout.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Reveal matrix.
    pub fn revealed(&self) -> &RevealState {
        &self.revealed
    }

    /// Player whose move it is.
    pub fn current_turn(&self) -> PlayerId {
        self.current_turn
    }

    /// Current phase.
    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Whether the session has ended.
    pub fn is_over(&self) -> bool {
        self.phase.is_concluded()
    }

    /// Winner, once the session has ended.
    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    /// Reveal a cell on behalf of `actor`.
    ///
    /// Returns None without touching state when the session is over, it is
    /// not `actor`'s turn, the coordinates are off the grid, or the cell is
    /// already revealed.
    pub fn resolve_move(&mut self, actor: PlayerId, row: i64, col: i64) -> Option<MoveOutcome> {
        if self.is_over() || self.current_turn != actor {
            return None;
        }
        let opponent = self.players.other(actor)?;
        let cell = self.grid.cell_at(row, col)?;
        if !self.revealed.reveal(cell) {
            return None;
        }

        let is_mine = self.grid.is_mine(cell);
        if is_mine {
            self.phase = MatchPhase::ConcludedByMine;
            self.winner = Some(opponent);
        } else {
            self.current_turn = opponent;
        }

        Some(MoveOutcome {
            revealed_cells: self.revealed.rows(),
            current_player: self.current_turn,
            game_over: self.is_over(),
            winner: self.winner,
            last_revealed: RevealedCell {
                row: cell.row,
                col: cell.col,
                is_mine,
            },
        })
    }

    /// End the session because `leaver` disconnected.
    ///
    /// The opponent wins regardless of turn or progress. Returns None if the
    /// session already ended or `leaver` is not a player here.
    pub fn forfeit(&mut self, leaver: PlayerId) -> Option<ForfeitOutcome> {
        if self.is_over() {
            return None;
        }
        let winner = self.players.other(leaver)?;

        self.phase = MatchPhase::ConcludedByForfeit;
        self.winner = Some(winner);

        Some(ForfeitOutcome { leaver, winner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::grid::Cell;

    const ALICE: PlayerId = PlayerId::new([1; 16]);
    const BOB: PlayerId = PlayerId::new([2; 16]);
    const MALLORY: PlayerId = PlayerId::new([9; 16]);

    fn session_with_mine_at(mine: Cell, first_turn: PlayerId) -> MatchSession {
        let grid = Grid::from_mines(5, &[mine]);
        MatchSession::with_grid([0; 16], PlayerPair::new(ALICE, BOB), grid, first_turn)
    }

    #[test]
    fn test_pair_other() {
        let pair = PlayerPair::new(ALICE, BOB);
        assert_eq!(pair.other(ALICE), Some(BOB));
        assert_eq!(pair.other(BOB), Some(ALICE));
        assert_eq!(pair.other(MALLORY), None);
        assert!(pair.contains(BOB));
        assert!(!pair.contains(MALLORY));
    }

    #[test]
    fn test_start_session() {
        let pair = PlayerPair::new(ALICE, BOB);
        let session = MatchSession::start([7; 16], pair, &GridConfig::default(), 1234).unwrap();

        assert_eq!(session.grid().mine_count(), 3);
        assert_eq!(session.revealed().revealed_count(), 0);
        assert!(pair.contains(session.current_turn()));
        assert_eq!(session.phase(), MatchPhase::Active);
        assert_eq!(session.winner(), None);
    }

    #[test]
    fn test_start_rejects_invalid_config() {
        let pair = PlayerPair::new(ALICE, BOB);
        let result = MatchSession::start([7; 16], pair, &GridConfig::new(2, 4), 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_coin_flip_picks_both_players() {
        let pair = PlayerPair::new(ALICE, BOB);
        let config = GridConfig::default();
        let openers: Vec<PlayerId> = (0..64)
            .map(|seed| MatchSession::start([0; 16], pair, &config, seed).unwrap().current_turn())
            .collect();

        assert!(openers.contains(&ALICE));
        assert!(openers.contains(&BOB));
    }

    #[test]
    fn test_safe_move_passes_turn() {
        let mut session = session_with_mine_at(Cell::new(4, 4), ALICE);

        let outcome = session.resolve_move(ALICE, 0, 0).unwrap();

        assert_eq!(outcome.current_player, BOB);
        assert!(!outcome.game_over);
        assert_eq!(outcome.winner, None);
        assert_eq!(outcome.last_revealed, RevealedCell { row: 0, col: 0, is_mine: false });
        assert!(outcome.revealed_cells[0][0]);
        assert_eq!(session.current_turn(), BOB);
        assert!(!session.is_over());
    }

    #[test]
    fn test_mine_hit_ends_game() {
        let mut session = session_with_mine_at(Cell::new(2, 3), ALICE);

        let outcome = session.resolve_move(ALICE, 2, 3).unwrap();

        assert!(outcome.game_over);
        assert_eq!(outcome.winner, Some(BOB));
        assert_eq!(outcome.current_player, ALICE);
        assert!(outcome.last_revealed.is_mine);
        assert_eq!(session.phase(), MatchPhase::ConcludedByMine);
        assert_eq!(session.current_turn(), ALICE);
        assert_eq!(session.winner(), Some(BOB));
    }

    #[test]
    fn test_out_of_turn_move_ignored() {
        let mut session = session_with_mine_at(Cell::new(4, 4), ALICE);
        let before = session.clone();

        assert!(session.resolve_move(BOB, 0, 0).is_none());
        assert!(session.resolve_move(MALLORY, 0, 0).is_none());

        assert_eq!(session.revealed(), before.revealed());
        assert_eq!(session.current_turn(), ALICE);
        assert!(!session.is_over());
    }

    #[test]
    fn test_reveal_is_idempotent() {
        let mut session = session_with_mine_at(Cell::new(4, 4), ALICE);
        session.resolve_move(ALICE, 1, 1).unwrap();
        session.resolve_move(BOB, 2, 2).unwrap();
        let before = session.clone();

        // Alice's turn again, same cell she already opened
        assert!(session.resolve_move(ALICE, 1, 1).is_none());

        assert_eq!(session.revealed(), before.revealed());
        assert_eq!(session.current_turn(), before.current_turn());
        assert_eq!(session.phase(), before.phase());
        assert_eq!(session.winner(), before.winner());
    }

    #[test]
    fn test_out_of_bounds_ignored() {
        let mut session = session_with_mine_at(Cell::new(4, 4), ALICE);

        assert!(session.resolve_move(ALICE, 5, 0).is_none());
        assert!(session.resolve_move(ALICE, 0, -1).is_none());
        assert!(session.resolve_move(ALICE, i64::MAX, i64::MIN).is_none());

        assert_eq!(session.revealed().revealed_count(), 0);
        assert_eq!(session.current_turn(), ALICE);
    }

    #[test]
    fn test_no_moves_after_game_over() {
        let mut session = session_with_mine_at(Cell::new(0, 0), ALICE);
        session.resolve_move(ALICE, 0, 0).unwrap();

        assert!(session.resolve_move(ALICE, 1, 1).is_none());
        assert!(session.resolve_move(BOB, 1, 1).is_none());
        assert_eq!(session.revealed().revealed_count(), 1);
    }

    #[test]
    fn test_forfeit_awards_opponent() {
        let mut session = session_with_mine_at(Cell::new(4, 4), ALICE);

        let outcome = session.forfeit(BOB).unwrap();

        assert_eq!(outcome, ForfeitOutcome { leaver: BOB, winner: ALICE });
        assert_eq!(session.phase(), MatchPhase::ConcludedByForfeit);
        assert_eq!(session.winner(), Some(ALICE));
        assert!(session.resolve_move(ALICE, 0, 0).is_none());
    }

    #[test]
    fn test_forfeit_by_turn_holder() {
        let mut session = session_with_mine_at(Cell::new(4, 4), ALICE);
        let outcome = session.forfeit(ALICE).unwrap();
        assert_eq!(outcome.winner, BOB);
    }

    #[test]
    fn test_forfeit_after_conclusion_ignored() {
        let mut session = session_with_mine_at(Cell::new(0, 0), ALICE);
        session.resolve_move(ALICE, 0, 0).unwrap();

        assert!(session.forfeit(BOB).is_none());
        assert_eq!(session.winner(), Some(BOB));
        assert_eq!(session.phase(), MatchPhase::ConcludedByMine);
    }

    #[test]
    fn test_forfeit_by_stranger_ignored() {
        let mut session = session_with_mine_at(Cell::new(0, 0), ALICE);
        assert!(session.forfeit(MALLORY).is_none());
        assert!(!session.is_over());
    }

    #[test]
    fn test_player_id_uuid_roundtrip() {
        let id = PlayerId::random();
        let parsed = PlayerId::from_uuid_str(&id.to_uuid_string()).unwrap();
        assert_eq!(id, parsed);
        assert_eq!(id.short().len(), 8);
    }
}
