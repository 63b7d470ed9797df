//! Game Logic Module
//!
//! Matchmaking and duel rules. No I/O happens here.
//!
//! ## Module Structure
//!
//! - `grid`: Mine layout, reveal matrix, grid generation
//! - `state`: Player identity, player pairs, the session state machine
//! - `queue`: FIFO waiting pool
//! - `events`: Outcomes produced by session transitions

pub mod events;
pub mod grid;
pub mod queue;
pub mod state;

// Re-export key types
pub use events::{ForfeitOutcome, MoveOutcome, RevealedCell};
pub use grid::{create_grid, Cell, Grid, RevealState};
pub use queue::{MatchQueue, QueueEntry};
pub use state::{MatchPhase, MatchSession, PlayerId, PlayerPair, SessionId, Stake};
