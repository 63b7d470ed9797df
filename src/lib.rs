//! # Mine Duel Server
//!
//! Matchmaking and authoritative turn resolution for two-player
//! minesweeper duels.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    MINE DUEL SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  config.rs       - Grid and server configuration             │
//! │                                                              │
//! │  core/                                                       │
//! │  └── rng.rs      - Seeded Xorshift128+ PRNG                  │
//! │                                                              │
//! │  game/           - Rules (no I/O)                            │
//! │  ├── grid.rs     - Mine layout and reveal matrix             │
//! │  ├── state.rs    - Players and the session state machine     │
//! │  ├── queue.rs    - FIFO waiting pool                         │
//! │  └── events.rs   - Move and forfeit outcomes                 │
//! │                                                              │
//! │  network/                                                    │
//! │  ├── session.rs  - Session directory and matchmaker          │
//! │  ├── protocol.rs - Message types                             │
//! │  └── server.rs   - WebSocket server                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Flow
//!
//! 1. `joinQueue` appends to the pool; two waiting players are paired in
//!    arrival order and each receives `matchFound`.
//! 2. `selectCell` from the turn holder reveals a cell; both players receive
//!    the same `updateGame`. A mine ends the game in the opponent's favour.
//! 3. A disconnect removes the player from the pool and forfeits any
//!    session, sending `gameOver` to the remaining player.
//!
//! Anything else (wrong turn, revealed cell, off-grid coordinates, no
//! session) is ignored without a reply.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::config::{ConfigError, GridConfig, ServerConfig};
pub use crate::core::rng::SessionRng;
pub use crate::game::state::{MatchSession, PlayerId, PlayerPair, Stake};
pub use crate::game::queue::MatchQueue;
pub use crate::network::session::{Matchmaker, SessionDirectory};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default grid side length.
pub const DEFAULT_GRID_SIZE: usize = 5;

/// Default mines per grid.
pub const DEFAULT_MINE_COUNT: usize = 3;
