//! Network Layer
//!
//! WebSocket transport plus the matchmaking service it drives.
//! The matchmaker holds all shared state; the server only moves messages.

pub mod protocol;
pub mod server;
pub mod session;

pub use protocol::{ClientMessage, InboundEvent, ServerMessage, MatchFound, UpdateGame, GameOverInfo};
pub use server::{GameServer, GameServerError};
pub use session::{Matchmaker, Outbound, OutboxReceiver, SessionDirectory, SeedSource, EntropySeeds, FixedSeeds};
