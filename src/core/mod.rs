//! Core primitives.
//!
//! Seeded randomness shared by grid generation and turn selection.

pub mod rng;

pub use rng::{derive_session_seed, SessionRng};
