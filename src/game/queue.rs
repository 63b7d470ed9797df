//! Matchmaking Queue
//!
//! FIFO waiting pool. Earliest joiners are paired first and a player never
//! appears in the pool twice.

use std::collections::VecDeque;
use chrono::{DateTime, Utc};

use crate::game::state::{PlayerId, Stake};

/// A player waiting for an opponent.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    /// Waiting player.
    pub player: PlayerId,
    /// Stake supplied on join.
    pub stake: Stake,
    /// When the player joined.
    pub joined_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Milliseconds spent waiting as of `now`.
    pub fn waited_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.joined_at).num_milliseconds()
    }
}

/// The waiting pool.
#[derive(Debug, Default)]
pub struct MatchQueue {
    entries: VecDeque<QueueEntry>,
}

impl MatchQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a player. Returns false if the player is already queued.
    pub fn enqueue(&mut self, player: PlayerId, stake: Stake) -> bool {
        if self.contains(player) {
            return false;
        }
        self.entries.push_back(QueueEntry {
            player,
            stake,
            joined_at: Utc::now(),
        });
        true
    }

    /// Remove and return the two oldest entries, if two are waiting.
    pub fn dequeue_pair_if_ready(&mut self) -> Option<(QueueEntry, QueueEntry)> {
        if self.entries.len() < 2 {
            return None;
        }
        let first = self.entries.pop_front()?;
        let second = self.entries.pop_front()?;
        Some((first, second))
    }

    /// Put a dequeued pair back at the head of the queue, in order.
    pub fn restore_pair(&mut self, first: QueueEntry, second: QueueEntry) {
        self.entries.push_front(second);
        self.entries.push_front(first);
    }

    /// Remove a player if queued. Returns whether a removal happened.
    pub fn remove_if_queued(&mut self, player: PlayerId) -> bool {
        match self.entries.iter().position(|e| e.player == player) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether the player is waiting.
    pub fn contains(&self, player: PlayerId) -> bool {
        self.entries.iter().any(|e| e.player == player)
    }

    /// Number of waiting players.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nobody is waiting.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
