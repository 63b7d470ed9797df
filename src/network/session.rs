//! Session Directory and Matchmaking Service
//!
//! Owns every piece of mutable server state: the waiting pool and the
//! player-to-session directory. Each inbound event is resolved to a list of
//! addressed outbound messages; the transport does the delivery.
//!
//! ## Locking
//!
//! The queue, the directory and every session have their own lock, so two
//! sessions never contend. Locks are always taken in the order
//! queue → directory → session, and a session lock is released before the
//! directory is touched again. Pairing keeps the queue locked until the new
//! session is registered, so a player is always either queued, in the
//! directory, or neither, never in between.
//!
//! ## Delivery order
//!
//! With an outbox attached, every message is pushed into it while the lock
//! that ordered the state change is still held. A single reader of the
//! outbox therefore sees `matchFound` before any `updateGame` or `gameOver`
//! of the same session.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, error, info};

use crate::config::{ConfigError, GridConfig};
use crate::core::rng::derive_session_seed;
use crate::game::queue::{MatchQueue, QueueEntry};
use crate::game::state::{MatchSession, PlayerId, PlayerPair, SessionId, Stake};
use crate::network::protocol::{
    GameOverInfo, InboundEvent, MatchFound, ServerMessage, UpdateGame,
};

/// A session shared by its two directory entries.
pub type SharedSession = Arc<Mutex<MatchSession>>;

/// Reader side of a matchmaker outbox.
pub type OutboxReceiver = mpsc::UnboundedReceiver<Outbound>;

/// A message addressed to one player.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    /// Recipient.
    pub recipient: PlayerId,
    /// Payload.
    pub message: ServerMessage,
}

impl Outbound {
    /// Address a message.
    pub fn new(recipient: PlayerId, message: ServerMessage) -> Self {
        Self { recipient, message }
    }
}

// =============================================================================
// SEED SOURCE
// =============================================================================

/// Supplies the RNG seed for a new session.
pub trait SeedSource: Send + Sync {
    /// Seed for the session about to start.
    fn session_seed(&self, session_id: &SessionId, players: &PlayerPair) -> u64;
}

/// Production seeds, derived from the random session UUID and both players.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntropySeeds;

impl SeedSource for EntropySeeds {
    fn session_seed(&self, session_id: &SessionId, players: &PlayerPair) -> u64 {
        let [a, b] = players.both();
        derive_session_seed(session_id, &[a.0, b.0])
    }
}

/// The same seed for every session.
#[derive(Debug, Clone, Copy)]
pub struct FixedSeeds(pub u64);

impl SeedSource for FixedSeeds {
    fn session_seed(&self, _session_id: &SessionId, _players: &PlayerPair) -> u64 {
        self.0
    }
}

// =============================================================================
// SESSION DIRECTORY
// =============================================================================

/// Maps each player to the session they are playing in.
///
/// An active session always has exactly two entries, one per player, both
/// pointing at the same session.
#[derive(Default)]
pub struct SessionDirectory {
    entries: BTreeMap<PlayerId, SharedSession>,
}

impl SessionDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register both players of a session.
    pub fn register(&mut self, players: PlayerPair, session: SharedSession) {
        for player in players.both() {
            self.entries.insert(player, session.clone());
        }
    }

    /// Session for a player.
    pub fn lookup(&self, player: PlayerId) -> Option<SharedSession> {
        self.entries.get(&player).cloned()
    }

    /// Whether the player is in a session.
    pub fn contains(&self, player: PlayerId) -> bool {
        self.entries.contains_key(&player)
    }

    /// Remove both entries of `session`.
    ///
    /// Entries that no longer point at `session` are left alone. Returns
    /// whether anything was removed.
    pub fn remove_session(&mut self, players: PlayerPair, session: &SharedSession) -> bool {
        let owned: Vec<PlayerId> = players
            .both()
            .into_iter()
            .filter(|p| {
                self.entries
                    .get(p)
                    .is_some_and(|entry| Arc::ptr_eq(entry, session))
            })
            .collect();

        for player in &owned {
            self.entries.remove(player);
        }
        !owned.is_empty()
    }

    /// Number of player entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no session is active.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of active sessions.
    pub fn session_count(&self) -> usize {
        self.entries.len() / 2
    }
}

// =============================================================================
// MATCHMAKER
// =============================================================================

/// The matchmaking service: waiting pool plus session directory.
pub struct Matchmaker {
    grid: GridConfig,
    queue: Mutex<MatchQueue>,
    directory: RwLock<SessionDirectory>,
    seeds: Box<dyn SeedSource>,
    outbox: Option<mpsc::UnboundedSender<Outbound>>,
}

impl Matchmaker {
    /// Create a matchmaker with random session seeds.
    pub fn new(grid: GridConfig) -> Result<Self, ConfigError> {
        Self::with_seed_source(grid, EntropySeeds)
    }

    /// Create a matchmaker with an explicit seed source.
    pub fn with_seed_source<S>(grid: GridConfig, seeds: S) -> Result<Self, ConfigError>
    where
        S: SeedSource + 'static,
    {
        grid.validate()?;
        Ok(Self {
            grid,
            queue: Mutex::new(MatchQueue::new()),
            directory: RwLock::new(SessionDirectory::new()),
            seeds: Box::new(seeds),
            outbox: None,
        })
    }

    /// Mirror every produced message into a channel, in commit order.
    ///
    /// Replaces any previously attached outbox.
    pub fn attach_outbox(&mut self) -> OutboxReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outbox = Some(tx);
        rx
    }

    /// Grid used for new sessions.
    pub fn grid_config(&self) -> &GridConfig {
        &self.grid
    }

    /// Dispatch an inbound event.
    pub async fn handle(&self, player: PlayerId, event: InboundEvent) -> Vec<Outbound> {
        match event {
            InboundEvent::JoinQueue { stake } => self.join_queue(player, stake).await,
            InboundEvent::LeaveQueue => {
                self.leave_queue(player).await;
                Vec::new()
            }
            InboundEvent::SelectCell { row, col } => self.select_cell(player, row, col).await,
            InboundEvent::Disconnect => self.handle_disconnect(player).await,
        }
    }

    /// Queue a player and start a session if two are waiting.
    ///
    /// A player already queued or already playing is ignored.
    pub async fn join_queue(&self, player: PlayerId, stake: Stake) -> Vec<Outbound> {
        let mut queue = self.queue.lock().await;

        if self.directory.read().await.contains(player) {
            debug!("Player {} is in a session, ignoring join", player.short());
            return Vec::new();
        }
        if !queue.enqueue(player, stake) {
            debug!("Player {} already queued", player.short());
            return Vec::new();
        }
        info!("Player {} joined queue with stake {}", player.short(), stake.0);

        let Some((first, second)) = queue.dequeue_pair_if_ready() else {
            debug!("Queue size {}", queue.len());
            return Vec::new();
        };

        let started = self.start_session(&first, &second).await;
        match started {
            // Published before the queue lock drops.
            Ok(messages) => self.publish(messages),
            Err(e) => {
                error!("Failed to start session: {}", e);
                queue.restore_pair(first, second);
                Vec::new()
            }
        }
    }

    /// Remove a player from the waiting pool.
    pub async fn leave_queue(&self, player: PlayerId) -> bool {
        let removed = self.queue.lock().await.remove_if_queued(player);
        if removed {
            debug!("Player {} left queue", player.short());
        }
        removed
    }

    /// Resolve a reveal. Ignored input produces no messages.
    pub async fn select_cell(&self, player: PlayerId, row: i64, col: i64) -> Vec<Outbound> {
        let Some(session) = self.directory.read().await.lookup(player) else {
            debug!("Player {} selected a cell outside any session", player.short());
            return Vec::new();
        };

        let (messages, finished) = {
            let mut guard = session.lock().await;
            let Some(outcome) = guard.resolve_move(player, row, col) else {
                debug!("Ignored move ({}, {}) from {}", row, col, player.short());
                return Vec::new();
            };

            if let (true, Some(winner)) = (outcome.game_over, outcome.winner) {
                info!(
                    "Player {} hit a mine at ({}, {}), {} wins",
                    player.short(),
                    outcome.last_revealed.row,
                    outcome.last_revealed.col,
                    winner.short()
                );
            }

            let players = guard.players();
            let finished = outcome.game_over.then_some(players);
            let update = ServerMessage::UpdateGame(UpdateGame::from(outcome));
            let messages = players
                .both()
                .into_iter()
                .map(|recipient| Outbound::new(recipient, update.clone()))
                .collect();
            (self.publish(messages), finished)
        };

        if let Some(players) = finished {
            self.directory.write().await.remove_session(players, &session);
        }
        messages
    }

    /// Drop a player from the queue and forfeit their session, if any.
    pub async fn handle_disconnect(&self, player: PlayerId) -> Vec<Outbound> {
        if self.queue.lock().await.remove_if_queued(player) {
            debug!("Removed disconnected player {} from queue", player.short());
        }

        let mut directory = self.directory.write().await;
        let Some(session) = directory.lookup(player) else {
            return Vec::new();
        };

        let messages = {
            let mut guard = session.lock().await;
            let forfeit = guard.forfeit(player);
            directory.remove_session(guard.players(), &session);

            match forfeit {
                Some(outcome) => {
                    info!(
                        "Player {} disconnected, {} wins by forfeit",
                        outcome.leaver.short(),
                        outcome.winner.short()
                    );
                    self.publish(vec![Outbound::new(
                        outcome.winner,
                        ServerMessage::GameOver(GameOverInfo { winner: outcome.winner }),
                    )])
                }
                None => Vec::new(),
            }
        };
        drop(directory);

        messages
    }

    /// Number of players waiting.
    pub async fn queue_len(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Whether the player is waiting.
    pub async fn is_queued(&self, player: PlayerId) -> bool {
        self.queue.lock().await.contains(player)
    }

    /// Number of active sessions.
    pub async fn session_count(&self) -> usize {
        self.directory.read().await.session_count()
    }

    /// Session a player is in.
    pub async fn session_for(&self, player: PlayerId) -> Option<SharedSession> {
        self.directory.read().await.lookup(player)
    }

    /// Copy messages into the outbox, if any, and hand them back.
    fn publish(&self, messages: Vec<Outbound>) -> Vec<Outbound> {
        if let Some(outbox) = &self.outbox {
            for out in &messages {
                if outbox.send(out.clone()).is_err() {
                    debug!("Outbox closed, dropping message for {}", out.recipient.short());
                }
            }
        }
        messages
    }

    /// Build and register a session. Called with the queue locked.
    async fn start_session(
        &self,
        first: &QueueEntry,
        second: &QueueEntry,
    ) -> Result<Vec<Outbound>, ConfigError> {
        let players = PlayerPair::new(first.player, second.player);
        let session_id: SessionId = uuid::Uuid::new_v4().into_bytes();
        let seed = self.seeds.session_seed(&session_id, &players);
        let session = MatchSession::start(session_id, players, &self.grid, seed)?;

        let grid = session.grid().rows();
        let revealed_cells = session.revealed().rows();
        let current_player = session.current_turn();

        self.directory
            .write()
            .await
            .register(players, Arc::new(Mutex::new(session)));

        let now = chrono::Utc::now();
        info!(
            "Session {} started: {} (stake {}, waited {}ms) vs {} (stake {}, waited {}ms), {} opens",
            hex::encode(&session_id[..4]),
            first.player.short(),
            first.stake.0,
            first.waited_ms(now),
            second.player.short(),
            second.stake.0,
            second.waited_ms(now),
            current_player.short()
        );

        Ok([(first.player, second.player), (second.player, first.player)]
            .into_iter()
            .map(|(recipient, opponent)| {
                Outbound::new(
                    recipient,
                    ServerMessage::MatchFound(MatchFound {
                        grid: grid.clone(),
                        revealed_cells: revealed_cells.clone(),
                        current_player,
                        opponent,
                    }),
                )
            })
            .collect())
    }
}
