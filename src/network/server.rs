//! WebSocket Game Server
//!
//! Transport for the matchmaker. Every connection gets a fresh player id and
//! inbound frames become matchmaker events. One dispatcher task drains the
//! matchmaker's outbox and routes each message to its recipient's socket,
//! so players see messages in the order the matchmaker committed them.
//! A closed socket is a disconnect.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, Mutex, OwnedSemaphorePermit, RwLock, Semaphore};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{ConfigError, ServerConfig};
use crate::game::state::PlayerId;
use crate::network::protocol::{ClientMessage, ErrorCode, InboundEvent, ServerError, ServerMessage};
use crate::network::session::{Matchmaker, OutboxReceiver};

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Outbound channel per connected player.
type ClientRegistry = Arc<RwLock<BTreeMap<PlayerId, mpsc::Sender<ServerMessage>>>>;

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Queue and sessions.
    matchmaker: Arc<Matchmaker>,
    /// Connected clients.
    clients: ClientRegistry,
    /// Matchmaker output, taken by the dispatcher when serving starts.
    outbox: Mutex<Option<OutboxReceiver>>,
    /// One permit per accepted connection, handshaking or not.
    connections: Arc<Semaphore>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Result<Self, GameServerError> {
        let matchmaker = Matchmaker::new(config.grid)?;
        Ok(Self::with_matchmaker(config, matchmaker))
    }

    /// Create a server around an existing matchmaker.
    pub fn with_matchmaker(config: ServerConfig, mut matchmaker: Matchmaker) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let outbox = matchmaker.attach_outbox();
        let permits = config.max_connections.min(Semaphore::MAX_PERMITS);

        Self {
            config,
            matchmaker: Arc::new(matchmaker),
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            outbox: Mutex::new(Some(outbox)),
            connections: Arc::new(Semaphore::new(permits)),
            shutdown_tx,
        }
    }

    /// Bind the configured address and serve until shutdown.
    #[instrument(skip(self), fields(addr = %self.config.bind_addr))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!("Game server listening on {}", listener.local_addr()?);
        self.spawn_dispatcher().await;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let Ok(permit) = self.connections.clone().try_acquire_owned() else {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            };

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr, permit);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Start routing matchmaker output. Only the first call has an effect.
    async fn spawn_dispatcher(&self) {
        match self.outbox.lock().await.take() {
            Some(outbox) => {
                tokio::spawn(dispatch(self.clients.clone(), outbox));
            }
            None => debug!("Dispatcher already running"),
        }
    }

    /// Handle a new WebSocket connection. The permit is held until cleanup.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr, permit: OwnedSemaphorePermit) {
        let clients = self.clients.clone();
        let matchmaker = self.matchmaker.clone();
        let buffer = self.config.outbound_buffer;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let _permit = permit;
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(buffer);
            let player_id = PlayerId::random();

            clients.write().await.insert(player_id, msg_tx.clone());
            debug!("Client {} assigned player {}", addr, player_id.short());

            // Writer task drains until every sender is dropped
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                let _ = ws_sender.close().await;
            });

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        let _ = msg_tx.send(error_message(
                                            ErrorCode::InvalidMessage,
                                            "Invalid message format",
                                        )).await;
                                        continue;
                                    }
                                };

                                matchmaker.handle(player_id, client_msg.into()).await;
                            }
                            Some(Ok(Message::Binary(_))) => {
                                let _ = msg_tx.send(error_message(
                                    ErrorCode::UnsupportedFrame,
                                    "Binary frames are not supported",
                                )).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Cleanup
            clients.write().await.remove(&player_id);
            drop(msg_tx);

            matchmaker.handle(player_id, InboundEvent::Disconnect).await;

            if sender_task.await.is_err() {
                debug!("Writer task for {} ended abnormally", addr);
            }

            info!("Client {} cleaned up", addr);
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Get active session count.
    pub async fn session_count(&self) -> usize {
        self.matchmaker.session_count().await
    }

    /// Get matchmaking queue size.
    pub async fn queue_size(&self) -> usize {
        self.matchmaker.queue_len().await
    }
}

/// Route matchmaker output to connected players, in outbox order.
///
/// A recipient whose outbound queue is full loses the message rather than
/// stalling delivery for everyone else.
async fn dispatch(clients: ClientRegistry, mut outbox: OutboxReceiver) {
    while let Some(out) = outbox.recv().await {
        let sender = clients.read().await.get(&out.recipient).cloned();
        let Some(sender) = sender else {
            debug!("Dropping message for departed player {}", out.recipient.short());
            continue;
        };

        match sender.try_send(out.message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue full for {}, dropping message", out.recipient.short());
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Player {} is closing, dropping message", out.recipient.short());
            }
        }
    }
    debug!("Matchmaker outbox closed");
}

fn error_message(code: ErrorCode, message: &str) -> ServerMessage {
    ServerMessage::Error(ServerError {
        code,
        message: message.to_string(),
    })
}
