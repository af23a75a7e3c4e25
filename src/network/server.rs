//! WebSocket Game Server
//!
//! Async WebSocket server for the shared session.
//! Accepts connections, parses intents and routes them through the hub.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn, error, debug, instrument};

use crate::game::player::ConnectionId;
use crate::game::session::SessionConfig;
use crate::network::hub::{SessionHub, SharedHub};
use crate::network::protocol::{ClientMessage, ErrorCode, ServerError, ServerMessage};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// WebSocket handshake timeout; also bounds the writer drain on close.
    pub connection_timeout: Duration,
    /// Game rules for the shared session.
    pub session: SessionConfig,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_connections: 256,
            connection_timeout: Duration::from_secs(10),
            session: SessionConfig::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Build from process environment.
    ///
    /// Reads `PORT`, `BIND_HOST`, `MAX_CONNECTIONS`, `MAX_PLAYERS`,
    /// `MAX_ROUNDS`, `REVEAL_DELAY_MS` and `SESSION_SEED`. Unset variables
    /// keep their defaults.
    pub fn from_env() -> Result<Self, GameServerError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_vars<F>(get: F) -> Result<Self, GameServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let host = get("BIND_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_var(&get, "PORT")?.unwrap_or(3000);
        config.bind_addr = format!("{}:{}", host, port)
            .parse()
            .map_err(|_| GameServerError::Config(format!("invalid BIND_HOST {:?}", host)))?;

        if let Some(max) = parse_var(&get, "MAX_CONNECTIONS")? {
            config.max_connections = max;
        }
        if let Some(max) = parse_var::<usize, _>(&get, "MAX_PLAYERS")? {
            if max < 2 {
                return Err(GameServerError::Config("MAX_PLAYERS must be at least 2".to_string()));
            }
            config.session.max_players = max;
        }
        if let Some(rounds) = parse_var::<u32, _>(&get, "MAX_ROUNDS")? {
            if rounds == 0 {
                return Err(GameServerError::Config("MAX_ROUNDS must be at least 1".to_string()));
            }
            config.session.default_max_rounds = rounds;
        }
        if let Some(ms) = parse_var(&get, "REVEAL_DELAY_MS")? {
            config.session.reveal_delay = Duration::from_millis(ms);
        }
        config.session.seed = parse_var(&get, "SESSION_SEED")?;

        Ok(config)
    }
}

fn parse_var<T, F>(get: &F, key: &str) -> Result<Option<T>, GameServerError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| GameServerError::Config(format!("invalid {} value {:?}", key, raw))),
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// Bad configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection limit reached.
    #[error("Connection limit reached")]
    ConnectionLimitReached,
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// The shared session and its connections.
    hub: SharedHub,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let hub = SessionHub::shared(config.session.clone());

        Self {
            config,
            hub,
            shutdown_tx,
        }
    }

    /// Shared hub handle.
    pub fn hub(&self) -> SharedHub {
        self.hub.clone()
    }

    /// Bind and run the server.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Game server listening on {}", self.config.bind_addr);
        self.serve(listener).await
    }

    /// Accept connections on an already-bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if let Err(e) = self.check_capacity().await {
                                warn!("{}, rejecting {}", e, addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
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

    async fn check_capacity(&self) -> Result<(), GameServerError> {
        if self.hub.lock().await.connection_count() >= self.config.max_connections {
            return Err(GameServerError::ConnectionLimitReached);
        }
        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let hub = self.hub.clone();
        let connection_timeout = self.config.connection_timeout;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match tokio::time::timeout(connection_timeout, accept_async(stream)).await {
                Ok(Ok(ws)) => ws,
                Ok(Err(e)) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
                Err(_) => {
                    warn!("WebSocket handshake timed out for {}", addr);
                    return;
                }
            };

            let id = ConnectionId::generate();
            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);

            let mut evicted = hub.lock().await.connect(id, addr, msg_tx.clone());

            // Spawn message sender task
            let mut sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let closing = matches!(msg, ServerMessage::Shutdown { .. });
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
                    if closing {
                        let _ = ws_sender.close().await;
                        break;
                    }
                }
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        let _ = msg_tx.try_send(ServerMessage::Error(ServerError {
                                            code: ErrorCode::InvalidInput,
                                            message: "Invalid message format".to_string(),
                                        }));
                                        continue;
                                    }
                                };

                                SessionHub::handle_message(&hub, id, client_msg).await;
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
                    _ = &mut evicted => {
                        warn!("Client {} dropped by the hub", addr);
                        break;
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.try_send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        });
                        break;
                    }
                }
            }

            // Losing the connection counts as leaving
            SessionHub::disconnect(&hub, id).await;
            drop(msg_tx);
            // A writer stuck on an unread socket never finishes by itself
            if tokio::time::timeout(connection_timeout, &mut sender_task).await.is_err() {
                sender_task.abort();
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
        self.hub.lock().await.connection_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tokio_tungstenite::connect_async;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.session.default_max_rounds, 3);
        assert_eq!(config.session.reveal_delay, Duration::from_millis(1500));
    }

    #[test]
    fn test_config_from_vars() {
        let config = ServerConfig::from_vars(vars(&[
            ("PORT", "4100"),
            ("BIND_HOST", "127.0.0.1"),
            ("MAX_ROUNDS", "5"),
            ("REVEAL_DELAY_MS", "250"),
            ("SESSION_SEED", "99"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:4100".parse().unwrap());
        assert_eq!(config.session.default_max_rounds, 5);
        assert_eq!(config.session.reveal_delay, Duration::from_millis(250));
        assert_eq!(config.session.seed, Some(99));
    }

    #[test]
    fn test_config_rejects_bad_values() {
        for bad in [
            vec![("PORT", "http")],
            vec![("MAX_ROUNDS", "0")],
            vec![("MAX_PLAYERS", "1")],
            vec![("BIND_HOST", "not a host")],
        ] {
            let err = ServerConfig::from_vars(vars(&bad)).unwrap_err();
            assert!(matches!(err, GameServerError::Config(_)), "{:?}", bad);
        }
    }

    #[tokio::test]
    async fn test_server_creation() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let server = GameServer::new(config);

        assert_eq!(server.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_round_trip_over_websocket() {
        let server = Arc::new(GameServer::new(ServerConfig::default()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let running = server.clone();
        let handle = tokio::spawn(async move { running.serve(listener).await });

        let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

        ws.send(Message::Text("{\"type\":\"bogus\"}".to_string())).await.unwrap();
        let reply = ws.next().await.unwrap().unwrap();
        let parsed = ServerMessage::from_json(reply.to_text().unwrap()).unwrap();
        assert!(matches!(parsed, ServerMessage::Error(ref e) if e.code == ErrorCode::InvalidInput));

        ws.send(Message::Text("{\"type\":\"join\",\"display_name\":\"Ana\"}".to_string()))
            .await
            .unwrap();
        let reply = ws.next().await.unwrap().unwrap();
        let parsed = ServerMessage::from_json(reply.to_text().unwrap()).unwrap();
        assert!(matches!(parsed, ServerMessage::JoinResult(ref r) if r.success));

        assert_eq!(server.connection_count().await, 1);
        assert_eq!(server.hub().lock().await.session().roster().len(), 1);

        ws.close(None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(server.connection_count().await, 0);
        assert!(server.hub().lock().await.session().roster().is_empty());

        server.shutdown();
        handle.await.unwrap().unwrap();
    }
}
