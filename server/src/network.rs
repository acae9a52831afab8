//! TCP acceptor filling lobbies and launching sessions

use crate::lobby::{Game, GameReport, Lobby};
use crate::session::DEFAULT_MAX_PLAYERS;
use crate::BoxError;
use log::{error, info, warn};
use shared::DEFAULT_PORT;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on, e.g. `127.0.0.1:8080`
    pub addr: String,
    /// Largest player count a setter may request
    pub max_players: u32,
    /// Eliminate an active player that does not pick in time. `None` waits forever.
    pub turn_timeout: Option<Duration>,
    /// Stop after the first session has finished
    pub once: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            max_players: DEFAULT_MAX_PLAYERS,
            turn_timeout: None,
            once: false,
        }
    }
}

/// Accepts players into one lobby at a time; each full lobby plays in its own task.
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self, BoxError> {
        let listener = TcpListener::bind(&config.addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server { listener, config })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Hosts sessions back to back. Returns after the first one when `once` is set.
    pub async fn run(&self) -> Result<(), BoxError> {
        let mut session_number: u64 = 0;

        loop {
            let game = self.fill_lobby().await?;
            session_number += 1;
            info!(
                "Session {} starting with {} players",
                session_number,
                game.players()
            );

            let handle = Self::spawn_game(session_number, game);
            if self.config.once {
                handle.await?;
                info!("Server shutting down");
                return Ok(());
            }
        }
    }

    fn spawn_game(session_number: u64, game: Game<TcpStream>) -> JoinHandle<GameReport> {
        tokio::spawn(async move {
            let report = game.play().await;
            info!(
                "Session {} finished: winner {:?}, roles {:?}",
                session_number, report.winner, report.roles
            );
            report
        })
    }

    /// Accepts connections until the lobby's roster is full.
    async fn fill_lobby(&self) -> Result<Game<TcpStream>, BoxError> {
        let mut lobby = Lobby::new(self.config.max_players);

        while !lobby.is_full() {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    continue;
                }
            };

            info!("Received incoming connection from {}", addr);
            if let Err(e) = stream.set_nodelay(true) {
                warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
            }

            match lobby.admit(stream).await {
                Ok(id) => info!("Connection from {} is player {}", addr, id),
                Err(e) => warn!("Rejected connection from {}: {}", addr, e),
            }
        }

        Ok(lobby.into_game(self.config.turn_timeout)?)
    }
}
