//! Registration of incoming connections into a session
//!
//! The first connection of a lobby becomes the setter: it receives a
//! `Setter` record and must answer with the number of players before any
//! other connection is admitted. Further connections fill the remaining
//! roster slots. Once the roster is full the lobby turns into a [`Game`].

use crate::barrier::RoundBarrier;
use crate::session::{PlayerId, Session, SessionError};
use crate::worker::{PlayerWorker, WorkerReport};
use log::{debug, error, info, warn};
use shared::{ChannelError, Connection, PlayerState, Record};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

#[derive(Debug, Error)]
pub enum LobbyError {
    #[error("setter handshake failed: {0}")]
    Handshake(#[from] ChannelError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

pub struct Lobby<S> {
    session: Session,
    max_players: u32,
    connections: Vec<Connection<S>>,
}

impl<S> Lobby<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(max_players: u32) -> Self {
        Self {
            session: Session::with_max_players(max_players),
            max_players,
            connections: Vec::new(),
        }
    }

    pub fn needs_setter(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.session.is_full()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Admits a connection: as setter if the lobby is empty, as a regular player otherwise.
    pub async fn admit(&mut self, stream: S) -> Result<PlayerId, LobbyError> {
        if self.needs_setter() {
            self.admit_setter(stream).await
        } else {
            Ok(self.admit_player(stream)?)
        }
    }

    /// Runs the configure handshake with the first connection.
    ///
    /// On failure the connection is dropped and the lobby is back to waiting
    /// for a setter.
    pub async fn admit_setter(&mut self, stream: S) -> Result<PlayerId, LobbyError> {
        let mut connection = Connection::new(stream);
        let id = self.session.register_player()?;

        match Self::configure_handshake(&mut self.session, &mut connection).await {
            Ok(expected) => {
                info!("Setter configured the session for {} players", expected);
                self.connections.push(connection);
                Ok(id)
            }
            Err(e) => {
                warn!("Setter rejected: {}", e);
                if let Err(e) = connection.close().await {
                    debug!("Closing rejected setter failed: {}", e);
                }
                self.session = Session::with_max_players(self.max_players);
                Err(e)
            }
        }
    }

    async fn configure_handshake(
        session: &mut Session,
        connection: &mut Connection<S>,
    ) -> Result<u32, LobbyError> {
        connection.send(&Record::setter_prompt()).await?;
        let answer = connection.recv().await?;
        session.configure(answer.expected_players)?;
        Ok(answer.expected_players)
    }

    /// Registers a further connection into the next free roster slot.
    pub fn admit_player(&mut self, stream: S) -> Result<PlayerId, SessionError> {
        let id = self.session.register_player()?;
        self.connections.push(Connection::new(stream));
        info!(
            "Player {} joined ({}/{})",
            id,
            self.session.registered(),
            self.session.expected_players().unwrap_or(0)
        );
        Ok(id)
    }

    /// Starts the session and hands every connection to its own worker.
    ///
    /// Opening records are taken here, before any worker can read a pick.
    pub fn into_game(mut self, turn_timeout: Option<Duration>) -> Result<Game<S>, SessionError> {
        self.session.start()?;

        let openings = (0..self.connections.len())
            .map(|id| self.session.snapshot_for(id))
            .collect::<Result<Vec<_>, _>>()?;

        let participants = self.connections.len();
        let session = Arc::new(Mutex::new(self.session));
        let barrier = Arc::new(RoundBarrier::new(participants));

        let workers = self
            .connections
            .into_iter()
            .zip(openings)
            .enumerate()
            .map(|(id, (connection, opening))| {
                PlayerWorker::new(
                    id,
                    opening,
                    connection,
                    Arc::clone(&session),
                    Arc::clone(&barrier),
                )
                .with_turn_timeout(turn_timeout)
            })
            .collect();

        Ok(Game { session, workers })
    }
}

/// Outcome of a finished session
#[derive(Debug, Clone)]
pub struct GameReport {
    pub winner: Option<PlayerId>,
    pub roles: Vec<PlayerState>,
    pub sequence: Vec<u32>,
    pub workers: Vec<WorkerReport>,
}

/// A full roster ready to play
pub struct Game<S> {
    session: Arc<Mutex<Session>>,
    workers: Vec<PlayerWorker<S>>,
}

impl<S> Game<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn players(&self) -> usize {
        self.workers.len()
    }

    /// Runs one worker task per player until all of them have left.
    pub async fn play(self) -> GameReport {
        let mut tasks = JoinSet::new();
        for worker in self.workers {
            debug!("Spawning worker for player {}", worker.id());
            tasks.spawn(worker.run());
        }

        let mut workers = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(report)) => workers.push(report),
                Ok(Err(e)) => error!("Worker failed: {}", e),
                Err(e) => error!("Worker task panicked: {}", e),
            }
        }
        workers.sort_by_key(|report| report.player);

        let session = self.session.lock().await;
        let report = GameReport {
            winner: session.winner(),
            roles: session.roster().iter().map(|p| p.role).collect(),
            sequence: session.sequence().to_vec(),
            workers,
        };

        match report.winner {
            Some(winner) => info!(
                "Game over: player {} won with a sequence of {} colors",
                winner,
                report.sequence.len()
            ),
            None => info!(
                "Game over without a winner, sequence of {} colors",
                report.sequence.len()
            ),
        }
        report
    }
}
