//! Per-connection worker driving one player through a session
//!
//! Every connected player gets its own task running [`PlayerWorker::run`].
//! A round looks the same for all of them:
//!
//! - The active player's worker reads one pick from its client and applies it
//!   to the session under the session lock, then publishes the result.
//! - Every worker waits for the result, copies it into its outbound record,
//!   sends that record to its client and reports the delivery.
//! - Nobody moves on until all deliveries of the round are in.
//!
//! A worker stops once its player is eliminated or has won.
//!
//! The opening record is built before any worker starts, and a worker only
//! drives a round whose result has not been published yet. A worker that
//! starts late therefore still sends its client every round, in order.
//!
//! ## Lost connections
//! A waiting player whose send fails is marked lost and leaves the barrier;
//! the session drops it at the start of the next round, so no round result
//! changes after it was published. A player whose connection fails while it
//! is (or is about to be) the active one stays for its turn and forfeits it,
//! so the remaining players always get a round result to wait for.

use crate::barrier::RoundBarrier;
use crate::session::{PlayerId, Session, SessionError};
use log::{debug, error, info, warn};
use shared::{is_valid_color, Connection, GameState, PlayerState, Record};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Final state of a worker after it left the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub player: PlayerId,
    pub role: PlayerState,
    pub connected: bool,
    pub rounds: u64,
}

pub struct PlayerWorker<S> {
    id: PlayerId,
    connection: Connection<S>,
    session: Arc<Mutex<Session>>,
    barrier: Arc<RoundBarrier>,
    turn_timeout: Option<Duration>,
    /// Last state snapshot prepared for this player
    pending: Record,
    connected: bool,
}

impl<S> PlayerWorker<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// `opening` is the player's snapshot taken when the session started.
    pub fn new(
        id: PlayerId,
        opening: Record,
        connection: Connection<S>,
        session: Arc<Mutex<Session>>,
        barrier: Arc<RoundBarrier>,
    ) -> Self {
        Self {
            id,
            connection,
            session,
            barrier,
            turn_timeout: None,
            pending: opening,
            connected: true,
        }
    }

    /// Eliminates an active player that does not send a pick within `limit`.
    pub fn with_turn_timeout(mut self, limit: Option<Duration>) -> Self {
        self.turn_timeout = limit;
        self
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub async fn run(mut self) -> Result<WorkerReport, SessionError> {
        self.deliver().await;

        let mut rounds = 0;
        loop {
            // A round cannot close without this worker, so this is the round it is part of
            let round = self.barrier.round();

            let (drives, running, published) = {
                let mut session = self.session.lock().await;
                let dropped = session.apply_drop_outs()?;
                if dropped > 0 {
                    debug!("Player {}: applied {} drop-outs", self.id, dropped);
                }
                let published = self.barrier.is_result_ready();
                let running = session.game_state() == GameState::Active;
                let drives = running && !published && session.active_player() == Some(self.id);
                (drives, running, published)
            };

            if !running && !published {
                // The game ended through a drop-out after this player's last snapshot
                self.finish_after_game_end().await?;
                break;
            }

            if drives {
                self.take_turn().await;
            }

            // Phase 1: the round result is in the session
            self.barrier.wait_result(round).await;
            self.pending = {
                let mut session = self.session.lock().await;
                session.check_winner(self.id);
                session.snapshot_for(self.id)?
            };

            // Phase 2: deliver it, then wait for every other delivery
            self.deliver().await;
            let leaving = self.settle_departure().await?;
            self.barrier.arrive(round, leaving);
            rounds += 1;

            if leaving {
                break;
            }
            self.barrier.wait_next_round(round).await;
        }

        if self.connected {
            if let Err(e) = self.connection.close().await {
                debug!("Player {}: close failed: {}", self.id, e);
            }
        }

        info!(
            "Player {} leaves as {:?} after {} rounds",
            self.id, self.pending.player_state, rounds
        );
        Ok(WorkerReport {
            player: self.id,
            role: self.pending.player_state,
            connected: self.connected,
            rounds,
        })
    }

    /// Reads the active player's pick, applies it and publishes the result.
    ///
    /// Publishing happens under the session lock, so any worker holding the
    /// lock sees either no change at all or a published result.
    async fn take_turn(&mut self) {
        let pick = self.read_pick().await;

        let mut session = self.session.lock().await;
        let outcome = match pick {
            Some(color) => session.play_color(self.id, color),
            None => session.forfeit(self.id),
        };

        match outcome {
            Ok(kind) => debug!("Player {} played {:?}", self.id, kind),
            Err(e) => error!("Player {}: turn rejected: {}", self.id, e),
        }
        self.barrier.publish();
    }

    /// Returns None when the player produced no usable pick.
    async fn read_pick(&mut self) -> Option<u32> {
        if !self.connected {
            return None;
        }

        let received = match self.turn_timeout {
            Some(limit) => match timeout(limit, self.connection.recv()).await {
                Ok(received) => received,
                Err(_) => {
                    warn!("Player {} did not pick within {:?}", self.id, limit);
                    return None;
                }
            },
            None => self.connection.recv().await,
        };

        match received {
            Ok(record) if is_valid_color(record.color) => Some(record.color),
            Ok(record) => {
                warn!("Player {} sent invalid color {}", self.id, record.color);
                None
            }
            Err(e) => {
                warn!("Player {}: receive failed: {}", self.id, e);
                self.connected = false;
                None
            }
        }
    }

    async fn deliver(&mut self) {
        if !self.connected {
            return;
        }
        if let Err(e) = self.connection.send(&self.pending).await {
            warn!("Player {}: send failed: {}", self.id, e);
            self.connected = false;
        }
    }

    /// Decides whether this worker leaves after the current round.
    ///
    /// A lost player that is not about to move is marked lost and leaves. One
    /// that holds the next turn stays and forfeits it.
    async fn settle_departure(&mut self) -> Result<bool, SessionError> {
        if self.pending.player_state.is_terminal() {
            return Ok(true);
        }
        if self.connected {
            return Ok(false);
        }

        let mut session = self.session.lock().await;
        if session.active_player() == Some(self.id) {
            return Ok(false);
        }
        session.mark_lost(self.id)?;
        self.pending.player_state = PlayerState::Eliminated;
        Ok(true)
    }

    async fn finish_after_game_end(&mut self) -> Result<(), SessionError> {
        self.pending = {
            let mut session = self.session.lock().await;
            session.check_winner(self.id);
            session.snapshot_for(self.id)?
        };
        self.deliver().await;
        Ok(())
    }
}
