//! Round logic applied by the active player's worker.
//!
//! Every function here runs with the session lock held by the caller, so a
//! round (pick, compare or append, turn rotation, winner detection) is never
//! observed half-applied by another worker.

use crate::session::{PlayerId, Session, SessionError};
use log::{debug, info};
use shared::{GameState, PlayerState};

/// What a single pick did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundKind {
    /// The active player appended a color and handed the turn on.
    Extend,
    /// The active player reproduced (or failed to reproduce) a known color.
    Recall { correct: bool },
    /// The active player produced no usable pick and was eliminated.
    Forfeit,
}

impl Session {
    /// Applies the active player's pick.
    ///
    /// When the player has replayed the whole sequence the pick extends it,
    /// otherwise it is compared against the color at the replay cursor.
    pub fn play_color(&mut self, player: PlayerId, color: u32) -> Result<RoundKind, SessionError> {
        self.ensure_turn(player)?;

        let kind = if self.cursor == self.sequence.len() {
            self.extend(player, color);
            RoundKind::Extend
        } else {
            RoundKind::Recall {
                correct: self.recall(player, color),
            }
        };

        self.settle();
        Ok(kind)
    }

    /// Eliminates the active player for failing to deliver a pick.
    pub fn forfeit(&mut self, player: PlayerId) -> Result<RoundKind, SessionError> {
        self.ensure_turn(player)?;

        info!("Player {} forfeits the turn", player);
        self.color = 0;
        self.wrong_color = true;
        self.eliminate(player);
        self.settle();
        Ok(RoundKind::Forfeit)
    }

    /// Removes a player whose connection failed.
    ///
    /// A waiting player is eliminated without touching the round result or the
    /// turn pointer. An active player forfeits instead.
    pub fn drop_out(&mut self, player: PlayerId) -> Result<(), SessionError> {
        let slot = self.player(player)?;
        if !slot.alive || self.game_state != GameState::Active {
            return Ok(());
        }
        if self.active == Some(player) {
            return self.forfeit(player).map(|_| ());
        }

        info!("Player {} dropped out", player);
        self.eliminate(player);
        self.settle();
        Ok(())
    }

    /// Records a lost connection without touching the current round.
    ///
    /// The player stays in the roster until [`Session::apply_drop_outs`] runs
    /// at the start of the next round.
    pub fn mark_lost(&mut self, player: PlayerId) -> Result<(), SessionError> {
        self.player(player)?;
        if !self.lost.contains(&player) {
            self.lost.push(player);
        }
        Ok(())
    }

    /// Drops every player marked lost since the last call. Returns how many were pending.
    pub fn apply_drop_outs(&mut self) -> Result<usize, SessionError> {
        let lost = std::mem::take(&mut self.lost);
        for &player in &lost {
            self.drop_out(player)?;
        }
        Ok(lost.len())
    }

    /// Hands the turn to the next alive player in roster order.
    ///
    /// Advances `turn_index` one step at a time, skipping eliminated slots,
    /// for at most `expected_players` steps. Returns `None` when nobody is
    /// left alive.
    pub fn whose_turn(&mut self, current: PlayerId) -> Option<PlayerId> {
        let expected = self.expected_players.unwrap_or(0);

        for _ in 0..expected {
            self.turn_index += 1;
            let candidate = self.turn_index % expected;

            if self.roster.get(candidate).map_or(false, |p| p.alive) {
                if let Some(previous) = self.roster.get_mut(current) {
                    if previous.role == PlayerState::Active {
                        previous.role = PlayerState::Waiting;
                    }
                }
                self.roster[candidate].role = PlayerState::Active;
                self.active = Some(candidate);
                self.cursor = 0;
                debug!("Turn {} goes to player {}", self.turn_index, candidate);
                return Some(candidate);
            }
        }

        self.active = None;
        None
    }

    /// Declares `player` the winner if it is the last one standing.
    ///
    /// Sessions configured for a single player never produce a winner.
    /// Calling this again with unchanged state returns the same verdict.
    pub fn check_winner(&mut self, player: PlayerId) -> bool {
        let expected = self.expected_players.unwrap_or(0);
        let alive_count = self.alive_count();

        let Some(slot) = self.roster.get_mut(player) else {
            return false;
        };
        if slot.role == PlayerState::Winner {
            return true;
        }
        if expected == 1 || alive_count != 1 || !slot.alive {
            return false;
        }

        slot.role = PlayerState::Winner;
        self.game_state = GameState::Ended;
        info!("Player {} wins after {} colors", player, self.sequence.len());
        true
    }

    fn ensure_turn(&self, player: PlayerId) -> Result<(), SessionError> {
        self.player(player)?;
        if self.game_state != GameState::Active {
            return Err(SessionError::GameNotActive);
        }
        if self.active != Some(player) {
            return Err(SessionError::NotYourTurn(player));
        }
        Ok(())
    }

    fn extend(&mut self, player: PlayerId, color: u32) {
        self.color = color;
        self.sequence.push(color);
        self.wrong_color = false;
        self.new_round = true;
        debug!(
            "Player {} extends the sequence with {} (length {})",
            player,
            color,
            self.sequence.len()
        );

        self.whose_turn(player);
        self.new_color = false;
    }

    fn recall(&mut self, player: PlayerId, color: u32) -> bool {
        self.color = color;

        if self.sequence[self.cursor] == color {
            self.wrong_color = false;
            self.new_round = false;
            self.cursor += 1;
            self.new_color = self.cursor == self.sequence.len();
            true
        } else {
            debug!(
                "Player {} picked {} at position {}, expected {}",
                player, color, self.cursor, self.sequence[self.cursor]
            );
            self.wrong_color = true;
            self.eliminate(player);
            false
        }
    }

    fn eliminate(&mut self, player: PlayerId) {
        if let Some(slot) = self.roster.get_mut(player) {
            slot.alive = false;
            slot.role = PlayerState::Eliminated;
        }
        self.eliminated += 1;
        info!(
            "Player {} eliminated, {} still alive",
            player,
            self.alive_count()
        );

        if self.active == Some(player) {
            self.new_round = true;
            self.whose_turn(player);
            self.new_color = self.sequence.is_empty();
        }

        if self.alive_count() == 0 {
            self.active = None;
            self.game_state = GameState::Ended;
            info!("Session ended without a winner");
        }
    }

    /// Runs winner detection for the last alive player, if there is exactly one.
    fn settle(&mut self) {
        if self.alive_count() != 1 {
            return;
        }
        if let Some(survivor) = self.roster.iter().find(|p| p.alive).map(|p| p.id) {
            self.check_winner(survivor);
        }
    }
}
