//! Shared state of one game session
//!
//! This module owns everything the player workers of a single game share:
//! - The roster of players, one index-stable slot per connection
//! - The color sequence built up over the game
//! - The turn counter and the in-round replay cursor of the active player
//! - The fields of the last round result copied into every outbound record
//!
//! A `Session` is always accessed through one lock held by the calling worker.
//! The round logic that mutates it lives in the `turn` module.

use log::info;
use shared::{GameState, PlayerState, Record};
use thiserror::Error;

/// Roster index assigned at registration, 0-based and never reused.
pub type PlayerId = usize;

/// Upper bound for the player count a setter may request
pub const DEFAULT_MAX_PLAYERS: u32 = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session is full ({0} players)")]
    Capacity(usize),
    #[error("session is already configured")]
    AlreadyConfigured,
    #[error("session is not configured yet")]
    NotConfigured,
    #[error("invalid player count {requested} (allowed 1..={max})")]
    InvalidPlayerCount { requested: u32, max: u32 },
    #[error("only {registered} of {expected} players registered")]
    RosterIncomplete { registered: usize, expected: usize },
    #[error("player {0} is not registered")]
    UnknownPlayer(PlayerId),
    #[error("it is not player {0}'s turn")]
    NotYourTurn(PlayerId),
    #[error("game is not active")]
    GameNotActive,
}

/// One roster slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub alive: bool,
    pub role: PlayerState,
}

impl Player {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            alive: true,
            role: PlayerState::Waiting,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) expected_players: Option<usize>,
    pub(crate) max_players: u32,
    pub(crate) roster: Vec<Player>,
    pub(crate) sequence: Vec<u32>,
    pub(crate) turn_index: usize,
    pub(crate) active: Option<PlayerId>,
    /// Position of the active player's next recall within `sequence`
    pub(crate) cursor: usize,
    pub(crate) eliminated: usize,
    pub(crate) game_state: GameState,
    /// Players whose connection failed, removed at the start of the next round
    pub(crate) lost: Vec<PlayerId>,

    // Result of the last round, copied into every player's outbound record
    pub(crate) color: u32,
    pub(crate) wrong_color: bool,
    pub(crate) new_color: bool,
    pub(crate) new_round: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::with_max_players(DEFAULT_MAX_PLAYERS)
    }

    pub fn with_max_players(max_players: u32) -> Self {
        Self {
            expected_players: None,
            max_players,
            roster: Vec::new(),
            sequence: Vec::new(),
            turn_index: 0,
            active: None,
            cursor: 0,
            eliminated: 0,
            game_state: GameState::Waiting,
            lost: Vec::new(),
            color: 0,
            wrong_color: false,
            // The very first pick of a session extends the empty sequence
            new_color: true,
            new_round: false,
        }
    }

    /// Appends a roster slot and returns its id.
    ///
    /// Before configuration only the setter (slot 0) may register; after it,
    /// registration is accepted until `expected_players` slots are filled.
    pub fn register_player(&mut self) -> Result<PlayerId, SessionError> {
        match self.expected_players {
            None if !self.roster.is_empty() => return Err(SessionError::NotConfigured),
            Some(expected) if self.roster.len() >= expected => {
                return Err(SessionError::Capacity(expected))
            }
            _ => {}
        }

        let id = self.roster.len();
        if id == 0 {
            self.roster.push(Player {
                role: PlayerState::Setter,
                ..Player::new(id)
            });
        } else {
            self.roster.push(Player::new(id));
        }
        info!("Registered player {}", id);
        Ok(id)
    }

    /// Fixes the number of players. Callable once, by the setter, before anyone else registers.
    pub fn configure(&mut self, expected_players: u32) -> Result<(), SessionError> {
        if self.expected_players.is_some() || self.roster.len() > 1 {
            return Err(SessionError::AlreadyConfigured);
        }
        if expected_players == 0 || expected_players > self.max_players {
            return Err(SessionError::InvalidPlayerCount {
                requested: expected_players,
                max: self.max_players,
            });
        }

        self.expected_players = Some(expected_players as usize);
        info!("Session configured for {} players", expected_players);
        Ok(())
    }

    /// Opens the game once every slot is filled: player 0 moves first.
    pub fn start(&mut self) -> Result<(), SessionError> {
        let expected = self.expected_players.ok_or(SessionError::NotConfigured)?;
        if self.roster.len() != expected {
            return Err(SessionError::RosterIncomplete {
                registered: self.roster.len(),
                expected,
            });
        }

        for player in &mut self.roster {
            player.role = PlayerState::Waiting;
        }
        self.roster[0].role = PlayerState::Active;
        self.active = Some(0);
        self.game_state = GameState::Active;
        info!("Session started with {} players", expected);
        Ok(())
    }

    /// Builds the outbound record for one player from the shared round result.
    pub fn snapshot_for(&self, player: PlayerId) -> Result<Record, SessionError> {
        let slot = self.player(player)?;
        Ok(Record {
            expected_players: self.expected_players.unwrap_or(0) as u32,
            player_state: slot.role,
            game_state: self.game_state,
            color: self.color,
            wrong_color: self.wrong_color,
            new_color: self.new_color,
            new_round: self.new_round,
        })
    }

    pub fn player(&self, player: PlayerId) -> Result<&Player, SessionError> {
        self.roster
            .get(player)
            .ok_or(SessionError::UnknownPlayer(player))
    }

    pub fn role(&self, player: PlayerId) -> Option<PlayerState> {
        self.roster.get(player).map(|p| p.role)
    }

    pub fn expected_players(&self) -> Option<usize> {
        self.expected_players
    }

    pub fn registered(&self) -> usize {
        self.roster.len()
    }

    pub fn is_full(&self) -> bool {
        self.expected_players == Some(self.roster.len())
    }

    pub fn alive_count(&self) -> usize {
        self.expected_players.unwrap_or(0) - self.eliminated
    }

    pub fn eliminated_count(&self) -> usize {
        self.eliminated
    }

    pub fn sequence(&self) -> &[u32] {
        &self.sequence
    }

    pub fn turn_index(&self) -> usize {
        self.turn_index
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn active_player(&self) -> Option<PlayerId> {
        self.active
    }

    pub fn game_state(&self) -> GameState {
        self.game_state
    }

    pub fn roster(&self) -> &[Player] {
        &self.roster
    }

    /// The player holding the Winner role, if the game produced one.
    pub fn winner(&self) -> Option<PlayerId> {
        self.roster
            .iter()
            .find(|p| p.role == PlayerState::Winner)
            .map(|p| p.id)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
