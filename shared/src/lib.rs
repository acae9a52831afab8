use serde::{Deserialize, Serialize};

pub mod connection;

pub use connection::{ChannelError, Connection};

/// Number of color buttons on the board. Colors are numbered `1..=COLOR_COUNT`.
pub const COLOR_COUNT: u32 = 7;
/// Exact size of one encoded [`Record`] on the wire.
pub const RECORD_SIZE: usize = 19;
pub const DEFAULT_PORT: u16 = 8080;

/// Role of a player within a session, as seen by that player's client.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    #[default]
    Waiting,
    Setter,
    Active,
    Eliminated,
    Winner,
}

impl PlayerState {
    /// Eliminated and Winner never change again for the rest of a session.
    pub fn is_terminal(self) -> bool {
        matches!(self, PlayerState::Eliminated | PlayerState::Winner)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameState {
    #[default]
    Waiting,
    Active,
    Ended,
}

/// The fixed-shape record exchanged in both directions.
///
/// Clients send it to answer the setter prompt (`expected_players`) and to
/// pick a color (`color`); the server sends one per connected player after
/// every round. The layout is fixed: both ends must agree on it out of band.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct Record {
    pub expected_players: u32,
    pub player_state: PlayerState,
    pub game_state: GameState,
    pub color: u32,
    pub wrong_color: bool,
    /// The next pick of the active player introduces a color instead of recalling one.
    pub new_color: bool,
    /// The replay starts again from the first color on the next turn.
    pub new_round: bool,
}

impl Record {
    /// First record sent to the connection that has to configure the session.
    pub fn setter_prompt() -> Self {
        Self {
            player_state: PlayerState::Setter,
            game_state: GameState::Waiting,
            ..Self::default()
        }
    }

    /// Setter's answer carrying the number of players for the session.
    pub fn configure(expected_players: u32) -> Self {
        Self {
            expected_players,
            player_state: PlayerState::Setter,
            ..Self::default()
        }
    }

    /// An active player's color pick.
    pub fn pick(color: u32) -> Self {
        Self {
            color,
            player_state: PlayerState::Active,
            game_state: GameState::Active,
            ..Self::default()
        }
    }
}

pub fn is_valid_color(color: u32) -> bool {
    (1..=COLOR_COUNT).contains(&color)
}

/// Encodes a record into its fixed-width wire form.
pub fn encode(record: &Record) -> bincode::Result<[u8; RECORD_SIZE]> {
    let mut buffer = [0u8; RECORD_SIZE];
    bincode::serialize_into(&mut buffer[..], record)?;
    Ok(buffer)
}

/// Decodes a full wire buffer. Unknown enum tags and non-0/1 booleans are rejected.
pub fn decode(buffer: &[u8; RECORD_SIZE]) -> bincode::Result<Record> {
    bincode::deserialize(buffer)
}
