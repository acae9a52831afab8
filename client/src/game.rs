use log::debug;
use shared::{GameState, PlayerState, Record};

/// What the last broadcast told us about the round that just happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundUpdate {
    /// A new color was appended to the sequence.
    Extended(u32),
    /// A known color was replayed correctly.
    Recalled(u32),
    /// The active player picked the wrong color (or none) and is out.
    Missed(u32),
}

/// Client-side view of the session, rebuilt from the server's broadcasts.
///
/// Every player receives the same round result, so each client can follow
/// the sequence on its own: a broadcast that follows a record announcing
/// `new_color` carries an appended color, any other correct broadcast is one
/// replay step, and a wrong color restarts the replay for the next player.
#[derive(Debug, Clone)]
pub struct ClientGameState {
    last: Record,
    sequence: Vec<u32>,
    cursor: usize,
    extend_pending: bool,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self {
            last: Record::default(),
            sequence: Vec::new(),
            cursor: 0,
            extend_pending: true,
        }
    }

    /// Takes the first record of the game (sent before any pick).
    pub fn apply_opening(&mut self, record: Record) {
        self.extend_pending = record.new_color;
        self.last = record;
    }

    /// Folds one round broadcast into the local view.
    pub fn apply_update(&mut self, record: Record) -> RoundUpdate {
        let update = if record.wrong_color {
            self.cursor = 0;
            RoundUpdate::Missed(record.color)
        } else if self.extend_pending {
            self.sequence.push(record.color);
            self.cursor = 0;
            RoundUpdate::Extended(record.color)
        } else {
            self.cursor += 1;
            RoundUpdate::Recalled(record.color)
        };

        debug!(
            "{:?}, sequence length {}, cursor {}",
            update,
            self.sequence.len(),
            self.cursor
        );
        self.extend_pending = record.new_color;
        self.last = record;
        update
    }

    pub fn last(&self) -> &Record {
        &self.last
    }

    pub fn sequence(&self) -> &[u32] {
        &self.sequence
    }

    /// Position of the next color to replay
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn player_state(&self) -> PlayerState {
        self.last.player_state
    }

    pub fn is_my_turn(&self) -> bool {
        self.last.player_state == PlayerState::Active && self.last.game_state == GameState::Active
    }

    pub fn is_over(&self) -> bool {
        self.last.player_state.is_terminal() || self.last.game_state == GameState::Ended
    }

    /// True when the next pick adds a color instead of replaying one
    pub fn expects_new_color(&self) -> bool {
        self.extend_pending
    }

    /// The color the active player has to replay next, if any.
    pub fn next_expected(&self) -> Option<u32> {
        if self.extend_pending {
            None
        } else {
            self.sequence.get(self.cursor).copied()
        }
    }
}

impl Default for ClientGameState {
    fn default() -> Self {
        Self::new()
    }
}
