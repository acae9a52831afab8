//! Text output for the player at the terminal

use crate::game::{ClientGameState, RoundUpdate};
use shared::{PlayerState, COLOR_COUNT};

const COLOR_NAMES: [&str; COLOR_COUNT as usize] = [
    "red", "orange", "yellow", "green", "blue", "indigo", "violet",
];

pub fn color_name(color: u32) -> &'static str {
    color
        .checked_sub(1)
        .and_then(|index| COLOR_NAMES.get(index as usize))
        .copied()
        .unwrap_or("no color")
}

/// Prints game events. A disabled renderer stays silent (bots, tests).
pub struct Renderer {
    enabled: bool,
}

impl Renderer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn show(&self, text: &str) {
        if self.enabled {
            println!("{}", text);
        }
    }

    pub fn setter_prompt(&self) {
        self.show("You are the first player. How many players in this game?");
    }

    pub fn waiting_for_players(&self, expected: u32) {
        self.show(&format!("Waiting for {} players to join...", expected));
    }

    pub fn game_started(&self, game: &ClientGameState) {
        self.show(&format!(
            "Game started with {} players",
            game.last().expected_players
        ));
    }

    pub fn turn_prompt(&self, game: &ClientGameState) {
        if game.expects_new_color() {
            self.show(&format!("Your turn! Add a new color (1-{})", COLOR_COUNT));
        } else {
            self.show(&format!(
                "Your turn! Pick color {} of {} (1-{})",
                game.cursor() + 1,
                game.sequence().len(),
                COLOR_COUNT
            ));
        }
    }

    pub fn round_result(&self, game: &ClientGameState, update: RoundUpdate) {
        match update {
            RoundUpdate::Extended(color) => self.show(&format!(
                "New color! {} ({}) - the sequence is {} long",
                color,
                color_name(color),
                game.sequence().len()
            )),
            RoundUpdate::Recalled(color) => {
                self.show(&format!("Correct: {} ({})", color, color_name(color)))
            }
            RoundUpdate::Missed(0) => self.show("No color picked, player is out"),
            RoundUpdate::Missed(color) => self.show(&format!(
                "Wrong color: {} ({}), player is out",
                color,
                color_name(color)
            )),
        }

        if game.last().new_round && !game.is_over() {
            self.show("New round!");
        }
    }

    pub fn outcome(&self, game: &ClientGameState) {
        match game.player_state() {
            PlayerState::Winner => self.show("You win!"),
            PlayerState::Eliminated => self.show("You lose!"),
            _ => self.show("Game over"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_names() {
        assert_eq!(color_name(1), "red");
        assert_eq!(color_name(COLOR_COUNT), "violet");
        assert_eq!(color_name(0), "no color");
        assert_eq!(color_name(COLOR_COUNT + 1), "no color");
    }
}
