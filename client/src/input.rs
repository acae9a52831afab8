//! Sources of color picks: a human at the terminal or a simulated player

use crate::game::ClientGameState;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{is_valid_color, COLOR_COUNT};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

/// Player count a bot answers with when it becomes the setter
pub const DEFAULT_BOT_PLAYERS: u32 = 2;

/// Where the client gets its answers from
pub enum InputManager {
    Terminal(TerminalInput<BufReader<Stdin>>),
    Bot(BotInput),
}

impl InputManager {
    pub fn terminal() -> Self {
        InputManager::Terminal(TerminalInput::new(BufReader::new(tokio::io::stdin())))
    }

    pub fn bot(bot: BotInput) -> Self {
        InputManager::Bot(bot)
    }

    pub async fn pick_color(&mut self, game: &ClientGameState) -> io::Result<u32> {
        match self {
            InputManager::Terminal(terminal) => terminal.read_color().await,
            InputManager::Bot(bot) => Ok(bot.pick_color(game)),
        }
    }

    pub async fn player_count(&mut self) -> io::Result<u32> {
        match self {
            InputManager::Terminal(terminal) => terminal.read_player_count().await,
            InputManager::Bot(bot) => Ok(bot.players),
        }
    }
}

/// Reads numbers line by line, asking again until the answer is usable.
pub struct TerminalInput<R> {
    lines: Lines<R>,
}

impl<R> TerminalInput<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    pub async fn read_color(&mut self) -> io::Result<u32> {
        loop {
            let value = self.read_number().await?;
            if is_valid_color(value) {
                return Ok(value);
            }
            println!("Colors are numbered 1 to {}", COLOR_COUNT);
        }
    }

    /// Any positive count is accepted here; the server decides whether it fits.
    pub async fn read_player_count(&mut self) -> io::Result<u32> {
        loop {
            let value = self.read_number().await?;
            if value > 0 {
                return Ok(value);
            }
            println!("A game needs at least one player");
        }
    }

    async fn read_number(&mut self) -> io::Result<u32> {
        loop {
            let line = self.lines.next_line().await?.ok_or_else(|| {
                io::Error::new(io::ErrorKind::UnexpectedEof, "input closed")
            })?;

            match line.trim().parse::<u32>() {
                Ok(value) => return Ok(value),
                Err(_) => println!("Please enter a number"),
            }
        }
    }
}

/// Simulated player that follows the sequence from the broadcasts.
///
/// With probability `mistake_rate` it picks a wrong color while replaying.
pub struct BotInput {
    rng: StdRng,
    mistake_rate: f64,
    players: u32,
}

impl BotInput {
    pub fn new(mistake_rate: f64, players: u32) -> Self {
        Self::with_rng(StdRng::from_entropy(), mistake_rate, players)
    }

    pub fn seeded(seed: u64, mistake_rate: f64, players: u32) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), mistake_rate, players)
    }

    fn with_rng(rng: StdRng, mistake_rate: f64, players: u32) -> Self {
        Self {
            rng,
            mistake_rate: mistake_rate.clamp(0.0, 1.0),
            players,
        }
    }

    pub fn pick_color(&mut self, game: &ClientGameState) -> u32 {
        let color = match game.next_expected() {
            Some(expected) if self.rng.gen_bool(self.mistake_rate) => self.other_than(expected),
            Some(expected) => expected,
            None => self.rng.gen_range(1..=COLOR_COUNT),
        };
        debug!("Bot picks color {}", color);
        color
    }

    // Uniform over the remaining colors
    fn other_than(&mut self, color: u32) -> u32 {
        let other = self.rng.gen_range(1..COLOR_COUNT);
        if other >= color {
            other + 1
        } else {
            other
        }
    }
}
