//! # Color Recall Client Library
//!
//! This library provides the terminal client for the color recall game. It
//! connects to the server, answers the setter prompt when it is the first
//! player, sends color picks on its turn and shows every round result.
//!
//! ## Architecture Overview
//!
//! The server is authoritative and only broadcasts one fixed-size record per
//! round. The client never decides anything; it follows the records and keeps
//! just enough state to show the player what happened and, for bots, to know
//! which color comes next.
//!
//! ### Following the Sequence
//! Every connected client sees every round. A broadcast that comes after a
//! record announcing a new color appends to the local copy of the sequence;
//! any other correct broadcast advances the replay position by one.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! Client-side view of the session rebuilt from the broadcasts.
//!
//! ### Input Module (`input`)
//! Terminal input and a simulated player with a configurable mistake rate.
//!
//! ### Network Module (`network`)
//! The connection to the server: setter handshake and the round loop.
//!
//! ### Rendering Module (`rendering`)
//! Text output for the player.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::input::{BotInput, InputManager};
//! use client::network::Client;
//! use client::rendering::Renderer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), client::BoxError> {
//!     let input = InputManager::bot(BotInput::new(0.1, 2));
//!     let mut client = Client::connect("127.0.0.1:8080", input, Renderer::new(true)).await?;
//!
//!     let role = client.run().await?;
//!     println!("Finished as {:?}", role);
//!
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
