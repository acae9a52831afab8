//! # Color Recall Server Library
//!
//! This library provides the authoritative server for the color recall game:
//! players take turns replaying a growing color sequence from memory and
//! extending it by one color. A wrong color eliminates the player; the last
//! one standing wins.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Game State
//! The server owns the color sequence, the turn pointer and the roster. All
//! decisions (is this color right, whose turn is next, who won) are made
//! here; clients only display the records they receive and send color picks.
//!
//! ### Round Synchronization
//! Every connected player is served by its own task. Exactly one of them, the
//! active player's, applies a pick per round. All of them then deliver the
//! same round result to their clients, and no task starts the next round
//! until every delivery is complete.
//!
//! ## Architecture Design
//!
//! ### Task Per Player
//! Each connection runs in a dedicated tokio task for the whole session. The
//! tasks share one `Session` behind a `tokio::sync::Mutex` and one
//! `RoundBarrier`. Network reads and writes only ever block the owning task.
//!
//! ### Two-Phase Barrier
//! Phase 1 ("result ready") releases the workers once the active player's
//! pick has been applied; phase 2 ("all delivered") releases them once every
//! client has received the result. The barrier is generation counted and
//! shrinks as players leave.
//!
//! ### Fixed-Width Records
//! Client and server exchange one fixed-size record type in both directions,
//! encoded with bincode (see the `shared` crate).
//!
//! ## Module Organization
//!
//! ### Session Module (`session`)
//! Roster, color sequence, counters and registration/configuration.
//!
//! ### Turn Module (`turn`)
//! Extend and recall rounds, turn rotation, forfeits and winner detection.
//!
//! ### Barrier Module (`barrier`)
//! The reusable two-phase rendezvous.
//!
//! ### Worker Module (`worker`)
//! The per-connection loop: receive, apply or observe, synchronize, send.
//!
//! ### Lobby Module (`lobby`)
//! Setter handshake, registration of further players, and the `Game` that
//! spawns the workers.
//!
//! ### Network Module (`network`)
//! TCP listener filling lobbies and launching sessions.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), server::BoxError> {
//!     let config = ServerConfig {
//!         addr: "127.0.0.1:8080".to_string(),
//!         ..ServerConfig::default()
//!     };
//!
//!     // Waits for a setter, fills the roster, plays, and repeats
//!     let server = Server::bind(config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod barrier;
pub mod lobby;
pub mod network;
pub mod session;
pub mod turn;
pub mod worker;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
