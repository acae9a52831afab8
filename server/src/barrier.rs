//! Reusable two-phase rendezvous for the player workers of one session
//!
//! Each round goes through two phases, tracked under a generation counter:
//!
//! 1. **Result ready**: the active worker applies its pick to the session and
//!    calls [`RoundBarrier::publish`]. Every worker blocks in
//!    [`RoundBarrier::wait_result`] until then, and afterwards copies the
//!    session fields into its own outbound record.
//! 2. **All delivered**: each worker sends its record and calls
//!    [`RoundBarrier::arrive`]. The arrival that brings the delivered count up
//!    to the number of participants closes the round: the flag and counter
//!    reset and the generation advances, releasing everyone blocked in
//!    [`RoundBarrier::wait_next_round`].
//!
//! No worker can therefore read the next pick before every connected client
//! has received the current round's result.
//!
//! Participants that leave (eliminated, winner, lost connection) still arrive
//! for their last round. Their departure takes effect when that round closes,
//! so the barrier is always sized to the players still connected.

use log::debug;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Phase {
    round: u64,
    result_ready: bool,
    delivered: usize,
    participants: usize,
    departing: usize,
}

pub struct RoundBarrier {
    state: watch::Sender<Phase>,
}

impl RoundBarrier {
    pub fn new(participants: usize) -> Self {
        let (state, _) = watch::channel(Phase {
            round: 0,
            result_ready: false,
            delivered: 0,
            participants,
            departing: 0,
        });
        Self { state }
    }

    /// Generation of the round currently in progress
    pub fn round(&self) -> u64 {
        self.state.borrow().round
    }

    pub fn participants(&self) -> usize {
        self.state.borrow().participants
    }

    pub fn is_result_ready(&self) -> bool {
        self.state.borrow().result_ready
    }

    /// Phase 1 release, called by the active worker once the round result is in the session.
    pub fn publish(&self) {
        self.state.send_modify(|phase| phase.result_ready = true);
    }

    /// Blocks until the result of `round` has been published.
    pub async fn wait_result(&self, round: u64) {
        self.wait_until(|phase| phase.round != round || phase.result_ready)
            .await;
    }

    /// Phase 2 count. Returns true for the arrival that closed the round.
    ///
    /// `leaving` marks a worker that will not take part in later rounds.
    pub fn arrive(&self, round: u64, leaving: bool) -> bool {
        let mut closed = false;

        self.state.send_modify(|phase| {
            if phase.round != round {
                return;
            }
            phase.delivered += 1;
            if leaving {
                phase.departing += 1;
            }

            if phase.delivered >= phase.participants {
                phase.participants -= phase.departing;
                phase.departing = 0;
                phase.delivered = 0;
                phase.result_ready = false;
                phase.round += 1;
                closed = true;
            }
        });

        if closed {
            debug!("Round {} delivered to every player", round);
        }
        closed
    }

    /// Blocks until `round` has been delivered to every participant.
    pub async fn wait_next_round(&self, round: u64) {
        self.wait_until(|phase| phase.round > round).await;
    }

    async fn wait_until(&self, condition: impl Fn(&Phase) -> bool) {
        let mut receiver = self.state.subscribe();
        loop {
            let satisfied = condition(&receiver.borrow_and_update());
            if satisfied {
                return;
            }
            // The sender lives as long as `self`, so this only fails if the barrier is gone
            if receiver.changed().await.is_err() {
                return;
            }
        }
    }
}
