//! FIFO matchmaking queue.
//!
//! Pairing is first-come first-served with no rating: a newly queued player
//! is matched with whoever has waited longest.

use std::collections::VecDeque;

use tracing::debug;

use crate::player::ConnectionId;

/// Result of [`MatchMaker::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Nobody was waiting; the player is now at the back of the queue.
    Queued,
    /// `opponent` was popped from the head of the queue.
    Matched { opponent: ConnectionId },
}

#[derive(Debug, Default)]
pub struct MatchMaker {
    queue: VecDeque<ConnectionId>,
}

impl MatchMaker {
    pub fn new() -> Self {
        MatchMaker::default()
    }

    pub fn enqueue(&mut self, conn: ConnectionId) -> MatchOutcome {
        // A player already waiting cannot be matched with itself.
        self.remove(conn);

        match self.queue.pop_front() {
            Some(opponent) => {
                debug!("matched {} with queue head {}", conn, opponent);
                MatchOutcome::Matched { opponent }
            }
            None => {
                self.queue.push_back(conn);
                debug!("{} queued", conn);
                MatchOutcome::Queued
            }
        }
    }

    /// Idempotent; returns whether `conn` was waiting.
    pub fn remove(&mut self, conn: ConnectionId) -> bool {
        match self.queue.iter().position(|c| *c == conn) {
            Some(idx) => {
                self.queue.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
