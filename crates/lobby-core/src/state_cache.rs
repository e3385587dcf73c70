//! Per-observer memory of the last presence state sent for each player.
//!
//! Used to suppress redundant `state_change` lines. It is purely an
//! optimisation: without it the lobby would still be correct, only
//! chattier.

use std::collections::HashMap;

use crate::player_state::PlayerState;

#[derive(Debug, Default)]
pub struct StateCache {
    last_sent: HashMap<String, PlayerState>,
}

impl StateCache {
    pub fn new() -> Self {
        StateCache::default()
    }

    /// `true` if `state` has not yet been sent for `name`.
    pub fn differs(&self, name: &str, state: PlayerState) -> bool {
        self.last_sent.get(name) != Some(&state)
    }

    /// Record that `state` was sent for `name`.
    ///
    /// `Disconnected` forgets the name, so a later player reusing it starts
    /// from "never seen".
    pub fn update(&mut self, name: &str, state: PlayerState) {
        if state == PlayerState::Disconnected {
            self.last_sent.remove(name);
        } else {
            self.last_sent.insert(name.to_string(), state);
        }
    }

    /// Names with a remembered state.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.last_sent.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.last_sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_sent.is_empty()
    }
}
