//! Pending-challenge bookkeeping.
//!
//! Edges are keyed by name and directed `challenger -> challengee`. The
//! table never looks players up itself; the caller resolves names through
//! the registry and passes what it found, so a player that vanished
//! between two commands simply resolves to `None`.

use std::collections::HashMap;

use indexmap::IndexSet;
use tracing::debug;

use crate::error::{CannotChallenge, ChallengeFailed};
use crate::player_state::PlayerState;

/// What the registry knows about the player being challenged.
#[derive(Debug, Clone, Copy)]
pub struct ChallengeTarget<'a> {
    pub name: &'a str,
    pub state: PlayerState,
    pub supports_challenge: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// New edge; the target should be sent `challenge <from>`.
    Notify,
    /// The same edge was already pending; nothing to send.
    AlreadyPending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Accepted and both players are free: start a game.
    StartGame,
    /// Declined; the edge is gone and nothing else happens.
    Declined,
}

#[derive(Debug, Default)]
pub struct Challenger {
    /// challengee -> challengers, oldest first.
    pending: HashMap<String, IndexSet<String>>,
}

impl Challenger {
    pub fn new() -> Self {
        Challenger::default()
    }

    pub fn challenge(
        &mut self,
        from: &str,
        target: Option<ChallengeTarget<'_>>,
    ) -> Result<ChallengeOutcome, CannotChallenge> {
        let target = target.ok_or(CannotChallenge::DoesNotExist)?;

        if target.name == from {
            return Err(CannotChallenge::Yourself);
        }
        if target.state != PlayerState::InLobby {
            return Err(CannotChallenge::NotInLobby);
        }
        if !target.supports_challenge {
            return Err(CannotChallenge::ExtensionNotSupported);
        }

        let inserted = self
            .pending
            .entry(target.name.to_string())
            .or_default()
            .insert(from.to_string());

        if inserted {
            debug!("challenge pending: {} -> {}", from, target.name);
            Ok(ChallengeOutcome::Notify)
        } else {
            Ok(ChallengeOutcome::AlreadyPending)
        }
    }

    /// Consume the edge `from -> challengee`.
    ///
    /// `challenger_state` is the challenger's current state, or `None` if no
    /// such player is connected.
    pub fn respond(
        &mut self,
        challengee: &str,
        from: &str,
        challenger_state: Option<PlayerState>,
        accepted: bool,
    ) -> Result<Resolution, ChallengeFailed> {
        let challenger_state = challenger_state.ok_or(ChallengeFailed::UnknownChallenger)?;

        if !self.remove_edge(from, challengee) {
            return Err(ChallengeFailed::NotChallenged);
        }

        if !accepted {
            debug!("challenge declined: {} -> {}", from, challengee);
            return Ok(Resolution::Declined);
        }
        if challenger_state != PlayerState::InLobby {
            return Err(ChallengeFailed::ChallengerUnavailable);
        }

        Ok(Resolution::StartGame)
    }

    /// Drop every edge with `name` at either end. Returns how many went.
    pub fn forget(&mut self, name: &str) -> usize {
        let mut removed = self.pending.remove(name).map_or(0, |set| set.len());

        self.pending.retain(|_, challengers| {
            if challengers.shift_remove(name) {
                removed += 1;
            }
            !challengers.is_empty()
        });

        if removed > 0 {
            debug!("cancelled {} pending challenge(s) involving {}", removed, name);
        }
        removed
    }

    pub fn is_pending(&self, from: &str, to: &str) -> bool {
        self.pending
            .get(to)
            .is_some_and(|challengers| challengers.contains(from))
    }

    /// Total number of pending edges.
    pub fn pending_count(&self) -> usize {
        self.pending.values().map(IndexSet::len).sum()
    }

    fn remove_edge(&mut self, from: &str, to: &str) -> bool {
        let Some(challengers) = self.pending.get_mut(to) else {
            return false;
        };
        let removed = challengers.shift_remove(from);
        if challengers.is_empty() {
            self.pending.remove(to);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby_target(name: &str) -> Option<ChallengeTarget<'_>> {
        Some(ChallengeTarget {
            name,
            state: PlayerState::InLobby,
            supports_challenge: true,
        })
    }

    #[test]
    fn rejections_leave_no_edge() {
        let mut ch = Challenger::new();

        assert_eq!(ch.challenge("alice", None), Err(CannotChallenge::DoesNotExist));
        assert_eq!(
            ch.challenge("alice", lobby_target("alice")),
            Err(CannotChallenge::Yourself)
        );
        assert_eq!(
            ch.challenge(
                "alice",
                Some(ChallengeTarget {
                    name: "bob",
                    state: PlayerState::InGame,
                    supports_challenge: true,
                })
            ),
            Err(CannotChallenge::NotInLobby)
        );
        assert_eq!(
            ch.challenge(
                "alice",
                Some(ChallengeTarget {
                    name: "bob",
                    state: PlayerState::InLobby,
                    supports_challenge: false,
                })
            ),
            Err(CannotChallenge::ExtensionNotSupported)
        );

        assert_eq!(ch.pending_count(), 0);
    }

    #[test]
    fn repeated_challenge_is_idempotent() {
        let mut ch = Challenger::new();
        assert_eq!(
            ch.challenge("alice", lobby_target("bob")),
            Ok(ChallengeOutcome::Notify)
        );
        assert_eq!(
            ch.challenge("alice", lobby_target("bob")),
            Ok(ChallengeOutcome::AlreadyPending)
        );
        assert_eq!(ch.pending_count(), 1);
    }

    #[test]
    fn accept_consumes_the_edge() {
        let mut ch = Challenger::new();
        ch.challenge("alice", lobby_target("bob")).unwrap();

        assert_eq!(
            ch.respond("bob", "alice", Some(PlayerState::InLobby), true),
            Ok(Resolution::StartGame)
        );
        assert_eq!(
            ch.respond("bob", "alice", Some(PlayerState::InLobby), true),
            Err(ChallengeFailed::NotChallenged)
        );
    }

    #[test]
    fn accept_fails_when_challenger_moved_on() {
        let mut ch = Challenger::new();
        ch.challenge("alice", lobby_target("bob")).unwrap();

        assert_eq!(
            ch.respond("bob", "alice", Some(PlayerState::InQueue), true),
            Err(ChallengeFailed::ChallengerUnavailable)
        );
        assert!(!ch.is_pending("alice", "bob"));
    }

    #[test]
    fn decline_and_unknown_challenger() {
        let mut ch = Challenger::new();
        ch.challenge("alice", lobby_target("bob")).unwrap();

        assert_eq!(
            ch.respond("bob", "carol", None, true),
            Err(ChallengeFailed::UnknownChallenger)
        );
        assert_eq!(
            ch.respond("bob", "alice", Some(PlayerState::InLobby), false),
            Ok(Resolution::Declined)
        );
        assert_eq!(ch.pending_count(), 0);
    }

    #[test]
    fn forget_removes_both_directions() {
        let mut ch = Challenger::new();
        ch.challenge("alice", lobby_target("bob")).unwrap();
        ch.challenge("bob", lobby_target("carol")).unwrap();
        ch.challenge("carol", lobby_target("alice")).unwrap();

        assert_eq!(ch.forget("bob"), 2);
        assert_eq!(ch.pending_count(), 1);
        assert!(ch.is_pending("carol", "alice"));
    }
}
