//! The lobby room: every player that is `InLobby` or `InQueue`.
//!
//! Membership only. Presence broadcasts need mutable access to each
//! member's [`Player`](crate::Player), so they are driven by the hub.

use indexmap::IndexSet;

use crate::player::ConnectionId;

#[derive(Debug, Default)]
pub struct Lobby {
    members: IndexSet<ConnectionId>,
}

impl Lobby {
    pub fn new() -> Self {
        Lobby::default()
    }

    /// Returns `false` if `conn` was already a member.
    pub fn add(&mut self, conn: ConnectionId) -> bool {
        self.members.insert(conn)
    }

    /// Returns `false` if `conn` was not a member.
    pub fn remove(&mut self, conn: ConnectionId) -> bool {
        self.members.shift_remove(&conn)
    }

    /// Members in join order.
    pub fn members(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.members.iter().copied()
    }

    /// Members other than `conn`, in join order.
    pub fn others(&self, conn: ConnectionId) -> Vec<ConnectionId> {
        self.members().filter(|m| *m != conn).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
