//! Connection ↔ identity registry.
//!
//! Owns every [`Session`] and the name index. The only way to bind a name
//! is [`PlayerRegistry::complete_handshake`], which checks availability and
//! binds in one step, so two connections can never end up holding the same
//! name.

use std::collections::HashMap;

use crate::error::HubError;
use crate::extension::ExtensionSet;
use crate::player::{ConnectionId, Outbound, PendingSession, Player, Session};
use crate::player_state::PlayerState;

/// Outcome of a handshake attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Handshake {
    /// The name is now bound to this connection.
    Completed,
    /// Someone else holds the name; the session is unchanged.
    NameTaken,
}

#[derive(Debug, Default)]
pub struct PlayerRegistry {
    sessions: HashMap<ConnectionId, Session>,
    names: HashMap<String, ConnectionId>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        PlayerRegistry::default()
    }

    /// Register a freshly accepted connection as unidentified.
    pub fn create_session(&mut self, outbound: Outbound) -> Result<(), HubError> {
        let conn = outbound.conn();
        if self.sessions.contains_key(&conn) {
            return Err(HubError::DuplicateConnection(conn));
        }

        self.sessions
            .insert(conn, Session::Unidentified(PendingSession::new(outbound)));
        Ok(())
    }

    /// Atomically reserve `name` and promote the session to a [`Player`].
    ///
    /// On [`Handshake::NameTaken`] nothing is mutated.
    pub fn complete_handshake(
        &mut self,
        conn: ConnectionId,
        name: &str,
        group: &str,
        extensions: ExtensionSet,
    ) -> Result<Handshake, HubError> {
        match self.sessions.get(&conn) {
            None => return Err(HubError::UnknownConnection(conn)),
            Some(Session::Identified(_)) => return Err(HubError::DuplicateConnection(conn)),
            Some(Session::Unidentified(_)) => {}
        }

        if self.names.contains_key(name) {
            return Ok(Handshake::NameTaken);
        }

        let Some(Session::Unidentified(pending)) = self.sessions.remove(&conn) else {
            return Err(HubError::UnknownConnection(conn));
        };

        let player = pending.identify(name.to_string(), group.to_string(), extensions);
        self.sessions.insert(conn, Session::Identified(player));
        self.names.insert(name.to_string(), conn);

        Ok(Handshake::Completed)
    }

    /// Remove a session and, if identified, its name binding.
    pub fn remove(&mut self, conn: ConnectionId) -> Option<Session> {
        let session = self.sessions.remove(&conn)?;
        if let Session::Identified(player) = &session {
            self.names.remove(player.name());
        }
        Some(session)
    }

    pub fn session(&self, conn: ConnectionId) -> Option<&Session> {
        self.sessions.get(&conn)
    }

    pub fn pending(&self, conn: ConnectionId) -> Option<&PendingSession> {
        match self.sessions.get(&conn) {
            Some(Session::Unidentified(pending)) => Some(pending),
            _ => None,
        }
    }

    pub fn get(&self, conn: ConnectionId) -> Option<&Player> {
        match self.sessions.get(&conn) {
            Some(Session::Identified(player)) => Some(player),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, conn: ConnectionId) -> Option<&mut Player> {
        match self.sessions.get_mut(&conn) {
            Some(Session::Identified(player)) => Some(player),
            _ => None,
        }
    }

    /// Identified player lookup, failing with a [`HubError`].
    pub fn player(&self, conn: ConnectionId) -> Result<&Player, HubError> {
        self.get(conn).ok_or(HubError::NotIdentified(conn))
    }

    pub fn player_mut(&mut self, conn: ConnectionId) -> Result<&mut Player, HubError> {
        self.get_mut(conn).ok_or(HubError::NotIdentified(conn))
    }

    /// Connection currently holding `name`, if any.
    pub fn conn_by_name(&self, name: &str) -> Option<ConnectionId> {
        self.names.get(name).copied()
    }

    /// Non-failing lookup by name.
    pub fn get_by_name(&self, name: &str) -> Option<&Player> {
        self.conn_by_name(name).and_then(|conn| self.get(conn))
    }

    /// Every identified player.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.sessions.values().filter_map(|session| match session {
            Session::Identified(player) => Some(player),
            Session::Unidentified(_) => None,
        })
    }

    /// Connections of every identified player except `conn`.
    pub fn identified_except(&self, conn: ConnectionId) -> Vec<ConnectionId> {
        self.players()
            .map(Player::conn)
            .filter(|other| *other != conn)
            .collect()
    }

    /// `(name, state)` of every identified player except `conn`.
    pub fn snapshot_except(&self, conn: ConnectionId) -> Vec<(String, PlayerState)> {
        self.players()
            .filter(|player| player.conn() != conn)
            .map(|player| (player.name().to_string(), player.state()))
            .collect()
    }

    /// Number of live connections (identified or not).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of identified players.
    pub fn identified_len(&self) -> usize {
        self.names.len()
    }
}
