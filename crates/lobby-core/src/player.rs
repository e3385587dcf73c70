//! Per-connection session representation.
//!
//! A connection is either [`Session::Unidentified`] (only the handshake is
//! possible) or [`Session::Identified`] (a named [`Player`] with the full
//! command set). The two phases are separate types, so operations that only
//! make sense after the handshake simply do not exist before it.

use std::fmt;

use tokio::sync::mpsc;
use tracing::trace;

use crate::disc::Disc;
use crate::error::CommandError;
use crate::extension::{Extension, ExtensionSet};
use crate::messages::{ChatScope, ServerMessage};
use crate::player_state::PlayerState;
use crate::state_cache::StateCache;

/// Identifier for a live connection.
///
/// Opaque; unique over the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outbound messages from the hub to a given connection.
pub type OutboundTx = mpsc::UnboundedSender<ServerMessage>;
pub type OutboundRx = mpsc::UnboundedReceiver<ServerMessage>;

/// Fire-and-forget handle to one connection's writer.
///
/// Sending never blocks; if the connection is already gone the message is
/// dropped.
#[derive(Debug, Clone)]
pub struct Outbound {
    conn: ConnectionId,
    tx: OutboundTx,
}

impl Outbound {
    pub fn new(conn: ConnectionId, tx: OutboundTx) -> Self {
        Outbound { conn, tx }
    }

    pub fn conn(&self) -> ConnectionId {
        self.conn
    }

    pub fn send(&self, msg: ServerMessage) {
        if self.tx.send(msg).is_err() {
            trace!("dropping message for closed connection {}", self.conn);
        }
    }
}

/// Key of a game room, derived from both seat names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(String);

impl RoomId {
    /// `first-second`. Names never contain `-`, so this is unambiguous and
    /// unique while both names are held.
    pub fn for_players(first: &str, second: &str) -> Self {
        RoomId(format!("{first}-{second}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The room a player currently belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomRef {
    Lobby,
    Game(RoomId),
}

/// A connection that has not completed the handshake.
#[derive(Debug)]
pub struct PendingSession {
    outbound: Outbound,
}

impl PendingSession {
    pub fn new(outbound: Outbound) -> Self {
        PendingSession { outbound }
    }

    pub fn conn(&self) -> ConnectionId {
        self.outbound.conn()
    }

    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    pub fn send_error(&self, err: &CommandError) {
        self.outbound.send(ServerMessage::from(err));
    }

    /// Bind an identity. The resulting player is still `InitialConnect`
    /// until the hub moves it into the lobby.
    pub fn identify(self, name: String, group: String, extensions: ExtensionSet) -> Player {
        Player {
            name,
            group,
            extensions,
            state: PlayerState::InitialConnect,
            seat: None,
            room: None,
            outbound: self.outbound,
            state_cache: StateCache::new(),
        }
    }
}

/// An identified player bound to one live connection.
#[derive(Debug)]
pub struct Player {
    name: String,
    group: String,
    extensions: ExtensionSet,
    state: PlayerState,
    seat: Option<Disc>,
    room: Option<RoomRef>,
    outbound: Outbound,
    state_cache: StateCache,
}

impl Player {
    pub fn conn(&self) -> ConnectionId {
        self.outbound.conn()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn supports(&self, ext: Extension) -> bool {
        self.extensions.contains(ext)
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn seat(&self) -> Option<Disc> {
        self.seat
    }

    pub fn room(&self) -> Option<&RoomRef> {
        self.room.as_ref()
    }

    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    // -------------------------------------------------------------------------
    // Outbound helpers
    // -------------------------------------------------------------------------

    pub fn send(&self, msg: ServerMessage) {
        self.outbound.send(msg);
    }

    pub fn send_error(&self, err: &CommandError) {
        self.send(ServerMessage::from(err));
    }

    /// Presence update, only for Lobby-extension clients and only when the
    /// observer's cached view is stale. Returns whether a line was sent.
    pub fn send_state_change(&mut self, name: &str, state: PlayerState) -> bool {
        if !self.supports(Extension::Lobby) || state == PlayerState::InitialConnect {
            return false;
        }
        if !self.state_cache.differs(name, state) {
            return false;
        }

        self.state_cache.update(name, state);
        self.send(ServerMessage::state_change(name, state));
        true
    }

    /// Bring this observer's view up to date with `snapshot` (every other
    /// identified player). Names it still remembers that are no longer
    /// present are reported `offline` first.
    pub fn send_client_states(&mut self, snapshot: &[(String, PlayerState)]) {
        if !self.supports(Extension::Lobby) {
            return;
        }

        let gone: Vec<String> = self
            .state_cache
            .names()
            .filter(|cached| !snapshot.iter().any(|(name, _)| name == cached))
            .map(str::to_string)
            .collect();

        for name in gone {
            self.send_state_change(&name, PlayerState::Disconnected);
        }
        for (name, state) in snapshot {
            self.send_state_change(name, *state);
        }
    }

    /// Relay a chat line if this player negotiated the Chat extension.
    pub fn send_chat(&self, sender: &str, scope: ChatScope, text: &str) {
        if !self.supports(Extension::Chat) {
            return;
        }

        self.send(ServerMessage::Chat {
            sender: sender.to_string(),
            scope,
            text: text.to_string(),
        });
    }

    pub fn send_challenge(&self, from: &str) {
        self.send(ServerMessage::Challenge {
            name: from.to_string(),
        });
    }

    // -------------------------------------------------------------------------
    // Mutators (hub only)
    // -------------------------------------------------------------------------

    pub(crate) fn set_state(&mut self, next: PlayerState) -> PlayerState {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?} for {}",
            self.state,
            next,
            self.name
        );
        std::mem::replace(&mut self.state, next)
    }

    pub(crate) fn set_room(&mut self, room: Option<RoomRef>) {
        self.room = room;
    }

    pub(crate) fn set_seat(&mut self, seat: Option<Disc>) {
        self.seat = seat;
    }
}

/// Everything the registry knows about one connection.
#[derive(Debug)]
pub enum Session {
    Unidentified(PendingSession),
    Identified(Player),
}

impl Session {
    pub fn conn(&self) -> ConnectionId {
        match self {
            Session::Unidentified(pending) => pending.conn(),
            Session::Identified(player) => player.conn(),
        }
    }

    pub fn state(&self) -> PlayerState {
        match self {
            Session::Unidentified(_) => PlayerState::InitialConnect,
            Session::Identified(player) => player.state(),
        }
    }

    pub fn outbound(&self) -> &Outbound {
        match self {
            Session::Unidentified(pending) => pending.outbound(),
            Session::Identified(player) => player.outbound(),
        }
    }

    pub fn send_error(&self, err: &CommandError) {
        self.outbound().send(ServerMessage::from(err));
    }
}
