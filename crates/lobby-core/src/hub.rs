//! The session hub: application context that owns every registry.
//!
//! A [`Hub`] is driven by exactly one owner (the server's hub task), which
//! feeds it transport events one at a time:
//! - [`Hub::connect`] when a connection is accepted,
//! - [`Hub::handle_line`] for every decoded line,
//! - [`Hub::disconnect`] when the connection goes away.
//!
//! Because nothing else touches the registries, a handshake can never race
//! another handshake or a disconnect, and every room processes one move at
//! a time.
//!
//! Command handlers live in `dispatch.rs`; this file holds the lifecycle
//! operations they share (state transitions, starting and ending games).

use tracing::{debug, info};

use crate::board::{EngineFactory, FourInARow, GameEngine};
use crate::challenger::Challenger;
use crate::disc::Disc;
use crate::error::HubError;
use crate::extension::ExtensionSet;
use crate::game_room::Member;
use crate::matchmaker::MatchMaker;
use crate::player::{ConnectionId, Outbound, OutboundTx, RoomId, RoomRef, Session};
use crate::player_state::PlayerState;
use crate::registry::PlayerRegistry;
use crate::room_manager::RoomManager;

/// Server identity advertised in `accept`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubSettings {
    /// Two-digit group tag of this server.
    pub group: String,
    /// Extensions the server is willing to negotiate.
    pub extensions: ExtensionSet,
}

impl Default for HubSettings {
    fn default() -> Self {
        HubSettings {
            group: "19".to_string(),
            extensions: ExtensionSet::all(),
        }
    }
}

pub struct Hub {
    pub(crate) settings: HubSettings,
    pub(crate) registry: PlayerRegistry,
    pub(crate) rooms: RoomManager,
    pub(crate) matchmaker: MatchMaker,
    pub(crate) challenger: Challenger,
    engine_factory: EngineFactory,
}

impl Hub {
    /// Hub playing the bundled four-in-a-row game.
    pub fn new(settings: HubSettings) -> Self {
        Hub::with_engine_factory(
            settings,
            Box::new(|| Box::new(FourInARow::new()) as Box<dyn GameEngine>),
        )
    }

    pub fn with_engine_factory(settings: HubSettings, engine_factory: EngineFactory) -> Self {
        Hub {
            settings,
            registry: PlayerRegistry::new(),
            rooms: RoomManager::new(),
            matchmaker: MatchMaker::new(),
            challenger: Challenger::new(),
            engine_factory,
        }
    }

    // -------------------------------------------------------------------------
    // Transport callbacks
    // -------------------------------------------------------------------------

    /// A new connection; it starts unidentified.
    pub fn connect(&mut self, conn: ConnectionId, tx: OutboundTx) -> Result<(), HubError> {
        self.registry.create_session(Outbound::new(conn, tx))?;
        debug!("connection {} opened ({} live)", conn, self.registry.len());
        Ok(())
    }

    /// The connection is gone. Its player (if any) is cleaned out of every
    /// structure and reported `offline` to the lobby.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Result<(), HubError> {
        let (name, group, state, room) = match self.registry.session(conn) {
            None => return Err(HubError::UnknownConnection(conn)),
            Some(Session::Unidentified(_)) => {
                self.registry.remove(conn);
                debug!("connection {} closed before handshake", conn);
                return Ok(());
            }
            Some(Session::Identified(player)) => (
                player.name().to_string(),
                player.group().to_string(),
                player.state(),
                player.room().cloned(),
            ),
        };

        if let Some(RoomRef::Game(id)) = &room {
            let room = self
                .rooms
                .get_mut(id)
                .ok_or_else(|| HubError::UnknownRoom(id.to_string()))?;
            if room.on_player_disconnect(conn).is_some() {
                self.end_game(id, Some(conn))?;
            }
        }
        if state == PlayerState::InQueue {
            self.matchmaker.remove(conn);
        }
        self.rooms.lobby_mut().remove(conn);
        self.challenger.forget(&name);

        if let Some(Session::Identified(mut player)) = self.registry.remove(conn) {
            player.set_state(PlayerState::Disconnected);
        }
        self.broadcast_lobby_state(conn, &name, PlayerState::Disconnected);

        info!("{} (group {}) disconnected ({})", name, group, conn);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Lifecycle operations
    // -------------------------------------------------------------------------

    fn member(&self, conn: ConnectionId) -> Result<Member, HubError> {
        let player = self.registry.player(conn)?;
        Ok(Member::new(player.name(), player.outbound().clone()))
    }

    /// Presence update to every lobby member except `subject`.
    fn broadcast_lobby_state(&mut self, subject: ConnectionId, name: &str, state: PlayerState) {
        for member in self.rooms.lobby().others(subject) {
            if let Some(observer) = self.registry.get_mut(member) {
                observer.send_state_change(name, state);
            }
        }
    }

    /// Transition a player and tell the lobby. Leaving `InLobby` cancels
    /// every challenge that names the player.
    pub(crate) fn set_state(&mut self, conn: ConnectionId, next: PlayerState) -> Result<(), HubError> {
        let player = self.registry.player_mut(conn)?;
        let prev = player.set_state(next);
        if prev == next {
            return Ok(());
        }

        let name = player.name().to_string();
        debug!("{}: {:?} -> {:?}", name, prev, next);

        if prev == PlayerState::InLobby {
            self.challenger.forget(&name);
        }
        self.broadcast_lobby_state(conn, &name, next);
        Ok(())
    }

    /// Put a player in the lobby room and bring its view up to date.
    pub(crate) fn move_to_lobby(&mut self, conn: ConnectionId) -> Result<(), HubError> {
        self.set_state(conn, PlayerState::InLobby)?;

        let player = self.registry.player_mut(conn)?;
        player.set_room(Some(RoomRef::Lobby));
        player.set_seat(None);
        self.rooms.lobby_mut().add(conn);

        let snapshot = self.registry.snapshot_except(conn);
        self.registry.player_mut(conn)?.send_client_states(&snapshot);
        Ok(())
    }

    /// Seat `first` (starting colour) and `second` in a new room and begin.
    ///
    /// Both players are announced as `InGame` while they are still lobby
    /// members, so observers never see them vanish from the lobby first.
    pub(crate) fn start_game(
        &mut self,
        first: ConnectionId,
        second: ConnectionId,
    ) -> Result<(), HubError> {
        self.set_state(first, PlayerState::InGame)?;
        self.set_state(second, PlayerState::InGame)?;

        for conn in [first, second] {
            self.matchmaker.remove(conn);
            self.rooms.lobby_mut().remove(conn);
        }

        let red = self.member(first)?;
        let yellow = self.member(second)?;
        let id = self.rooms.open((self.engine_factory)(), red, yellow);

        for (conn, disc) in [(first, Disc::Red), (second, Disc::Yellow)] {
            let player = self.registry.player_mut(conn)?;
            player.set_room(Some(RoomRef::Game(id.clone())));
            player.set_seat(Some(disc));
        }

        self.rooms
            .get(&id)
            .ok_or_else(|| HubError::UnknownRoom(id.to_string()))?
            .begin();
        Ok(())
    }

    /// Tear a finished room down and send everyone still connected back to
    /// the lobby. `departed` is a member that is leaving entirely.
    pub(crate) fn end_game(
        &mut self,
        id: &RoomId,
        departed: Option<ConnectionId>,
    ) -> Result<(), HubError> {
        let room = self
            .rooms
            .remove(id)
            .ok_or_else(|| HubError::UnknownRoom(id.to_string()))?;
        debug!("room {} closed", id);

        for conn in room.member_conns() {
            if Some(conn) == departed {
                continue;
            }
            if self.registry.get(conn).is_some() {
                self.move_to_lobby(conn)?;
            }
        }
        Ok(())
    }

    /// Seat `spectator` as an observer of room `id`. The player must be
    /// in the lobby.
    pub fn add_spectator(&mut self, id: &RoomId, spectator: ConnectionId) -> Result<(), HubError> {
        if self.rooms.get(id).is_none() {
            return Err(HubError::UnknownRoom(id.to_string()));
        }
        if !self.registry.player(spectator)?.state().is_in_lobby_room() {
            return Err(HubError::NotInLobby(spectator));
        }
        self.set_state(spectator, PlayerState::InGame)?;
        self.rooms.lobby_mut().remove(spectator);
        self.matchmaker.remove(spectator);

        self.registry
            .player_mut(spectator)?
            .set_room(Some(RoomRef::Game(id.clone())));
        let member = self.member(spectator)?;

        self.rooms
            .get_mut(id)
            .ok_or_else(|| HubError::UnknownRoom(id.to_string()))?
            .add_spectator(member);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    /// State of the player holding `name`, if connected.
    pub fn player_state(&self, name: &str) -> Option<PlayerState> {
        self.registry.get_by_name(name).map(|player| player.state())
    }

    /// Seat colour of the player holding `name`, while seated in a game.
    pub fn player_seat(&self, name: &str) -> Option<Disc> {
        self.registry.get_by_name(name).and_then(|player| player.seat())
    }

    /// Number of identified players.
    pub fn player_count(&self) -> usize {
        self.registry.identified_len()
    }

    /// Number of live connections, identified or not.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    pub fn lobby_len(&self) -> usize {
        self.rooms.lobby().len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.room_count()
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.room_ids()
    }

    pub fn queue_len(&self) -> usize {
        self.matchmaker.len()
    }

    pub fn pending_challenge_count(&self) -> usize {
        self.challenger.pending_count()
    }
}
