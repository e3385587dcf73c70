//! Owner of the lobby singleton and every running [`GameRoom`].

use std::collections::HashMap;

use crate::board::GameEngine;
use crate::game_room::{GameRoom, Member};
use crate::lobby::Lobby;
use crate::player::RoomId;

#[derive(Debug, Default)]
pub struct RoomManager {
    lobby: Lobby,
    rooms: HashMap<RoomId, GameRoom>,
}

impl RoomManager {
    pub fn new() -> Self {
        RoomManager::default()
    }

    pub fn lobby(&self) -> &Lobby {
        &self.lobby
    }

    pub fn lobby_mut(&mut self) -> &mut Lobby {
        &mut self.lobby
    }

    /// Create a room for `red` (starting seat) and `yellow`, keyed by both
    /// names. The room is not started.
    pub fn open(&mut self, engine: Box<dyn GameEngine>, red: Member, yellow: Member) -> RoomId {
        let id = RoomId::for_players(&red.name, &yellow.name);
        let room = GameRoom::new(id.clone(), engine, red, yellow);

        let previous = self.rooms.insert(id.clone(), room);
        debug_assert!(previous.is_none(), "room {id} opened twice");
        id
    }

    pub fn get(&self, id: &RoomId) -> Option<&GameRoom> {
        self.rooms.get(id)
    }

    pub fn get_mut(&mut self, id: &RoomId) -> Option<&mut GameRoom> {
        self.rooms.get_mut(id)
    }

    pub fn remove(&mut self, id: &RoomId) -> Option<GameRoom> {
        self.rooms.remove(id)
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().cloned().collect()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
