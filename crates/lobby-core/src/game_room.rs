//! A running game between two seated players.
//!
//! The room owns its [`GameEngine`] and the outbound handles of everyone
//! watching. It reports what happened through [`MoveOutcome`]; moving
//! players back to the lobby afterwards is the hub's job.

use tracing::{debug, info};

use crate::board::GameEngine;
use crate::disc::Disc;
use crate::error::CommandError;
use crate::messages::{ErrorCode, ServerMessage};
use crate::player::{ConnectionId, Outbound, RoomId};

/// Someone in the room: a seat or a spectator.
#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    pub outbound: Outbound,
}

impl Member {
    pub fn new(name: impl Into<String>, outbound: Outbound) -> Self {
        Member {
            name: name.into(),
            outbound,
        }
    }

    pub fn conn(&self) -> ConnectionId {
        self.outbound.conn()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Refused; the mover got an error and nothing changed.
    Rejected,
    /// Applied; the next turn has been requested.
    Continued,
    /// Applied and the game is over. `None` is a draw.
    Finished { winner: Option<String> },
}

pub struct GameRoom {
    id: RoomId,
    engine: Box<dyn GameEngine>,
    /// Indexed by [`Disc::seat_index`].
    seats: [Member; 2],
    spectators: Vec<Member>,
    finished: bool,
}

impl std::fmt::Debug for GameRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameRoom")
            .field("id", &self.id)
            .field("seats", &self.seats)
            .field("spectators", &self.spectators.len())
            .field("finished", &self.finished)
            .finish()
    }
}

impl GameRoom {
    /// `red` takes the starting seat.
    pub fn new(id: RoomId, engine: Box<dyn GameEngine>, red: Member, yellow: Member) -> Self {
        GameRoom {
            id,
            engine,
            seats: [red, yellow],
            spectators: Vec::new(),
            finished: false,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn seat(&self, disc: Disc) -> &Member {
        &self.seats[disc.seat_index()]
    }

    pub fn seat_of(&self, conn: ConnectionId) -> Option<Disc> {
        [Disc::Red, Disc::Yellow]
            .into_iter()
            .find(|disc| self.seat(*disc).conn() == conn)
    }

    /// Name of the player whose turn it is.
    pub fn turn_holder(&self) -> &str {
        &self.seat(self.engine.current_turn()).name
    }

    pub fn add_spectator(&mut self, member: Member) {
        debug!("{} is now watching {}", member.name, self.id);
        self.spectators.push(member);
    }

    pub fn spectator_count(&self) -> usize {
        self.spectators.len()
    }

    /// Seats first, then spectators.
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.seats.iter().chain(self.spectators.iter())
    }

    pub fn member_conns(&self) -> Vec<ConnectionId> {
        self.members().map(Member::conn).collect()
    }

    fn broadcast(&self, msg: &ServerMessage) {
        for member in self.members() {
            member.outbound.send(msg.clone());
        }
    }

    /// Announce the game and request the opening move.
    pub fn begin(&self) {
        let start = ServerMessage::StartGame {
            first: self.seats[0].name.clone(),
            second: self.seats[1].name.clone(),
        };
        for seat in &self.seats {
            seat.outbound.send(start.clone());
        }

        info!(
            "game {} started: {} vs {}",
            self.id, self.seats[0].name, self.seats[1].name
        );
        self.broadcast(&ServerMessage::request_move(self.turn_holder()));
    }

    pub fn handle_move(&mut self, conn: ConnectionId, column: u8) -> MoveOutcome {
        let Some(mover) = self.members().find(|m| m.conn() == conn).cloned() else {
            return MoveOutcome::Rejected;
        };

        let disc = match self.seat_of(conn) {
            Some(disc) if !self.finished && disc == self.engine.current_turn() => disc,
            _ => {
                mover.outbound.send(ServerMessage::from(&CommandError::NotYourMove));
                return MoveOutcome::Rejected;
            }
        };

        if !self.engine.is_move_valid(column, disc) {
            mover.outbound.send(ServerMessage::from(&CommandError::InvalidMove));
            return MoveOutcome::Rejected;
        }
        if let Err(err) = self.engine.apply_move(column, disc) {
            debug!("engine refused a validated move in {}: {}", self.id, err);
            mover.outbound.send(ServerMessage::from(&CommandError::InvalidMove));
            return MoveOutcome::Rejected;
        }

        self.broadcast(&ServerMessage::done_move(mover.name.as_str(), column));

        if self.engine.is_over() {
            let winner = self.engine.winner().map(|d| self.seat(d).name.clone());
            self.finish(winner.as_deref());
            return MoveOutcome::Finished { winner };
        }

        self.broadcast(&ServerMessage::request_move(self.turn_holder()));
        MoveOutcome::Continued
    }

    /// A member's connection went away.
    ///
    /// Losing a seat ends the game in favour of the other seat; the returned
    /// name is that winner. Losing a spectator just drops it.
    pub fn on_player_disconnect(&mut self, conn: ConnectionId) -> Option<String> {
        let Some(disc) = self.seat_of(conn) else {
            self.spectators.retain(|s| s.conn() != conn);
            return None;
        };
        if self.finished {
            return None;
        }

        let gone = self.seat(disc).name.clone();
        let remaining = self.seat(disc.opponent()).clone();

        remaining.outbound.send(ServerMessage::error(
            ErrorCode::PlayerDisconnected,
            gone.as_str(),
        ));

        let end = ServerMessage::game_end(Some(&remaining.name));
        for member in self.members().filter(|m| m.conn() != conn) {
            member.outbound.send(end.clone());
        }

        self.finished = true;
        info!("game {} ended: {} left, {} wins", self.id, gone, remaining.name);
        Some(remaining.name)
    }

    fn finish(&mut self, winner: Option<&str>) {
        self.broadcast(&ServerMessage::game_end(winner));
        self.finished = true;

        match winner {
            Some(name) => info!("game {} ended: {} wins", self.id, name),
            None => info!("game {} ended in a draw", self.id),
        }
    }
}
