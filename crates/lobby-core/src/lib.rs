//! lobby-core
//!
//! Pure session logic for the lobby server:
//! - messages (client commands / server messages)
//! - player identity, lifecycle state and extension negotiation
//! - registries: players, lobby, game rooms, matchmaking queue, challenges
//! - the `Hub` that owns them all and runs the protocol state machine
//!
//! No sockets here; the transport feeds a [`Hub`] and drains each
//! connection's outbound channel.

pub mod board;
pub mod challenger;
pub mod disc;
mod dispatch;
pub mod error;
pub mod extension;
pub mod game_room;
pub mod hub;
pub mod lobby;
pub mod matchmaker;
pub mod messages;
pub mod player;
pub mod player_state;
pub mod registry;
pub mod room_manager;
pub mod state_cache;

pub use board::{EngineFactory, FourInARow, GameEngine};
pub use disc::Disc;
pub use error::{CannotChallenge, ChallengeFailed, CommandError, GameError, HubError};
pub use extension::{Extension, ExtensionSet};
pub use hub::{Hub, HubSettings};

pub use messages::{
    ChatScope,
    ClientCommand,
    CommandKind,
    ErrorCode,
    LineRejection,
    ParsedLine,
    ServerMessage,
};

pub use player::{ConnectionId, Outbound, OutboundRx, OutboundTx, Player, RoomId, Session};
pub use player_state::PlayerState;
