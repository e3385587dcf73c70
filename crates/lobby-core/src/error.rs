//! Error types for the session core.
//!
//! - [`CommandError`]: every way a client command can be refused. These are
//!   always recoverable and become an `error` line to the sender.
//! - [`CannotChallenge`] / [`ChallengeFailed`]: challenge sub-protocol refusals.
//! - [`GameError`]: a [`GameEngine`](crate::GameEngine) refused a move.
//! - [`HubError`]: broken wiring between the transport and the hub. These
//!   must never happen in a correctly wired server.

use thiserror::Error;

use crate::extension::Extension;
use crate::messages::ErrorCode;
use crate::player::ConnectionId;

/// A refused client command.
///
/// `Display` is the human-readable text sent after the error code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command")]
    UnknownCommand,

    #[error("Expected at least {expected} parameter(s)")]
    Syntax { expected: usize },

    #[error("{0}")]
    InvalidUsername(&'static str),

    #[error("{0}")]
    InvalidParameter(&'static str),

    #[error("Message contains invalid characters")]
    InvalidChat,

    #[error("You must be in the {0} state")]
    WrongState(&'static str),

    #[error("{0} extension not specified during handshake")]
    ExtensionRequired(Extension),

    #[error("Not your move")]
    NotYourMove,

    #[error("Move is invalid")]
    InvalidMove,
}

impl CommandError {
    /// Wire category for this refusal.
    pub fn code(&self) -> ErrorCode {
        match self {
            CommandError::UnknownCommand
            | CommandError::WrongState(_)
            | CommandError::ExtensionRequired(_)
            | CommandError::NotYourMove => ErrorCode::InvalidCommand,
            CommandError::Syntax { .. } => ErrorCode::Syntax,
            CommandError::InvalidUsername(_) => ErrorCode::InvalidUsername,
            CommandError::InvalidParameter(_) => ErrorCode::InvalidParameter,
            CommandError::InvalidChat => ErrorCode::InvalidChat,
            CommandError::InvalidMove => ErrorCode::InvalidMove,
        }
    }
}

/// Why a `challenge` was refused. Sent with [`ErrorCode::CannotChallenge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CannotChallenge {
    #[error("Opponent does not exist")]
    DoesNotExist,

    #[error("Opponent must be in the lobby state")]
    NotInLobby,

    #[error("Opponent does not support challenging")]
    ExtensionNotSupported,

    #[error("You cannot challenge yourself")]
    Yourself,
}

/// Why a `challenge_response` failed. Sent with [`ErrorCode::InvalidParameter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChallengeFailed {
    #[error("Unknown challenger name")]
    UnknownChallenger,

    #[error("The challenger has not challenged you")]
    NotChallenged,

    #[error("Challenger is not in the lobby state")]
    ChallengerUnavailable,
}

/// A move the engine refused to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("column {0} is out of range")]
    ColumnOutOfRange(u8),

    #[error("column {0} is full")]
    ColumnFull(u8),

    #[error("it is not {0:?}'s turn")]
    WrongTurn(crate::disc::Disc),

    #[error("the game is already over")]
    GameOver,
}

/// Contract violations between the transport and the hub.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("connection {0} already has a session")]
    DuplicateConnection(ConnectionId),

    #[error("connection {0} has no session")]
    UnknownConnection(ConnectionId),

    #[error("connection {0} has not completed the handshake")]
    NotIdentified(ConnectionId),

    #[error("connection {0} is not in the lobby")]
    NotInLobby(ConnectionId),

    #[error("game room {0} does not exist")]
    UnknownRoom(String),
}
