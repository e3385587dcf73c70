//! Message types exchanged between sessions and the hub.
//!
//! These are **transport-agnostic** logical messages:
//! - [`ClientCommand`]: what a connection asks the hub to do.
//! - [`ServerMessage`]: what the hub pushes to a connection.
//!
//! The text encoding lives in the `lobby-protocol` crate; this module is
//! purely logical.

use crate::error::CommandError;
use crate::player_state::PlayerState;

/// The command a line names, independent of whether its arguments parsed.
///
/// The hub uses this to apply extension and state gates *before*
/// reporting argument errors, so a client in the wrong state learns about
/// the state first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Join,
    ReadyForGame,
    DoMove,
    ChatLocal,
    ChatGlobal,
    Challenge,
    ChallengeResponse,
    Error,
}

/// A fully validated client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Handshake: `join <name> <group> <ext...>`.
    Join {
        name: String,
        group: String,
        extensions: Vec<String>,
    },

    /// Enter the matchmaking queue.
    ReadyForGame,

    /// Drop a disc into `column`.
    DoMove { column: u8 },

    /// Chat to the sender's current room.
    ChatLocal { text: String },

    /// Chat to every identified player.
    ChatGlobal { text: String },

    /// Challenge the named lobby player.
    Challenge { name: String },

    /// Answer a pending challenge from `name`.
    ChallengeResponse { name: String, accept: bool },

    /// Client-side fault report. Logged, never answered.
    Error { code: String, message: String },
}

impl ClientCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            ClientCommand::Join { .. } => CommandKind::Join,
            ClientCommand::ReadyForGame => CommandKind::ReadyForGame,
            ClientCommand::DoMove { .. } => CommandKind::DoMove,
            ClientCommand::ChatLocal { .. } => CommandKind::ChatLocal,
            ClientCommand::ChatGlobal { .. } => CommandKind::ChatGlobal,
            ClientCommand::Challenge { .. } => CommandKind::Challenge,
            ClientCommand::ChallengeResponse { .. } => CommandKind::ChallengeResponse,
            ClientCommand::Error { .. } => CommandKind::Error,
        }
    }
}

/// A line the codec could not turn into a [`ClientCommand`].
///
/// `kind` is `None` when the command name itself is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRejection {
    pub kind: Option<CommandKind>,
    pub error: CommandError,
}

impl LineRejection {
    pub fn unknown() -> Self {
        LineRejection {
            kind: None,
            error: CommandError::UnknownCommand,
        }
    }

    pub fn malformed(kind: CommandKind, error: CommandError) -> Self {
        LineRejection {
            kind: Some(kind),
            error,
        }
    }
}

/// Output of the line codec, as consumed by [`Hub::handle_line`](crate::Hub::handle_line).
pub type ParsedLine = Result<ClientCommand, LineRejection>;

/// Numeric error categories used on the wire.
///
/// Clients only compare the code; the trailing text is informational.
#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidMove = 2,
    PlayerDisconnected = 3,
    InvalidUsername = 4,
    CannotChallenge = 5,
    InvalidChat = 6,
    InvalidCommand = 7,
    InvalidParameter = 8,
    Syntax = 9,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Where a chat line was posted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChatScope {
    Local,
    Global,
}

/// A message pushed from the server to one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Handshake accepted.
    Accept { group: String, extensions: Vec<String> },

    /// A game started; `first` moves first.
    StartGame { first: String, second: String },

    /// `name` is expected to move next.
    RequestMove { name: String },

    /// `name` dropped a disc into `column`.
    DoneMove { name: String, column: u8 },

    /// The game ended; `None` means a draw.
    GameEnd { winner: Option<String> },

    /// Lobby presence update.
    StateChange { name: String, state: PlayerState },

    /// Relayed chat line.
    Chat {
        sender: String,
        scope: ChatScope,
        text: String,
    },

    /// `name` challenged the receiving player.
    Challenge { name: String },

    /// Error report.
    Error { code: ErrorCode, message: String },
}

// -----------------------------------------------------------------------------
// Convenience constructors
// -----------------------------------------------------------------------------

impl ServerMessage {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code,
            message: message.into(),
        }
    }

    pub fn state_change(name: impl Into<String>, state: PlayerState) -> Self {
        ServerMessage::StateChange {
            name: name.into(),
            state,
        }
    }

    pub fn request_move(name: impl Into<String>) -> Self {
        ServerMessage::RequestMove { name: name.into() }
    }

    pub fn done_move(name: impl Into<String>, column: u8) -> Self {
        ServerMessage::DoneMove {
            name: name.into(),
            column,
        }
    }

    pub fn game_end(winner: Option<&str>) -> Self {
        ServerMessage::GameEnd {
            winner: winner.map(str::to_string),
        }
    }
}

impl From<&CommandError> for ServerMessage {
    fn from(err: &CommandError) -> Self {
        ServerMessage::error(err.code(), err.to_string())
    }
}
