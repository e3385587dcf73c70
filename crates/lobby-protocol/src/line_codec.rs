//! Text line codec.
//!
//! One command per line, space-separated tokens, command name first.
//!
//! Input (line → [`ParsedLine`]):
//!
//! - `join <name> <group> <ext>*`
//! - `ready_for_game`
//! - `do_move <column>`
//! - `chat_local <text>` / `chat_global <text>`
//! - `challenge <name>`
//! - `challenge_response <name> yes|no`
//! - `error <code> [message]`
//!
//! Output ([`ServerMessage`] → line):
//!
//! - `accept <group> <ext>*`
//! - `start_game <first> <second>`
//! - `request_move <name>` / `done_move <name> <column>`
//! - `game_end [winner]`
//! - `state_change <name> lobby|lobby_ready|game|offline`
//! - `message <sender> [global]<text>` / `message <sender> [local]<text>`
//! - `challenge <name>`
//! - `error <NNN> <message>`

use lobby_core::board::COLUMNS;
use lobby_core::{
    ChatScope, ClientCommand, CommandError, CommandKind, LineRejection, ParsedLine, PlayerState,
    ServerMessage,
};

/// Command name → kind. The only place command names are known.
pub const COMMANDS: &[(&str, CommandKind)] = &[
    ("join", CommandKind::Join),
    ("ready_for_game", CommandKind::ReadyForGame),
    ("do_move", CommandKind::DoMove),
    ("chat_local", CommandKind::ChatLocal),
    ("chat_global", CommandKind::ChatGlobal),
    ("challenge", CommandKind::Challenge),
    ("challenge_response", CommandKind::ChallengeResponse),
    ("error", CommandKind::Error),
];

pub fn command_kind(name: &str) -> Option<CommandKind> {
    COMMANDS
        .iter()
        .find(|(command, _)| *command == name)
        .map(|(_, kind)| *kind)
}

/// Parse one line.
///
/// Returns `None` for blank lines. A trailing `\r` is ignored.
pub fn parse_line(line: &str) -> Option<ParsedLine> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    let (name, rest) = match line.split_once(' ') {
        Some((name, rest)) => (name, Some(rest)),
        None => (line, None),
    };

    let Some(kind) = command_kind(name) else {
        return Some(Err(LineRejection::unknown()));
    };

    let args: Vec<&str> = rest.map_or_else(Vec::new, |r| r.split_whitespace().collect());

    let parsed = match kind {
        CommandKind::Join => parse_join(&args),
        CommandKind::ReadyForGame => Ok(ClientCommand::ReadyForGame),
        CommandKind::DoMove => parse_do_move(&args),
        CommandKind::ChatLocal => parse_chat(rest).map(|text| ClientCommand::ChatLocal { text }),
        CommandKind::ChatGlobal => parse_chat(rest).map(|text| ClientCommand::ChatGlobal { text }),
        CommandKind::Challenge => parse_challenge(&args),
        CommandKind::ChallengeResponse => parse_challenge_response(&args),
        CommandKind::Error => parse_error(&args),
    };

    Some(parsed.map_err(|err| LineRejection::malformed(kind, err)))
}

fn require_args(args: &[&str], expected: usize) -> Result<(), CommandError> {
    if args.len() < expected {
        Err(CommandError::Syntax { expected })
    } else {
        Ok(())
    }
}

fn parse_join(args: &[&str]) -> Result<ClientCommand, CommandError> {
    // join <name> <group> <ext>*
    require_args(args, 2)?;

    if !is_valid_name(args[0]) {
        return Err(CommandError::InvalidUsername("player-name"));
    }
    if !is_valid_group(args[1]) {
        return Err(CommandError::InvalidParameter("group-number"));
    }
    if !args[2..].iter().all(|ext| is_valid_extension(ext)) {
        return Err(CommandError::InvalidParameter("extension-list"));
    }

    Ok(ClientCommand::Join {
        name: args[0].to_string(),
        group: args[1].to_string(),
        extensions: args[2..].iter().map(|ext| ext.to_string()).collect(),
    })
}

fn parse_do_move(args: &[&str]) -> Result<ClientCommand, CommandError> {
    require_args(args, 1)?;

    let column = parse_column(args[0]).ok_or(CommandError::InvalidParameter("column"))?;
    Ok(ClientCommand::DoMove { column })
}

fn parse_chat(rest: Option<&str>) -> Result<String, CommandError> {
    let text = rest.ok_or(CommandError::Syntax { expected: 1 })?;
    if !is_valid_chat(text) {
        return Err(CommandError::InvalidChat);
    }
    Ok(text.to_string())
}

fn parse_challenge(args: &[&str]) -> Result<ClientCommand, CommandError> {
    require_args(args, 1)?;

    if !is_valid_name(args[0]) {
        return Err(CommandError::InvalidParameter("player-name"));
    }
    Ok(ClientCommand::Challenge {
        name: args[0].to_string(),
    })
}

fn parse_challenge_response(args: &[&str]) -> Result<ClientCommand, CommandError> {
    require_args(args, 2)?;

    if !is_valid_name(args[0]) {
        return Err(CommandError::InvalidParameter("player-name"));
    }
    let accept = match args[1] {
        "yes" => true,
        "no" => false,
        _ => return Err(CommandError::InvalidParameter("answer")),
    };

    Ok(ClientCommand::ChallengeResponse {
        name: args[0].to_string(),
        accept,
    })
}

fn parse_error(args: &[&str]) -> Result<ClientCommand, CommandError> {
    require_args(args, 1)?;

    if !is_valid_error_code(args[0]) {
        return Err(CommandError::InvalidParameter("error-code"));
    }
    Ok(ClientCommand::Error {
        code: args[0].to_string(),
        message: args[1..].join(" "),
    })
}

// -----------------------------------------------------------------------------
// Validators
// -----------------------------------------------------------------------------

pub fn is_valid_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn is_valid_group(s: &str) -> bool {
    s.len() == 2 && s.chars().all(|c| c.is_ascii_digit())
}

pub fn is_valid_extension(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphabetic() || c == '_')
}

pub fn is_valid_chat(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ')
}

fn is_valid_error_code(s: &str) -> bool {
    s.len() == 3 && s.chars().all(|c| c.is_ascii_digit())
}

/// A single digit naming an existing column.
fn parse_column(s: &str) -> Option<u8> {
    let mut chars = s.chars();
    let digit = chars.next()?.to_digit(10)?;
    if chars.next().is_some() || digit as usize >= COLUMNS {
        return None;
    }
    Some(digit as u8)
}

// -----------------------------------------------------------------------------
// Output
// -----------------------------------------------------------------------------

/// Wire name of a presence state.
pub fn state_name(state: PlayerState) -> &'static str {
    match state {
        PlayerState::InLobby => "lobby",
        PlayerState::InQueue => "lobby_ready",
        PlayerState::InGame => "game",
        // Never broadcast before the handshake completes.
        PlayerState::InitialConnect | PlayerState::Disconnected => "offline",
    }
}

/// Format a server message as one line, without the trailing newline.
pub fn format_message(msg: &ServerMessage) -> String {
    match msg {
        ServerMessage::Accept { group, extensions } => {
            if extensions.is_empty() {
                format!("accept {}", group)
            } else {
                format!("accept {} {}", group, extensions.join(" "))
            }
        }
        ServerMessage::StartGame { first, second } => format!("start_game {} {}", first, second),
        ServerMessage::RequestMove { name } => format!("request_move {}", name),
        ServerMessage::DoneMove { name, column } => format!("done_move {} {}", name, column),
        ServerMessage::GameEnd { winner: Some(winner) } => format!("game_end {}", winner),
        ServerMessage::GameEnd { winner: None } => "game_end".to_string(),
        ServerMessage::StateChange { name, state } => {
            format!("state_change {} {}", name, state_name(*state))
        }
        ServerMessage::Chat {
            sender,
            scope,
            text,
        } => {
            let tag = match scope {
                ChatScope::Global => "[global]",
                ChatScope::Local => "[local]",
            };
            format!("message {} {}{}", sender, tag, text)
        }
        ServerMessage::Challenge { name } => format!("challenge {}", name),
        ServerMessage::Error { code, message } => {
            if message.is_empty() {
                format!("error {:03}", code.as_u16())
            } else {
                format!("error {:03} {}", code.as_u16(), message)
            }
        }
    }
}
