//! lobby-protocol
//!
//! Wire-level encoding/decoding for the lobby server.
//!
//! Turns text lines into `lobby_core::ParsedLine` values and
//! `lobby_core::ServerMessage` values back into lines. The transport adds
//! and strips the `\n` terminator.

pub mod line_codec;

pub use line_codec::{format_message, parse_line, state_name, COMMANDS};
