//! Shared types for the lobby TCP server.
//!
//! This module defines the channel between connection tasks and the hub
//! task. Connection ids and outbound channels come from `lobby_core`.

use lobby_core::{ConnectionId, OutboundTx, ParsedLine};
use tokio::sync::mpsc;

/// Transport event flowing from a connection task into the hub task.
///
/// A connection's `Connected` always precedes its lines and `Disconnected`
/// always follows them, because one task sends all three.
#[derive(Debug)]
pub enum HubRequest {
    Connected { conn: ConnectionId, tx: OutboundTx },
    Line { conn: ConnectionId, line: ParsedLine },
    Disconnected { conn: ConnectionId },
}

/// Channel from connection tasks → hub task.
pub type HubTx = mpsc::UnboundedSender<HubRequest>;
pub type HubRx = mpsc::UnboundedReceiver<HubRequest>;
