//! Central hub loop.
//!
//! This task owns the [`Hub`] and applies every [`HubRequest`] in arrival
//! order. All outbound traffic is pushed by the hub itself onto each
//! connection's channel, so there is no routing step here.

use lobby_core::Hub;
use tracing::{error, info};

use crate::types::{HubRequest, HubRx};

/// Run the hub until every sender is dropped.
pub async fn run_hub_loop(mut hub_rx: HubRx, mut hub: Hub) {
    while let Some(req) = hub_rx.recv().await {
        let result = match req {
            HubRequest::Connected { conn, tx } => hub.connect(conn, tx),
            HubRequest::Line { conn, line } => hub.handle_line(conn, line),
            HubRequest::Disconnected { conn } => hub.disconnect(conn),
        };

        if let Err(err) = &result {
            error!("hub contract violation: {}", err);
        }
        debug_assert!(result.is_ok(), "hub contract violation: {:?}", result);
    }

    info!(
        "hub loop shutting down ({} players, {} rooms)",
        hub.player_count(),
        hub.room_count()
    );
}
