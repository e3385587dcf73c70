//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Listens on the configured address/port.
//! - Accepts new TCP connections, up to `max_clients` at a time.
//! - Assigns each connection a `ConnectionId`.
//! - Spawns:
//!   - a per-connection task to handle I/O,
//!   - a single hub task that owns the `Hub`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use lobby_core::{ConnectionId, Hub};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

use crate::client;
use crate::config::Config;
use crate::hub_task;
use crate::types::{HubRx, HubTx};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

fn next_connection_id() -> ConnectionId {
    ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
}

/// Bind the configured address and serve forever.
pub async fn run(config: Config) -> Result<()> {
    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("listening on {}", addr);

    serve(listener, config).await
}

/// Serve on an already bound listener.
pub async fn serve(listener: TcpListener, config: Config) -> Result<()> {
    let settings = config.hub_settings()?;

    let (hub_tx, hub_rx): (HubTx, HubRx) = mpsc::unbounded_channel();
    tokio::spawn(hub_task::run_hub_loop(hub_rx, Hub::new(settings)));

    let slots = Arc::new(Semaphore::new(config.max_clients));

    loop {
        let (stream, peer_addr) = listener.accept().await.context("accepting connection")?;

        let Ok(permit) = slots.clone().try_acquire_owned() else {
            warn!(
                "rejecting connection from {}: max_clients ({}) reached",
                peer_addr, config.max_clients
            );
            // Dropping the stream closes it.
            continue;
        };

        let conn = next_connection_id();
        info!("accepted connection {} from {}", conn, peer_addr);

        let hub_tx = hub_tx.clone();
        let max_line_len = config.max_line_len;

        tokio::spawn(async move {
            let _permit = permit;
            match client::run_client(conn, stream, hub_tx, max_line_len).await {
                Ok(()) => info!("connection {} closed", conn),
                Err(e) => warn!("connection {} dropped: {:#}", conn, e),
            }
        });
    }
}
