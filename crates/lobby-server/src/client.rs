//! Per-connection I/O.
//!
//! The read side splits the byte stream into lines, decodes them and
//! forwards them to the hub. A separate writer task drains the
//! connection's outbound channel.

use anyhow::{anyhow, bail, Result};
use bytes::BytesMut;
use lobby_core::{ConnectionId, OutboundRx};
use lobby_protocol::{format_message, parse_line};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::types::{HubRequest, HubTx};

/// Run the I/O loops for a single connection until it closes.
pub async fn run_client(
    conn: ConnectionId,
    stream: TcpStream,
    hub_tx: HubTx,
    max_line_len: usize,
) -> Result<()> {
    stream.set_nodelay(true)?;
    let (read_half, write_half) = stream.into_split();

    let (out_tx, out_rx) = mpsc::unbounded_channel();
    hub_tx
        .send(HubRequest::Connected { conn, tx: out_tx })
        .map_err(|_| anyhow!("hub task has stopped"))?;

    let writer = tokio::spawn(write_loop(conn, write_half, out_rx));

    let result = read_loop(conn, read_half, &hub_tx, max_line_len).await;

    // Ignored: if the hub is gone there is nobody left to tell.
    let _ = hub_tx.send(HubRequest::Disconnected { conn });

    // The writer drains whatever the hub queued before the disconnect and
    // stops once the hub has dropped every sender for this connection.
    if let Err(e) = writer.await {
        warn!("{} writer task failed: {}", conn, e);
    }

    result
}

async fn read_loop(
    conn: ConnectionId,
    mut read_half: OwnedReadHalf,
    hub_tx: &HubTx,
    max_line_len: usize,
) -> Result<()> {
    let mut buffer = BytesMut::with_capacity(4096);

    loop {
        // Process complete lines
        while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
            if newline_pos > max_line_len {
                bail!("line longer than {} bytes", max_line_len);
            }
            let line = buffer.split_to(newline_pos + 1);
            let text = String::from_utf8_lossy(&line[..newline_pos]);
            trace!("{} -> {}", conn, text.trim_end());

            if let Some(parsed) = parse_line(&text) {
                hub_tx
                    .send(HubRequest::Line { conn, line: parsed })
                    .map_err(|_| anyhow!("hub task has stopped"))?;
            }
        }

        // Unterminated tail
        if buffer.len() > max_line_len {
            bail!("line longer than {} bytes", max_line_len);
        }

        if read_half.read_buf(&mut buffer).await? == 0 {
            if !buffer.is_empty() {
                debug!("{} closed with {} unterminated byte(s)", conn, buffer.len());
            }
            return Ok(());
        }
    }
}

async fn write_loop(conn: ConnectionId, mut write_half: OwnedWriteHalf, mut out_rx: OutboundRx) {
    while let Some(msg) = out_rx.recv().await {
        let mut line = format_message(&msg);
        trace!("{} <- {}", conn, line);
        line.push('\n');

        if let Err(e) = write_half.write_all(line.as_bytes()).await {
            warn!("{} write error: {}", conn, e);
            break;
        }
    }
}
