//! Interactive line client.
//!
//! Forwards stdin lines to the server and prints every line it sends back.
//!
//!     cargo run -p lobby-server --example line_client -- --server 127.0.0.1:6666

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Parser, Debug)]
#[clap(about = "Talk to a lobby-server by hand")]
struct Cli {
    /// Server address
    #[clap(short, long, default_value = "127.0.0.1:6666")]
    server: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let stream = TcpStream::connect(&cli.server)
        .await
        .with_context(|| format!("connecting to {}", cli.server))?;
    println!("Connected to {}.", cli.server);
    println!("Try: join alice 19 Lobby Chat Challenge");
    println!("Ctrl-D to leave.\n");

    let (read_half, mut write_half) = stream.into_split();
    let mut server_lines = BufReader::new(read_half).lines();
    let mut stdin_lines = BufReader::new(io::stdin()).lines();

    loop {
        tokio::select! {
            line = stdin_lines.next_line() => {
                let Some(line) = line? else {
                    println!("EOF on stdin, exiting client.");
                    break;
                };
                write_half.write_all(line.as_bytes()).await?;
                write_half.write_all(b"\n").await?;
            }
            line = server_lines.next_line() => {
                match line? {
                    Some(line) => println!("<< {}", line),
                    None => {
                        println!("Server closed the connection.");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
