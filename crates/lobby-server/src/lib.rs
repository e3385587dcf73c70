//! lobby-server
//!
//! Multi-client async TCP server for the lobby and game rooms.

pub mod config;
pub mod types;
pub mod server;

// these are internal modules, not re-exported
mod client;
mod hub_task;
