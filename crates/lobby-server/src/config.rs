//! Configuration for the lobby TCP server.
//!
//! Sources, later wins:
//!
//! 1. built-in defaults,
//! 2. an optional TOML file,
//! 3. environment variables:
//!    - `LOBBY_BIND_ADDR`   (default: "0.0.0.0")
//!    - `LOBBY_PORT`        (default: "6666")
//!    - `LOBBY_MAX_CLIENTS` (default: "1024")
//!    - `LOBBY_GROUP`       (default: "19")
//!    - `LOBBY_EXTENSIONS`  (default: "Lobby,Chat,Challenge")
//!    - `LOBBY_MAX_LINE_LEN` (default: "4096")
//! 4. command-line flags (applied by the binary).

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use lobby_core::{Extension, ExtensionSet, HubSettings};
use serde::Deserialize;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Maximum number of simultaneously connected clients.
    pub max_clients: usize,

    /// Two-digit group tag sent in `accept`.
    pub group: String,

    /// Extensions offered during the handshake.
    pub extensions: Vec<String>,

    /// Longest accepted line, in bytes, before the connection is dropped.
    pub max_line_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: 6666,
            max_clients: 1024,
            group: "19".to_string(),
            extensions: Extension::ALL.iter().map(|ext| ext.name().to_string()).collect(),
            max_line_len: 4096,
        }
    }
}

impl Config {
    /// Defaults, then `path` (if any), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Read a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Config::from_toml(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply `LOBBY_*` overrides found through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("LOBBY_BIND_ADDR") {
            self.bind_addr = addr;
        }
        override_parsed(&lookup, "LOBBY_PORT", &mut self.port)?;
        override_parsed(&lookup, "LOBBY_MAX_CLIENTS", &mut self.max_clients)?;
        if let Some(group) = lookup("LOBBY_GROUP") {
            self.group = group;
        }
        if let Some(list) = lookup("LOBBY_EXTENSIONS") {
            self.extensions = list
                .split(',')
                .map(str::trim)
                .filter(|ext| !ext.is_empty())
                .map(str::to_string)
                .collect();
        }
        override_parsed(&lookup, "LOBBY_MAX_LINE_LEN", &mut self.max_line_len)?;
        Ok(())
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Validated hub settings.
    pub fn hub_settings(&self) -> Result<HubSettings> {
        if self.group.len() != 2 || !self.group.chars().all(|c| c.is_ascii_digit()) {
            bail!("group must be exactly two digits, got {:?}", self.group);
        }

        let mut extensions = ExtensionSet::empty();
        for token in &self.extensions {
            match Extension::from_token(token) {
                Some(ext) => extensions.insert(ext),
                None => bail!("unknown extension {:?}", token),
            }
        }

        Ok(HubSettings {
            group: self.group.clone(),
            extensions,
        })
    }
}

fn override_parsed<T, F>(lookup: &F, key: &str, slot: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup(key) {
        *slot = val
            .parse::<T>()
            .with_context(|| format!("invalid value for {}: {:?}", key, val))?;
    }
    Ok(())
}
