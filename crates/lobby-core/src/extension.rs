//! Optional protocol extensions negotiated during the handshake.
//!
//! Clients advertise free-form extension tokens in `join`; tokens the
//! server does not know are accepted and ignored. The negotiated set for
//! a session is the intersection of what the client advertised and what
//! the server is configured to support.

use std::fmt;

/// A protocol capability that gates a group of commands.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// Lobby presence: `state_change` broadcasts.
    Lobby,
    /// `chat_local` / `chat_global` and `message` delivery.
    Chat,
    /// `challenge` / `challenge_response`.
    Challenge,
}

impl Extension {
    /// Canonical advertisement order.
    pub const ALL: [Extension; 3] = [Extension::Lobby, Extension::Chat, Extension::Challenge];

    /// Token used on the wire (case-sensitive).
    pub fn name(self) -> &'static str {
        match self {
            Extension::Lobby => "Lobby",
            Extension::Chat => "Chat",
            Extension::Challenge => "Challenge",
        }
    }

    /// Look up a known extension by its wire token.
    pub fn from_token(token: &str) -> Option<Self> {
        Extension::ALL.into_iter().find(|ext| ext.name() == token)
    }

    fn bit(self) -> u8 {
        match self {
            Extension::Lobby => 0b001,
            Extension::Chat => 0b010,
            Extension::Challenge => 0b100,
        }
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A small set of [`Extension`]s.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ExtensionSet(u8);

impl ExtensionSet {
    pub fn empty() -> Self {
        ExtensionSet(0)
    }

    /// Every extension this crate implements.
    pub fn all() -> Self {
        Extension::ALL.into_iter().collect()
    }

    /// Build a set from wire tokens, ignoring unknown ones.
    pub fn from_tokens<'a, I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        tokens.into_iter().filter_map(Extension::from_token).collect()
    }

    pub fn insert(&mut self, ext: Extension) {
        self.0 |= ext.bit();
    }

    pub fn contains(&self, ext: Extension) -> bool {
        self.0 & ext.bit() != 0
    }

    pub fn intersection(&self, other: &ExtensionSet) -> ExtensionSet {
        ExtensionSet(self.0 & other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Members in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = Extension> + '_ {
        Extension::ALL.into_iter().filter(|ext| self.contains(*ext))
    }
}

impl FromIterator<Extension> for ExtensionSet {
    fn from_iter<T: IntoIterator<Item = Extension>>(iter: T) -> Self {
        let mut set = ExtensionSet::empty();
        for ext in iter {
            set.insert(ext);
        }
        set
    }
}
