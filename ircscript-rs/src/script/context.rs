//! Session snapshot handed to every expansion.
//!
//! Corresponds to the `ScriptArgs` bundle the client builds for each event,
//! command line, or popup item before running a script.  The engine only
//! reads from it.

/// Read-only view of the session that identifiers such as `$me`, `$chan`,
/// and `$nick` resolve against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationContext {
    /// Our own nickname on this connection (`$me`).
    pub me: String,
    /// Channel the event happened on, or the active channel (`$chan`).
    pub channel: String,
    /// Nickname of the peer that triggered the event (`$nick`).
    pub nick: String,
    /// `user@host` of the peer (`$address`).
    pub address: String,
    /// Tag of the active window: a channel, query nick, or `Console` (`$active`).
    pub active_window: String,
    /// Connection id (`$cid`).
    pub connection_id: u32,
    /// Address of the server we are connected to (`$server`).
    pub server: String,
    /// Network name as announced by the server (`$network`).
    pub network: String,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field by its identifier name (`me`, `chan`, `nick`, …).
    ///
    /// Returns `false` for unknown names or a non-numeric `cid`.
    pub fn set_field(&mut self, name: &str, value: &str) -> bool {
        match name.to_ascii_lowercase().as_str() {
            "me" => self.me = value.to_owned(),
            "chan" | "channel" => self.channel = value.to_owned(),
            "nick" => self.nick = value.to_owned(),
            "address" => self.address = value.to_owned(),
            "active" => self.active_window = value.to_owned(),
            "server" => self.server = value.to_owned(),
            "network" => self.network = value.to_owned(),
            "cid" => match value.trim().parse() {
                Ok(id) => self.connection_id = id,
                Err(_) => return false,
            },
            _ => return false,
        }
        true
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
