//! Internal address list (IAL).
//!
//! The client caches the `nick!user@host` of every user it sees on a shared
//! channel.  `$address(nick,N)` reads the cache and renders it as one of
//! the ten conventional ban-mask levels; `$comchan(nick,N)` lists the
//! channels we share with a nick.

use std::collections::HashMap;

/// Read access to the address cache.
pub trait AddressList {
    /// Full `nick!user@host` for `nick`, if known.
    fn address_of(&self, nick: &str) -> Option<String>;

    /// Channels shared with `nick`, in join order.
    fn common_channels(&self, nick: &str) -> Vec<String>;
}

#[derive(Debug, Clone, Default)]
struct Entry {
    address: Option<String>,
    channels: Vec<String>,
}

/// In-memory address list keyed by lower-cased nick.
#[derive(Debug, Default)]
pub struct Ial {
    entries: HashMap<String, Entry>,
}

impl Ial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a full `nick!user@host`.  Returns `false` if it is malformed.
    pub fn add(&mut self, full: &str) -> bool {
        let Some(parts) = AddressParts::parse(full) else {
            return false;
        };
        self.entries
            .entry(parts.nick.to_lowercase())
            .or_default()
            .address = Some(full.to_owned());
        true
    }

    /// Record that `nick` is on `channel`.
    pub fn join(&mut self, nick: &str, channel: &str) {
        let entry = self.entries.entry(nick.to_lowercase()).or_default();
        if !entry.channels.iter().any(|c| c.eq_ignore_ascii_case(channel)) {
            entry.channels.push(channel.to_owned());
        }
    }

    pub fn part(&mut self, nick: &str, channel: &str) {
        if let Some(entry) = self.entries.get_mut(&nick.to_lowercase()) {
            entry.channels.retain(|c| !c.eq_ignore_ascii_case(channel));
        }
    }

    /// Forget a nick entirely (quit).
    pub fn remove(&mut self, nick: &str) -> bool {
        self.entries.remove(&nick.to_lowercase()).is_some()
    }
}

impl AddressList for Ial {
    fn address_of(&self, nick: &str) -> Option<String> {
        self.entries.get(&nick.to_lowercase())?.address.clone()
    }

    fn common_channels(&self, nick: &str) -> Vec<String> {
        self.entries
            .get(&nick.to_lowercase())
            .map(|e| e.channels.clone())
            .unwrap_or_default()
    }
}

// ── Address masks ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AddressParts<'a> {
    nick: &'a str,
    user: &'a str,
    host: &'a str,
}

impl<'a> AddressParts<'a> {
    fn parse(full: &'a str) -> Option<Self> {
        let (nick, rest) = full.split_once('!')?;
        let (user, host) = rest.split_once('@')?;
        if nick.is_empty() || user.is_empty() || host.is_empty() {
            return None;
        }
        Some(AddressParts { nick, user, host })
    }
}

/// Wildcard the most specific part of a host: the last octet of an IPv4
/// address, otherwise the first label of a name with at least two dots.
fn wild_host(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    let is_ipv4 = labels.len() == 4
        && labels.iter().all(|l| !l.is_empty() && l.bytes().all(|b| b.is_ascii_digit()));
    if is_ipv4 {
        format!("{}.*", labels[..3].join("."))
    } else if labels.len() > 2 {
        format!("*.{}", labels[1..].join("."))
    } else {
        host.to_owned()
    }
}

/// Render `nick!user@host` as mask `level` (0–9).
///
/// | Level | Mask                 |
/// |-------|----------------------|
/// | 0     | `*!user@host`        |
/// | 1     | `*!*user@host`       |
/// | 2     | `*!*@host`           |
/// | 3     | `*!*user@*.host`     |
/// | 4     | `*!*@*.host`         |
/// | 5–9   | as 0–4 with the nick |
///
/// A leading `~` on the ident is dropped in the `*user` forms.
pub fn address_mask(full: &str, level: i64) -> Option<String> {
    let parts = AddressParts::parse(full)?;
    if !(0..=9).contains(&level) {
        return None;
    }
    let nick = if level >= 5 { parts.nick } else { "*" };
    let user = parts.user.trim_start_matches('~');
    let mask = match level % 5 {
        0 => format!("{nick}!{}@{}", parts.user, parts.host),
        1 => format!("{nick}!*{user}@{}", parts.host),
        2 => format!("{nick}!*@{}", parts.host),
        3 => format!("{nick}!*{user}@{}", wild_host(parts.host)),
        _ => format!("{nick}!*@{}", wild_host(parts.host)),
    };
    Some(mask)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const BOB: &str = "Bob!~bobby@irc.example.com";

    #[test]
    fn masks() {
        assert_eq!(address_mask(BOB, 0).as_deref(), Some("*!~bobby@irc.example.com"));
        assert_eq!(address_mask(BOB, 1).as_deref(), Some("*!*bobby@irc.example.com"));
        assert_eq!(address_mask(BOB, 2).as_deref(), Some("*!*@irc.example.com"));
        assert_eq!(address_mask(BOB, 3).as_deref(), Some("*!*bobby@*.example.com"));
        assert_eq!(address_mask(BOB, 4).as_deref(), Some("*!*@*.example.com"));
        assert_eq!(address_mask(BOB, 5).as_deref(), Some(BOB));
        assert_eq!(address_mask(BOB, 9).as_deref(), Some("Bob!*@*.example.com"));
    }

    #[test]
    fn ipv4_host_masks_last_octet() {
        assert_eq!(
            address_mask("x!y@192.168.1.20", 4).as_deref(),
            Some("*!*@192.168.1.*")
        );
    }

    #[test]
    fn bad_level_or_address() {
        assert_eq!(address_mask(BOB, 10), None);
        assert_eq!(address_mask(BOB, -1), None);
        assert_eq!(address_mask("no-at-sign", 2), None);
    }

    #[test]
    fn ial_lookup_and_channels() {
        let mut ial = Ial::new();
        assert!(ial.add(BOB));
        assert!(!ial.add("garbage"));
        ial.join("bob", "#rust");
        ial.join("BOB", "#irc");
        ial.join("bob", "#RUST");
        assert_eq!(ial.address_of("bob").as_deref(), Some(BOB));
        assert_eq!(ial.common_channels("Bob"), vec!["#rust", "#irc"]);
        ial.part("bob", "#rust");
        assert_eq!(ial.common_channels("bob"), vec!["#irc"]);
        assert!(ial.remove("bob"));
        assert_eq!(ial.address_of("bob"), None);
    }
}
