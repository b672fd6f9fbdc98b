//! Data sources that identifiers read from.
//!
//! `$read`, `$readini` and `$hget` never touch the disk or the hash tables
//! directly; they go through the traits below so an embedding client (or a
//! test) can supply its own.  Every method is fail-soft: a missing file,
//! section or item is `None`, never an error.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::Path;

// ── Seams ─────────────────────────────────────────────────────────────────────

/// Line-oriented text files (`$read`).
pub trait TextFiles {
    fn lines(&self, path: &Path) -> Option<Vec<String>>;
}

/// Ini-style configuration files (`$readini`).
pub trait IniFiles {
    fn value(&self, path: &Path, section: &str, key: &str) -> Option<String>;
}

/// Named in-memory hash tables (`$hget`).
pub trait HashTables {
    fn get(&self, table: &str, item: &str) -> Option<String>;
}

/// Free-text prompt shown to the user (`$input`).
pub trait Prompter {
    fn prompt(&self, message: &str, title: Option<&str>) -> Option<String>;
}

// ── Filesystem defaults ───────────────────────────────────────────────────────

/// Reads files from disk on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFiles;

impl TextFiles for DiskFiles {
    fn lines(&self, path: &Path) -> Option<Vec<String>> {
        match std::fs::read_to_string(path) {
            Ok(s) => Some(s.lines().map(str::to_owned).collect()),
            Err(e) => {
                log::debug!("read {}: {e}", path.display());
                None
            }
        }
    }
}

impl IniFiles for DiskFiles {
    fn value(&self, path: &Path, section: &str, key: &str) -> Option<String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| log::debug!("readini {}: {e}", path.display()))
            .ok()?;
        ini_lookup(&text, section, key)
    }
}

/// Find `key` under `[section]`; both match case-insensitively.
///
/// Lines starting with `;` or `#` are comments.  The first matching key
/// wins.
pub fn ini_lookup(text: &str, section: &str, key: &str) -> Option<String> {
    let mut in_section = false;
    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_section = name.trim().eq_ignore_ascii_case(section);
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            if k.trim().eq_ignore_ascii_case(key) {
                return Some(v.trim().to_owned());
            }
        }
    }
    None
}

// ── Hash tables ───────────────────────────────────────────────────────────────

/// In-memory hash tables.  Table names are case-insensitive, item names
/// are case-insensitive too.
#[derive(Debug, Default)]
pub struct MemoryTables {
    tables: HashMap<String, HashMap<String, String>>,
}

impl MemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, table: &str, item: &str, value: impl Into<String>) {
        self.tables
            .entry(table.to_lowercase())
            .or_default()
            .insert(item.to_lowercase(), value.into());
    }

    pub fn remove(&mut self, table: &str, item: &str) -> bool {
        self.tables
            .get_mut(&table.to_lowercase())
            .is_some_and(|t| t.remove(&item.to_lowercase()).is_some())
    }

    pub fn free(&mut self, table: &str) -> bool {
        self.tables.remove(&table.to_lowercase()).is_some()
    }
}

impl HashTables for MemoryTables {
    fn get(&self, table: &str, item: &str) -> Option<String> {
        self.tables
            .get(&table.to_lowercase())?
            .get(&item.to_lowercase())
            .cloned()
    }
}

// ── Prompts ───────────────────────────────────────────────────────────────────

/// Headless sessions: every prompt is dismissed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl Prompter for NoPrompt {
    fn prompt(&self, message: &str, _title: Option<&str>) -> Option<String> {
        log::debug!("input prompt dismissed: {message:?}");
        None
    }
}

/// Asks on stderr and reads one line from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdioPrompt;

impl Prompter for StdioPrompt {
    fn prompt(&self, message: &str, title: Option<&str>) -> Option<String> {
        let mut err = std::io::stderr();
        match title {
            Some(t) => write!(err, "[{t}] {message} ").ok()?,
            None => write!(err, "{message} ").ok()?,
        }
        err.flush().ok()?;
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_owned()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
