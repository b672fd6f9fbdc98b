//! User-defined aliases.
//!
//! An alias is a named [`Script`] invoked like a function: `$greet` or
//! `$greet(bob,#rust)`.  The engine consults the [`AliasStore`] before the
//! builtin catalog, so an alias can shadow a builtin of the same name.
//!
//! ## Positional parameters
//!
//! Before a body line is expanded, call arguments are substituted:
//!
//! | Sequence | Meaning                                   |
//! |----------|-------------------------------------------|
//! | `$0`     | Number of arguments                       |
//! | `$N`     | Argument N (1-based), empty if missing    |
//! | `$N-`    | Arguments N onward, joined with spaces    |
//! | `$N-M`   | Arguments N through M, joined with spaces |
//!
//! A body line starting with `/return` ends the alias with the expansion of
//! the rest of that line.  Otherwise the alias evaluates to its last
//! non-empty expanded line.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::script::engine::{ExpandError, Scope};

// ── Seams ─────────────────────────────────────────────────────────────────────

/// Something callable as `$name(args)`.
pub trait AliasScript {
    fn parse(&self, scope: &Scope<'_>, args: &[String]) -> Result<String, ExpandError>;
}

/// Name → alias lookup.  Names are matched case-insensitively.
pub trait AliasStore {
    fn lookup(&self, name: &str) -> Option<&dyn AliasScript>;
}

// ── Script ────────────────────────────────────────────────────────────────────

/// A multi-line alias body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    lines: Vec<String>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a script from a body, one line per `\n`.
    pub fn from_body(body: &str) -> Self {
        Script { lines: body.lines().map(str::to_owned).collect() }
    }

    pub fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl AliasScript for Script {
    fn parse(&self, scope: &Scope<'_>, args: &[String]) -> Result<String, ExpandError> {
        let mut result = String::new();
        for raw in &self.lines {
            let line = substitute_params(raw.trim(), args);
            if let Some(rest) = return_value(&line) {
                return scope.expand(rest);
            }
            let out = scope.expand(&line)?;
            if !out.trim().is_empty() {
                result = out;
            }
        }
        Ok(result)
    }
}

/// `"/return x"` → `Some("x")`; `"/return"` → `Some("")`.
fn return_value(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('/')?;
    let (cmd, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    cmd.eq_ignore_ascii_case("return").then(|| tail.trim())
}

fn param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$(\d+)(-(\d+)?)?").expect("static regex"))
}

/// Replace `$0`, `$N`, `$N-` and `$N-M` in `line` with call arguments.
pub fn substitute_params(line: &str, args: &[String]) -> String {
    if !line.contains('$') {
        return line.to_owned();
    }
    param_re()
        .replace_all(line, |caps: &Captures<'_>| {
            let n: usize = caps[1].parse().unwrap_or(0);
            let open_range = caps.get(2).is_some();
            if n == 0 && !open_range {
                return args.len().to_string();
            }
            let from = n.saturating_sub(1);
            if !open_range {
                return args.get(from).cloned().unwrap_or_default();
            }
            let to = caps
                .get(3)
                .and_then(|m| m.as_str().parse::<usize>().ok())
                .unwrap_or(args.len())
                .min(args.len());
            if from >= to {
                String::new()
            } else {
                args[from..to].join(" ")
            }
        })
        .into_owned()
}

// ── AliasTable ────────────────────────────────────────────────────────────────

/// In-memory alias store.
#[derive(Debug, Default)]
pub struct AliasTable {
    aliases: HashMap<String, Script>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or replace) an alias.
    pub fn define(&mut self, name: &str, script: Script) {
        self.aliases.insert(name.to_lowercase(), script);
    }

    /// Append a body line, creating the alias if needed.
    pub fn append_line(&mut self, name: &str, line: impl Into<String>) {
        self.aliases
            .entry(name.to_lowercase())
            .or_default()
            .push_line(line);
    }

    /// Remove an alias.  Returns `true` if it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.aliases.remove(&name.to_lowercase()).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Script> {
        self.aliases.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl AliasStore for AliasTable {
    fn lookup(&self, name: &str) -> Option<&dyn AliasScript> {
        self.get(name).map(|s| s as &dyn AliasScript)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
