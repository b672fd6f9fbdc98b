//! Script file loader.
//!
//! Seeds an engine and a session snapshot from a line-oriented file:
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `/alias <name> <body>` | define an alias; repeat to add body lines |
//! | `/set <field> <value>` or `/set <field>=<value>` | set a session field or `maxdepth` |
//! | `/hadd <table> <item> <value>` | store a hash table item |
//! | `/ial <nick!user@host>` | record a cached address |
//! | `/join <nick> <#chan>` | record a shared channel |
//! | Lines starting with `;` | comment, ignored |
//! | Any other `/command` | silently skipped |

use std::path::Path;

use thiserror::Error;

use crate::alias::AliasTable;
use crate::external::MemoryTables;
use crate::ial::Ial;
use crate::script::{Engine, EngineOptions, EvaluationContext};

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error on a recognised directive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

/// Everything a script file defines.
#[derive(Debug, Default)]
pub struct ScriptFile {
    pub aliases: AliasTable,
    pub tables: MemoryTables,
    pub ial: Ial,
    pub context: EvaluationContext,
    pub max_depth: Option<usize>,
}

impl ScriptFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse script file text.
    ///
    /// Returns what could be loaded plus an error for every malformed line.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut file = ScriptFile::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            let Some(rest) = line.strip_prefix('/') else { continue };
            let (cmd, args) = next_word(rest);

            let result = match cmd.to_ascii_lowercase().as_str() {
                "alias" => file.alias(args),
                "set" => file.set(args),
                "hadd" => file.hadd(args),
                "ial" => file.ial(args),
                "join" => file.join(args),
                _ => Ok(()),
            };
            if let Err(message) = result {
                log::warn!("line {}: {message}", i + 1);
                errors.push(ConfigError { line: i + 1, message });
            }
        }

        (file, errors)
    }

    /// Read and parse a script file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    /// Build an engine over the loaded collaborators, returning it with the
    /// session snapshot.
    pub fn into_engine(self, mut options: EngineOptions) -> (Engine, EvaluationContext) {
        if let Some(depth) = self.max_depth {
            options.max_depth = depth;
        }
        let engine = Engine::new()
            .with_options(options)
            .with_aliases(self.aliases)
            .with_hash_tables(self.tables)
            .with_address_list(self.ial);
        (engine, self.context)
    }

    // ── Directives ────────────────────────────────────────────────────────────

    fn alias(&mut self, args: &str) -> Result<(), String> {
        let (name, body) = next_word(args);
        if name.is_empty() {
            return Err("/alias: missing name".into());
        }
        if body.is_empty() {
            return Err(format!("/alias {name}: missing body"));
        }
        self.aliases.append_line(name, body);
        Ok(())
    }

    fn set(&mut self, args: &str) -> Result<(), String> {
        let (field, value) = match args.split_once('=') {
            Some((f, v)) if !f.trim().contains(char::is_whitespace) => (f.trim(), v.trim()),
            _ => next_word(args),
        };
        if field.is_empty() {
            return Err("/set: missing field".into());
        }
        if field.eq_ignore_ascii_case("maxdepth") {
            let depth = value
                .parse()
                .map_err(|_| format!("/set maxdepth: not a number: {value:?}"))?;
            self.max_depth = Some(depth);
            return Ok(());
        }
        if self.context.set_field(field, value) {
            Ok(())
        } else {
            Err(format!("/set {field}: unknown field or bad value {value:?}"))
        }
    }

    fn hadd(&mut self, args: &str) -> Result<(), String> {
        let (table, rest) = next_word(args);
        let (item, value) = next_word(rest);
        if table.is_empty() || item.is_empty() {
            return Err("/hadd: usage: /hadd <table> <item> <value>".into());
        }
        self.tables.add(table, item, value);
        Ok(())
    }

    fn ial(&mut self, args: &str) -> Result<(), String> {
        if self.ial.add(args.trim()) {
            Ok(())
        } else {
            Err(format!("/ial: not a nick!user@host address: {args:?}"))
        }
    }

    fn join(&mut self, args: &str) -> Result<(), String> {
        let (nick, rest) = next_word(args);
        let (chan, _) = next_word(rest);
        if nick.is_empty() || chan.is_empty() {
            return Err("/join: usage: /join <nick> <#chan>".into());
        }
        self.ial.join(nick, chan);
        Ok(())
    }
}

/// Split off the first whitespace-delimited word; the remainder is trimmed.
fn next_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.split_once(|c: char| c.is_ascii_whitespace()) {
        Some((word, rest)) => (word, rest.trim()),
        None => (s, ""),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::HashTables;
    use crate::ial::AddressList;
    use std::io::Write as _;

    const SAMPLE: &str = "\
; greeting helpers
/alias greet hi $1
/alias shout /return $upper($1-)
/alias shout this line is never reached
/set me fusion
/set chan=#rust
/set cid 4
/set maxdepth 16
/hadd seen bob yesterday at noon
/ial bob!~b@host.example.org
/join bob #rust
/echo ignored
";

    #[test]
    fn load_directives() {
        let (file, errors) = ScriptFile::load_str(SAMPLE);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(file.aliases.len(), 2);
        assert_eq!(file.aliases.get("shout").map(|s| s.lines().len()), Some(2));
        assert_eq!(file.context.me, "fusion");
        assert_eq!(file.context.channel, "#rust");
        assert_eq!(file.context.connection_id, 4);
        assert_eq!(file.max_depth, Some(16));
        assert_eq!(file.tables.get("seen", "bob").as_deref(), Some("yesterday at noon"));
        assert_eq!(file.ial.common_channels("bob"), vec!["#rust"]);
    }

    #[test]
    fn malformed_lines_are_reported() {
        let src = "/alias\n/set colour red\n/set cid x\n/ial nobody\n/hadd t\n/join bob\n";
        let (_, errors) = ScriptFile::load_str(src);
        let lines: Vec<usize> = errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![1, 2, 3, 4, 5, 6]);
        assert!(errors[3].to_string().starts_with("line 4: /ial"));
    }

    #[test]
    fn into_engine_expands() {
        let (file, _) = ScriptFile::load_str(SAMPLE);
        let (engine, ctx) = file.into_engine(EngineOptions::default());
        assert_eq!(engine.options().max_depth, 16);
        assert_eq!(engine.parse(&ctx, "$greet($me)"), "hi fusion");
        assert_eq!(engine.parse(&ctx, "$shout(a,b)"), "A B");
        assert_eq!(engine.parse(&ctx, "$hget(bob,seen)"), "yesterday at noon");
        assert_eq!(engine.parse(&ctx, "$address(bob,2)"), "*!*@host.example.org");
    }

    #[test]
    fn load_file_from_disk() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(SAMPLE.as_bytes()).unwrap();
        let (file, errors) = ScriptFile::load_file(f.path()).unwrap();
        assert!(errors.is_empty());
        assert_eq!(file.aliases.len(), 2);
        assert!(ScriptFile::load_file(Path::new("/no/such/file")).is_err());
    }
}
