//! Built-in identifier functions.
//!
//! Each function receives its arguments as fully expanded strings and
//! returns a string.  Nothing here can fail loudly: bad arity or a
//! non-numeric argument is an [`ArgError`], which the dispatcher logs and
//! turns into an empty result.  The one exception is `$deltok`, which hands
//! back its first argument unchanged.

use std::path::{Path, PathBuf};

use aho_corasick::{AhoCorasickBuilder, MatchKind};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use md5::{Digest, Md5};
use rand::Rng;
use regex::{Captures, RegexBuilder};
use thiserror::Error;

use super::engine::Scope;
use super::timefmt;
use super::tokens::{self, TokenSel};
use super::value::format_number;
use crate::ial;
use crate::strip::strip_codes;

/// Why a builtin produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    #[error("${name}: expected {expected} argument(s), got {got}")]
    Arity { name: String, expected: &'static str, got: usize },
    #[error("${name}: argument {index} is not a number: {value:?}")]
    NotNumeric { name: String, index: usize, value: String },
    #[error("${name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Names handled by [`call_builtin`], upper case.
pub const BUILTIN_NAMES: &[&str] = &[
    "ADDRESS", "ADDTOK", "APPDIR", "ASC", "ASCTIME", "CALC", "CHR", "COMCHAN", "CONCAT", "CTIME",
    "DECODE", "DELTOK", "DURATION", "ENCODE", "GETTOK", "HGET", "IIF", "INPUT", "LEFT", "LEN",
    "LOWER", "MD5", "MID", "RAND", "READ", "READINI", "REPLACE", "REPLACECS", "RIGHT", "SQRT",
    "STRIP", "UPPER",
];

/// Call builtin `name` (upper case).
///
/// Returns `None` if there is no such builtin; the caller then resolves the
/// identifier to the empty string.
pub fn call_builtin(name: &str, args: &[String], scope: &Scope<'_>) -> Option<String> {
    // Ok(None)    → not a builtin
    // Ok(Some(s)) → result
    // Err(e)      → invalid call, degrades to ""
    fn inner(name: &str, args: &[String], scope: &Scope<'_>) -> Result<Option<String>, ArgError> {
        let engine = scope.engine();
        Ok(Some(match name {
            // ── Strings ──────────────────────────────────────────────────────
            "LEFT" => {
                arity(name, args, 2, 2)?;
                left(&args[0], int_arg(name, args, 1)?)
            }
            "RIGHT" => {
                arity(name, args, 2, 2)?;
                right(&args[0], int_arg(name, args, 1)?)
            }
            "MID" => {
                arity(name, args, 2, 3)?;
                let start = int_arg(name, args, 1)?;
                let len = if args.len() == 3 { int_arg(name, args, 2)? } else { -1 };
                mid(&args[0], start, len)
            }
            "LEN" => {
                arity(name, args, 1, 1)?;
                args[0].chars().count().to_string()
            }
            "UPPER" => {
                arity(name, args, 1, 1)?;
                args[0].to_uppercase()
            }
            "LOWER" => {
                arity(name, args, 1, 1)?;
                args[0].to_lowercase()
            }
            "STRIP" => {
                arity(name, args, 1, usize::MAX)?;
                strip_codes(&args[0]).into_owned()
            }
            "REPLACE" | "REPLACECS" => {
                if args.len() < 3 || args.len() % 2 == 0 {
                    return Err(ArgError::Arity {
                        name: name.to_owned(),
                        expected: "3, 5, 7, …",
                        got: args.len(),
                    });
                }
                replace(&args[0], &args[1..], name == "REPLACE")
            }
            "CONCAT" => args.concat(),

            // ── Tokens ───────────────────────────────────────────────────────
            "GETTOK" | "DELTOK" => {
                let (text, sel, delim) = token_args(name, args)?;
                let sel = TokenSel::parse(sel).ok_or_else(|| ArgError::Invalid {
                    name: name.to_owned(),
                    reason: format!("bad token range {sel:?}"),
                })?;
                if name == "GETTOK" {
                    tokens::get_tokens(&text, sel, delim)
                } else {
                    tokens::delete_tokens(&text, sel, delim)
                }
            }
            "ADDTOK" => {
                let (text, token, delim) = token_args(name, args)?;
                tokens::add_token(&text, token, delim)
            }

            // ── Encoding / hashing ───────────────────────────────────────────
            "ENCODE" => {
                arity(name, args, 1, 1)?;
                BASE64.encode(args[0].as_bytes())
            }
            "DECODE" => {
                arity(name, args, 1, 1)?;
                let bytes = BASE64.decode(args[0].trim()).map_err(|e| ArgError::Invalid {
                    name: name.to_owned(),
                    reason: e.to_string(),
                })?;
                String::from_utf8_lossy(&bytes).into_owned()
            }
            "MD5" => {
                arity(name, args, 1, 1)?;
                format!("{:x}", Md5::digest(args[0].as_bytes()))
            }

            // ── Numbers ──────────────────────────────────────────────────────
            "CALC" => {
                arity(name, args, 1, usize::MAX)?;
                match engine.arithmetic().evaluate(&args.join(",")) {
                    Some(x) => format_number(x),
                    None => String::new(),
                }
            }
            "SQRT" => {
                arity(name, args, 1, 1)?;
                let n = int_arg(name, args, 0)?;
                if n < 0 {
                    return Err(invalid(name, "negative operand"));
                }
                (((n as f64).sqrt() * 1e6).round() / 1e6).to_string()
            }
            "RAND" => {
                arity(name, args, 2, 2)?;
                let (lo, hi) = (int_arg(name, args, 0)?, int_arg(name, args, 1)?);
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                if lo == hi {
                    lo.to_string()
                } else {
                    rand::thread_rng().gen_range(lo..hi).to_string()
                }
            }
            "CHR" => {
                arity(name, args, 1, 1)?;
                let code = int_arg(name, args, 0)?;
                u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| invalid(name, "not a code point"))?
                    .to_string()
            }
            "ASC" => {
                arity(name, args, 1, 1)?;
                let mut chars = args[0].chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => u32::from(c).to_string(),
                    _ => return Err(invalid(name, "expected a single character")),
                }
            }

            // ── Time ─────────────────────────────────────────────────────────
            "CTIME" => timefmt::ctime(),
            "ASCTIME" => {
                let secs = if args.is_empty() {
                    chrono::Utc::now().timestamp()
                } else {
                    int_arg(name, args, 0)?
                };
                let format = (args.len() > 1).then(|| args[1..].join(","));
                timefmt::asctime(secs, format.as_deref())
                    .ok_or_else(|| invalid(name, "time out of range"))?
            }
            "DURATION" => {
                arity(name, args, 1, 1)?;
                timefmt::duration(int_arg(name, args, 0)?)
            }

            // ── Files, tables and the address list ───────────────────────────
            "READ" => {
                arity(name, args, 1, 2)?;
                let path = resolve_path(&engine.options().app_dir, &args[0]);
                let lines = engine.text_files().lines(&path).unwrap_or_default();
                match args.get(1).filter(|s| !s.is_empty()) {
                    None if lines.is_empty() => String::new(),
                    None => lines[rand::thread_rng().gen_range(0..lines.len())].clone(),
                    Some(_) => match int_arg(name, args, 1)? {
                        0 => lines.len().to_string(),
                        n if n > 0 => lines.get(n as usize - 1).cloned().unwrap_or_default(),
                        _ => String::new(),
                    },
                }
            }
            "READINI" => {
                arity(name, args, 3, 3)?;
                let path = resolve_path(&engine.options().app_dir, &args[0]);
                engine.ini_files().value(&path, &args[1], &args[2]).unwrap_or_default()
            }
            "HGET" => {
                // $hget(item,table)
                arity(name, args, 2, 2)?;
                engine.hash_tables().get(&args[1], &args[0]).unwrap_or_default()
            }
            "ADDRESS" => {
                arity(name, args, 1, 2)?;
                let Some(full) = engine.address_list().address_of(&args[0]) else {
                    return Ok(Some(String::new()));
                };
                if args.len() == 1 {
                    full
                } else {
                    let level = int_arg(name, args, 1)?;
                    ial::address_mask(&full, level).ok_or_else(|| invalid(name, "bad mask level"))?
                }
            }
            "COMCHAN" => {
                arity(name, args, 2, 2)?;
                let chans = engine.address_list().common_channels(&args[0]);
                match int_arg(name, args, 1)? {
                    0 => chans.len().to_string(),
                    n if n > 0 => chans.get(n as usize - 1).cloned().unwrap_or_default(),
                    _ => String::new(),
                }
            }
            "INPUT" => {
                arity(name, args, 1, 2)?;
                engine
                    .prompter()
                    .prompt(&args[0], args.get(1).map(String::as_str))
                    .unwrap_or_default()
            }

            // ── Control ──────────────────────────────────────────────────────
            "IIF" => {
                arity(name, args, 3, 3)?;
                if engine.conditions().evaluate(&args[0]) {
                    args[1].clone()
                } else {
                    args[2].clone()
                }
            }

            // ── Paths ────────────────────────────────────────────────────────
            "APPDIR" => {
                let root = &engine.options().app_dir;
                match args.first().filter(|s| !s.is_empty()) {
                    Some(rel) => resolve_path(root, rel).display().to_string(),
                    None => root.display().to_string(),
                }
            }

            _ => return Ok(None),
        }))
    }

    match inner(name, args, scope) {
        Ok(result) => result,
        Err(e) => {
            log::debug!("{e}");
            if name == "DELTOK" {
                Some(args.first().cloned().unwrap_or_default())
            } else {
                Some(String::new())
            }
        }
    }
}

// ── Argument helpers ──────────────────────────────────────────────────────────

fn arity(name: &str, args: &[String], min: usize, max: usize) -> Result<(), ArgError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = match (min, max) {
        (1, 1) => "1",
        (2, 2) => "2",
        (3, 3) => "3",
        (1, 2) => "1 or 2",
        (2, 3) => "2 or 3",
        _ => "at least 1",
    };
    Err(ArgError::Arity { name: name.to_owned(), expected, got: args.len() })
}

fn int_arg(name: &str, args: &[String], index: usize) -> Result<i64, ArgError> {
    let raw = args.get(index).map(String::as_str).unwrap_or_default();
    raw.trim().parse().map_err(|_| ArgError::NotNumeric {
        name: name.to_owned(),
        index: index + 1,
        value: raw.to_owned(),
    })
}

fn invalid(name: &str, reason: &str) -> ArgError {
    ArgError::Invalid { name: name.to_owned(), reason: reason.to_owned() }
}

/// Split `text…,middle,code` for the token functions.  Leading arguments
/// are re-joined with `,` since the text itself may contain commas.
fn token_args<'a>(name: &str, args: &'a [String]) -> Result<(String, &'a str, char), ArgError> {
    if args.len() < 3 {
        return Err(ArgError::Arity { name: name.to_owned(), expected: "3", got: args.len() });
    }
    let n = args.len();
    let code = int_arg(name, args, n - 1)?;
    let delim = u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| invalid(name, "bad delimiter code"))?;
    Ok((args[..n - 2].join(","), args[n - 2].as_str(), delim))
}

fn resolve_path(root: &Path, path: &str) -> PathBuf {
    let p = Path::new(path.trim());
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

// ── String primitives ─────────────────────────────────────────────────────────

/// First `n` characters; negative `n` drops that many from the end.
pub fn left(s: &str, n: i64) -> String {
    let len = s.chars().count() as i64;
    let take = if n >= 0 { n.min(len) } else { (len + n).max(0) };
    s.chars().take(take as usize).collect()
}

/// Last `n` characters; negative `n` drops that many from the start.
pub fn right(s: &str, n: i64) -> String {
    let len = s.chars().count() as i64;
    let skip = if n >= 0 { (len - n).max(0) } else { n.unsigned_abs().min(len as u64) as i64 };
    s.chars().skip(skip as usize).collect()
}

/// 1-based substring.  `start` below 1 counts as 1; a negative `len`
/// runs to the end.
pub fn mid(s: &str, start: i64, len: i64) -> String {
    let skip = (start.max(1) - 1) as usize;
    let it = s.chars().skip(skip);
    if len < 0 {
        it.collect()
    } else {
        it.take(len as usize).collect()
    }
}

/// Replace every `old` with `new` for each `old,new` pair in `pairs`.
///
/// At any position the first listed pair that matches wins.  Case is
/// folded with Unicode rules when `ignore_case` is set.
fn replace(s: &str, pairs: &[String], ignore_case: bool) -> String {
    let (patterns, replacements): (Vec<&str>, Vec<&str>) = pairs
        .chunks_exact(2)
        .filter(|p| !p[0].is_empty())
        .map(|p| (p[0].as_str(), p[1].as_str()))
        .unzip();
    if patterns.is_empty() {
        return s.to_owned();
    }
    if ignore_case {
        let alternation: Vec<String> =
            patterns.iter().map(|p| format!("({})", regex::escape(p))).collect();
        return match RegexBuilder::new(&alternation.join("|")).case_insensitive(true).build() {
            Ok(re) => re
                .replace_all(s, |caps: &Captures<'_>| {
                    (1..caps.len())
                        .find(|&i| caps.get(i).is_some())
                        .map_or("", |i| replacements[i - 1])
                        .to_owned()
                })
                .into_owned(),
            Err(e) => {
                log::debug!("$replace: {e}");
                s.to_owned()
            }
        };
    }
    let ac = AhoCorasickBuilder::new()
        .match_kind(MatchKind::LeftmostFirst)
        .build(&patterns);
    ac.replace_all(s, &replacements)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::MemoryTables;
    use crate::ial::Ial;
    use crate::script::context::EvaluationContext;
    use crate::script::engine::Engine;

    fn call_with(engine: &Engine, name: &str, args: &[&str]) -> Option<String> {
        let ctx = EvaluationContext::new();
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        call_builtin(name, &args, &engine.scope(&ctx))
    }

    fn call(name: &str, args: &[&str]) -> String {
        call_with(&Engine::new(), name, args).unwrap_or_else(|| panic!("{name} is not a builtin"))
    }

    #[test]
    fn unknown_is_none() {
        assert_eq!(call_with(&Engine::new(), "BOGUS", &[]), None);
    }

    #[test]
    fn every_listed_name_dispatches() {
        let engine = Engine::new();
        for name in BUILTIN_NAMES {
            assert!(call_with(&engine, name, &[]).is_some(), "{name}");
        }
    }

    #[test]
    fn left_right_mid() {
        assert_eq!(call("LEFT", &["hello", "3"]), "hel");
        assert_eq!(call("LEFT", &["hello", "9"]), "hello");
        assert_eq!(call("LEFT", &["hello", "-2"]), "hel");
        assert_eq!(call("RIGHT", &["hello", "3"]), "llo");
        assert_eq!(call("RIGHT", &["hello", "-2"]), "llo");
        assert_eq!(call("MID", &["hello", "2", "2"]), "el");
        assert_eq!(call("MID", &["hello", "2"]), "ello");
        assert_eq!(call("MID", &["hello", "0", "-1"]), "hello");
    }

    #[test]
    fn arity_and_numeric_failures_are_empty() {
        assert_eq!(call("LEFT", &["hello"]), "");
        assert_eq!(call("LEFT", &["hello", "x"]), "");
        assert_eq!(call("UPPER", &["a", "b"]), "");
        assert_eq!(call("IIF", &["1", "a"]), "");
    }

    #[test]
    fn case_and_length() {
        assert_eq!(call("UPPER", &["abc"]), "ABC");
        assert_eq!(call("LOWER", &["ABC"]), "abc");
        assert_eq!(call("LEN", &["héllo"]), "5");
        assert_eq!(call("CONCAT", &["a", "b", "c"]), "abc");
        assert_eq!(call("STRIP", &["\x02bold\x02"]), "bold");
    }

    #[test]
    fn replace_variants() {
        assert_eq!(call("REPLACE", &["Hello HELLO", "hello", "bye"]), "bye bye");
        assert_eq!(call("REPLACECS", &["Hello hello", "hello", "bye"]), "Hello bye");
        assert_eq!(call("REPLACE", &["a-b-c", "-", "+", "a", "x"]), "x+b+c");
        assert_eq!(call("REPLACE", &["abc", "", "x"]), "abc");
        assert_eq!(call("REPLACE", &["abc", "b"]), "");
    }

    #[test]
    fn replace_folds_non_ascii_case() {
        assert_eq!(call("REPLACE", &["ÄPFEL und äpfel", "äpfel", "x"]), "x und x");
        assert_eq!(call("REPLACECS", &["ÄPFEL und äpfel", "äpfel", "x"]), "ÄPFEL und x");
        assert_eq!(call("REPLACE", &["a.b", ".", "!"]), "a!b");
    }

    #[test]
    fn replace_first_listed_pair_wins() {
        assert_eq!(call("REPLACE", &["abcd", "ab", "1", "abc", "2"]), "1cd");
        assert_eq!(call("REPLACECS", &["abcd", "ab", "1", "abc", "2"]), "1cd");
    }

    #[test]
    fn token_functions() {
        assert_eq!(call("GETTOK", &["a", "b", "c", "2", "44"]), "b");
        assert_eq!(call("GETTOK", &["a.b.c", "0", "46"]), "3");
        assert_eq!(call("GETTOK", &["a.b.c", "2-", "46"]), "b.c");
        assert_eq!(call("DELTOK", &["a.b.c", "1", "46"]), "b.c");
        assert_eq!(call("DELTOK", &["a.b.c", "x", "46"]), "a.b.c");
        assert_eq!(call("ADDTOK", &["a b", "c", "32"]), "a b c");
        assert_eq!(call("GETTOK", &["a.b", "1"]), "");
    }

    #[test]
    fn encoding_and_hashing() {
        assert_eq!(call("ENCODE", &["hello"]), "aGVsbG8=");
        assert_eq!(call("DECODE", &["aGVsbG8="]), "hello");
        assert_eq!(call("DECODE", &["***"]), "");
        assert_eq!(call("MD5", &["abc"]), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn numbers() {
        assert_eq!(call("CALC", &["2 + 3 * 4"]), "14");
        assert_eq!(call("CALC", &["7 / 2"]), "3.5");
        assert_eq!(call("CALC", &["0.1 + 0.2"]), "0.3");
        assert_eq!(call("CALC", &["abc"]), "");
        assert_eq!(call("SQRT", &["16"]), "4");
        assert_eq!(call("SQRT", &["2"]), "1.414214");
        assert_eq!(call("SQRT", &["2.5"]), "");
        assert_eq!(call("CHR", &["65"]), "A");
        assert_eq!(call("ASC", &["A"]), "65");
        assert_eq!(call("ASC", &["AB"]), "");
    }

    #[test]
    fn rand_stays_in_range() {
        assert_eq!(call("RAND", &["5", "5"]), "5");
        for _ in 0..50 {
            let n: i64 = call("RAND", &["1", "4"]).parse().unwrap();
            assert!((1..4).contains(&n));
        }
    }

    #[test]
    fn time_functions() {
        assert_eq!(call("DURATION", &["3661"]), "1hr 1min 1sec");
        assert_eq!(call("DURATION", &["soon"]), "");
        assert!(call("CTIME", &[]).parse::<i64>().is_ok());
        assert_eq!(call("ASCTIME", &["0", "yyyy"]).len(), 4);
    }

    #[test]
    fn iif_branches() {
        assert_eq!(call("IIF", &["1 == 1", "yes", "no"]), "yes");
        assert_eq!(call("IIF", &["a == b", "yes", "no"]), "no");
    }

    #[test]
    fn read_and_appdir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lines.txt"), "one\ntwo\nthree\n").unwrap();
        std::fs::write(dir.path().join("cfg.ini"), "[a]\nk=v\n").unwrap();
        let engine = Engine::new().with_app_dir(dir.path());
        let read = |args: &[&str]| call_with(&engine, "READ", args).unwrap_or_default();
        assert_eq!(read(&["lines.txt", "2"]), "two");
        assert_eq!(read(&["lines.txt", "0"]), "3");
        assert_eq!(read(&["lines.txt", "9"]), "");
        assert!(["one", "two", "three"].contains(&read(&["lines.txt"]).as_str()));
        assert_eq!(read(&["missing.txt", "1"]), "");
        assert_eq!(
            call_with(&engine, "READINI", &["cfg.ini", "A", "K"]).as_deref(),
            Some("v")
        );
        assert_eq!(
            call_with(&engine, "APPDIR", &[]).map(PathBuf::from).as_deref(),
            Some(dir.path())
        );
    }

    #[test]
    fn tables_and_addresses() {
        let mut tables = MemoryTables::new();
        tables.add("seen", "bob", "yesterday");
        let mut ial = Ial::new();
        ial.add("bob!~b@host.example.org");
        ial.join("bob", "#rust");
        let engine = Engine::new().with_hash_tables(tables).with_address_list(ial);
        let f = |name: &str, args: &[&str]| call_with(&engine, name, args).unwrap_or_default();
        assert_eq!(f("HGET", &["bob", "seen"]), "yesterday");
        assert_eq!(f("HGET", &["alice", "seen"]), "");
        assert_eq!(f("ADDRESS", &["bob"]), "bob!~b@host.example.org");
        assert_eq!(f("ADDRESS", &["bob", "2"]), "*!*@host.example.org");
        assert_eq!(f("ADDRESS", &["carol", "2"]), "");
        assert_eq!(f("COMCHAN", &["bob", "1"]), "#rust");
        assert_eq!(f("COMCHAN", &["bob", "0"]), "1");
        assert_eq!(f("COMCHAN", &["bob", "2"]), "");
    }

    #[test]
    fn input_without_prompter_is_empty() {
        assert_eq!(call("INPUT", &["Nick?"]), "");
    }
}
