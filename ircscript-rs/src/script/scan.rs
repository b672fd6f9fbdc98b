//! Lexical scanning of script lines.
//!
//! Three passes operate on raw line text:
//!
//! - [`find_calls`] locates every top-level `$name(...)` with balanced
//!   parentheses, to any nesting depth.
//! - [`concat_segments`] splits on the `$+` join marker, trimming each
//!   piece.
//! - [`find_bare_tokens`] locates the remaining `$name` identifiers within
//!   a piece.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

/// One `$name(args)` occurrence within a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallMatch<'a> {
    /// Byte offset of the leading `$`.
    pub start: usize,
    /// Byte offset just past the closing `)`.
    pub end: usize,
    pub name: &'a str,
    /// Everything between the outer parentheses, unparsed.
    pub args: &'a str,
}

impl CallMatch<'_> {
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_name_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Try to read a balanced call whose `$` sits at byte `start`.
///
/// Returns `None` if `start` does not begin `$name(` or the parentheses
/// never balance.
pub fn call_at(text: &str, start: usize) -> Option<CallMatch<'_>> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'$') || !bytes.get(start + 1).copied().is_some_and(is_name_start) {
        return None;
    }
    let mut i = start + 2;
    while bytes.get(i).copied().is_some_and(is_name_continue) {
        i += 1;
    }
    if bytes.get(i) != Some(&b'(') {
        return None;
    }
    let name_end = i;
    let mut depth = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(CallMatch {
                        start,
                        end: i + 1,
                        name: &text[start + 1..name_end],
                        args: &text[name_end + 1..i],
                    });
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Every outermost balanced call in `line`, left to right, non-overlapping.
///
/// A `$name(` whose parentheses never close is skipped and stays literal;
/// scanning resumes just after its `$`, so calls nested inside it are
/// still found.
pub fn find_calls(line: &str) -> Vec<CallMatch<'_>> {
    let mut calls = Vec::new();
    let mut pos = 0;
    while let Some(off) = line[pos..].find('$') {
        let start = pos + off;
        match call_at(line, start) {
            Some(m) => {
                pos = m.end;
                calls.push(m);
            }
            None => pos = start + 1,
        }
    }
    calls
}

/// The call spanning all of `text`, if `text` is exactly one `$name(...)`.
///
/// `$a(1)$b(2)` starts and ends like a call but is two of them; this
/// returns `None` for it.
pub fn whole_call(text: &str) -> Option<CallMatch<'_>> {
    call_at(text, 0).filter(|m| m.end == text.len())
}

/// The pieces between `$+` markers, each trimmed.  A line with no marker
/// is a single piece.
pub fn concat_segments(line: &str) -> impl Iterator<Item = &str> {
    line.split("$+").map(str::trim)
}

/// Apply the `$+` join operator: the trimmed pieces glued with no
/// separator.
pub fn collapse_concat(line: &str) -> String {
    concat_segments(line).collect()
}

fn bare_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\w+").expect("static regex"))
}

/// Byte ranges of `$name` identifiers left after call resolution.
///
/// A token directly followed by `(` belongs to an unbalanced call and is
/// kept as literal text.
pub fn find_bare_tokens(line: &str) -> Vec<Range<usize>> {
    bare_token_re()
        .find_iter(line)
        .filter(|m| !line[m.end()..].starts_with('('))
        .map(|m| m.range())
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
