//! Argument-list splitting for `$name(args)` calls.
//!
//! Commas separate parameters only at the call's own nesting level; a comma
//! inside a nested `$sub(a,b)` belongs to the sub-call.  Values produced by
//! an already-evaluated inner call travel as [`Segment::Resolved`] and are
//! never split again, so a result such as `a,b` reaches its parent as one
//! parameter.

/// One positional parameter before expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Script text that may still contain identifiers.
    Raw(&'a str),
    /// Final text produced by an inner call.
    Resolved(String),
}

/// Split `raw` on commas outside parentheses.
///
/// Empty parameters are kept (`a,,b` has three); an empty `raw` has none.
pub fn split_args(raw: &str) -> Vec<Segment<'_>> {
    if raw.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut from = 0;
    for (i, b) in raw.bytes().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                out.push(Segment::Raw(&raw[from..i]));
                from = i + 1;
            }
            _ => {}
        }
    }
    out.push(Segment::Raw(&raw[from..]));
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(parts: &[&'static str]) -> Vec<Segment<'static>> {
        parts.iter().map(|p| Segment::Raw(*p)).collect()
    }

    #[test]
    fn plain_split() {
        assert_eq!(split_args("hello,3"), raw(&["hello", "3"]));
    }

    #[test]
    fn nested_commas_stay_together() {
        assert_eq!(
            split_args("$left(a,b),$mid(x,1,2),z"),
            raw(&["$left(a,b)", "$mid(x,1,2)", "z"])
        );
    }

    #[test]
    fn empty_parameters_are_kept() {
        assert_eq!(split_args("a,,b"), raw(&["a", "", "b"]));
        assert_eq!(split_args("a,"), raw(&["a", ""]));
        assert!(split_args("").is_empty());
    }

    #[test]
    fn whitespace_is_preserved() {
        assert_eq!(split_args("1 == 1, yes"), raw(&["1 == 1", " yes"]));
    }
}
