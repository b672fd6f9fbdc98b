//! Delimited-token helpers behind `$gettok`, `$deltok` and `$addtok`.
//!
//! A "token" here is one field of a string split on a single delimiter
//! character: in `a.b.c` split on `.` (code 46) the tokens are `a`, `b`
//! and `c`.  Runs of delimiters count as one, so empty tokens never exist.

/// Which tokens a call addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSel {
    /// `0`: the number of tokens.
    Count,
    /// `N` or `-N` (from the end).
    One(i64),
    /// `N-` or `N-M`, inclusive.
    Range(i64, Option<i64>),
}

impl TokenSel {
    /// Parse `N`, `-N`, `N-` or `N-M`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(n) = s.parse::<i64>() {
            return Some(if n == 0 { TokenSel::Count } else { TokenSel::One(n) });
        }
        // Skip a leading sign so `-2-` splits after the number.
        let split_at = s.get(1..)?.find('-')? + 1;
        let (from, to) = (&s[..split_at], &s[split_at + 1..]);
        let from: i64 = from.parse().ok()?;
        let to = if to.is_empty() { None } else { Some(to.parse().ok()?) };
        Some(TokenSel::Range(from, to))
    }
}

fn split(text: &str, delim: char) -> Vec<&str> {
    text.split(delim).filter(|t| !t.is_empty()).collect()
}

/// 1-based (negative = from the end) index to a 0-based one.
fn index(n: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let i = if n > 0 { n - 1 } else { len + n };
    (0..len).contains(&i).then_some(i as usize)
}

/// Resolve a selection to a half-open range, or `None` when it is empty.
fn bounds(sel: TokenSel, len: usize) -> Option<(usize, usize)> {
    match sel {
        TokenSel::Count => None,
        TokenSel::One(n) => index(n, len).map(|i| (i, i + 1)),
        TokenSel::Range(from, to) => {
            let start = index(from, len)?;
            let end = match to {
                None => len,
                // An end past the last token is clipped, not rejected.
                Some(t) if t > len as i64 => len,
                Some(t) => index(t, len)? + 1,
            };
            (start < end).then_some((start, end))
        }
    }
}

/// `$gettok(text,sel,code)`.
pub fn get_tokens(text: &str, sel: TokenSel, delim: char) -> String {
    let toks = split(text, delim);
    if sel == TokenSel::Count {
        return toks.len().to_string();
    }
    match bounds(sel, toks.len()) {
        Some((a, b)) => toks[a..b].join(&delim.to_string()),
        None => String::new(),
    }
}

/// `$deltok(text,sel,code)`.  Out-of-range selections leave `text` as is.
pub fn delete_tokens(text: &str, sel: TokenSel, delim: char) -> String {
    let toks = split(text, delim);
    match bounds(sel, toks.len()) {
        Some((a, b)) => {
            let kept: Vec<&str> = toks[..a].iter().chain(&toks[b..]).copied().collect();
            kept.join(&delim.to_string())
        }
        None => text.to_owned(),
    }
}

/// `$addtok(text,token,code)`: append `token` unless an equal one (ignoring
/// case) is already present.
pub fn add_token(text: &str, token: &str, delim: char) -> String {
    let toks = split(text, delim);
    if token.is_empty() || toks.iter().any(|t| t.to_lowercase() == token.to_lowercase()) {
        return text.to_owned();
    }
    if toks.is_empty() {
        return token.to_owned();
    }
    format!("{}{delim}{token}", toks.join(&delim.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_selections() {
        assert_eq!(TokenSel::parse("0"), Some(TokenSel::Count));
        assert_eq!(TokenSel::parse("2"), Some(TokenSel::One(2)));
        assert_eq!(TokenSel::parse("-1"), Some(TokenSel::One(-1)));
        assert_eq!(TokenSel::parse("2-"), Some(TokenSel::Range(2, None)));
        assert_eq!(TokenSel::parse("2-3"), Some(TokenSel::Range(2, Some(3))));
        assert_eq!(TokenSel::parse("-3--1"), Some(TokenSel::Range(-3, Some(-1))));
        assert_eq!(TokenSel::parse("x"), None);
        assert_eq!(TokenSel::parse("1-x"), None);
        assert_eq!(TokenSel::parse(""), None);
    }

    #[test]
    fn get_single_and_count() {
        assert_eq!(get_tokens("a.b.c", TokenSel::One(2), '.'), "b");
        assert_eq!(get_tokens("a.b.c", TokenSel::One(-1), '.'), "c");
        assert_eq!(get_tokens("a..b", TokenSel::Count, '.'), "2");
        assert_eq!(get_tokens("a.b.c", TokenSel::One(4), '.'), "");
    }

    #[test]
    fn get_ranges() {
        assert_eq!(get_tokens("a b c d", TokenSel::Range(2, None), ' '), "b c d");
        assert_eq!(get_tokens("a b c d", TokenSel::Range(2, Some(3)), ' '), "b c");
        assert_eq!(get_tokens("a b c d", TokenSel::Range(3, Some(9)), ' '), "c d");
        assert_eq!(get_tokens("a b c d", TokenSel::Range(3, Some(2)), ' '), "");
    }

    #[test]
    fn delete() {
        assert_eq!(delete_tokens("a,b,c", TokenSel::One(2), ','), "a,c");
        assert_eq!(delete_tokens("a,b,c,d", TokenSel::Range(2, Some(3)), ','), "a,d");
        assert_eq!(delete_tokens("a,b,c", TokenSel::Range(2, None), ','), "a");
        assert_eq!(delete_tokens("a,b,c", TokenSel::One(7), ','), "a,b,c");
    }

    #[test]
    fn add() {
        assert_eq!(add_token("a b", "c", ' '), "a b c");
        assert_eq!(add_token("a B", "b", ' '), "a B");
        assert_eq!(add_token("", "x", ' '), "x");
    }
}
