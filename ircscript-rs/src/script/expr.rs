//! Condition and arithmetic expressions for `$iif` and `$calc`.
//!
//! By the time an expression reaches this module every identifier in it has
//! already been expanded, so operands are plain numbers and words.  Bare
//! words are string literals: `$iif($nick == bob, …)` arrives here as
//! `alice == bob`.
//!
//! Operator precedence (lowest → highest):
//!   or  →  and  →  relational  →  additive  →  multiplicative  →
//!   power  →  unary  →  primary
//!
//! Relational operators include the word forms `isin`, `isincs`, `iswm`
//! and `iswmcs`; each may be negated with a leading `!` (`!isin`).

use super::value::Value;

// ── Evaluator seams ───────────────────────────────────────────────────────────

/// Decides the condition of `$iif(cond,then,else)`.
pub trait ConditionEvaluator {
    fn evaluate(&self, expr: &str) -> bool;
}

/// Evaluates the expression of `$calc(expr)`.
///
/// Returns `None` when the result is not a finite number.
pub trait ArithmeticEvaluator {
    fn evaluate(&self, expr: &str) -> Option<f64>;
}

/// Default evaluator backing both `$iif` and `$calc`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExprEvaluator;

impl ConditionEvaluator for ExprEvaluator {
    fn evaluate(&self, expr: &str) -> bool {
        match eval_str(expr) {
            Ok(v) => v.as_bool(),
            Err(e) => {
                log::debug!("condition {expr:?}: {e}");
                false
            }
        }
    }
}

impl ArithmeticEvaluator for ExprEvaluator {
    fn evaluate(&self, expr: &str) -> Option<f64> {
        match eval_str(expr) {
            Ok(v) => v.as_number().filter(|x| x.is_finite()),
            Err(e) => {
                log::debug!("calc {expr:?}: {e}");
                None
            }
        }
    }
}

// ── Token ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Num(Value),
    Str(String),
    Word(String),

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Bang,

    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `isin`, `iswm`, … with a negation flag for the `!isin` form.
    WordOp(WordOp, bool),

    And,
    Or,

    LParen,
    RParen,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WordOp {
    IsIn,
    IsInCs,
    IsWm,
    IsWmCs,
}

impl WordOp {
    fn from_word(w: &str) -> Option<Self> {
        match w.to_ascii_lowercase().as_str() {
            "isin" => Some(WordOp::IsIn),
            "isincs" => Some(WordOp::IsInCs),
            "iswm" => Some(WordOp::IsWm),
            "iswmcs" => Some(WordOp::IsWmCs),
            _ => None,
        }
    }
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

struct Lexer {
    src: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(src: &str) -> Self {
        Lexer { src: src.chars().collect(), pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src.get(self.pos + n).copied()
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    /// Words run to the next whitespace or parenthesis.
    fn read_word(&mut self, start: usize) -> String {
        while matches!(self.peek(), Some(c) if !c.is_whitespace() && c != '(' && c != ')') {
            self.pos += 1;
        }
        self.src[start..self.pos].iter().collect()
    }

    fn read_number(&mut self, start: usize) -> Token {
        if self.src[start] == '0' && matches!(self.peek(), Some('x' | 'X')) {
            self.pos += 1;
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let hex: String = self.src[start + 2..self.pos].iter().collect();
            return Token::Num(Value::Int(i64::from_str_radix(&hex, 16).unwrap_or(0)));
        }

        let mut is_float = false;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            is_float = true;
            self.pos += 1;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        // `3rd`, `1.2.3`: not a number after all.
        if matches!(self.peek(), Some(c) if c.is_alphabetic() || c == '_' || c == '.') {
            return Token::Word(self.read_word(start));
        }

        let s: String = self.src[start..self.pos].iter().collect();
        if is_float {
            Token::Num(Value::Float(s.parse().unwrap_or(0.0)))
        } else {
            match s.parse() {
                Ok(n) => Token::Num(Value::Int(n)),
                Err(_) => Token::Num(Value::Float(s.parse().unwrap_or(0.0))),
            }
        }
    }

    fn read_string(&mut self) -> Token {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '"' => break,
                '\\' => {
                    if let Some(esc) = self.peek() {
                        self.pos += 1;
                        s.push(esc);
                    }
                }
                c => s.push(c),
            }
        }
        Token::Str(s)
    }

    /// `*` and `?` open a wildcard word (`*!*@host`) unless they read as
    /// arithmetic (`3 * 4`, `3*4`, `2*(1)`).
    fn starts_wildcard(&self) -> bool {
        match self.peek_at(1) {
            None => false,
            Some(c) => !(c.is_whitespace() || c.is_ascii_digit() || c == '(' || c == '-'),
        }
    }

    fn next_token(&mut self) -> Token {
        self.skip_ws();
        let start = self.pos;
        let ch = match self.peek() {
            None => return Token::Eof,
            Some(c) => c,
        };

        if (ch == '*' || ch == '?') && self.starts_wildcard() {
            return Token::Word(self.read_word(start));
        }

        self.pos += 1;
        match ch {
            c if c.is_ascii_digit() => self.read_number(start),
            '"' => self.read_string(),
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '^' => Token::Caret,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '!' => {
                if self.eat('=') {
                    Token::Ne
                } else if matches!(self.peek(), Some(c) if c.is_alphabetic()) {
                    let word = self.read_word(self.pos);
                    match WordOp::from_word(&word) {
                        Some(op) => Token::WordOp(op, true),
                        None => Token::Word(format!("!{word}")),
                    }
                } else {
                    Token::Bang
                }
            }
            '=' if self.eat('=') => Token::Eq,
            '<' => {
                if self.eat('=') {
                    Token::Le
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '&' if self.eat('&') => Token::And,
            '|' if self.eat('|') => Token::Or,
            _ => {
                let word = self.read_word(start);
                match WordOp::from_word(&word) {
                    Some(op) => Token::WordOp(op, false),
                    None => Token::Word(word),
                }
            }
        }
    }

    fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let t = self.next_token();
            let done = matches!(t, Token::Eof);
            tokens.push(t);
            if done {
                break;
            }
        }
        tokens
    }
}

// ── AST ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Word(WordOp, bool),
}

#[derive(Debug, Clone)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

// ── Parser ────────────────────────────────────────────────────────────────────

/// Deepest nesting of parentheses and unary or `^` chains.
const MAX_NESTING: usize = 256;

/// Longest expression, in tokens.  Bounds the height of left-associative
/// chains such as `1+1+1+…`, which evaluate recursively.
const MAX_TOKENS: usize = 1024;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0, depth: 0 }
    }

    /// Run `f` one nesting level down, failing past [`MAX_NESTING`].
    fn descend<T, F>(&mut self, f: F) -> Result<T, String>
    where
        F: FnOnce(&mut Self) -> Result<T, String>,
    {
        if self.depth >= MAX_NESTING {
            return Err(format!("nested deeper than {MAX_NESTING}"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        self.pos += 1;
        t
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_relational()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_relational()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Eq => BinOp::Eq,
                Token::Ne => BinOp::Ne,
                Token::Lt => BinOp::Lt,
                Token::Le => BinOp::Le,
                Token::Gt => BinOp::Gt,
                Token::Ge => BinOp::Ge,
                Token::WordOp(op, negated) => BinOp::Word(*op, *negated),
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_power()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_power()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    /// `^` is right-associative: `2 ^ 3 ^ 2` is `2 ^ 9`.
    fn parse_power(&mut self) -> Result<Expr, String> {
        let base = self.parse_unary()?;
        if self.eat(&Token::Caret) {
            let exp = self.descend(Self::parse_power)?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Token::Minus => {
                self.pos += 1;
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.descend(Self::parse_unary)?)))
            }
            Token::Plus => {
                self.pos += 1;
                self.descend(Self::parse_unary)
            }
            Token::Bang => {
                self.pos += 1;
                Ok(Expr::Unary(UnaryOp::Not, Box::new(self.descend(Self::parse_unary)?)))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Token::Num(v) => Ok(Expr::Literal(v)),
            Token::Str(s) | Token::Word(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::LParen => {
                let inner = self.descend(Self::parse_or)?;
                if !self.eat(&Token::RParen) {
                    return Err("expected ')'".into());
                }
                Ok(inner)
            }
            other => Err(format!("unexpected token {other:?}")),
        }
    }
}

/// Parse an expression string into an AST.
pub fn parse_expr(src: &str) -> Result<Expr, String> {
    let tokens = Lexer::new(src).tokenize();
    if tokens.len() > MAX_TOKENS {
        return Err(format!("longer than {MAX_TOKENS} tokens"));
    }
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_or()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(format!("trailing input at {other:?}")),
    }
}

// ── Evaluator ─────────────────────────────────────────────────────────────────

pub fn eval_expr(expr: &Expr) -> Result<Value, String> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),

        Expr::Unary(op, inner) => {
            let v = eval_expr(inner)?;
            match op {
                UnaryOp::Neg => v.arith_neg(),
                UnaryOp::Not => Ok(Value::from(!v.as_bool())),
            }
        }

        Expr::Binary(op, lhs, rhs) => {
            match op {
                BinOp::And => {
                    if !eval_expr(lhs)?.as_bool() {
                        return Ok(Value::Int(0));
                    }
                    return Ok(Value::from(eval_expr(rhs)?.as_bool()));
                }
                BinOp::Or => {
                    if eval_expr(lhs)?.as_bool() {
                        return Ok(Value::Int(1));
                    }
                    return Ok(Value::from(eval_expr(rhs)?.as_bool()));
                }
                _ => {}
            }
            let l = eval_expr(lhs)?;
            let r = eval_expr(rhs)?;
            eval_binop(op, l, r)
        }
    }
}

fn eval_binop(op: &BinOp, l: Value, r: Value) -> Result<Value, String> {
    use std::cmp::Ordering;
    match op {
        BinOp::Add => l.arith_add(&r),
        BinOp::Sub => l.arith_sub(&r),
        BinOp::Mul => l.arith_mul(&r),
        BinOp::Div => l.arith_div(&r),
        BinOp::Rem => l.arith_rem(&r),
        BinOp::Pow => l.arith_pow(&r),

        BinOp::Eq => Ok(Value::from(l.cmp_value(&r) == Ordering::Equal)),
        BinOp::Ne => Ok(Value::from(l.cmp_value(&r) != Ordering::Equal)),
        BinOp::Lt => Ok(Value::from(l.cmp_value(&r) == Ordering::Less)),
        BinOp::Le => Ok(Value::from(l.cmp_value(&r) != Ordering::Greater)),
        BinOp::Gt => Ok(Value::from(l.cmp_value(&r) == Ordering::Greater)),
        BinOp::Ge => Ok(Value::from(l.cmp_value(&r) != Ordering::Less)),

        BinOp::Word(word, negated) => {
            let (a, b) = (l.as_str(), r.as_str());
            let hit = match word {
                WordOp::IsIn => b.to_lowercase().contains(&a.to_lowercase()),
                WordOp::IsInCs => b.contains(&a),
                WordOp::IsWm => glob_match(&a.to_lowercase(), &b.to_lowercase()),
                WordOp::IsWmCs => glob_match(&a, &b),
            };
            Ok(Value::from(hit != *negated))
        }

        BinOp::And | BinOp::Or => unreachable!("handled above"),
    }
}

// ── Wildcard matcher ──────────────────────────────────────────────────────────

/// `*` matches any run, `?` any single character.
///
/// Only the most recent `*` is ever backtracked to, so matching is
/// O(pattern × text) whatever the pattern.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    // (pattern index of the last `*`, text index it currently absorbs up to)
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        match p.get(pi) {
            Some('*') => {
                star = Some((pi, ti));
                pi += 1;
            }
            Some(&c) if c == '?' || c == t[ti] => {
                pi += 1;
                ti += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    star = Some((sp, st + 1));
                    pi = sp + 1;
                    ti = st + 1;
                }
                None => return false,
            },
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

/// Convenience: parse and evaluate an expression string.
pub fn eval_str(src: &str) -> Result<Value, String> {
    eval_expr(&parse_expr(src)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
