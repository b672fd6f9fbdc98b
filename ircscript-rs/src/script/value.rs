//! Operand type for `$calc` and `$iif` expressions.
//!
//! Script text is untyped; an operand is a string until an operator asks
//! for a number, at which point it is coerced.

use std::cmp::Ordering;
use std::fmt;

/// An expression operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Str(String::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => f.write_str(&format_number(*x)),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Render a float to 15 significant digits, so `0.1 + 0.2` prints `0.3`.
/// Whole values print without a fractional part.
pub fn format_number(x: f64) -> String {
    if !x.is_finite() {
        return x.to_string();
    }
    format!("{x:.14e}").parse::<f64>().unwrap_or(x).to_string()
}

impl Value {
    /// `0`, `""`, `"0"` and `"$false"` are falsy.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => {
                let s = s.trim();
                !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("$false")
            }
        }
    }

    /// Numeric view, or `None` when a string operand is not a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            Value::Str(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_str(&self) -> String {
        self.to_string()
    }

    fn is_float(&self) -> bool {
        match self {
            Value::Int(_) => false,
            Value::Float(_) => true,
            Value::Str(s) => s.contains('.') || s.contains(['e', 'E']),
        }
    }

    /// Coerce both sides; a non-numeric operand poisons the result.
    fn promote(a: &Value, b: &Value) -> Result<(f64, f64, bool), String> {
        let x = a.as_number().ok_or_else(|| format!("not a number: {a}"))?;
        let y = b.as_number().ok_or_else(|| format!("not a number: {b}"))?;
        Ok((x, y, a.is_float() || b.is_float()))
    }

    fn make_numeric(f: f64, is_float: bool) -> Value {
        if is_float || f.fract() != 0.0 || f.abs() >= i64::MAX as f64 {
            Value::Float(f)
        } else {
            Value::Int(f as i64)
        }
    }

    pub fn arith_add(&self, rhs: &Value) -> Result<Value, String> {
        let (a, b, fl) = Self::promote(self, rhs)?;
        Ok(Self::make_numeric(a + b, fl))
    }

    pub fn arith_sub(&self, rhs: &Value) -> Result<Value, String> {
        let (a, b, fl) = Self::promote(self, rhs)?;
        Ok(Self::make_numeric(a - b, fl))
    }

    pub fn arith_mul(&self, rhs: &Value) -> Result<Value, String> {
        let (a, b, fl) = Self::promote(self, rhs)?;
        Ok(Self::make_numeric(a * b, fl))
    }

    /// Division always yields the exact quotient: `$calc(7 / 2)` is `3.5`.
    pub fn arith_div(&self, rhs: &Value) -> Result<Value, String> {
        let (a, b, fl) = Self::promote(self, rhs)?;
        if b == 0.0 {
            return Err("division by zero".into());
        }
        Ok(Self::make_numeric(a / b, fl))
    }

    pub fn arith_rem(&self, rhs: &Value) -> Result<Value, String> {
        let (a, b, fl) = Self::promote(self, rhs)?;
        if b == 0.0 {
            return Err("modulo by zero".into());
        }
        Ok(Self::make_numeric(a % b, fl))
    }

    pub fn arith_pow(&self, rhs: &Value) -> Result<Value, String> {
        let (a, b, fl) = Self::promote(self, rhs)?;
        Ok(Self::make_numeric(a.powf(b), fl))
    }

    pub fn arith_neg(&self) -> Result<Value, String> {
        match self {
            Value::Int(n) => Ok(Value::Int(-n)),
            Value::Float(x) => Ok(Value::Float(-x)),
            Value::Str(_) => {
                let x = self.as_number().ok_or_else(|| format!("not a number: {self}"))?;
                Ok(Self::make_numeric(-x, self.is_float()))
            }
        }
    }

    /// Numeric comparison when both sides are numbers, otherwise a
    /// case-insensitive string comparison.
    pub fn cmp_value(&self, rhs: &Value) -> Ordering {
        match (self.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => self
                .as_str()
                .to_lowercase()
                .cmp(&rhs.as_str().to_lowercase()),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Int(if b { 1 } else { 0 })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_float_drops_trailing_zero() {
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Float(3.0).to_string(), "3");
    }

    #[test]
    fn floats_round_to_fifteen_digits() {
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(std::f64::consts::PI), "3.14159265358979");
        assert_eq!(format_number(-1.0 / 3.0), "-0.333333333333333");
        assert_eq!(format_number(0.0), "0");
    }

    #[test]
    fn truthiness() {
        assert!(Value::Int(1).as_bool());
        assert!(!Value::Int(0).as_bool());
        assert!(Value::Str("yes".into()).as_bool());
        assert!(!Value::Str("".into()).as_bool());
        assert!(!Value::Str("0".into()).as_bool());
        assert!(!Value::Str("$false".into()).as_bool());
    }

    #[test]
    fn arithmetic_on_strings() {
        let a = Value::Str("10".into());
        let b = Value::Str("4".into());
        assert_eq!(a.arith_add(&b), Ok(Value::Int(14)));
        assert_eq!(a.arith_div(&b), Ok(Value::Float(2.5)));
        assert_eq!(a.arith_rem(&b), Ok(Value::Int(2)));
        assert_eq!(Value::Int(2).arith_pow(&Value::Int(10)), Ok(Value::Int(1024)));
    }

    #[test]
    fn non_numeric_operand_is_an_error() {
        assert!(Value::Str("abc".into()).arith_add(&Value::Int(1)).is_err());
        assert!(Value::Int(1).arith_div(&Value::Int(0)).is_err());
    }

    #[test]
    fn compare_mixed() {
        assert_eq!(Value::Str("10".into()).cmp_value(&Value::Int(9)), Ordering::Greater);
        assert_eq!(Value::Str("Bob".into()).cmp_value(&Value::Str("bob".into())), Ordering::Equal);
    }
}
