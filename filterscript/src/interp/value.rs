//! Runtime values for the interpreter
//!
//! Values are immutable: every operation returns a new [`Value`]. Every
//! coercion and comparison is an exhaustive match over the variant pairs;
//! `Undefined` on either side is an [`InternalError`], since the evaluator
//! must have propagated it before asking.

use crate::error::InternalError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Runtime value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Deliberately not computed; the result depends on data we don't have
    Undefined,
    /// Computed, and empty
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Ordered, 0-indexed, heterogeneous
    Array(Vec<Value>),
}

/// Type tag of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Undefined,
    Null,
    Bool,
    Int,
    Float,
    Str,
    Array,
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Undefined => "undefined",
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Str => "string",
            ValueType::Array => "array",
        }
    }
}

/// Arithmetic operand after numeric coercion
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(f) => f,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Number::Int(n) => Value::Int(n),
            Number::Float(f) => Value::Float(f),
        }
    }
}

impl Value {
    /// Build a value of type `ty` from an optional payload, casting the
    /// payload to that type. `Undefined` accepts no payload other than null.
    pub fn from_parts(ty: ValueType, payload: Option<Value>) -> Result<Value, InternalError> {
        match (ty, payload) {
            (ValueType::Undefined, None | Some(Value::Null)) => Ok(Value::Undefined),
            (ValueType::Undefined, Some(_)) => Err(InternalError::UndefinedPayload),
            (ty, Some(value)) if value.value_type() == ty => Ok(value),
            (ty, None) => Value::Null.cast(ty),
            (ty, Some(value)) => value.cast(ty),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Undefined => ValueType::Undefined,
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Str(_) => ValueType::Str,
            Value::Array(_) => ValueType::Array,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.value_type().name()
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// True if this value or any nested array element is `Undefined`
    pub fn has_undefined(&self) -> bool {
        match self {
            Value::Undefined => true,
            Value::Array(items) => items.iter().any(Value::has_undefined),
            _ => false,
        }
    }

    /// Copy with every `Undefined`, at any depth, replaced by `Null`
    pub fn undefined_to_null(&self) -> Value {
        match self {
            Value::Undefined => Value::Null,
            Value::Array(items) => Value::Array(items.iter().map(Value::undefined_to_null).collect()),
            other => other.clone(),
        }
    }

    /// Convert to another type. Casting to `Null` or `Array` never fails for
    /// a concrete value; casting `Undefined` always does. Casting to `Array`
    /// wraps the value, arrays included.
    pub fn cast(&self, target: ValueType) -> Result<Value, InternalError> {
        if self.is_undefined() {
            return Err(InternalError::UndefinedCast {
                target: target.name(),
            });
        }
        if target == ValueType::Array {
            return Ok(Value::Array(vec![self.clone()]));
        }
        if self.value_type() == target {
            return Ok(self.clone());
        }
        match target {
            ValueType::Undefined => Err(InternalError::Invariant(format!(
                "cannot cast {} to undefined",
                self.type_name()
            ))),
            ValueType::Null => Ok(Value::Null),
            ValueType::Bool => self.to_bool().map(Value::Bool),
            ValueType::Int => self.to_int().map(Value::Int),
            ValueType::Float => self.to_float().map(Value::Float),
            ValueType::Str => self.to_str().map(Value::Str),
            ValueType::Array => Ok(Value::Array(vec![self.clone()])),
        }
    }

    pub fn to_bool(&self) -> Result<bool, InternalError> {
        Ok(match self {
            Value::Undefined => return Err(InternalError::UndefinedCast { target: "bool" }),
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty() && s != "0",
            Value::Array(items) => !items.is_empty(),
        })
    }

    pub fn to_int(&self) -> Result<i64, InternalError> {
        Ok(match self {
            Value::Undefined => return Err(InternalError::UndefinedCast { target: "int" }),
            Value::Null => 0,
            Value::Bool(b) => i64::from(*b),
            Value::Int(n) => *n,
            Value::Float(f) => *f as i64,
            Value::Str(s) => match parse_numeric_prefix(s) {
                Number::Int(n) => n,
                Number::Float(f) => f as i64,
            },
            Value::Array(items) => i64::from(!items.is_empty()),
        })
    }

    pub fn to_float(&self) -> Result<f64, InternalError> {
        Ok(match self {
            Value::Undefined => return Err(InternalError::UndefinedCast { target: "float" }),
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Int(n) => *n as f64,
            Value::Float(f) => *f,
            Value::Str(s) => parse_numeric_prefix(s).as_f64(),
            Value::Array(items) => f64::from(u8::from(!items.is_empty())),
        })
    }

    /// String form. Arrays render one element per line, each followed by a
    /// newline.
    pub fn to_str(&self) -> Result<String, InternalError> {
        Ok(match self {
            Value::Undefined => return Err(InternalError::UndefinedCast { target: "string" }),
            Value::Null => String::new(),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => String::new(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => s.clone(),
            Value::Array(items) => {
                let mut out = String::new();
                for item in items {
                    out.push_str(&item.to_str()?);
                    out.push('\n');
                }
                out
            }
        })
    }

    /// Numeric view for arithmetic. Strings use their leading numeric prefix.
    pub fn to_number(&self) -> Result<Number, InternalError> {
        Ok(match self {
            Value::Undefined => return Err(InternalError::UndefinedCast { target: "number" }),
            Value::Float(f) => Number::Float(*f),
            Value::Str(s) => parse_numeric_prefix(s),
            other => Number::Int(other.to_int()?),
        })
    }

    /// `==`: compares string forms; arrays element-wise; an empty array
    /// equals `false` and `null`.
    pub fn loose_equals(&self, other: &Value) -> Result<bool, InternalError> {
        equals(self, other, false)
    }

    /// `===`: like `==` but the types must match too
    pub fn strict_equals(&self, other: &Value) -> Result<bool, InternalError> {
        equals(self, other, true)
    }

    /// Ordering used by `<`, `>`, `<=` and `>=`. `None` when unordered (NaN).
    pub fn compare(&self, other: &Value) -> Result<Option<Ordering>, InternalError> {
        use Value::*;
        Ok(match (self, other) {
            (Undefined, _) | (_, Undefined) => return Err(InternalError::UndefinedComparison),
            (Array(a), Array(b)) => {
                if a.len() != b.len() {
                    return Ok(Some(a.len().cmp(&b.len())));
                }
                for (x, y) in a.iter().zip(b) {
                    match x.compare(y)? {
                        Some(Ordering::Equal) => continue,
                        other => return Ok(other),
                    }
                }
                Some(Ordering::Equal)
            }
            (Array(_), _) => Some(Ordering::Greater),
            (_, Array(_)) => Some(Ordering::Less),
            (Str(a), Str(b)) => {
                if is_numeric_str(a) && is_numeric_str(b) {
                    compare_numbers(parse_numeric_prefix(a), parse_numeric_prefix(b))
                } else {
                    Some(a.as_str().cmp(b.as_str()))
                }
            }
            (Null, Str(s)) => Some("".cmp(s.as_str())),
            (Str(s), Null) => Some(s.as_str().cmp("")),
            (Bool(_) | Null, _) | (_, Bool(_) | Null) => {
                Some(self.to_bool()?.cmp(&other.to_bool()?))
            }
            (Str(s), Int(_) | Float(_)) => {
                if is_numeric_str(s) {
                    compare_numbers(parse_numeric_prefix(s), other.to_number()?)
                } else {
                    Some(s.as_str().cmp(other.to_str()?.as_str()))
                }
            }
            (Int(_) | Float(_), Str(s)) => {
                if is_numeric_str(s) {
                    compare_numbers(self.to_number()?, parse_numeric_prefix(s))
                } else {
                    Some(self.to_str()?.as_str().cmp(s.as_str()))
                }
            }
            (Int(_) | Float(_), Int(_) | Float(_)) => {
                compare_numbers(self.to_number()?, other.to_number()?)
            }
        })
    }
}

fn equals(a: &Value, b: &Value, strict: bool) -> Result<bool, InternalError> {
    match (a, b) {
        (Value::Undefined, _) | (_, Value::Undefined) => Err(InternalError::UndefinedComparison),
        (Value::Array(xs), Value::Array(ys)) => {
            if xs.len() != ys.len() {
                return Ok(false);
            }
            for (x, y) in xs.iter().zip(ys) {
                if !equals(x, y, strict)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Value::Array(items), other) | (other, Value::Array(items)) => {
            if strict || !items.is_empty() {
                return Ok(false);
            }
            Ok(matches!(other, Value::Bool(false) | Value::Null))
        }
        _ => {
            let same_type = a.value_type() == b.value_type();
            Ok((same_type || !strict) && a.to_str()? == b.to_str()?)
        }
    }
}

fn compare_numbers(a: Number, b: Number) -> Option<Ordering> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => Some(x.cmp(&y)),
        _ => a.as_f64().partial_cmp(&b.as_f64()),
    }
}

// ---------------------------------------------------------------------------
// Arithmetic. Callers have already ruled out `Undefined` operands and zero
// divisors.
// ---------------------------------------------------------------------------

/// `+`: concatenation if either side is a string, array concatenation if
/// both are arrays, numeric addition otherwise
pub fn add(a: &Value, b: &Value) -> Result<Value, InternalError> {
    match (a, b) {
        (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::Str(a.to_str()? + &b.to_str()?)),
        (Value::Array(xs), Value::Array(ys)) => {
            Ok(Value::Array(xs.iter().chain(ys).cloned().collect()))
        }
        _ => Ok(int_or_float(a.to_number()?, b.to_number()?, i64::checked_add, |x, y| x + y)),
    }
}

pub fn sub(a: &Value, b: &Value) -> Result<Value, InternalError> {
    Ok(int_or_float(a.to_number()?, b.to_number()?, i64::checked_sub, |x, y| x - y))
}

pub fn mul(a: &Value, b: &Value) -> Result<Value, InternalError> {
    Ok(int_or_float(a.to_number()?, b.to_number()?, i64::checked_mul, |x, y| x * y))
}

/// `/`: an int when both sides are ints and the division is exact
pub fn div(a: &Value, b: &Value) -> Result<Value, InternalError> {
    let (x, y) = (a.to_number()?, b.to_number()?);
    if y.as_f64() == 0.0 {
        return Err(InternalError::Invariant("division by zero reached arithmetic".into()));
    }
    if let (Number::Int(x), Number::Int(y)) = (x, y) {
        if let Some(0) = x.checked_rem(y) {
            if let Some(q) = x.checked_div(y) {
                return Ok(Value::Int(q));
            }
        }
    }
    Ok(Value::Float(x.as_f64() / y.as_f64()))
}

/// `%`: remainder of the integer casts
pub fn modulo(a: &Value, b: &Value) -> Result<Value, InternalError> {
    let (x, y) = (a.to_int()?, b.to_int()?);
    if y == 0 {
        return Err(InternalError::Invariant("modulo by zero reached arithmetic".into()));
    }
    Ok(Value::Int(x.checked_rem(y).unwrap_or(0)))
}

/// `**`: an int for int operands with a non-negative exponent that doesn't overflow
pub fn pow(a: &Value, b: &Value) -> Result<Value, InternalError> {
    let (base, exp) = (a.to_number()?, b.to_number()?);
    if let (Number::Int(base), Number::Int(exp)) = (base, exp) {
        if let Ok(exp) = u32::try_from(exp) {
            if let Some(n) = base.checked_pow(exp) {
                return Ok(Value::Int(n));
            }
        }
    }
    Ok(Value::Float(base.as_f64().powf(exp.as_f64())))
}

pub fn neg(a: &Value) -> Result<Value, InternalError> {
    Ok(match a.to_number()? {
        Number::Int(n) => n
            .checked_neg()
            .map_or(Value::Float(-(n as f64)), Value::Int),
        Number::Float(f) => Value::Float(-f),
    })
}

fn int_or_float(
    a: Number,
    b: Number,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Value {
    if let (Number::Int(x), Number::Int(y)) = (a, b) {
        if let Some(n) = int_op(x, y) {
            return Value::Int(n);
        }
    }
    Value::Float(float_op(a.as_f64(), b.as_f64()))
}

// ---------------------------------------------------------------------------
// Numeric strings
// ---------------------------------------------------------------------------

/// Loose parse of the leading numeric part of a string: `"12abc"` is 12,
/// `" 1.5e1x"` is 15.0, `"abc"` is 0.
pub fn parse_numeric_prefix(s: &str) -> Number {
    scan_number(s).map_or(Number::Int(0), |(n, _)| n)
}

/// Strict check: the whole string (ignoring surrounding whitespace) is a number
pub fn is_numeric_str(s: &str) -> bool {
    match scan_number(s) {
        Some((_, len)) => s.trim_start()[len..].trim_end().is_empty(),
        None => false,
    }
}

/// Returns the number and how many bytes of the left-trimmed input it used
fn scan_number(s: &str) -> Option<(Number, usize)> {
    let t = s.trim_start();
    let b = t.as_bytes();
    let digits_from = |mut i: usize| {
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut i = 0;
    if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
        i += 1;
    }
    let int_end = digits_from(i);
    let int_digits = int_end - i;
    i = int_end;

    let mut is_float = false;
    if i < b.len() && b[i] == b'.' {
        let frac_end = digits_from(i + 1);
        if int_digits > 0 || frac_end > i + 1 {
            i = frac_end;
            is_float = true;
        }
    }
    if int_digits == 0 && !is_float {
        return None;
    }

    if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
        let mut j = i + 1;
        if j < b.len() && (b[j] == b'+' || b[j] == b'-') {
            j += 1;
        }
        let exp_end = digits_from(j);
        if exp_end > j {
            i = exp_end;
            is_float = true;
        }
    }

    let text = &t[..i];
    if !is_float {
        if let Ok(n) = text.parse::<i64>() {
            return Some((Number::Int(n), i));
        }
    }
    text.parse::<f64>().ok().map(|f| (Number::Float(f), i))
}

/// Render a float with 14 significant digits, dropping trailing zeros;
/// whole numbers print without a fraction.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "NAN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "INF" } else { "-INF" }.to_string();
    }
    if f == 0.0 {
        return if f.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let sci = format!("{:.13e}", f);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    let negative = mantissa.starts_with('-');
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let digits = digits.trim_end_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };
    let sign = if negative { "-" } else { "" };

    if !(-5..15).contains(&exp) {
        let (head, tail) = digits.split_at(1);
        let tail = if tail.is_empty() { "0" } else { tail };
        let exp_sign = if exp < 0 { '-' } else { '+' };
        return format!("{sign}{head}.{tail}E{exp_sign}{}", exp.abs());
    }

    let point = exp + 1;
    let body = if point <= 0 {
        format!("0.{}{}", "0".repeat(point.unsigned_abs() as usize), digits)
    } else {
        let point = point as usize;
        if digits.len() <= point {
            format!("{}{}", digits, "0".repeat(point - digits.len()))
        } else {
            format!("{}.{}", &digits[..point], &digits[point..])
        }
    };
    format!("{sign}{body}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{}", format_float(*x)),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}
