use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single sheet cell as seen by the record engine.
///
/// Serializes JSON-naturally (numbers, booleans and strings as themselves); the
/// empty sentinel serializes as `""` and both `""` and `null` deserialize back to
/// [`CellValue::Empty`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    /// Empty / unset cell value.
    #[default]
    Empty,
    /// IEEE-754 double precision number.
    Number(f64),
    /// Plain string.
    String(String),
    /// Boolean.
    Boolean(bool),
}

impl CellValue {
    /// Returns true for the empty sentinel (including a zero-length string).
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Numeric view of the cell.
    ///
    /// Numbers are returned as-is; strings count when they parse as a finite
    /// number after trimming. Everything else is non-numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            CellValue::Empty | CellValue::Boolean(_) => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            // `-0` and `0` must stringify identically for matching.
            CellValue::Number(n) if *n == 0.0 => f.write_str("0"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::String(s) => f.write_str(s),
            CellValue::Boolean(true) => f.write_str("true"),
            CellValue::Boolean(false) => f.write_str("false"),
        }
    }
}

/// Returns true if two cells match for key and criteria lookups.
///
/// Matching is string-coercion equality: `Number(7.0)` matches `String("7")`, and
/// the empty sentinel matches an empty string. Numbers stringify in plain
/// decimal, so `Number(1e21)` only matches `"1000000000000000000000"`, never
/// `"1e21"`. Every lookup in the crate goes through this function.
pub fn values_match(a: &CellValue, b: &CellValue) -> bool {
    match (a, b) {
        (CellValue::String(a), CellValue::String(b)) => a == b,
        _ => a.to_string() == b.to_string(),
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(f64::from(value))
    }
}

impl From<u32> for CellValue {
    fn from(value: u32) -> Self {
        CellValue::Number(f64::from(value))
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::String(value)
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::from(value.to_string())
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Empty => serializer.serialize_str(""),
            CellValue::Number(n) => serializer.serialize_f64(*n),
            CellValue::String(s) => serializer.serialize_str(s),
            CellValue::Boolean(b) => serializer.serialize_bool(*b),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<RawScalar>::deserialize(deserializer)? {
            None => CellValue::Empty,
            Some(RawScalar::Boolean(b)) => CellValue::Boolean(b),
            Some(RawScalar::Number(n)) => CellValue::Number(n),
            Some(RawScalar::String(s)) => CellValue::from(s),
        })
    }
}
