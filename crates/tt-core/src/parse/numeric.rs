//! Numeric coercion of raw cell values.
//!
//! Every value read from a sanitized row goes through [`coerce`] before
//! use: integer first, then float rounded to 3 decimals, otherwise the
//! original string unchanged. Coercion never fails; rejecting a value that
//! must be numeric is the record builder's job.

use serde_json::Value;

/// A cell value after coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Int(i64),
    /// Rounded to 3 decimal digits.
    Float(f64),
    /// The original string, for cells that are not numeric.
    Text(String),
}

impl CellValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            CellValue::Text(_) => None,
        }
    }

    /// Integer view: integers directly, floats only when integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(i) => Some(*i),
            CellValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// The value as it serializes into a record's values stanza.
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Int(i) => Value::from(*i),
            CellValue::Float(f) => Value::from(*f),
            CellValue::Text(s) => Value::from(s.clone()),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Coerce a raw string cell into a typed value.
pub fn coerce(raw: &str) -> CellValue {
    if let Ok(i) = raw.parse::<i64>() {
        return CellValue::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return CellValue::Float(round3(f));
    }
    CellValue::Text(raw.to_string())
}

pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
