use chrono::{NaiveDate, NaiveDateTime};
use std::cmp::Ordering;

use crate::format::format_value;

/// A single cell value as seen by the table engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
}

impl Value {
    // Mixed kinds are ordered by this rank, nulls always last
    fn rank(&self) -> u8 {
        match self {
            Value::Number(_) => 0,
            Value::Date(_) => 1,
            Value::Bool(_) => 2,
            Value::Text(_) => 3,
            Value::Null => 4,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Total order used for sorting.
    ///
    /// Numbers compare with `total_cmp` (a plain NaN sorts after infinity), text
    /// lexicographically, dates chronologically and booleans `false < true`.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    /// The string this value is matched and displayed as.
    pub fn to_display_string(&self) -> String {
        format_value(self)
    }

    /// Case-insensitive substring match against the displayed string.
    /// `needle` is expected to be lowercase already.
    pub fn matches(&self, needle: &str) -> bool {
        if self.is_null() {
            return false;
        }
        self.to_display_string().to_lowercase().contains(needle)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v.and_time(chrono::NaiveTime::MIN))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_kinds_follow_rank() {
        let mut values = vec![
            Value::Null,
            Value::from("b"),
            Value::from(true),
            Value::from(3.0),
        ];
        values.sort_by(|a, b| a.compare(b));
        assert_eq!(
            values,
            vec![
                Value::from(3.0),
                Value::from(true),
                Value::from("b"),
                Value::Null
            ]
        );
    }

    #[test]
    fn nan_sorts_after_numbers() {
        assert_eq!(
            Value::from(f64::NAN).compare(&Value::from(1e300)),
            Ordering::Greater
        );
    }

    #[test]
    fn null_never_matches() {
        assert!(!Value::Null.matches("a"));
        assert!(Value::from(true).matches("yes"));
        assert!(Value::from("Structure Fire").matches("fire"));
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Value::from(None::<f64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}
