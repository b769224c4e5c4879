//! Free-form attribute values.

use std::collections::BTreeMap;

/// Free-form key/value options attached to viewports and display-set entries.
pub type Options = BTreeMap<String, AttributeValue>;

/// A dynamically-typed attribute value addressable by matching rules.
///
/// Covers the shapes metadata attributes take in practice: text (UIDs,
/// modality codes, descriptions), numbers (series number, frame counts),
/// flags, and lists (modalities in a study).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Numeric view of the value. Text is parsed if it holds a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Text view of the value, without conversion.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether the value carries no information (empty text or empty list).
    pub fn is_empty(&self) -> bool {
        match self {
            AttributeValue::Text(s) => s.is_empty(),
            AttributeValue::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Equality with numeric coercion: `Number(5.0)` equals `Text("5")`.
    ///
    /// A single-element list equals its element.
    pub fn loosely_equals(&self, other: &AttributeValue) -> bool {
        match (self, other) {
            (AttributeValue::Number(_), AttributeValue::Text(_))
            | (AttributeValue::Text(_), AttributeValue::Number(_)) => {
                match (self.as_f64(), other.as_f64()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            (AttributeValue::List(items), scalar) | (scalar, AttributeValue::List(items))
                if !matches!(scalar, AttributeValue::List(_)) =>
            {
                items.len() == 1 && items[0].loosely_equals(scalar)
            }
            _ => self == other,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl From<f64> for AttributeValue {
    fn from(n: f64) -> Self {
        AttributeValue::Number(n)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        AttributeValue::Number(n as f64)
    }
}

impl From<usize> for AttributeValue {
    fn from(n: usize) -> Self {
        AttributeValue::Number(n as f64)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

impl<T: Into<AttributeValue>> From<Vec<T>> for AttributeValue {
    fn from(items: Vec<T>) -> Self {
        AttributeValue::List(items.into_iter().map(Into::into).collect())
    }
}
