//! Attribute values stored in intervals

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value held by an attribute during one interval
///
/// A small closed union: the store never needs arbitrary payloads. `Null`
/// is the absent sentinel; it still occupies an interval but renders as
/// "no information" to queries.
///
/// Serialized as `"null"`, `{"int": 1}`, `{"long": 1}` or `{"string": "x"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateValue {
    #[default]
    Null,
    Int(i32),
    Long(i64),
    String(String),
}

impl StateValue {
    pub fn is_null(&self) -> bool {
        matches!(self, StateValue::Null)
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            StateValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view of the value (`Int` is widened)
    pub fn as_long(&self) -> Option<i64> {
        match self {
            StateValue::Int(v) => Some(i64::from(*v)),
            StateValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StateValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short type tag used in reports
    pub fn type_name(&self) -> &'static str {
        match self {
            StateValue::Null => "null",
            StateValue::Int(_) => "int",
            StateValue::Long(_) => "long",
            StateValue::String(_) => "string",
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Null => write!(f, "null"),
            StateValue::Int(v) => write!(f, "{}", v),
            StateValue::Long(v) => write!(f, "{}", v),
            StateValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for StateValue {
    fn from(v: i32) -> Self {
        StateValue::Int(v)
    }
}

impl From<i64> for StateValue {
    fn from(v: i64) -> Self {
        StateValue::Long(v)
    }
}

impl From<&str> for StateValue {
    fn from(s: &str) -> Self {
        StateValue::String(s.to_string())
    }
}

impl From<String> for StateValue {
    fn from(s: String) -> Self {
        StateValue::String(s)
    }
}

impl<T: Into<StateValue>> From<Option<T>> for StateValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(StateValue::Null)
    }
}
