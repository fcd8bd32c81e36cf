use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A partition or sort key value.
///
/// Keys are restricted to the scalar kinds a keyed store can hash or
/// order on. Serialization is untagged, so `KeyValue::Text("USER#1")`
/// is written as the plain string `"USER#1"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    Boolean(bool),
    Integer(i64),
    Text(String),
}

impl KeyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            KeyValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            KeyValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            KeyValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KeyValue::Text(value) => write!(f, "{}", value),
            KeyValue::Integer(value) => write!(f, "{}", value),
            KeyValue::Boolean(value) => write!(f, "{}", value),
        }
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        KeyValue::Text(value)
    }
}

impl From<&String> for KeyValue {
    fn from(value: &String) -> Self {
        KeyValue::Text(value.clone())
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        KeyValue::Text(value.to_string())
    }
}

impl From<bool> for KeyValue {
    fn from(value: bool) -> Self {
        KeyValue::Boolean(value)
    }
}

impl From<Uuid> for KeyValue {
    fn from(value: Uuid) -> Self {
        KeyValue::Text(value.to_string())
    }
}

macro_rules! key_value_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for KeyValue {
                fn from(value: $ty) -> Self {
                    KeyValue::Integer(i64::from(value))
                }
            }
        )*
    };
}

key_value_from_integer!(i8, i16, i32, i64, u8, u16, u32);
