use std::fmt::Display;

use thiserror::Error;

use super::key::KeyValue;

#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("Sort key '{value}' present but no sort key name defined")]
    MissingSortKeyName { value: KeyValue },

    #[error("Sort key name '{0}' is the same as the partition key name")]
    KeyNameConflict(String),

    #[error("Key field names must not be empty")]
    EmptyKeyName,

    #[error("Unsupported shape for field '{field}': {shape}")]
    UnsupportedShape { field: String, shape: String },

    #[error("Field '{0}' appears more than once in the flat record")]
    DuplicateField(String),

    #[error("Invalid envelope options: {0}")]
    InvalidOptions(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;

impl EnvelopeError {
    pub(crate) fn unsupported(field: impl Into<String>, shape: impl Into<String>) -> Self {
        Self::UnsupportedShape {
            field: field.into(),
            shape: shape.into(),
        }
    }
}

impl serde::ser::Error for EnvelopeError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Serialization(msg.to_string())
    }
}

impl serde::de::Error for EnvelopeError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Deserialization(msg.to_string())
    }
}
