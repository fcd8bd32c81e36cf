use crate::core::{EnvelopeError, Result};

/// What to do with `None` and unit field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullFields {
    /// Leave the attribute out of the flat record.
    #[default]
    Omit,
    /// Write an explicit null attribute.
    Keep,
}

/// What to do with struct, map and data-carrying enum field values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NestedFields {
    /// Fail the encode with `UnsupportedShape`.
    #[default]
    Reject,
    /// Flatten into the top level, joining names with `separator`
    /// (`address.city`). Decoding re-nests names containing the separator.
    JoinPath { separator: String },
}

/// Envelope configuration
///
/// The defaults match what a keyed store expects from a flat item:
/// no null attributes and no sub-documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvelopeOptions {
    pub null_fields: NullFields,
    pub nested_fields: NestedFields,
}

impl EnvelopeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handling of absent values
    pub fn null_fields(mut self, policy: NullFields) -> Self {
        self.null_fields = policy;
        self
    }

    /// Set the handling of composite values
    pub fn nested_fields(mut self, policy: NestedFields) -> Self {
        self.nested_fields = policy;
        self
    }

    /// Flatten composite values with path-joined field names
    pub fn join_nested(self, separator: &str) -> Self {
        self.nested_fields(NestedFields::JoinPath {
            separator: separator.to_string(),
        })
    }

    /// The separator in use, if nested values are flattened.
    pub fn separator(&self) -> Option<&str> {
        match &self.nested_fields {
            NestedFields::JoinPath { separator } => Some(separator),
            NestedFields::Reject => None,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.separator() == Some("") {
            return Err(EnvelopeError::InvalidOptions(
                "nested field separator must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
