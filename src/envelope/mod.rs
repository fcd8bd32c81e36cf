//! Flattening envelope
//!
//! Wraps a [`KeyedRecord`] so that it serializes as one flat map: the
//! record's own fields plus its computed partition and sort keys.
//!
//! # Architecture
//!
//! - `capture.rs` - serde `Serializer` that records a value's fields into a flat map
//! - `codec.rs` - encode/decode algorithm (`EnvelopeCodec`)
//! - `nesting.rs` - re-nesting of path-joined names on decode
//! - `options.rs` - configuration (`EnvelopeOptions`)

mod capture;
mod codec;
mod nesting;
mod options;

use std::ops::{Deref, DerefMut};

use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::{FlatRecord, KeyedRecord, Result};

pub use codec::EnvelopeCodec;
pub use options::{EnvelopeOptions, NestedFields, NullFields};

/// A keyed record together with its flat storage representation.
///
/// Serializing an `Envelope<T>` writes `T`'s fields and its keys side by
/// side in a single map, using the default [`EnvelopeOptions`].
/// Deserializing hands the input straight to `T`'s own `Deserialize`
/// impl.
///
/// The wrapped record is reachable through `Deref`/`DerefMut`, so
/// `envelope.name` reads the record's `name` field.
///
/// # Examples
///
/// ```
/// use keyed_envelope::{Envelope, KeyValue, KeyedRecord};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct User {
///     id: u32,
///     name: String,
/// }
///
/// impl KeyedRecord for User {
///     fn partition_key(&self) -> KeyValue {
///         format!("USER#{}", self.id).into()
///     }
///
///     fn sort_key(&self) -> Option<KeyValue> {
///         Some("PROFILE".into())
///     }
/// }
///
/// let envelope = Envelope::new(User { id: 7, name: "Ada".into() });
/// assert_eq!(envelope.name, "Ada");
///
/// let json = serde_json::to_string(&envelope).unwrap();
/// assert_eq!(json, r#"{"id":7,"name":"Ada","pk":"USER#7","sk":"PROFILE"}"#);
///
/// let back: Envelope<User> = serde_json::from_str(&json).unwrap();
/// assert_eq!(back.into_inner(), User { id: 7, name: "Ada".into() });
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope<T> {
    base: T,
}

impl<T> Envelope<T> {
    pub fn new(base: T) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &T {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut T {
        &mut self.base
    }

    pub fn into_inner(self) -> T {
        self.base
    }
}

impl<T: KeyedRecord + Serialize> Envelope<T> {
    /// Flat representation of the wrapped record.
    pub fn encode(&self) -> Result<FlatRecord> {
        EnvelopeCodec::default().encode(&self.base)
    }
}

impl<T: KeyedRecord + serde::de::DeserializeOwned> Envelope<T> {
    /// Rebuilds the wrapped record from its flat representation.
    pub fn decode(record: FlatRecord) -> Result<Self> {
        EnvelopeCodec::default().decode(record).map(Self::new)
    }
}

impl<T> From<T> for Envelope<T> {
    fn from(base: T) -> Self {
        Self::new(base)
    }
}

impl<T> Deref for Envelope<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl<T> DerefMut for Envelope<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.base
    }
}

impl<T: KeyedRecord + Serialize> Serialize for Envelope<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let flat = self.encode().map_err(S::Error::custom)?;
        flat.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Envelope<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Self::new)
    }
}
