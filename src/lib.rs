// ============================================================================
// keyed_envelope Library
// ============================================================================

//! Flat, key-annotated serialization for records stored in partition/sort
//! keyed stores (DynamoDB style single-table designs).
//!
//! A record implements [`KeyedRecord`] to report its partition key and
//! optional sort key. Wrapping it in an [`Envelope`] (or running it
//! through an [`EnvelopeCodec`]) produces one flat map holding the
//! record's own fields and the computed keys under their configured
//! names:
//!
//! ```
//! use keyed_envelope::{Envelope, KeyedRecord};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize, KeyedRecord)]
//! #[keyed(partition_key = "USER#{id}", sort_key = "PROFILE")]
//! struct User {
//!     id: u32,
//!     name: String,
//!     points: i64,
//!     verified: bool,
//! }
//!
//! let user = User { id: 123, name: "John".into(), points: 100, verified: true };
//! let json = serde_json::to_value(Envelope::new(&user)).unwrap();
//!
//! assert_eq!(json, serde_json::json!({
//!     "pk": "USER#123",
//!     "sk": "PROFILE",
//!     "id": 123,
//!     "name": "John",
//!     "points": 100,
//!     "verified": true,
//! }));
//!
//! let back: Envelope<User> = serde_json::from_value(json).unwrap();
//! assert_eq!(back.into_inner(), user);
//! ```

pub mod core;
pub mod envelope;

pub use crate::core::{AttributeValue, EnvelopeError, FlatMap, FlatRecord, KeyValue, KeyedRecord, Result};
pub use envelope::{Envelope, EnvelopeCodec, EnvelopeOptions, NestedFields, NullFields};

/// `#[derive(KeyedRecord)]`, see [`KeyedRecord`].
pub use keyed_envelope_derive::KeyedRecord;
