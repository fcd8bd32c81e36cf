use log::{debug, trace};
use serde::Serialize;
use serde::de::{Deserialize, DeserializeOwned};
use serde::de::value::MapDeserializer;

use super::capture::capture_fields;
use super::nesting::unflatten;
use super::options::EnvelopeOptions;
use crate::core::record::validate_key_names;
use crate::core::{EnvelopeError, FlatMap, FlatRecord, KeyedRecord, Result};

/// Encodes keyed records into flat records and back.
///
/// # Examples
///
/// ```
/// use keyed_envelope::{EnvelopeCodec, KeyValue, KeyedRecord};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Session {
///     user: String,
///     started: i64,
/// }
///
/// impl KeyedRecord for Session {
///     fn partition_key(&self) -> KeyValue {
///         format!("USER#{}", self.user).into()
///     }
///
///     fn sort_key(&self) -> Option<KeyValue> {
///         Some(format!("SESSION#{}", self.started).into())
///     }
/// }
///
/// # fn main() -> keyed_envelope::Result<()> {
/// let codec = EnvelopeCodec::default();
/// let session = Session { user: "ada".into(), started: 42 };
///
/// let flat = codec.encode(&session)?;
/// assert_eq!(flat.get("pk").and_then(|v| v.as_str()), Some("USER#ada"));
/// assert_eq!(flat.get("sk").and_then(|v| v.as_str()), Some("SESSION#42"));
///
/// let decoded: Session = codec.decode(flat)?;
/// assert_eq!(decoded, session);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct EnvelopeCodec {
    options: EnvelopeOptions,
}

impl EnvelopeCodec {
    pub fn new(options: EnvelopeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EnvelopeOptions {
        &self.options
    }

    /// Flattens `record` and injects its computed keys.
    ///
    /// Stored attributes named like a key field are dropped first, so the
    /// computed key always wins. A sort key without a sort key name is an
    /// error and nothing is produced.
    pub fn encode<T>(&self, record: &T) -> Result<FlatRecord>
    where
        T: KeyedRecord + Serialize + ?Sized,
    {
        validate_key_names::<T>()?;

        let mut fields = capture_fields(record, &self.options)?;

        drop_shadowed(&mut fields, T::PARTITION_KEY_NAME);
        if let Some(name) = T::SORT_KEY_NAME {
            drop_shadowed(&mut fields, name);
        }

        fields.insert(
            T::PARTITION_KEY_NAME.to_string(),
            record.partition_key().into(),
        );

        if let Some(sort_key) = record.sort_key() {
            match T::SORT_KEY_NAME {
                Some(name) => {
                    fields.insert(name.to_string(), sort_key.into());
                }
                None => return Err(EnvelopeError::MissingSortKeyName { value: sort_key }),
            }
        }

        trace!("Encoded keyed record with {} attributes", fields.len());
        Ok(FlatRecord::from(fields))
    }

    /// Rebuilds a record from a flat record using the record's own
    /// `Deserialize` impl.
    ///
    /// Key fields are passed through like any other attribute; types that
    /// don't declare them simply ignore them.
    pub fn decode<T>(&self, record: FlatRecord) -> Result<T>
    where
        T: KeyedRecord + DeserializeOwned,
    {
        self.options.validate()?;

        match self.options.separator() {
            None => T::deserialize(record.into_map_deserializer()),
            Some(separator) => {
                let mut verbatim = vec![T::PARTITION_KEY_NAME];
                verbatim.extend(T::SORT_KEY_NAME);
                let tree = unflatten(record, separator, &verbatim)?;
                T::deserialize(MapDeserializer::new(tree.into_iter()))
            }
        }
    }

    /// Encodes into a JSON object.
    pub fn encode_json<T>(&self, record: &T) -> Result<serde_json::Value>
    where
        T: KeyedRecord + Serialize + ?Sized,
    {
        Ok(serde_json::to_value(self.encode(record)?)?)
    }

    /// Decodes from a JSON object. Nested objects and arrays are rejected.
    pub fn decode_json<T>(&self, value: serde_json::Value) -> Result<T>
    where
        T: KeyedRecord + DeserializeOwned,
    {
        let record = FlatRecord::deserialize(value)?;
        self.decode(record)
    }

    pub fn to_json_string<T>(&self, record: &T) -> Result<String>
    where
        T: KeyedRecord + Serialize + ?Sized,
    {
        Ok(serde_json::to_string(&self.encode(record)?)?)
    }

    pub fn from_json_str<T>(&self, json: &str) -> Result<T>
    where
        T: KeyedRecord + DeserializeOwned,
    {
        let record: FlatRecord = serde_json::from_str(json)?;
        self.decode(record)
    }
}

fn drop_shadowed(fields: &mut FlatMap, key_name: &str) {
    if let Some(stored) = fields.remove(key_name) {
        debug!(
            "Stored attribute '{}' = {} replaced by the computed key",
            key_name, stored
        );
    }
}
