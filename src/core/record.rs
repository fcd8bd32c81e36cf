use super::error::{EnvelopeError, Result};
use super::key::KeyValue;

/// Contract for records stored in a partition/sort keyed store.
///
/// The keys are computed by the record, they do not have to be stored
/// attributes. Key field names are fixed per type.
///
/// # Examples
///
/// ```
/// use keyed_envelope::{KeyValue, KeyedRecord};
///
/// struct Order {
///     customer: String,
///     number: i64,
/// }
///
/// impl KeyedRecord for Order {
///     fn partition_key(&self) -> KeyValue {
///         format!("CUSTOMER#{}", self.customer).into()
///     }
///
///     fn sort_key(&self) -> Option<KeyValue> {
///         Some(self.number.into())
///     }
/// }
///
/// assert_eq!(Order::PARTITION_KEY_NAME, "pk");
/// assert_eq!(Order::SORT_KEY_NAME, Some("sk"));
/// ```
pub trait KeyedRecord {
    /// Attribute name of the partition key in the flat record.
    const PARTITION_KEY_NAME: &'static str = "pk";
    /// Attribute name of the sort key; `None` for types without one.
    const SORT_KEY_NAME: Option<&'static str> = Some("sk");

    fn partition_key(&self) -> KeyValue;

    fn sort_key(&self) -> Option<KeyValue>;
}

impl<T: KeyedRecord + ?Sized> KeyedRecord for &T {
    const PARTITION_KEY_NAME: &'static str = T::PARTITION_KEY_NAME;
    const SORT_KEY_NAME: Option<&'static str> = T::SORT_KEY_NAME;

    fn partition_key(&self) -> KeyValue {
        (**self).partition_key()
    }

    fn sort_key(&self) -> Option<KeyValue> {
        (**self).sort_key()
    }
}

/// Checks the per-type key names before anything is written with them.
pub(crate) fn validate_key_names<T: KeyedRecord + ?Sized>() -> Result<()> {
    if T::PARTITION_KEY_NAME.is_empty() {
        return Err(EnvelopeError::EmptyKeyName);
    }

    match T::SORT_KEY_NAME {
        Some("") => Err(EnvelopeError::EmptyKeyName),
        Some(name) if name == T::PARTITION_KEY_NAME => {
            Err(EnvelopeError::KeyNameConflict(name.to_string()))
        }
        _ => Ok(()),
    }
}
