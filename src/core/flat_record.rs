use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::de::value::MapDeserializer;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::EnvelopeError;
use super::value::AttributeValue;

/// Field name to value mapping built while capturing a record.
pub type FlatMap = BTreeMap<String, AttributeValue>;

/// A single-level record: field name to scalar value, no sub-documents.
///
/// Fields are kept sorted by name so two encodings of the same record
/// compare and print identically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatRecord {
    fields: FlatMap,
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.fields.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.fields.remove(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, AttributeValue> {
        self.fields.iter()
    }

    pub fn into_inner(self) -> FlatMap {
        self.fields
    }

    /// Deserializer over the fields, as if they had been parsed from a map.
    pub(crate) fn into_map_deserializer<'de>(
        self,
    ) -> MapDeserializer<'de, btree_map::IntoIter<String, AttributeValue>, EnvelopeError> {
        MapDeserializer::new(self.fields.into_iter())
    }
}

impl From<FlatMap> for FlatRecord {
    fn from(fields: FlatMap) -> Self {
        Self { fields }
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for FlatRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let fields = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { fields }
    }
}

impl IntoIterator for FlatRecord {
    type Item = (String, AttributeValue);
    type IntoIter = btree_map::IntoIter<String, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a FlatRecord {
    type Item = (&'a String, &'a AttributeValue);
    type IntoIter = btree_map::Iter<'a, String, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl Serialize for FlatRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(&self.fields)
    }
}

impl<'de> Deserialize<'de> for FlatRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields = FlatMap::deserialize(deserializer)?;
        Ok(Self { fields })
    }
}
