//! Re-nesting of path-joined field names for decoding.
//!
//! The inverse of `NestedFields::JoinPath` flattening: `address.city`
//! becomes a `city` entry inside an `address` map so that the domain
//! type's own `Deserialize` impl sees its original shape.

use std::collections::BTreeMap;

use serde::de::value::{MapAccessDeserializer, MapDeserializer};
use serde::de::{IntoDeserializer, Visitor};
use serde::{Deserializer, forward_to_deserialize_any};

use crate::core::{AttributeValue, EnvelopeError, FlatRecord, Result};

pub(crate) type Tree = BTreeMap<String, Node>;

pub(crate) enum Node {
    Leaf(AttributeValue),
    Branch(Tree),
}

/// Builds the nested tree. Names listed in `verbatim` stay top-level leaves.
pub(crate) fn unflatten(record: FlatRecord, separator: &str, verbatim: &[&str]) -> Result<Tree> {
    let mut root = Tree::new();

    for (name, value) in record {
        if verbatim.contains(&name.as_str()) || !name.contains(separator) {
            insert_leaf(&mut root, &name, name.clone(), value)?;
            continue;
        }

        let segments: Vec<&str> = name.split(separator).collect();
        let (last, parents) = match segments.split_last() {
            Some(split) => split,
            None => continue,
        };

        let mut level = &mut root;
        for segment in parents {
            let node = level
                .entry(segment.to_string())
                .or_insert_with(|| Node::Branch(Tree::new()));
            level = match node {
                Node::Branch(children) => children,
                Node::Leaf(_) => return Err(EnvelopeError::DuplicateField(name.clone())),
            };
        }
        insert_leaf(level, &name, last.to_string(), value)?;
    }

    Ok(root)
}

fn insert_leaf(level: &mut Tree, full_name: &str, key: String, value: AttributeValue) -> Result<()> {
    if level.contains_key(&key) {
        return Err(EnvelopeError::DuplicateField(full_name.to_string()));
    }
    level.insert(key, Node::Leaf(value));
    Ok(())
}

impl<'de> Deserializer<'de> for Node {
    type Error = EnvelopeError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self {
            Node::Leaf(value) => value.deserialize_any(visitor),
            Node::Branch(children) => visitor.visit_map(MapDeserializer::new(children.into_iter())),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self {
            Node::Leaf(value) => value.deserialize_option(visitor),
            branch => visitor.visit_some(branch),
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self {
            Node::Leaf(value) => value.deserialize_enum(name, variants, visitor),
            Node::Branch(children) => visitor.visit_enum(MapAccessDeserializer::new(
                MapDeserializer::new(children.into_iter()),
            )),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, EnvelopeError> for Node {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_text(tree: &Tree, key: &str) -> Option<String> {
        match tree.get(key) {
            Some(Node::Leaf(AttributeValue::Text(value))) => Some(value.clone()),
            _ => None,
        }
    }

    #[test]
    fn test_unflatten_groups_by_prefix() {
        let record: FlatRecord = [
            ("address.city", "Oslo"),
            ("address.street", "Karl Johans gate"),
            ("name", "Ada"),
        ]
        .into_iter()
        .collect();

        let tree = unflatten(record, ".", &[]).unwrap();

        assert_eq!(leaf_text(&tree, "name").as_deref(), Some("Ada"));
        match tree.get("address") {
            Some(Node::Branch(children)) => {
                assert_eq!(leaf_text(children, "city").as_deref(), Some("Oslo"));
                assert_eq!(children.len(), 2);
            }
            _ => panic!("address should be a branch"),
        }
    }

    #[test]
    fn test_verbatim_names_are_not_split() {
        let record: FlatRecord = [("USER.pk", "A")].into_iter().collect();

        let tree = unflatten(record, ".", &["USER.pk"]).unwrap();

        assert_eq!(leaf_text(&tree, "USER.pk").as_deref(), Some("A"));
    }

    #[test]
    fn test_leaf_and_branch_conflict() {
        let record: FlatRecord = [("address", "flat"), ("address.city", "Oslo")]
            .into_iter()
            .collect();

        let err = unflatten(record, ".", &[]).err().unwrap();

        assert!(matches!(err, EnvelopeError::DuplicateField(name) if name == "address.city"));
    }
}
