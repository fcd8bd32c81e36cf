//! Field-capturing serializer
//!
//! Runs a record's own `Serialize` impl and records every field it
//! emits into a [`FlatMap`]. Scalars are stored as they are, `None`
//! follows [`NullFields`], unit values are stored as null, and composite
//! values follow [`NestedFields`]. Sequences are never representable in a
//! flat record.

use serde::ser::{self, Impossible, Serialize, Serializer};

use super::options::{EnvelopeOptions, NestedFields, NullFields};
use crate::core::{AttributeValue, EnvelopeError, FlatMap, Result};

const ROOT: &str = "<record>";

/// Captures the top-level fields of `record` into a fresh flat map.
pub(crate) fn capture_fields<T>(record: &T, options: &EnvelopeOptions) -> Result<FlatMap>
where
    T: Serialize + ?Sized,
{
    options.validate()?;
    record.serialize(RecordSerializer { options })
}

fn unsupported<T>(field: &str, shape: &str) -> Result<T> {
    Err(EnvelopeError::unsupported(field, shape))
}

/// Writes one named value into the map, honouring the options.
fn capture_value<T>(
    sink: &mut FlatMap,
    path: String,
    value: &T,
    options: &EnvelopeOptions,
) -> Result<()>
where
    T: Serialize + ?Sized,
{
    value.serialize(ValueSerializer {
        sink,
        path,
        options,
    })
}

/// Under `JoinPath`, a name holding the separator would be split apart on decode.
fn check_segment(options: &EnvelopeOptions, parent: Option<&str>, name: &str) -> Result<()> {
    let separator = match options.separator() {
        Some(separator) if name.contains(separator) => separator,
        _ => return Ok(()),
    };
    let field = match parent {
        Some(parent) => format!("{}{}{}", parent, separator, name),
        None => name.to_string(),
    };
    unsupported(&field, &format!("name containing separator '{}'", separator))
}

fn insert_unique(sink: &mut FlatMap, path: String, value: AttributeValue) -> Result<()> {
    if sink.contains_key(&path) {
        return Err(EnvelopeError::DuplicateField(path));
    }
    sink.insert(path, value);
    Ok(())
}

// ============================================================================
// Root
// ============================================================================

struct RecordSerializer<'o> {
    options: &'o EnvelopeOptions,
}

impl<'o> ser::Serializer for RecordSerializer<'o> {
    type Ok = FlatMap;
    type Error = EnvelopeError;

    type SerializeSeq = Impossible<FlatMap, EnvelopeError>;
    type SerializeTuple = Impossible<FlatMap, EnvelopeError>;
    type SerializeTupleStruct = Impossible<FlatMap, EnvelopeError>;
    type SerializeTupleVariant = Impossible<FlatMap, EnvelopeError>;
    type SerializeMap = FieldCollector<'o>;
    type SerializeStruct = FieldCollector<'o>;
    type SerializeStructVariant = Impossible<FlatMap, EnvelopeError>;

    fn serialize_bool(self, _v: bool) -> Result<FlatMap> {
        unsupported(ROOT, "bool")
    }

    fn serialize_i64(self, _v: i64) -> Result<FlatMap> {
        unsupported(ROOT, "integer")
    }

    fn serialize_i8(self, v: i8) -> Result<FlatMap> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<FlatMap> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<FlatMap> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_u64(self, _v: u64) -> Result<FlatMap> {
        unsupported(ROOT, "integer")
    }

    fn serialize_u8(self, v: u8) -> Result<FlatMap> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<FlatMap> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<FlatMap> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_f32(self, _v: f32) -> Result<FlatMap> {
        unsupported(ROOT, "float")
    }

    fn serialize_f64(self, _v: f64) -> Result<FlatMap> {
        unsupported(ROOT, "float")
    }

    fn serialize_char(self, _v: char) -> Result<FlatMap> {
        unsupported(ROOT, "char")
    }

    fn serialize_str(self, _v: &str) -> Result<FlatMap> {
        unsupported(ROOT, "string")
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<FlatMap> {
        unsupported(ROOT, "bytes")
    }

    fn serialize_none(self) -> Result<FlatMap> {
        unsupported(ROOT, "none")
    }

    fn serialize_some<T>(self, _value: &T) -> Result<FlatMap>
    where
        T: Serialize + ?Sized,
    {
        unsupported(ROOT, "option")
    }

    fn serialize_unit(self) -> Result<FlatMap> {
        unsupported(ROOT, "unit")
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<FlatMap> {
        unsupported(ROOT, &format!("unit struct {}", name))
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<FlatMap> {
        unsupported(ROOT, &format!("enum variant {}::{}", name, variant))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<FlatMap>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<FlatMap>
    where
        T: Serialize + ?Sized,
    {
        unsupported(ROOT, &format!("enum variant {}::{}", name, variant))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        unsupported(ROOT, "sequence")
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        unsupported(ROOT, "tuple")
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        unsupported(ROOT, &format!("tuple struct {}", name))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        unsupported(ROOT, &format!("enum variant {}::{}", name, variant))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(FieldCollector::new(self.options))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Ok(FieldCollector::new(self.options))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        unsupported(ROOT, &format!("enum variant {}::{}", name, variant))
    }
}

/// Owns the map for the top-level record.
struct FieldCollector<'o> {
    fields: FlatMap,
    pending_key: Option<String>,
    options: &'o EnvelopeOptions,
}

impl<'o> FieldCollector<'o> {
    fn new(options: &'o EnvelopeOptions) -> Self {
        Self {
            fields: FlatMap::new(),
            pending_key: None,
            options,
        }
    }
}

impl ser::SerializeStruct for FieldCollector<'_> {
    type Ok = FlatMap;
    type Error = EnvelopeError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        check_segment(self.options, None, key)?;
        capture_value(&mut self.fields, key.to_string(), value, self.options)
    }

    fn skip_field(&mut self, _key: &'static str) -> Result<()> {
        Ok(())
    }

    fn end(self) -> Result<FlatMap> {
        Ok(self.fields)
    }
}

impl ser::SerializeMap for FieldCollector<'_> {
    type Ok = FlatMap;
    type Error = EnvelopeError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.pending_key = Some(key.serialize(KeySerializer)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let key = self.pending_key.take().ok_or_else(|| {
            <EnvelopeError as ser::Error>::custom("serialize_value called before serialize_key")
        })?;
        check_segment(self.options, None, &key)?;
        capture_value(&mut self.fields, key, value, self.options)
    }

    fn end(self) -> Result<FlatMap> {
        Ok(self.fields)
    }
}

// ============================================================================
// Field values
// ============================================================================

struct ValueSerializer<'a, 'o> {
    sink: &'a mut FlatMap,
    path: String,
    options: &'o EnvelopeOptions,
}

impl<'a, 'o> ValueSerializer<'a, 'o> {
    fn store(self, value: AttributeValue) -> Result<()> {
        insert_unique(self.sink, self.path, value)
    }

    fn store_absent(self) -> Result<()> {
        match self.options.null_fields {
            NullFields::Omit => Ok(()),
            NullFields::Keep => self.store(AttributeValue::Null),
        }
    }

    fn nest(self, shape: &str) -> Result<NestedCollector<'a, 'o>> {
        let options = self.options;
        match &options.nested_fields {
            NestedFields::Reject => unsupported(&self.path, shape),
            NestedFields::JoinPath { .. } => Ok(NestedCollector {
                start_len: self.sink.len(),
                sink: self.sink,
                prefix: self.path,
                pending_key: None,
                options,
            }),
        }
    }
}

impl<'a, 'o> ser::Serializer for ValueSerializer<'a, 'o> {
    type Ok = ();
    type Error = EnvelopeError;

    type SerializeSeq = Impossible<(), EnvelopeError>;
    type SerializeTuple = Impossible<(), EnvelopeError>;
    type SerializeTupleStruct = Impossible<(), EnvelopeError>;
    type SerializeTupleVariant = Impossible<(), EnvelopeError>;
    type SerializeMap = NestedCollector<'a, 'o>;
    type SerializeStruct = NestedCollector<'a, 'o>;
    type SerializeStructVariant = NestedCollector<'a, 'o>;

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.store(AttributeValue::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.store(v.into())
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.store(v.into())
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.store(v.into())
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.store(v.into())
    }

    fn serialize_i128(self, v: i128) -> Result<()> {
        if let Ok(v) = i64::try_from(v) {
            return self.store(v.into());
        }
        match u64::try_from(v) {
            Ok(v) => self.store(v.into()),
            Err(_) => unsupported(&self.path, "integer outside 64-bit range"),
        }
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.store(v.into())
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.store(v.into())
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.store(v.into())
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.store(v.into())
    }

    fn serialize_u128(self, v: u128) -> Result<()> {
        match u64::try_from(v) {
            Ok(v) => self.store(v.into()),
            Err(_) => unsupported(&self.path, "integer outside 64-bit range"),
        }
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.store(v.into())
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.store(v.into())
    }

    fn serialize_char(self, v: char) -> Result<()> {
        self.store(AttributeValue::Text(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.store(v.into())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.store(AttributeValue::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> Result<()> {
        self.store_absent()
    }

    fn serialize_some<T>(self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    // Unit carries no data but must still be present for the field to decode.
    fn serialize_unit(self) -> Result<()> {
        self.store(AttributeValue::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        self.store(AttributeValue::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.store(variant.into())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let mut nested = self.nest("enum variant with data")?;
        nested.prefix = nested.child_path(variant)?;
        capture_value(&mut *nested.sink, nested.prefix.clone(), value, nested.options)?;
        nested.finish()
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        unsupported(&self.path, "sequence")
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        unsupported(&self.path, "tuple")
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        unsupported(&self.path, "tuple struct")
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        unsupported(&self.path, "tuple variant")
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        self.nest("map")
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        self.nest("struct")
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        let mut nested = self.nest("enum variant with data")?;
        nested.prefix = nested.child_path(variant)?;
        Ok(nested)
    }
}

/// Writes a composite value's fields into the parent map under joined names.
struct NestedCollector<'a, 'o> {
    sink: &'a mut FlatMap,
    prefix: String,
    pending_key: Option<String>,
    options: &'o EnvelopeOptions,
    start_len: usize,
}

impl NestedCollector<'_, '_> {
    fn child_path(&self, name: &str) -> Result<String> {
        check_segment(self.options, Some(self.prefix.as_str()), name)?;
        let separator = self.options.separator().unwrap_or_default();
        Ok(format!("{}{}{}", self.prefix, separator, name))
    }

    /// A composite that wrote nothing would be missing entirely on decode.
    fn finish(self) -> Result<()> {
        if self.sink.len() == self.start_len {
            return unsupported(&self.prefix, "empty composite");
        }
        Ok(())
    }
}

impl ser::SerializeStruct for NestedCollector<'_, '_> {
    type Ok = ();
    type Error = EnvelopeError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let path = self.child_path(key)?;
        capture_value(self.sink, path, value, self.options)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for NestedCollector<'_, '_> {
    type Ok = ();
    type Error = EnvelopeError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        ser::SerializeStruct::serialize_field(self, key, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeMap for NestedCollector<'_, '_> {
    type Ok = ();
    type Error = EnvelopeError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.pending_key = Some(key.serialize(KeySerializer)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let key = self.pending_key.take().ok_or_else(|| {
            <EnvelopeError as ser::Error>::custom("serialize_value called before serialize_key")
        })?;
        let path = self.child_path(&key)?;
        capture_value(self.sink, path, value, self.options)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

// ============================================================================
// Map keys
// ============================================================================

/// Turns a map key into a field name. Only string-like keys qualify.
struct KeySerializer;

macro_rules! key_to_string {
    ($($method:ident: $ty:ty),*) => {
        $(
            fn $method(self, v: $ty) -> Result<String> {
                Ok(v.to_string())
            }
        )*
    };
}

impl ser::Serializer for KeySerializer {
    type Ok = String;
    type Error = EnvelopeError;

    type SerializeSeq = Impossible<String, EnvelopeError>;
    type SerializeTuple = Impossible<String, EnvelopeError>;
    type SerializeTupleStruct = Impossible<String, EnvelopeError>;
    type SerializeTupleVariant = Impossible<String, EnvelopeError>;
    type SerializeMap = Impossible<String, EnvelopeError>;
    type SerializeStruct = Impossible<String, EnvelopeError>;
    type SerializeStructVariant = Impossible<String, EnvelopeError>;

    key_to_string! {
        serialize_i8: i8, serialize_i16: i16, serialize_i32: i32, serialize_i64: i64,
        serialize_u8: u8, serialize_u16: u16, serialize_u32: u32, serialize_u64: u64,
        serialize_char: char, serialize_str: &str
    }

    fn serialize_bool(self, _v: bool) -> Result<String> {
        unsupported("<map key>", "bool")
    }

    fn serialize_f32(self, _v: f32) -> Result<String> {
        unsupported("<map key>", "float")
    }

    fn serialize_f64(self, _v: f64) -> Result<String> {
        unsupported("<map key>", "float")
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String> {
        unsupported("<map key>", "bytes")
    }

    fn serialize_none(self) -> Result<String> {
        unsupported("<map key>", "none")
    }

    fn serialize_some<T>(self, _value: &T) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        unsupported("<map key>", "option")
    }

    fn serialize_unit(self) -> Result<String> {
        unsupported("<map key>", "unit")
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String> {
        unsupported("<map key>", "unit struct")
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        unsupported("<map key>", "enum variant with data")
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        unsupported("<map key>", "sequence")
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        unsupported("<map key>", "tuple")
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        unsupported("<map key>", "tuple struct")
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        unsupported("<map key>", "tuple variant")
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        unsupported("<map key>", "map")
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        unsupported("<map key>", "struct")
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        unsupported("<map key>", "struct variant")
    }
}
