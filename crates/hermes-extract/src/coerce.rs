//! Lenient coercion of string pairs into typed values.
//!
//! Path parameters, query strings and headers arrive as ordered string pairs.
//! A [`CoercionTable`] knows, for one target type, which kind of value each
//! field expects. It turns the pairs into a JSON object with numbers, booleans
//! and arrays where the target wants them, which serde then deserializes.
//!
//! The table is derived by driving the target's `Deserialize` impl once with a
//! recording deserializer. Derive it once per type (at route registration) and
//! reuse it for every request.
//!
//! ```
//! use hermes_extract::{CoercionTable, FieldKind};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize, PartialEq)]
//! struct ListParams {
//!     ids: Vec<u32>,
//!     limit: Option<u32>,
//!     verbose: bool,
//! }
//!
//! let table = CoercionTable::of::<ListParams>();
//! assert_eq!(table.kind("limit"), Some(&FieldKind::Unsigned));
//!
//! let pairs = vec![
//!     ("ids".to_string(), "1".to_string()),
//!     ("ids".to_string(), "2".to_string()),
//!     ("limit".to_string(), "10".to_string()),
//!     ("verbose".to_string(), "true".to_string()),
//! ];
//! let params: ListParams = table.bind(&pairs).unwrap();
//! assert_eq!(params, ListParams { ids: vec![1, 2], limit: Some(10), verbose: true });
//! ```

use serde::de::{
    self, value::StrDeserializer, DeserializeOwned, DeserializeSeed, Deserializer,
    IntoDeserializer, MapAccess, SeqAccess, Visitor,
};
use serde_json::{Map, Number, Value};
use std::fmt;

/// Nesting depth past which the recorder stops descending.
const MAX_DEPTH: usize = 8;

/// The kind of value a field expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// `bool`.
    Bool,
    /// Signed integers.
    Integer,
    /// Unsigned integers.
    Unsigned,
    /// `f32` / `f64`.
    Float,
    /// Strings, chars and unit enums.
    Text,
    /// Sequences of the inner kind.
    Sequence(Box<FieldKind>),
    /// Structs and maps.
    Object,
    /// Anything the recorder could not classify.
    Unknown,
}

impl FieldKind {
    fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Shape {
    Struct(Vec<(&'static str, FieldKind)>),
    Map,
    Tuple(Vec<FieldKind>),
    Scalar(FieldKind),
    Unit,
}

/// Field kinds for one target type.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionTable {
    type_name: &'static str,
    shape: Shape,
}

impl CoercionTable {
    /// Derives the table for `T`.
    #[must_use]
    pub fn of<T: DeserializeOwned>() -> Self {
        let mut shape = Shape::Scalar(FieldKind::Unknown);
        let mut skip = 0;
        loop {
            let mut cursor = None;
            let result = T::deserialize(ShapeRecorder {
                shape: &mut shape,
                skip,
                cursor: &mut cursor,
            });
            // A field whose value the target rejects aborts the pass; resume after it.
            match (result, cursor) {
                (Err(_), Some(next)) if next > skip => skip = next,
                _ => break,
            }
        }
        Self {
            type_name: std::any::type_name::<T>(),
            shape,
        }
    }

    /// Returns the target type's name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the kind recorded for a struct field.
    #[must_use]
    pub fn kind(&self, field: &str) -> Option<&FieldKind> {
        match &self.shape {
            Shape::Struct(fields) => fields.iter().find(|(n, _)| *n == field).map(|(_, k)| k),
            _ => None,
        }
    }

    /// Iterates over recorded struct fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &FieldKind)> {
        let fields: &[(&'static str, FieldKind)] = match &self.shape {
            Shape::Struct(fields) => fields,
            _ => &[],
        };
        fields.iter().map(|(n, k)| (*n, k))
    }

    /// Converts ordered pairs into a JSON value shaped for the target.
    ///
    /// Repeated keys collect into arrays for sequence fields; scalar fields
    /// take the first value. Values that do not parse as the expected kind
    /// stay strings so deserialization reports the precise type error.
    #[must_use]
    pub fn coerce(&self, pairs: &[(String, String)]) -> Value {
        match &self.shape {
            Shape::Struct(_) | Shape::Map => {
                let mut object = Map::new();
                for (key, values) in group(pairs) {
                    let kind = self.kind(key).unwrap_or(&FieldKind::Unknown);
                    object.insert(key.to_string(), coerce_values(kind, &values));
                }
                Value::Object(object)
            }
            Shape::Tuple(kinds) => Value::Array(
                pairs
                    .iter()
                    .enumerate()
                    .map(|(i, (_, v))| coerce_one(kinds.get(i).unwrap_or(&FieldKind::Unknown), v))
                    .collect(),
            ),
            Shape::Scalar(FieldKind::Sequence(inner)) if inner.is_sequence() => Value::Array(
                pairs
                    .iter()
                    .map(|(k, v)| Value::Array(vec![Value::from(k.as_str()), Value::from(v.as_str())]))
                    .collect(),
            ),
            Shape::Scalar(kind) => {
                let values: Vec<&str> = pairs.iter().map(|(_, v)| v.as_str()).collect();
                if values.is_empty() {
                    Value::Null
                } else {
                    coerce_values(kind, &values)
                }
            }
            Shape::Unit => Value::Null,
        }
    }

    /// Coerces the pairs and deserializes them into `T`.
    pub fn bind<T: DeserializeOwned>(&self, pairs: &[(String, String)]) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.coerce(pairs))
    }
}

/// Groups values by key, keeping first-seen key order.
fn group(pairs: &[(String, String)]) -> Vec<(&str, Vec<&str>)> {
    let mut grouped: Vec<(&str, Vec<&str>)> = Vec::new();
    for (key, value) in pairs {
        match grouped.iter_mut().find(|(k, _)| *k == key.as_str()) {
            Some((_, values)) => values.push(value.as_str()),
            None => grouped.push((key.as_str(), vec![value.as_str()])),
        }
    }
    grouped
}

fn coerce_values(kind: &FieldKind, values: &[&str]) -> Value {
    match (kind, values) {
        (FieldKind::Sequence(inner), _) => {
            Value::Array(values.iter().map(|v| coerce_one(inner, v)).collect())
        }
        (FieldKind::Unknown, [single]) => Value::from(*single),
        (FieldKind::Unknown, _) => Value::Array(values.iter().map(|v| Value::from(*v)).collect()),
        (_, [first, ..]) => coerce_one(kind, first),
        (_, []) => Value::Null,
    }
}

fn coerce_one(kind: &FieldKind, raw: &str) -> Value {
    let coerced = match kind {
        FieldKind::Bool => match raw {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        FieldKind::Integer => raw.parse::<i64>().ok().map(Value::from),
        FieldKind::Unsigned => raw.parse::<u64>().ok().map(Value::from),
        FieldKind::Float => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        FieldKind::Object => serde_json::from_str::<Value>(raw)
            .ok()
            .filter(Value::is_object),
        FieldKind::Sequence(inner) => Some(Value::Array(vec![coerce_one(inner, raw)])),
        FieldKind::Text | FieldKind::Unknown => None,
    };
    coerced.unwrap_or_else(|| Value::from(raw))
}

#[derive(Debug)]
struct RecordError(String);

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl RecordError {
    fn msg(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl std::error::Error for RecordError {}

impl de::Error for RecordError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

fn name_deserializer(name: &'static str) -> StrDeserializer<'static, RecordError> {
    name.into_deserializer()
}

/// Records the top-level shape of the target.
struct ShapeRecorder<'a> {
    shape: &'a mut Shape,
    skip: usize,
    cursor: &'a mut Option<usize>,
}

impl ShapeRecorder<'_> {
    fn scalar<'de, V, F>(self, record: F, visitor: V) -> Result<V::Value, RecordError>
    where
        V: Visitor<'de>,
        F: FnOnce(KindRecorder<'_>, V) -> Result<V::Value, RecordError>,
    {
        let mut kind = FieldKind::Unknown;
        let result = record(KindRecorder::new(&mut kind, 0), visitor);
        *self.shape = Shape::Scalar(kind);
        result
    }
}

macro_rules! forward_scalar {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
                self.scalar(|r, v| r.$method(v), visitor)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for ShapeRecorder<'_> {
    type Error = RecordError;

    forward_scalar! {
        deserialize_bool deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_i128 deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
        deserialize_u128 deserialize_f32 deserialize_f64 deserialize_char deserialize_str
        deserialize_string deserialize_bytes deserialize_byte_buf deserialize_seq
        deserialize_identifier deserialize_any
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        visitor.visit_some(self)
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        *self.shape = Shape::Unit;
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, RecordError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, RecordError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, RecordError> {
        let mut kinds = Vec::with_capacity(len);
        let result = visitor.visit_seq(TupleWalker {
            kinds: &mut kinds,
            remaining: len,
        });
        *self.shape = Shape::Tuple(kinds);
        result
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, RecordError> {
        self.deserialize_tuple(len, visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        *self.shape = Shape::Map;
        visitor.visit_map(EmptyMap)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, RecordError> {
        if !matches!(self.shape, Shape::Struct(_)) {
            *self.shape = Shape::Struct(fields.iter().map(|f| (*f, FieldKind::Unknown)).collect());
        }
        let Shape::Struct(recorded) = self.shape else {
            return Err(RecordError::msg("struct shape not recorded"));
        };
        let mut kinds: Vec<FieldKind> = recorded.iter().map(|(_, k)| k.clone()).collect();
        let mut position = self.skip;
        let result = visitor.visit_map(FieldWalker {
            fields,
            kinds: &mut kinds,
            cursor: &mut position,
            depth: 1,
        });
        for ((_, slot), kind) in recorded.iter_mut().zip(kinds) {
            *slot = kind;
        }
        *self.cursor = Some(position);
        result
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, RecordError> {
        self.scalar(|r, v| r.deserialize_enum(name, variants, v), visitor)
    }
}

/// Records the kind of one value into `slot`.
struct KindRecorder<'a> {
    slot: &'a mut FieldKind,
    depth: usize,
}

impl<'a> KindRecorder<'a> {
    fn new(slot: &'a mut FieldKind, depth: usize) -> Self {
        Self { slot, depth }
    }

    fn record(self, kind: FieldKind) {
        *self.slot = kind;
    }
}

impl<'de> Deserializer<'de> for KindRecorder<'_> {
    type Error = RecordError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.record(FieldKind::Unknown);
        visitor.visit_str("")
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.record(FieldKind::Bool);
        visitor.visit_bool(false)
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.record(FieldKind::Integer);
        visitor.visit_i64(1)
    }

    fn deserialize_i128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.record(FieldKind::Unsigned);
        visitor.visit_u64(1)
    }

    fn deserialize_u128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.record(FieldKind::Float);
        visitor.visit_f64(1.0)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.record(FieldKind::Text);
        visitor.visit_char('a')
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.record(FieldKind::Text);
        visitor.visit_str("")
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.record(FieldKind::Text);
        visitor.visit_bytes(b"")
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        if self.depth >= MAX_DEPTH {
            return visitor.visit_none();
        }
        visitor.visit_some(self)
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.record(FieldKind::Unknown);
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, RecordError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, RecordError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        let mut inner = FieldKind::Unknown;
        let result = visitor.visit_seq(OneElement {
            slot: Some(&mut inner),
            depth: self.depth + 1,
        });
        *self.slot = FieldKind::Sequence(Box::new(inner));
        result
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, RecordError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, RecordError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        self.record(FieldKind::Object);
        visitor.visit_map(EmptyMap)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, RecordError> {
        let depth = self.depth;
        self.record(FieldKind::Object);
        if depth >= MAX_DEPTH {
            return visitor.visit_map(EmptyMap);
        }
        let mut kinds = vec![FieldKind::Unknown; fields.len()];
        let mut cursor = 0;
        visitor.visit_map(FieldWalker {
            fields,
            kinds: &mut kinds,
            cursor: &mut cursor,
            depth: depth + 1,
        })
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, RecordError> {
        self.record(FieldKind::Text);
        let first = variants
            .first()
            .ok_or_else(|| RecordError::msg("enum has no variants"))?;
        visitor.visit_enum(name_deserializer(first))
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        visitor.visit_str("")
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, RecordError> {
        visitor.visit_unit()
    }
}

/// Yields every declared field of a struct, recording each value's kind.
struct FieldWalker<'a> {
    fields: &'static [&'static str],
    kinds: &'a mut [FieldKind],
    cursor: &'a mut usize,
    depth: usize,
}

impl<'de> MapAccess<'de> for FieldWalker<'_> {
    type Error = RecordError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, RecordError> {
        match self.fields.get(*self.cursor) {
            Some(name) => seed.deserialize(name_deserializer(name)).map(Some),
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, RecordError> {
        let index = *self.cursor;
        *self.cursor += 1;
        let slot = self
            .kinds
            .get_mut(index)
            .ok_or_else(|| RecordError::msg("value requested without a key"))?;
        seed.deserialize(KindRecorder::new(slot, self.depth))
    }
}

/// A map with no entries.
struct EmptyMap;

impl<'de> MapAccess<'de> for EmptyMap {
    type Error = RecordError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        _seed: K,
    ) -> Result<Option<K::Value>, RecordError> {
        Ok(None)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        _seed: V,
    ) -> Result<V::Value, RecordError> {
        Err(RecordError::msg("empty map has no values"))
    }
}

/// A sequence with one recorded element.
struct OneElement<'a> {
    slot: Option<&'a mut FieldKind>,
    depth: usize,
}

impl<'de> SeqAccess<'de> for OneElement<'_> {
    type Error = RecordError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, RecordError> {
        match self.slot.take() {
            Some(slot) if self.depth < MAX_DEPTH => {
                seed.deserialize(KindRecorder::new(slot, self.depth)).map(Some)
            }
            _ => Ok(None),
        }
    }
}

/// Records each element of a fixed-length tuple.
struct TupleWalker<'a> {
    kinds: &'a mut Vec<FieldKind>,
    remaining: usize,
}

impl<'de> SeqAccess<'de> for TupleWalker<'_> {
    type Error = RecordError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, RecordError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        self.kinds.push(FieldKind::Unknown);
        match self.kinds.last_mut() {
            Some(slot) => seed.deserialize(KindRecorder::new(slot, 1)).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;
    use std::num::NonZeroU32;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Order {
        Asc,
        Desc,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Nested {
        inner: u8,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Everything {
        flag: bool,
        delta: i32,
        count: u64,
        ratio: f64,
        name: String,
        tags: Vec<String>,
        ids: Option<Vec<u32>>,
        order: Option<Order>,
        nested: Option<Nested>,
        extra: HashMap<String, String>,
    }

    #[test]
    fn test_kinds_recorded() {
        let table = CoercionTable::of::<Everything>();
        assert_eq!(table.kind("flag"), Some(&FieldKind::Bool));
        assert_eq!(table.kind("delta"), Some(&FieldKind::Integer));
        assert_eq!(table.kind("count"), Some(&FieldKind::Unsigned));
        assert_eq!(table.kind("ratio"), Some(&FieldKind::Float));
        assert_eq!(table.kind("name"), Some(&FieldKind::Text));
        assert_eq!(
            table.kind("tags"),
            Some(&FieldKind::Sequence(Box::new(FieldKind::Text)))
        );
        assert_eq!(
            table.kind("ids"),
            Some(&FieldKind::Sequence(Box::new(FieldKind::Unsigned)))
        );
        assert_eq!(table.kind("order"), Some(&FieldKind::Text));
        assert_eq!(table.kind("nested"), Some(&FieldKind::Object));
        assert_eq!(table.kind("extra"), Some(&FieldKind::Object));
        assert_eq!(table.fields().count(), 10);
    }

    #[test]
    fn test_rejected_field_does_not_hide_later_fields() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Strict {
            #[serde(deserialize_with = "always_fails")]
            first: String,
            second: u16,
        }

        fn always_fails<'de, D: de::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
            let _ = String::deserialize(d)?;
            Err(de::Error::custom("nope"))
        }

        let table = CoercionTable::of::<Strict>();
        assert_eq!(table.kind("first"), Some(&FieldKind::Text));
        assert_eq!(table.kind("second"), Some(&FieldKind::Unsigned));
    }

    #[test]
    fn test_repeated_keys_bind_sequence() {
        #[derive(Debug, Deserialize)]
        struct Q {
            ids: Vec<u32>,
        }
        let q: Q = CoercionTable::of::<Q>()
            .bind(&pairs(&[("ids", "1"), ("ids", "2")]))
            .unwrap();
        assert_eq!(q.ids, vec![1, 2]);
    }

    #[test]
    fn test_single_value_binds_sequence() {
        #[derive(Debug, Deserialize)]
        struct Q {
            ids: Vec<u32>,
        }
        let q: Q = CoercionTable::of::<Q>().bind(&pairs(&[("ids", "7")])).unwrap();
        assert_eq!(q.ids, vec![7]);
    }

    #[test]
    fn test_repeated_scalar_takes_first() {
        #[derive(Debug, Deserialize)]
        struct Q {
            limit: u32,
        }
        let q: Q = CoercionTable::of::<Q>()
            .bind(&pairs(&[("limit", "10"), ("limit", "99")]))
            .unwrap();
        assert_eq!(q.limit, 10);
    }

    #[test]
    fn test_uncoercible_value_reports_type_error() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Q {
            limit: u32,
        }
        let table = CoercionTable::of::<Q>();
        assert_eq!(table.coerce(&pairs(&[("limit", "ten")]))["limit"], "ten");
        let err = table.bind::<Q>(&pairs(&[("limit", "ten")])).unwrap_err();
        assert!(err.to_string().contains("invalid type"));
    }

    #[test]
    fn test_unknown_fields_stay_strings() {
        let table = CoercionTable::of::<HashMap<String, Value>>();
        let value = table.coerce(&pairs(&[("a", "1"), ("b", "x"), ("b", "y")]));
        assert_eq!(value["a"], "1");
        assert_eq!(value["b"], serde_json::json!(["x", "y"]));
    }

    #[test]
    fn test_booleans_and_floats() {
        #[derive(Debug, Deserialize)]
        struct Q {
            on: bool,
            ratio: f32,
            off: Option<bool>,
        }
        let q: Q = CoercionTable::of::<Q>()
            .bind(&pairs(&[("on", "true"), ("ratio", "0.5"), ("off", "false")]))
            .unwrap();
        assert!(q.on);
        assert!((q.ratio - 0.5).abs() < f32::EPSILON);
        assert_eq!(q.off, Some(false));
    }

    #[test]
    fn test_scalar_and_tuple_targets() {
        let id: u64 = CoercionTable::of::<u64>().bind(&pairs(&[("id", "42")])).unwrap();
        assert_eq!(id, 42);

        let (org, n): (String, i32) = CoercionTable::of::<(String, i32)>()
            .bind(&pairs(&[("org", "acme"), ("n", "-3")]))
            .unwrap();
        assert_eq!((org.as_str(), n), ("acme", -3));

        let all: Vec<(String, String)> = CoercionTable::of::<Vec<(String, String)>>()
            .bind(&pairs(&[("a", "1"), ("a", "2")]))
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_unit_and_newtype() {
        assert_eq!(CoercionTable::of::<()>().coerce(&pairs(&[("x", "1")])), Value::Null);

        #[derive(Debug, Deserialize, PartialEq)]
        struct UserId(NonZeroU32);
        #[derive(Debug, Deserialize)]
        struct P {
            id: UserId,
        }
        let table = CoercionTable::of::<P>();
        assert_eq!(table.kind("id"), Some(&FieldKind::Unsigned));
        let p: P = table.bind(&pairs(&[("id", "9")])).unwrap();
        assert_eq!(p.id.0.get(), 9);
    }

    #[test]
    fn test_recursive_type_terminates() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Node {
            value: u8,
            children: Vec<Node>,
            parent: Option<Box<Node>>,
        }
        let table = CoercionTable::of::<Node>();
        assert_eq!(table.kind("value"), Some(&FieldKind::Unsigned));
        assert_eq!(table.kind("parent"), Some(&FieldKind::Object));
    }
}
