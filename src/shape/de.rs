//! `serde::Deserializer` for [`Shape`].

use super::core::{Shape, ShapeError};
use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{IntoDeserializer, Visitor};
use serde::forward_to_deserialize_any;
use std::collections::BTreeMap;

/// Parse a string leaf into the primitive the visitor asks for.
macro_rules! deserialize_parsed {
    ($($method:ident => $visit:ident as $expected:literal),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ShapeError> {
                match self {
                    Shape::String(s) => match s.trim().parse() {
                        Ok(parsed) => visitor.$visit(parsed),
                        Err(_) => Err(ShapeError::Parse {
                            value: s,
                            expected: $expected,
                        }),
                    },
                    other => other.deserialize_any(visitor),
                }
            }
        )*
    };
}

impl<'de> serde::Deserializer<'de> for Shape {
    type Error = ShapeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ShapeError> {
        match self {
            Shape::Null => visitor.visit_unit(),
            Shape::String(s) => visitor.visit_string(s),
            Shape::List(items) => {
                let mut seq: SeqDeserializer<_, ShapeError> = SeqDeserializer::new(items.into_iter());
                let value = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(value)
            }
            Shape::Map(map) => visit_map(map, visitor),
        }
    }

    deserialize_parsed! {
        deserialize_bool => visit_bool as "boolean",
        deserialize_i8 => visit_i8 as "integer",
        deserialize_i16 => visit_i16 as "integer",
        deserialize_i32 => visit_i32 as "integer",
        deserialize_i64 => visit_i64 as "integer",
        deserialize_i128 => visit_i128 as "integer",
        deserialize_u8 => visit_u8 as "unsigned integer",
        deserialize_u16 => visit_u16 as "unsigned integer",
        deserialize_u32 => visit_u32 as "unsigned integer",
        deserialize_u64 => visit_u64 as "unsigned integer",
        deserialize_u128 => visit_u128 as "unsigned integer",
        deserialize_f32 => visit_f32 as "number",
        deserialize_f64 => visit_f64 as "number",
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ShapeError> {
        match self {
            Shape::Null => visitor.visit_none(),
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ShapeError> {
        match self {
            Shape::Null => visitor.visit_unit(),
            Shape::String(s) if s.is_empty() => visitor.visit_unit(),
            Shape::Map(map) if map.is_empty() => visitor.visit_unit(),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ShapeError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ShapeError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ShapeError> {
        match self {
            Shape::Null => Shape::List(Vec::new()).deserialize_any(visitor),
            Shape::String(s) => Shape::List(vec![Shape::String(s)]).deserialize_any(visitor),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, ShapeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, ShapeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ShapeError> {
        match self {
            Shape::Null => visit_map(BTreeMap::new(), visitor),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ShapeError> {
        match self {
            Shape::Null => visit_map(BTreeMap::new(), visitor),
            Shape::Map(map) => {
                let map = map
                    .into_iter()
                    .map(|(key, value)| (field_name(fields, key), value))
                    .collect();
                visit_map(map, visitor)
            }
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ShapeError> {
        match self {
            Shape::String(s) => visitor.visit_enum(s.into_deserializer()),
            other => other.deserialize_any(visitor),
        }
    }

    forward_to_deserialize_any! {
        char str string bytes byte_buf identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, ShapeError> for Shape {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

fn visit_map<'de, V: Visitor<'de>>(
    map: BTreeMap<String, Shape>,
    visitor: V,
) -> Result<V::Value, ShapeError> {
    let mut access: MapDeserializer<'de, _, ShapeError> = MapDeserializer::new(map.into_iter());
    let value = visitor.visit_map(&mut access)?;
    access.end()?;
    Ok(value)
}

/// Exact field name when declared, otherwise the declared field that matches
/// ignoring ASCII case, otherwise the key unchanged.
fn field_name(fields: &'static [&'static str], key: String) -> String {
    if fields.contains(&key.as_str()) {
        return key;
    }
    fields
        .iter()
        .find(|field| field.eq_ignore_ascii_case(&key))
        .map(|field| (*field).to_string())
        .unwrap_or(key)
}
