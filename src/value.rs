use std::borrow::Cow;
use std::convert::TryFrom;
use std::fmt;
use std::ops::Index;

use serde::de::{
    self,
    value::{MapDeserializer, SeqDeserializer},
    DeserializeSeed, EnumAccess, IntoDeserializer, Unexpected, VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;

use crate::element::Category;
use crate::error::{Error, Result};
use crate::integer::{Integer, Split};

/// Any single encoded element, owned.
///
/// Decoding into a `Value` keeps the wire's own shape: raw strings stay bytes (they are not
/// required to be UTF-8), maps keep their pairs in wire order and allow any key type.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(Integer),
    F32(f32),
    F64(f64),
    Raw(Vec<u8>),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// The wire category this value encodes as. Integers report the category of the smallest
    /// unsigned-or-signed form: non-negative values are unsigned.
    pub fn category(&self) -> Category {
        match self {
            Value::Nil => Category::Nil,
            Value::Bool(_) => Category::Bool,
            Value::Int(v) => v.category(),
            Value::F32(_) => Category::Float32,
            Value::F64(_) => Category::Float64,
            Value::Raw(_) => Category::Raw,
            Value::Array(_) => Category::Array,
            Value::Map(_) => Category::Map,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Value::Raw(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Bool(v) = *self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_int(&self) -> Option<Integer> {
        if let Value::Int(v) = *self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_int().and_then(|v| v.as_i64())
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_int().and_then(|v| v.as_u64())
    }

    pub fn as_f32(&self) -> Option<f32> {
        if let Value::F32(v) = *self {
            Some(v)
        } else {
            None
        }
    }

    /// Either float width, widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F32(v) => Some(v as f64),
            Value::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&[u8]> {
        if let Value::Raw(ref v) = *self {
            Some(v)
        } else {
            None
        }
    }

    /// The raw bytes, if they are valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_raw().and_then(|v| std::str::from_utf8(v).ok())
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        if let Value::Array(ref v) = *self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        if let Value::Array(ref mut v) = *self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        if let Value::Map(ref v) = *self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Vec<(Value, Value)>> {
        if let Value::Map(ref mut v) = *self {
            Some(v)
        } else {
            None
        }
    }

    /// Value of the first map entry whose key is the raw string `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_raw() == Some(key.as_bytes()))
            .map(|(_, v)| v)
    }
}

static NIL: Value = Value::Nil;

impl Index<usize> for Value {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        self.as_array().and_then(|v| v.get(index)).unwrap_or(&NIL)
    }
}

impl Index<&str> for Value {
    type Output = Value;

    fn index(&self, index: &str) -> &Self::Output {
        self.get(index).unwrap_or(&NIL)
    }
}

macro_rules! impl_value_from_integer {
    ($t: ty) => {
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(Integer::from(v))
            }
        }
    };
}

macro_rules! impl_value_from {
    ($t: ty, $p: ident) => {
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$p(v)
            }
        }
    };
}

impl_value_from!(bool, Bool);
impl_value_from!(Integer, Int);
impl_value_from!(f32, F32);
impl_value_from!(f64, F64);
impl_value_from!(Vec<u8>, Raw);
impl_value_from!(Vec<Value>, Array);
impl_value_from!(Vec<(Value, Value)>, Map);
impl_value_from_integer!(u8);
impl_value_from_integer!(u16);
impl_value_from_integer!(u32);
impl_value_from_integer!(u64);
impl_value_from_integer!(usize);
impl_value_from_integer!(i8);
impl_value_from_integer!(i16);
impl_value_from_integer!(i32);
impl_value_from_integer!(i64);
impl_value_from_integer!(isize);

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Nil
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Raw(v.into_bytes())
    }
}

impl<'a> From<&'a str> for Value {
    fn from(v: &str) -> Self {
        Value::Raw(v.as_bytes().to_vec())
    }
}

impl<'a> From<Cow<'a, str>> for Value {
    fn from(v: Cow<'a, str>) -> Self {
        Value::from(v.into_owned())
    }
}

impl<'a> From<&'a [u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Raw(v.to_vec())
    }
}

impl<V: Into<Value>> std::iter::FromIterator<V> for Value {
    fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
        let v: Vec<Value> = iter.into_iter().map(Into::into).collect();
        Value::Array(v)
    }
}

macro_rules! impl_try_from_value {
    ($t: ty, $p: ident) => {
        impl TryFrom<Value> for $t {
            type Error = Value;
            fn try_from(v: Value) -> Result<Self, Self::Error> {
                match v {
                    Value::$p(v) => Ok(v),
                    _ => Err(v),
                }
            }
        }
    };
}

macro_rules! impl_try_from_value_integer {
    ($t: ty) => {
        impl TryFrom<Value> for $t {
            type Error = Value;
            fn try_from(v: Value) -> Result<Self, Self::Error> {
                match v {
                    Value::Int(i) => TryFrom::try_from(i).map_err(|_| v),
                    _ => Err(v),
                }
            }
        }
    };
}

impl_try_from_value!(bool, Bool);
impl_try_from_value!(f32, F32);
impl_try_from_value!(f64, F64);
impl_try_from_value!(Vec<u8>, Raw);
impl_try_from_value!(Vec<Value>, Array);
impl_try_from_value!(Vec<(Value, Value)>, Map);
impl_try_from_value_integer!(u8);
impl_try_from_value_integer!(u16);
impl_try_from_value_integer!(u32);
impl_try_from_value_integer!(u64);
impl_try_from_value_integer!(usize);
impl_try_from_value_integer!(i8);
impl_try_from_value_integer!(i16);
impl_try_from_value_integer!(i32);
impl_try_from_value_integer!(i64);
impl_try_from_value_integer!(isize);

impl TryFrom<Value> for String {
    type Error = Value;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Raw(bytes) => String::from_utf8(bytes).map_err(|e| Value::Raw(e.into_bytes())),
            _ => Err(v),
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Nil => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serde::Serialize::serialize(v, serializer),
            Value::F32(v) => serializer.serialize_f32(*v),
            Value::F64(v) => serializer.serialize_f64(*v),
            Value::Raw(v) => serializer.serialize_bytes(v),
            Value::Array(v) => serializer.collect_seq(v),
            Value::Map(v) => serializer.collect_map(v.iter().map(|(k, v)| (k, v))),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::{Deserialize, Deserializer, Error as DeError, MapAccess, SeqAccess};

        struct ValueVisitor;
        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
                fmt.write_str("any encodable value")
            }

            fn visit_bool<E: DeError>(self, v: bool) -> Result<Self::Value, E> {
                Ok(Value::Bool(v))
            }

            fn visit_i64<E: DeError>(self, v: i64) -> Result<Self::Value, E> {
                Ok(Value::Int(Integer::from(v)))
            }

            fn visit_u64<E: DeError>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Value::Int(Integer::from(v)))
            }

            fn visit_f32<E: DeError>(self, v: f32) -> Result<Self::Value, E> {
                Ok(Value::F32(v))
            }

            fn visit_f64<E: DeError>(self, v: f64) -> Result<Self::Value, E> {
                Ok(Value::F64(v))
            }

            fn visit_str<E: DeError>(self, v: &str) -> Result<Self::Value, E> {
                Ok(Value::from(v))
            }

            fn visit_string<E: DeError>(self, v: String) -> Result<Self::Value, E> {
                Ok(Value::from(v))
            }

            fn visit_bytes<E: DeError>(self, v: &[u8]) -> Result<Self::Value, E> {
                Ok(Value::Raw(v.into()))
            }

            fn visit_byte_buf<E: DeError>(self, v: Vec<u8>) -> Result<Self::Value, E> {
                Ok(Value::Raw(v))
            }

            fn visit_unit<E: DeError>(self) -> Result<Self::Value, E> {
                Ok(Value::Nil)
            }

            fn visit_none<E: DeError>(self) -> Result<Self::Value, E> {
                Ok(Value::Nil)
            }

            fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
                Value::deserialize(d)
            }

            fn visit_newtype_struct<D: Deserializer<'de>>(
                self,
                d: D,
            ) -> Result<Self::Value, D::Error> {
                Value::deserialize(d)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                // The hint comes straight from the input
                let mut seq = match access.size_hint() {
                    Some(size) => Vec::with_capacity(size.min(4096)),
                    None => Vec::new(),
                };
                while let Some(elem) = access.next_element()? {
                    seq.push(elem);
                }
                Ok(Value::Array(seq))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = match access.size_hint() {
                    Some(size) => Vec::with_capacity(size.min(4096)),
                    None => Vec::new(),
                };
                while let Some(entry) = access.next_entry()? {
                    map.push(entry);
                }
                Ok(Value::Map(map))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

fn visit_array<'de, V: Visitor<'de>>(items: Vec<Value>, visitor: V) -> Result<V::Value> {
    let mut seq = SeqDeserializer::<_, Error>::new(items.into_iter());
    let v = visitor.visit_seq(&mut seq)?;
    seq.end()?;
    Ok(v)
}

fn visit_pairs<'de, V: Visitor<'de>>(pairs: Vec<(Value, Value)>, visitor: V) -> Result<V::Value> {
    let mut map = MapDeserializer::<_, Error>::new(pairs.into_iter());
    let v = visitor.visit_map(&mut map)?;
    map.end()?;
    Ok(v)
}

/// Reads a `Value` back out as any deserializable type. Registered decode functions hand their
/// result to the target type this way.
impl<'de> de::Deserializer<'de> for Value {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Nil => visitor.visit_unit(),
            Value::Bool(v) => visitor.visit_bool(v),
            Value::Int(v) => match v.split() {
                Split::Unsigned(v) => visitor.visit_u64(v),
                Split::Negative(v) => visitor.visit_i64(v),
            },
            Value::F32(v) => visitor.visit_f32(v),
            Value::F64(v) => visitor.visit_f64(v),
            Value::Raw(v) => match String::from_utf8(v) {
                Ok(s) => visitor.visit_string(s),
                Err(e) => visitor.visit_byte_buf(e.into_bytes()),
            },
            Value::Array(v) => visit_array(v, visitor),
            Value::Map(v) => visit_pairs(v, visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Nil => visitor.visit_none(),
            v => visitor.visit_some(v),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Raw(v) => visitor.visit_byte_buf(v),
            v => v.deserialize_any(visitor),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Raw(v) => {
                let mut seq = SeqDeserializer::<_, Error>::new(v.into_iter());
                let v = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(v)
            }
            v => v.deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self {
            Value::Raw(_) | Value::Int(_) => visitor.visit_enum(EnumDeserializer {
                variant: self,
                payload: None,
            }),
            Value::Map(mut pairs) if pairs.len() == 1 => {
                let (variant, payload) = pairs.remove(0);
                visitor.visit_enum(EnumDeserializer {
                    variant,
                    payload: Some(payload),
                })
            }
            other => Err(Error::mismatch("enum", other.category())),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str string
        unit unit_struct tuple tuple_struct map struct identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, Error> for Value {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}

struct EnumDeserializer {
    variant: Value,
    payload: Option<Value>,
}

impl<'de> EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let variant = seed.deserialize(self.variant)?;
        Ok((
            variant,
            VariantDeserializer {
                payload: self.payload,
            },
        ))
    }
}

struct VariantDeserializer {
    payload: Option<Value>,
}

impl VariantDeserializer {
    fn payload(self, expected: &'static str) -> Result<Value> {
        self.payload
            .ok_or_else(|| de::Error::invalid_type(Unexpected::UnitVariant, &expected))
    }
}

impl<'de> VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.payload {
            None | Some(Value::Nil) => Ok(()),
            Some(_) => Err(de::Error::invalid_type(
                Unexpected::NewtypeVariant,
                &"unit variant",
            )),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(self.payload("newtype variant")?)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        de::Deserializer::deserialize_seq(self.payload("tuple variant")?, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        de::Deserializer::deserialize_any(self.payload("struct variant")?, visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    fn sample() -> Value {
        Value::Map(vec![
            (Value::from("name"), Value::from("sensor")),
            (Value::from("count"), Value::from(3u8)),
            (Value::from(7u8), Value::Array(vec![Value::Nil, Value::F32(1.5)])),
        ])
    }

    #[test]
    fn accessors() {
        let v = sample();
        assert_eq!(v["name"].as_str(), Some("sensor"));
        assert_eq!(v["count"].as_u64(), Some(3));
        assert_eq!(v["count"].as_i64(), Some(3));
        assert!(v["missing"].is_nil());
        assert_eq!(v.as_map().unwrap()[2].1[1].as_f64(), Some(1.5));
        assert!(v.as_map().unwrap()[2].1[7].is_nil());
        assert_eq!(Value::Raw(vec![0xff]).as_str(), None);
        assert_eq!(Value::Raw(vec![0xff]).as_raw(), Some(&[0xff][..]));
    }

    #[test]
    fn categories() {
        assert_eq!(Value::from(-1i8).category(), Category::SignedInt);
        assert_eq!(Value::from(1i8).category(), Category::UnsignedInt);
        assert_eq!(Value::F32(0.0).category(), Category::Float32);
        assert_eq!(sample().category(), Category::Map);
        assert_eq!(Value::default().category(), Category::Nil);
    }

    #[test]
    fn conversions() {
        assert_eq!(u8::try_from(Value::from(200u64)), Ok(200u8));
        assert!(u8::try_from(Value::from(-1i64)).is_err());
        assert_eq!(String::try_from(Value::from("hi")), Ok("hi".to_string()));
        assert_eq!(
            String::try_from(Value::Raw(vec![0xc0])),
            Err(Value::Raw(vec![0xc0]))
        );
        let list: Value = vec![1u8, 2, 3].into_iter().collect();
        assert_eq!(list.as_array().map(|a| a.len()), Some(3));
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Shape {
        Empty,
        Circle(f64),
        Rect { w: u32, h: u32 },
        Pair(i8, i8),
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Drawing {
        title: String,
        shapes: Vec<Shape>,
        tag: Option<u16>,
    }

    #[test]
    fn deserialize_from_value() {
        let v = Value::Map(vec![
            (Value::from("title"), Value::from("sketch")),
            (
                Value::from("shapes"),
                Value::Array(vec![
                    Value::from("Empty"),
                    Value::Map(vec![(Value::from("Circle"), Value::F64(2.0))]),
                    Value::Map(vec![(
                        Value::from("Rect"),
                        Value::Map(vec![
                            (Value::from("w"), Value::from(3u8)),
                            (Value::from("h"), Value::from(4u8)),
                        ]),
                    )]),
                    Value::Map(vec![(
                        Value::from("Pair"),
                        Value::Array(vec![Value::from(-1i8), Value::from(1i8)]),
                    )]),
                ]),
            ),
            (Value::from("tag"), Value::Nil),
        ]);
        let drawing = Drawing::deserialize(v).unwrap();
        assert_eq!(
            drawing,
            Drawing {
                title: "sketch".into(),
                shapes: vec![
                    Shape::Empty,
                    Shape::Circle(2.0),
                    Shape::Rect { w: 3, h: 4 },
                    Shape::Pair(-1, 1)
                ],
                tag: None,
            }
        );
    }

    #[test]
    fn raw_as_sequence() {
        let bytes = Vec::<u8>::deserialize(Value::Raw(vec![1, 2, 3])).unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
        let buf = serde_bytes::ByteBuf::deserialize(Value::Raw(vec![9])).unwrap();
        assert_eq!(buf.into_vec(), vec![9]);
    }

    #[test]
    fn mismatch_reports_category() {
        let err = String::deserialize(Value::from(5u8)).unwrap_err();
        assert!(matches!(err, Error::SerdeFail(_)));
        let err = Shape::deserialize(Value::Bool(true)).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                found: Category::Bool,
                ..
            }
        ));
    }

    #[test]
    fn through_the_codec() {
        let v = sample();
        let enc = crate::marshal(&v).unwrap();
        let back: Value = crate::unmarshal(&enc).unwrap();
        assert_eq!(back, v);
    }
}
