//! Deserialization.
//!
//! Each destination type asks for the category it wants, and anything else on the wire is a
//! [`TypeMismatch`](crate::Error::TypeMismatch). Integer destinations take either signedness and
//! leave range checks to the destination. Sequences also accept a raw, one element per byte.
//!
//! Struct keys are resolved through the [field cache](crate::fields). Structs, newtype structs,
//! tuple structs, and unit structs with a registered decode function are read by that function
//! instead.

use serde::de::value::{
    BorrowedStrDeserializer, BytesDeserializer, SeqDeserializer, StringDeserializer,
};
use serde::de::*;
use serde::de::Error as DeError;

use crate::decode::Decoder;
use crate::element::Element;
use crate::error::{Error, Result};
use crate::fields::{self, Fields};
use crate::marker::Marker;

use std::sync::Arc;

/// Keys up to this length are resolved against a field table without allocating.
const KEY_STACK: usize = 64;

impl<'r> Decoder<'r> {
    fn visit_raw<'de, V: Visitor<'de>>(&mut self, len: usize, visitor: V) -> Result<V::Value> {
        let bytes = self.read_payload(len)?;
        match String::from_utf8(bytes) {
            Ok(s) => visitor.visit_string(s),
            Err(e) => visitor.visit_byte_buf(e.into_bytes()),
        }
    }

    fn visit_string<'de, V: Visitor<'de>>(&mut self, len: usize, visitor: V) -> Result<V::Value> {
        let bytes = self.read_payload(len)?;
        let s = String::from_utf8(bytes)
            .map_err(|e| Error::BadEncode(format!("raw is not UTF-8: {}", e)))?;
        visitor.visit_string(s)
    }

    fn visit_raw_as_seq<'de, V: Visitor<'de>>(
        &mut self,
        len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        let bytes = self.read_payload(len)?;
        let mut seq = SeqDeserializer::<_, Error>::new(bytes.into_iter());
        let v = visitor.visit_seq(&mut seq)?;
        seq.end()?;
        Ok(v)
    }

    /// Hand an array to the visitor, which must take every element.
    fn visit_array<'de, V: Visitor<'de>>(&mut self, len: usize, visitor: V) -> Result<V::Value> {
        let mut seq = SeqAccess::new(self, len);
        let v = visitor.visit_seq(&mut seq)?;
        if seq.size_left != 0 {
            return Err(Error::invalid_length(len, &"fewer elements in array"));
        }
        Ok(v)
    }

    /// Hand a map to the visitor, which must take every entry.
    fn visit_map<'de, V: Visitor<'de>>(
        &mut self,
        len: usize,
        fields: Option<Arc<Fields>>,
        visitor: V,
    ) -> Result<V::Value> {
        let mut map = MapAccess::new(self, len, fields);
        let v = visitor.visit_map(&mut map)?;
        if map.size_left != 0 {
            return Err(Error::invalid_length(len, &"fewer elements in map"));
        }
        Ok(v)
    }
}

impl<'de, 'a, 'r> serde::Deserializer<'de> for &'a mut Decoder<'r> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_element()? {
            Element::Nil => visitor.visit_unit(),
            Element::Bool(v) => visitor.visit_bool(v),
            Element::Uint(v) => visitor.visit_u64(v),
            Element::Int(v) => visitor.visit_i64(v),
            Element::F32(v) => visitor.visit_f32(v),
            Element::F64(v) => visitor.visit_f64(v),
            Element::Raw(len) => self.visit_raw(len, visitor),
            Element::Array(len) => self.visit_array(len, visitor),
            Element::Map(len) => self.visit_map(len, None, visitor),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_element()? {
            Element::Bool(v) => visitor.visit_bool(v),
            elem => Err(Error::mismatch("Bool", elem.category())),
        }
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_element()? {
            Element::Uint(v) => visitor.visit_u64(v),
            Element::Int(v) => visitor.visit_i64(v),
            elem => Err(Error::mismatch("integer", elem.category())),
        }
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_element()? {
            Element::F32(v) => visitor.visit_f32(v),
            Element::F64(v) => visitor.visit_f32(v as f32),
            elem => Err(Error::mismatch("float", elem.category())),
        }
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_element()? {
            Element::F32(v) => visitor.visit_f64(v as f64),
            Element::F64(v) => visitor.visit_f64(v),
            elem => Err(Error::mismatch("float", elem.category())),
        }
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_string(visitor)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_element()? {
            Element::Raw(len) => self.visit_string(len, visitor),
            elem => Err(Error::mismatch("Raw", elem.category())),
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_element()? {
            Element::Raw(len) => visitor.visit_byte_buf(self.read_payload(len)?),
            Element::Array(len) => self.visit_array(len, visitor),
            elem => Err(Error::mismatch("Raw", elem.category())),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.peek_marker()? == Marker::Nil {
            self.next_element()?;
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_element()? {
            Element::Nil => visitor.visit_unit(),
            elem => Err(Error::mismatch("Nil", elem.category())),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        match self.registered(name) {
            Some(entry) => (entry.decode)(self)?.deserialize_unit_struct(name, visitor),
            None => self.deserialize_unit(visitor),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        match self.registered(name) {
            Some(entry) => visitor.visit_newtype_struct((entry.decode)(self)?),
            None => visitor.visit_newtype_struct(self),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_element()? {
            Element::Array(len) => self.visit_array(len, visitor),
            Element::Raw(len) => self.visit_raw_as_seq(len, visitor),
            elem => Err(Error::mismatch("Array", elem.category())),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        match self.registered(name) {
            Some(entry) => (entry.decode)(self)?.deserialize_tuple_struct(name, len, visitor),
            None => self.deserialize_seq(visitor),
        }
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_element()? {
            Element::Map(len) => self.visit_map(len, None, visitor),
            elem => Err(Error::mismatch("Map", elem.category())),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        if let Some(entry) = self.registered(name) {
            return (entry.decode)(self)?.deserialize_struct(name, fields, visitor);
        }
        match self.next_element()? {
            Element::Map(len) => {
                let fields = fields::fields_of(name, fields);
                self.visit_map(len, Some(fields), visitor)
            }
            Element::Array(len) => self.visit_array(len, visitor),
            elem => Err(Error::mismatch("Map", elem.category())),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_enum(EnumAccess::new(self))
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_element()? {
            Element::Raw(len) => self.visit_raw(len, visitor),
            Element::Uint(v) => visitor.visit_u64(v),
            elem => Err(Error::mismatch("identifier", elem.category())),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_any(visitor)
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

struct EnumAccess<'a, 'r> {
    de: &'a mut Decoder<'r>,
    has_value: bool,
}

impl<'a, 'r> EnumAccess<'a, 'r> {
    fn new(de: &'a mut Decoder<'r>) -> Self {
        Self {
            de,
            has_value: false,
        }
    }
}

impl<'de, 'a, 'r> serde::de::EnumAccess<'de> for EnumAccess<'a, 'r> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V>(mut self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: DeserializeSeed<'de>,
    {
        let val = match self.de.peek_marker()? {
            Marker::FixMap(_) | Marker::Map16 | Marker::Map32 => {
                let len = self.de.decode_map_len()?;
                if len != 1 {
                    return Err(Error::SerdeFail(format!(
                        "expected a map with one entry for an enum, found {} entries",
                        len
                    )));
                }
                self.has_value = true;
                seed.deserialize(&mut *self.de)?
            }
            Marker::FixRaw(_) | Marker::Raw16 | Marker::Raw32 => {
                self.has_value = false;
                seed.deserialize(&mut *self.de)?
            }
            _ => {
                let elem = self.de.next_element()?;
                return Err(Error::mismatch("enum", elem.category()));
            }
        };
        Ok((val, self))
    }
}

impl<'de, 'a, 'r> serde::de::VariantAccess<'de> for EnumAccess<'a, 'r> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        if self.has_value {
            self.de.decode_nil()
        } else {
            Ok(())
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        if self.has_value {
            seed.deserialize(&mut *self.de)
        } else {
            Err(Error::SerdeFail(
                "invalid type: unit variant, expected newtype variant".to_string(),
            ))
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if self.has_value {
            serde::Deserializer::deserialize_map(&mut *self.de, visitor)
        } else {
            Err(Error::SerdeFail(
                "invalid type: unit variant, expected struct variant".to_string(),
            ))
        }
    }

    fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if self.has_value {
            serde::Deserializer::deserialize_tuple(&mut *self.de, len, visitor)
        } else {
            Err(Error::SerdeFail(
                "invalid type: unit variant, expected tuple variant".to_string(),
            ))
        }
    }
}

struct SeqAccess<'a, 'r> {
    de: &'a mut Decoder<'r>,
    size_left: usize,
}

impl<'a, 'r> SeqAccess<'a, 'r> {
    fn new(de: &'a mut Decoder<'r>, len: usize) -> Self {
        Self { de, size_left: len }
    }
}

impl<'de, 'a, 'r> serde::de::SeqAccess<'de> for SeqAccess<'a, 'r> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        if self.size_left > 0 {
            self.size_left -= 1;
            let val = seed.deserialize(&mut *self.de)?;
            Ok(Some(val))
        } else {
            Ok(None)
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.size_left)
    }
}

struct MapAccess<'a, 'r> {
    de: &'a mut Decoder<'r>,
    size_left: usize,
    fields: Option<Arc<Fields>>,
}

impl<'a, 'r> MapAccess<'a, 'r> {
    fn new(de: &'a mut Decoder<'r>, len: usize, fields: Option<Arc<Fields>>) -> Self {
        Self {
            de,
            size_left: len,
            fields,
        }
    }

    /// Resolve a raw key against the struct's field table. Known names are handed over as the
    /// table's own `&'static str`.
    fn field_key<'de, K>(&mut self, fields: &Fields, seed: K) -> Result<K::Value>
    where
        K: DeserializeSeed<'de>,
    {
        let len = match self.de.next_element()? {
            Element::Raw(len) => len,
            elem => return Err(Error::mismatch("Raw", elem.category())),
        };
        let key = if len <= fields.longest().min(KEY_STACK) {
            let mut buf = [0u8; KEY_STACK];
            let key = &mut buf[..len];
            self.de.read_payload_into(key)?;
            if let Some(name) = fields.resolve(key) {
                return seed.deserialize(BorrowedStrDeserializer::<Error>::new(name));
            }
            key.to_vec()
        } else {
            let key = self.de.read_payload(len)?;
            if let Some(name) = fields.resolve(&key) {
                return seed.deserialize(BorrowedStrDeserializer::<Error>::new(name));
            }
            key
        };
        match String::from_utf8(key) {
            Ok(s) => seed.deserialize(StringDeserializer::<Error>::new(s)),
            Err(e) => seed.deserialize(BytesDeserializer::<Error>::new(e.as_bytes())),
        }
    }
}

impl<'de, 'a, 'r> serde::de::MapAccess<'de> for MapAccess<'a, 'r> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        if self.size_left == 0 {
            return Ok(None);
        }
        self.size_left -= 1;
        if let Some(fields) = self.fields.clone() {
            if matches!(
                self.de.peek_marker()?,
                Marker::FixRaw(_) | Marker::Raw16 | Marker::Raw32
            ) {
                return self.field_key(&fields, seed).map(Some);
            }
        }
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.de)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.size_left)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::element::Category;
    use crate::value::Value;
    use serde::{Deserialize, Serialize};
    use std::collections::{BTreeMap, HashMap};

    fn roundtrip<T>(v: &T) -> T
    where
        T: Serialize + DeserializeOwned,
    {
        let enc = crate::marshal(v).unwrap();
        crate::unmarshal(&enc).unwrap()
    }

    mod structs {
        use super::*;

        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        #[allow(non_snake_case)]
        struct Record {
            A: i32,
            B: String,
        }

        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        struct Nested {
            name: String,
            #[serde(rename = "rec")]
            record: Record,
            tags: Vec<String>,
            lookup: BTreeMap<String, u32>,
            maybe: Option<Box<Nested>>,
            #[serde(with = "serde_bytes")]
            blob: Vec<u8>,
            ratio: f32,
            unit: (),
        }

        fn nested() -> Nested {
            let mut lookup = BTreeMap::new();
            lookup.insert("one".to_string(), 1);
            lookup.insert("big".to_string(), 1 << 20);
            Nested {
                name: "outer".into(),
                record: Record {
                    A: -70000,
                    B: "b".into(),
                },
                tags: vec!["x".into(), "".into()],
                lookup,
                maybe: Some(Box::new(Nested {
                    name: "inner".into(),
                    record: Record {
                        A: 0,
                        B: "".into(),
                    },
                    tags: vec![],
                    lookup: BTreeMap::new(),
                    maybe: None,
                    blob: vec![],
                    ratio: 0.0,
                    unit: (),
                })),
                blob: vec![0, 1, 2, 255],
                ratio: 0.5,
                unit: (),
            }
        }

        #[test]
        fn record_bytes() {
            let data = [0x82, 0xa1, b'A', 0x01, 0xa1, b'B', 0xa1, b'x'];
            let r: Record = crate::unmarshal(&data).unwrap();
            assert_eq!(
                r,
                Record {
                    A: 1,
                    B: "x".into()
                }
            );
        }

        #[test]
        fn nested_roundtrip() {
            let v = nested();
            assert_eq!(roundtrip(&v), v);
        }

        #[test]
        fn key_order_and_unknown_keys() {
            // B before A, plus an unknown key with a nested value
            let data = [
                0x83, 0xa1, b'B', 0xa1, b'y', 0xa1, b'Z', 0x91, 0xc0, 0xa1, b'A', 0xd0, 0x80,
            ];
            let r: Record = crate::unmarshal(&data).unwrap();
            assert_eq!(
                r,
                Record {
                    A: -128,
                    B: "y".into()
                }
            );
        }

        #[test]
        fn missing_field() {
            let data = [0x81, 0xa1, b'A', 0x01];
            let err = crate::unmarshal::<Record>(&data).unwrap_err();
            assert!(matches!(err, Error::SerdeFail(_)));
        }

        #[test]
        fn from_array() {
            let data = [0x92, 0x05, 0xa1, b'q'];
            let r: Record = crate::unmarshal(&data).unwrap();
            assert_eq!(r.A, 5);
            assert_eq!(r.B, "q");
        }

        #[test]
        fn array_longer_than_struct() {
            let data = [0x93, 0x05, 0xa1, b'q', 0x07];
            let err = crate::unmarshal::<Record>(&data).unwrap_err();
            assert!(matches!(err, Error::SerdeFail(_)), "{}", err);
        }

        #[derive(Debug, PartialEq, Deserialize)]
        struct Long {
            #[serde(rename = "a_field_name_well_past_sixty_four_bytes_so_it_cannot_fit_on_the_stack")]
            long: u8,
            short: u8,
        }

        #[test]
        fn keys_of_every_length() {
            let long_name =
                b"a_field_name_well_past_sixty_four_bytes_so_it_cannot_fit_on_the_stack";
            let mut data = vec![0x84, 0xa5];
            data.extend_from_slice(b"short");
            data.push(0x01);
            // Unknown, not UTF-8, and no longer than the longest field
            data.extend_from_slice(&[0xa2, 0xff, 0xfe, 0xc0]);
            // Unknown and longer than every field
            data.push(0xda);
            data.extend_from_slice(&(long_name.len() as u16 + 1).to_be_bytes());
            data.extend_from_slice(long_name);
            data.push(b'x');
            data.push(0xc3);
            data.push(0xda);
            data.extend_from_slice(&(long_name.len() as u16).to_be_bytes());
            data.extend_from_slice(long_name);
            data.push(0x02);
            let v: Long = crate::unmarshal(&data).unwrap();
            assert_eq!(v, Long { long: 2, short: 1 });

            // A key cut short inside the stack buffer
            let err = crate::unmarshal::<Long>(&[0x81, 0xa5, b's', b'h']).unwrap_err();
            assert!(err.is_truncated());
        }

        #[derive(Debug)]
        struct FirstEntry(String, u8);

        impl<'de> Deserialize<'de> for FirstEntry {
            fn deserialize<D>(d: D) -> std::result::Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                struct FirstVisitor;

                impl<'de> Visitor<'de> for FirstVisitor {
                    type Value = FirstEntry;

                    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                        f.write_str("a map")
                    }

                    fn visit_map<A>(self, mut map: A) -> std::result::Result<FirstEntry, A::Error>
                    where
                        A: serde::de::MapAccess<'de>,
                    {
                        let (k, v) = map
                            .next_entry()?
                            .ok_or_else(|| A::Error::custom("empty map"))?;
                        Ok(FirstEntry(k, v))
                    }
                }

                d.deserialize_map(FirstVisitor)
            }
        }

        #[test]
        fn map_entries_left_unread() {
            let one = [0x81, 0xa1, b'a', 0x01];
            let FirstEntry(k, v) = crate::unmarshal(&one).unwrap();
            assert_eq!((k.as_str(), v), ("a", 1));
            let two = [0x82, 0xa1, b'a', 0x01, 0xa1, b'b', 0x02];
            let err = crate::unmarshal::<FirstEntry>(&two).unwrap_err();
            assert!(matches!(err, Error::SerdeFail(_)), "{}", err);
        }

        #[test]
        fn field_cache_populated() {
            let _ = roundtrip(&Record {
                A: 1,
                B: "c".into(),
            });
            let fields = fields::lookup("Record").unwrap();
            assert_eq!(fields.names(), &["A", "B"]);
        }

        #[test]
        fn wrong_category() {
            let data = [0x92, 0xa1, b'A', 0x01];
            let err = crate::unmarshal::<HashMap<String, u8>>(&data).unwrap_err();
            assert!(matches!(
                err,
                Error::TypeMismatch {
                    expected: "Map",
                    found: Category::Array
                }
            ));
            let data = [0xa1, b'A'];
            let err = crate::unmarshal::<Record>(&data).unwrap_err();
            assert!(matches!(
                err,
                Error::TypeMismatch {
                    expected: "Map",
                    found: Category::Raw
                }
            ));
        }
    }

    mod enums {
        use super::*;

        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        enum Op {
            Stop,
            Go(u8),
            Move(i8, i8),
            Turn { deg: u16 },
        }

        #[test]
        fn variants() {
            for op in [Op::Stop, Op::Go(3), Op::Move(-1, 2), Op::Turn { deg: 400 }] {
                assert_eq!(roundtrip(&op), op);
            }
        }

        #[test]
        fn bad_shapes() {
            let err = crate::unmarshal::<Op>(&[0x05]).unwrap_err();
            assert!(matches!(
                err,
                Error::TypeMismatch {
                    expected: "enum",
                    found: Category::UnsignedInt
                }
            ));
            let err = crate::unmarshal::<Op>(&[0x80]).unwrap_err();
            assert!(matches!(err, Error::SerdeFail(_)));
            let err = crate::unmarshal::<Op>(&[0xa4, b'S', b'k', b'i', b'p']).unwrap_err();
            assert!(matches!(err, Error::SerdeFail(_)));
        }

        #[test]
        fn unit_variant_with_nil_payload() {
            let data = [0x81, 0xa4, b'S', b't', b'o', b'p', 0xc0];
            assert_eq!(crate::unmarshal::<Op>(&data).unwrap(), Op::Stop);
            let value: Value = crate::unmarshal(&data).unwrap();
            assert_eq!(Op::deserialize(value).unwrap(), Op::Stop);

            let data = [0x81, 0xa4, b'S', b't', b'o', b'p', 0x01];
            let err = crate::unmarshal::<Op>(&data).unwrap_err();
            assert!(matches!(
                err,
                Error::TypeMismatch {
                    expected: "Nil",
                    found: Category::UnsignedInt
                }
            ));
            let value: Value = crate::unmarshal(&data).unwrap();
            assert!(Op::deserialize(value).is_err());
        }
    }

    mod scalars {
        use super::*;

        #[test]
        fn integer_ranges() {
            assert_eq!(crate::unmarshal::<u8>(&[0xd1, 0x00, 0xc8]).unwrap(), 200);
            assert_eq!(crate::unmarshal::<i8>(&[0xcc, 0x7f]).unwrap(), 127);
            assert!(crate::unmarshal::<u8>(&[0xcd, 0x01, 0x00]).is_err());
            assert!(crate::unmarshal::<u32>(&[0xff]).is_err());
            let err = crate::unmarshal::<u8>(&[0xc3]).unwrap_err();
            assert!(matches!(
                err,
                Error::TypeMismatch {
                    expected: "integer",
                    found: Category::Bool
                }
            ));
        }

        #[test]
        fn floats() {
            let enc = crate::marshal(&1.5f32).unwrap();
            assert_eq!(crate::unmarshal::<f64>(&enc).unwrap(), 1.5);
            let enc = crate::marshal(&2.25f64).unwrap();
            assert_eq!(crate::unmarshal::<f32>(&enc).unwrap(), 2.25);
            assert!(crate::unmarshal::<f64>(&[0x01]).is_err());
        }

        #[test]
        fn strings() {
            assert_eq!(roundtrip(&'é'), 'é');
            assert_eq!(roundtrip(&"hello".to_string()), "hello");
            let err = crate::unmarshal::<String>(&[0xa2, 0xc3, 0x28]).unwrap_err();
            assert!(matches!(err, Error::BadEncode(_)));
        }

        #[test]
        fn bytes_and_sequences() {
            let raw = [0xa3, 1, 2, 3];
            let seq: Vec<u8> = crate::unmarshal(&raw).unwrap();
            assert_eq!(seq, vec![1, 2, 3]);
            let buf: serde_bytes::ByteBuf = crate::unmarshal(&raw).unwrap();
            assert_eq!(buf.into_vec(), vec![1, 2, 3]);
            let arr = [0x92, 4, 5];
            let buf: serde_bytes::ByteBuf = crate::unmarshal(&arr).unwrap();
            assert_eq!(buf.into_vec(), vec![4, 5]);
        }

        #[test]
        fn sequences_read_to_the_end() {
            let data = [0x93, 1, 2, 3, 0x04];
            let mut src = &data[..];
            let mut dec = Decoder::new(&mut src);
            assert!(dec.decode::<(u8, u8)>().is_err());

            assert!(crate::unmarshal::<[u8; 2]>(&[0x93, 1, 2, 3]).is_err());
            assert_eq!(crate::unmarshal::<[u8; 3]>(&[0x93, 1, 2, 3]).unwrap(), [1, 2, 3]);
            assert_eq!(crate::unmarshal::<(u8, u8)>(&[0x92, 1, 2]).unwrap(), (1, 2));
            // Too few is serde's own length error
            assert!(crate::unmarshal::<(u8, u8)>(&[0x91, 1]).is_err());
        }

        #[test]
        fn options() {
            assert_eq!(roundtrip(&Some(Some(3u8))), Some(Some(3u8)));
            assert_eq!(roundtrip(&None::<String>), None);
            assert_eq!(crate::unmarshal::<Option<u8>>(&[0x09]).unwrap(), Some(9));
        }
    }

    mod values {
        use super::*;

        #[test]
        fn generic_shapes() {
            let data = [
                0x83, 0x01, 0xa1, b'a', 0xa1, 0xff, 0xc2, 0xc0, 0x92, 0xcb, 0x3f, 0xf0, 0, 0, 0,
                0, 0, 0, 0xd0, 0x80,
            ];
            let v: Value = crate::unmarshal(&data).unwrap();
            assert_eq!(
                v,
                Value::Map(vec![
                    (Value::from(1u8), Value::from("a")),
                    (Value::Raw(vec![0xff]), Value::Bool(false)),
                    (
                        Value::Nil,
                        Value::Array(vec![Value::F64(1.0), Value::from(-128i64)])
                    ),
                ])
            );
        }

        #[test]
        fn widened_integers() {
            let enc = crate::marshal(&200i32).unwrap();
            let v: Value = crate::unmarshal(&enc).unwrap();
            assert_eq!(v.as_u64(), Some(200));
        }
    }
}
