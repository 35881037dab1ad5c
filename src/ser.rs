//! Serialization.
//!
//! Enum variants, when mapped, are:
//! - Unit - Just the variant name as a raw
//! - Newtype - Map with one pair. Key is variant name, content is the value
//! - Tuple - Map with one pair. Key is variant name, content is the tuple as an array
//! - Struct - Map with one pair. Key is variant name, content is the struct
//!
//! Structs, newtype structs, tuple structs, and unit structs are first looked up in the
//! encoder's [`Registry`](crate::Registry) by their serde name.

use serde::ser::*;

use crate::coder::CODER_NAME;
use crate::encode::Encoder;
use crate::error::{Error, Result};
use crate::registry::Entry;
use crate::value::Value;

impl<'a, 'w> Serializer for &'a mut Encoder<'w> {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = SeqSerializer<'a, 'w>;
    type SerializeTuple = Compound<'a, 'w>;
    type SerializeTupleStruct = TupleStructSerializer<'a, 'w>;
    type SerializeTupleVariant = Compound<'a, 'w>;
    type SerializeMap = MapSerializer<'a, 'w>;
    type SerializeStruct = StructSerializer<'a, 'w>;
    type SerializeStructVariant = Compound<'a, 'w>;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.encode_bool(v)
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.encode_i64(v as i64)
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.encode_i64(v as i64)
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.encode_i64(v as i64)
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.encode_i64(v)
    }

    fn serialize_i128(self, _: i128) -> Result<()> {
        Err(Error::Unsupported("i128"))
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.encode_u64(v as u64)
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.encode_u64(v as u64)
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.encode_u64(v as u64)
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.encode_u64(v)
    }

    fn serialize_u128(self, _: u128) -> Result<()> {
        Err(Error::Unsupported("u128"))
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.encode_f32(v)
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.encode_f64(v)
    }

    fn serialize_char(self, v: char) -> Result<()> {
        self.encode_str(v.encode_utf8(&mut [0u8; 4]))
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.encode_str(v)
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.encode_bytes(v)
    }

    fn serialize_none(self) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_some<T: Serialize + ?Sized>(self, v: &T) -> Result<()> {
        v.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        self.encode_nil()
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<()> {
        match self.registered(name) {
            Some(entry) => (entry.encode)(self, &Value::Nil),
            None => self.serialize_unit(),
        }
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        v: &T,
    ) -> Result<()> {
        if name == CODER_NAME {
            return match self.capture(v)? {
                Value::Raw(bytes) => self.write(&bytes),
                other => Err(Error::SerdeFail(format!(
                    "pre-encoded value must be bytes, got {}",
                    other.category()
                ))),
            };
        }
        match self.registered(name) {
            Some(entry) => {
                let captured = self.capture(v)?;
                (entry.encode)(self, &captured)
            }
            None => v.serialize(self),
        }
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()> {
        self.encode_map_len(1)?;
        self.encode_str(variant)?;
        value.serialize(self)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        SeqSerializer::new(self, len)
    }

    fn serialize_tuple(self, len: usize) -> Result<Compound<'a, 'w>> {
        self.encode_array_len(len)?;
        Ok(Compound { enc: self })
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        if let Some(entry) = self.registered(name) {
            return Ok(TupleStructSerializer::Registered {
                enc: self,
                entry,
                items: Vec::with_capacity(len.min(4096)),
            });
        }
        self.encode_array_len(len)?;
        Ok(TupleStructSerializer::Plain(self))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.encode_map_len(1)?;
        self.encode_str(variant)?;
        self.encode_array_len(len)?;
        Ok(Compound { enc: self })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap> {
        MapSerializer::new(self, len)
    }

    fn serialize_struct(self, name: &'static str, len: usize) -> Result<Self::SerializeStruct> {
        if let Some(entry) = self.registered(name) {
            return Ok(StructSerializer::Registered {
                enc: self,
                entry,
                pairs: Vec::with_capacity(len.min(4096)),
            });
        }
        self.encode_map_len(len)?;
        Ok(StructSerializer::Plain(self))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.encode_map_len(1)?;
        self.encode_str(variant)?;
        self.encode_map_len(len)?;
        Ok(Compound { enc: self })
    }

    fn collect_seq<I>(self, iter: I) -> Result<()>
    where
        I: IntoIterator,
        <I as IntoIterator>::Item: Serialize,
    {
        let iter = iter.into_iter();
        match iter.size_hint() {
            (lo, Some(hi)) if lo == hi => {
                self.encode_array_len(lo)?;
                let mut count = 0;
                for item in iter {
                    item.serialize(&mut *self)?;
                    count += 1;
                }
                if count != lo {
                    return Err(Error::SerdeFail(format!(
                        "sequence announced {} items but yielded {}",
                        lo, count
                    )));
                }
                Ok(())
            }
            _ => {
                let items: Vec<I::Item> = iter.collect();
                self.encode_array_len(items.len())?;
                for item in items.iter() {
                    item.serialize(&mut *self)?;
                }
                Ok(())
            }
        }
    }

    fn collect_map<K, V, I>(self, iter: I) -> Result<()>
    where
        K: Serialize,
        V: Serialize,
        I: IntoIterator<Item = (K, V)>,
    {
        let iter = iter.into_iter();
        match iter.size_hint() {
            (lo, Some(hi)) if lo == hi => {
                self.encode_map_len(lo)?;
                let mut count = 0;
                for (k, v) in iter {
                    k.serialize(&mut *self)?;
                    v.serialize(&mut *self)?;
                    count += 1;
                }
                if count != lo {
                    return Err(Error::SerdeFail(format!(
                        "map announced {} entries but yielded {}",
                        lo, count
                    )));
                }
                Ok(())
            }
            _ => {
                let entries: Vec<(K, V)> = iter.collect();
                self.encode_map_len(entries.len())?;
                for (k, v) in entries.iter() {
                    k.serialize(&mut *self)?;
                    v.serialize(&mut *self)?;
                }
                Ok(())
            }
        }
    }
}

/// Encode a sequence of possibly unknown length.
///
/// If the length is known, the array header goes out first and every element is written
/// straight through. If not, the elements are encoded into a side buffer by a forked encoder,
/// and on `end()` the header with the final count is written, followed by the buffer.
pub struct SeqSerializer<'a, 'w> {
    enc: &'a mut Encoder<'w>,
    unknown_len: Option<(usize, Vec<u8>)>,
}

impl<'a, 'w> SeqSerializer<'a, 'w> {
    fn new(enc: &'a mut Encoder<'w>, len: Option<usize>) -> Result<Self> {
        let unknown_len = match len {
            Some(len) => {
                enc.encode_array_len(len)?;
                None
            }
            None => Some((0, Vec::new())),
        };
        Ok(Self { enc, unknown_len })
    }
}

impl<'a, 'w> SerializeSeq for SeqSerializer<'a, 'w> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        match self.unknown_len {
            Some((ref mut len, ref mut buf)) => {
                *len += 1;
                value.serialize(&mut self.enc.fork(buf))
            }
            None => value.serialize(&mut *self.enc),
        }
    }

    fn end(self) -> Result<()> {
        if let Some((len, buf)) = self.unknown_len {
            self.enc.encode_array_len(len)?;
            if !buf.is_empty() {
                self.enc.write(&buf)?;
            }
        }
        Ok(())
    }
}

/// Encode a map of possibly unknown length. Works the same way as [`SeqSerializer`], counting
/// keys.
pub struct MapSerializer<'a, 'w> {
    enc: &'a mut Encoder<'w>,
    unknown_len: Option<(usize, Vec<u8>)>,
}

impl<'a, 'w> MapSerializer<'a, 'w> {
    fn new(enc: &'a mut Encoder<'w>, len: Option<usize>) -> Result<Self> {
        let unknown_len = match len {
            Some(len) => {
                enc.encode_map_len(len)?;
                None
            }
            None => Some((0, Vec::new())),
        };
        Ok(Self { enc, unknown_len })
    }

    fn serialize_any<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        match self.unknown_len {
            Some((_, ref mut buf)) => value.serialize(&mut self.enc.fork(buf)),
            None => value.serialize(&mut *self.enc),
        }
    }
}

impl<'a, 'w> SerializeMap for MapSerializer<'a, 'w> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<()> {
        if let Some((ref mut len, _)) = self.unknown_len {
            *len += 1;
        }
        self.serialize_any(key)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.serialize_any(value)
    }

    fn end(self) -> Result<()> {
        if let Some((len, buf)) = self.unknown_len {
            self.enc.encode_map_len(len)?;
            if !buf.is_empty() {
                self.enc.write(&buf)?;
            }
        }
        Ok(())
    }
}

/// Elements and fields whose container header has already been written.
pub struct Compound<'a, 'w> {
    enc: &'a mut Encoder<'w>,
}

impl<'a, 'w> SerializeTuple for Compound<'a, 'w> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.enc)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a, 'w> SerializeTupleVariant for Compound<'a, 'w> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.enc)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a, 'w> SerializeStructVariant for Compound<'a, 'w> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.enc.encode_str(key)?;
        value.serialize(&mut *self.enc)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

/// A tuple struct, either written directly or gathered up for its registered encoder.
pub enum TupleStructSerializer<'a, 'w> {
    Plain(&'a mut Encoder<'w>),
    Registered {
        enc: &'a mut Encoder<'w>,
        entry: Entry,
        items: Vec<Value>,
    },
}

impl<'a, 'w> SerializeTupleStruct for TupleStructSerializer<'a, 'w> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        match self {
            TupleStructSerializer::Plain(enc) => value.serialize(&mut **enc),
            TupleStructSerializer::Registered { enc, items, .. } => {
                items.push(enc.capture(value)?);
                Ok(())
            }
        }
    }

    fn end(self) -> Result<()> {
        match self {
            TupleStructSerializer::Plain(_) => Ok(()),
            TupleStructSerializer::Registered { enc, entry, items } => {
                (entry.encode)(enc, &Value::Array(items))
            }
        }
    }
}

/// A struct, either written directly as a map of field names to values, or gathered up for its
/// registered encoder.
pub enum StructSerializer<'a, 'w> {
    Plain(&'a mut Encoder<'w>),
    Registered {
        enc: &'a mut Encoder<'w>,
        entry: Entry,
        pairs: Vec<(Value, Value)>,
    },
}

impl<'a, 'w> SerializeStruct for StructSerializer<'a, 'w> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        match self {
            StructSerializer::Plain(enc) => {
                enc.encode_str(key)?;
                value.serialize(&mut **enc)
            }
            StructSerializer::Registered { enc, pairs, .. } => {
                pairs.push((Value::from(key), enc.capture(value)?));
                Ok(())
            }
        }
    }

    fn end(self) -> Result<()> {
        match self {
            StructSerializer::Plain(_) => Ok(()),
            StructSerializer::Registered { enc, entry, pairs } => {
                (entry.encode)(enc, &Value::Map(pairs))
            }
        }
    }
}
