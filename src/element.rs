//! Wire format rules: choosing the tag and length prefix for each value, and reading them back.
//!
//! An [`Element`] is one tag plus its fixed-width field. Raw payloads and container contents
//! are not part of the element; the encoder and decoder move those separately.

use std::fmt;
use std::io::Read;

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};

use crate::error::{Error, Result};
use crate::marker::Marker;

/// Largest length a raw, array, or map prefix can announce.
pub const MAX_LEN: usize = u32::MAX as usize;

/// The category a tag falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Nil,
    Bool,
    SignedInt,
    UnsignedInt,
    Float32,
    Float64,
    Raw,
    Array,
    Map,
}

impl Category {
    pub fn name(&self) -> &'static str {
        use self::Category::*;
        match self {
            Nil => "Nil",
            Bool => "Bool",
            SignedInt => "SignedInt",
            UnsignedInt => "UnsignedInt",
            Float32 => "Float32",
            Float64 => "Float64",
            Raw => "Raw",
            Array => "Array",
            Map => "Map",
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Category::SignedInt | Category::UnsignedInt)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which thresholds to use when picking a tag for a signed integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum IntPolicy {
    /// Signed values only ever use the inline or signed tags. A positive value of 128 or more
    /// takes at least the 16-bit signed form.
    #[default]
    Compatible,
    /// Non-negative signed values are encoded with the unsigned rules.
    Compact,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Element {
    Nil,
    Bool(bool),
    Uint(u64),
    Int(i64),
    F32(f32),
    F64(f64),
    /// Raw header; the payload of this many bytes follows.
    Raw(usize),
    /// Array header; this many elements follow.
    Array(usize),
    /// Map header; this many key/value pairs follow.
    Map(usize),
}

impl Element {
    pub fn category(&self) -> Category {
        match *self {
            Element::Nil => Category::Nil,
            Element::Bool(_) => Category::Bool,
            Element::Uint(_) => Category::UnsignedInt,
            Element::Int(_) => Category::SignedInt,
            Element::F32(_) => Category::Float32,
            Element::F64(_) => Category::Float64,
            Element::Raw(_) => Category::Raw,
            Element::Array(_) => Category::Array,
            Element::Map(_) => Category::Map,
        }
    }

    /// Read the rest of an element whose tag byte has already been consumed.
    pub fn read_after(marker: Marker, r: &mut dyn Read) -> Result<Element> {
        use self::Marker::*;
        let width = marker.field_width();
        let elem = match marker {
            Reserved(n) => {
                return Err(Error::BadEncode(format!("unrecognized tag 0x{:02x}", n)))
            }
            Nil => Element::Nil,
            False => Element::Bool(false),
            True => Element::Bool(true),
            PosFixInt(v) => Element::Uint(v as u64),
            NegFixInt(v) => Element::Int(v as i64),
            FixRaw(len) => Element::Raw(len as usize),
            FixArray(len) => Element::Array(len as usize),
            FixMap(len) => Element::Map(len as usize),
            UInt8 => Element::Uint(
                r.read_u8()
                    .map_err(|e| Error::read("decode UInt8", width, e))? as u64,
            ),
            UInt16 => Element::Uint(
                r.read_u16::<BigEndian>()
                    .map_err(|e| Error::read("decode UInt16", width, e))? as u64,
            ),
            UInt32 => Element::Uint(
                r.read_u32::<BigEndian>()
                    .map_err(|e| Error::read("decode UInt32", width, e))? as u64,
            ),
            UInt64 => Element::Uint(
                r.read_u64::<BigEndian>()
                    .map_err(|e| Error::read("decode UInt64", width, e))?,
            ),
            Int8 => Element::Int(
                r.read_i8()
                    .map_err(|e| Error::read("decode Int8", width, e))? as i64,
            ),
            Int16 => Element::Int(
                r.read_i16::<BigEndian>()
                    .map_err(|e| Error::read("decode Int16", width, e))? as i64,
            ),
            Int32 => Element::Int(
                r.read_i32::<BigEndian>()
                    .map_err(|e| Error::read("decode Int32", width, e))? as i64,
            ),
            Int64 => Element::Int(
                r.read_i64::<BigEndian>()
                    .map_err(|e| Error::read("decode Int64", width, e))?,
            ),
            F32 => Element::F32(
                r.read_f32::<BigEndian>()
                    .map_err(|e| Error::read("decode F32", width, e))?,
            ),
            F64 => Element::F64(
                r.read_f64::<BigEndian>()
                    .map_err(|e| Error::read("decode F64", width, e))?,
            ),
            Raw16 => Element::Raw(
                r.read_u16::<BigEndian>()
                    .map_err(|e| Error::read("decode Raw16 length", width, e))? as usize,
            ),
            Raw32 => Element::Raw(
                r.read_u32::<BigEndian>()
                    .map_err(|e| Error::read("decode Raw32 length", width, e))? as usize,
            ),
            Array16 => Element::Array(
                r.read_u16::<BigEndian>()
                    .map_err(|e| Error::read("decode Array16 length", width, e))?
                    as usize,
            ),
            Array32 => Element::Array(
                r.read_u32::<BigEndian>()
                    .map_err(|e| Error::read("decode Array32 length", width, e))?
                    as usize,
            ),
            Map16 => Element::Map(
                r.read_u16::<BigEndian>()
                    .map_err(|e| Error::read("decode Map16 length", width, e))? as usize,
            ),
            Map32 => Element::Map(
                r.read_u32::<BigEndian>()
                    .map_err(|e| Error::read("decode Map32 length", width, e))? as usize,
            ),
        };
        Ok(elem)
    }
}

/// The encoded tag and fixed-width field of one element, at most 9 bytes.
#[derive(Clone, Copy, Debug)]
pub struct Header {
    buf: [u8; 9],
    len: usize,
}

impl Header {
    fn tag(marker: Marker) -> Self {
        let mut buf = [0u8; 9];
        buf[0] = marker.into();
        Header { buf, len: 1 }
    }

    fn with_u8(marker: Marker, v: u8) -> Self {
        let mut h = Header::tag(marker);
        h.buf[1] = v;
        h.len = 2;
        h
    }

    fn with_u16(marker: Marker, v: u16) -> Self {
        let mut h = Header::tag(marker);
        BigEndian::write_u16(&mut h.buf[1..3], v);
        h.len = 3;
        h
    }

    fn with_u32(marker: Marker, v: u32) -> Self {
        let mut h = Header::tag(marker);
        BigEndian::write_u32(&mut h.buf[1..5], v);
        h.len = 5;
        h
    }

    fn with_u64(marker: Marker, v: u64) -> Self {
        let mut h = Header::tag(marker);
        BigEndian::write_u64(&mut h.buf[1..9], v);
        h.len = 9;
        h
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

fn uint_header(v: u64) -> Header {
    if v < 128 {
        Header::tag(Marker::PosFixInt(v as u8))
    } else if v < 256 {
        Header::with_u8(Marker::UInt8, v as u8)
    } else if v < 65536 {
        Header::with_u16(Marker::UInt16, v as u16)
    } else if v < 4294967296 {
        Header::with_u32(Marker::UInt32, v as u32)
    } else {
        Header::with_u64(Marker::UInt64, v)
    }
}

fn int_header(v: i64, policy: IntPolicy) -> Header {
    if policy == IntPolicy::Compact && v >= 0 {
        return uint_header(v as u64);
    }
    if !(-2147483648..2147483648).contains(&v) {
        Header::with_u64(Marker::Int64, v as u64)
    } else if !(-32768..32768).contains(&v) {
        Header::with_u32(Marker::Int32, v as u32)
    } else if !(-128..128).contains(&v) {
        Header::with_u16(Marker::Int16, v as u16)
    } else if v < -32 {
        Header::with_u8(Marker::Int8, v as u8)
    } else {
        Header::tag(Marker::from_u8(v as u8))
    }
}

fn len_header(
    len: usize,
    fix: fn(u8) -> Marker,
    fix_max: usize,
    m16: Marker,
    m32: Marker,
) -> Result<Header> {
    if len > MAX_LEN {
        return Err(Error::LengthTooLong {
            max: MAX_LEN,
            actual: len,
        });
    }
    Ok(if len < fix_max {
        Header::tag(fix(len as u8))
    } else if len < 65536 {
        Header::with_u16(m16, len as u16)
    } else {
        Header::with_u32(m32, len as u32)
    })
}

/// Pick the narrowest tag for an element and encode it with its fixed-width field.
pub fn encode_header(elem: Element, policy: IntPolicy) -> Result<Header> {
    Ok(match elem {
        Element::Nil => Header::tag(Marker::Nil),
        Element::Bool(v) => Header::tag(if v { Marker::True } else { Marker::False }),
        Element::Uint(v) => uint_header(v),
        Element::Int(v) => int_header(v, policy),
        Element::F32(v) => Header::with_u32(Marker::F32, v.to_bits()),
        Element::F64(v) => Header::with_u64(Marker::F64, v.to_bits()),
        Element::Raw(len) => len_header(len, Marker::FixRaw, 32, Marker::Raw16, Marker::Raw32)?,
        Element::Array(len) => {
            len_header(len, Marker::FixArray, 16, Marker::Array16, Marker::Array32)?
        }
        Element::Map(len) => len_header(len, Marker::FixMap, 16, Marker::Map16, Marker::Map32)?,
    })
}
