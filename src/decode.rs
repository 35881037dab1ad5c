//! The decoding half of the codec.
//!
//! A [`Decoder`] pulls bytes from a caller-supplied source one element at a time. It never reads
//! ahead further than the next tag byte, so values written back to back can be decoded back to
//! back from the same source.

use std::convert::TryFrom;
use std::io::Read;
use std::sync::Arc;

use byteorder::ReadBytesExt;
use serde::de::{DeserializeOwned, Error as DeError, Unexpected};
use serde::Deserialize;

use crate::config::Config;
use crate::depth_tracking::DepthTracker;
use crate::element::Element;
use crate::error::{Error, Result};
use crate::marker::Marker;
use crate::registry::{Entry, Registry};
use crate::timestamp::Timestamp;
use crate::value::Value;

/// Upper bound on what is reserved up front for a payload or container, whatever length the
/// input claims. Anything larger grows as the data actually arrives.
pub(crate) const PREALLOC_LIMIT: usize = 4096;

/// Reads values from a source in the raw-type MessagePack format.
///
/// ```
/// use rawpack::Decoder;
/// let data = [0xd1, 0x00, 0xc8, 0x92, 0xa1, b'A', 0x01];
/// let mut src = &data[..];
/// let mut dec = Decoder::new(&mut src);
/// assert_eq!(dec.decode_i64().unwrap(), 200);
/// let pair: (String, u8) = dec.decode().unwrap();
/// assert_eq!(pair, ("A".to_string(), 1));
/// ```
pub struct Decoder<'r> {
    r: &'r mut dyn Read,
    registry: Arc<Registry>,
    config: Config,
    depth_tracking: DepthTracker,
    peeked: Option<u8>,
}

impl<'r> Decoder<'r> {
    /// A decoder using the shared default registry.
    pub fn new(r: &'r mut dyn Read) -> Self {
        Self::with_registry(r, Registry::shared())
    }

    pub fn with_registry(r: &'r mut dyn Read, registry: Arc<Registry>) -> Self {
        let config = Config::default();
        Self {
            r,
            registry,
            config,
            depth_tracking: DepthTracker::new(config.get_max_depth()),
            peeked: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self.depth_tracking = DepthTracker::new(config.get_max_depth());
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn registered(&self, name: &str) -> Option<Entry> {
        if self.registry.is_empty() {
            None
        } else {
            self.registry.get(name).copied()
        }
    }

    /// Look at the next tag without consuming it.
    pub(crate) fn peek_marker(&mut self) -> Result<Marker> {
        let byte = match self.peeked {
            Some(byte) => byte,
            None => {
                let byte = self
                    .r
                    .read_u8()
                    .map_err(|e| Error::read("read tag", 1, e))?;
                self.peeked = Some(byte);
                byte
            }
        };
        Ok(Marker::from_u8(byte))
    }

    /// Read one tag and its fixed-width field. Raw payloads are left in the source.
    pub(crate) fn next_element(&mut self) -> Result<Element> {
        let marker = self.peek_marker()?;
        self.peeked = None;
        let elem = Element::read_after(marker, &mut *self.r)?;
        self.depth_tracking.update_elem(&elem)?;
        Ok(elem)
    }

    /// Read a raw payload whose header has already been consumed.
    pub(crate) fn read_payload(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(len.min(PREALLOC_LIMIT));
        let actual = Read::take(&mut *self.r, len as u64).read_to_end(&mut buf)?;
        if actual < len {
            return Err(Error::Truncated {
                step: "read raw payload",
                expected: len - actual,
            });
        }
        Ok(buf)
    }

    /// Fill `buf` from a raw payload whose header has already been consumed.
    pub(crate) fn read_payload_into(&mut self, buf: &mut [u8]) -> Result<()> {
        self.r
            .read_exact(buf)
            .map_err(|e| Error::read("read raw payload", buf.len(), e))
    }

    /// Decode a value of any deserializable type.
    pub fn decode<T: DeserializeOwned>(&mut self) -> Result<T> {
        T::deserialize(self)
    }

    /// Decode whatever comes next, keeping its wire shape.
    pub fn decode_value(&mut self) -> Result<Value> {
        Value::deserialize(self)
    }

    pub fn decode_nil(&mut self) -> Result<()> {
        match self.next_element()? {
            Element::Nil => Ok(()),
            elem => Err(Error::mismatch("Nil", elem.category())),
        }
    }

    pub fn decode_bool(&mut self) -> Result<bool> {
        match self.next_element()? {
            Element::Bool(v) => Ok(v),
            elem => Err(Error::mismatch("Bool", elem.category())),
        }
    }

    /// Decode an integer of either signedness that fits in a `u64`.
    pub fn decode_u64(&mut self) -> Result<u64> {
        match self.next_element()? {
            Element::Uint(v) => Ok(v),
            Element::Int(v) => u64::try_from(v)
                .map_err(|_| Error::invalid_value(Unexpected::Signed(v), &"an unsigned integer")),
            elem => Err(Error::mismatch("integer", elem.category())),
        }
    }

    /// Decode an integer of either signedness that fits in an `i64`.
    pub fn decode_i64(&mut self) -> Result<i64> {
        match self.next_element()? {
            Element::Int(v) => Ok(v),
            Element::Uint(v) => i64::try_from(v)
                .map_err(|_| Error::invalid_value(Unexpected::Unsigned(v), &"an i64")),
            elem => Err(Error::mismatch("integer", elem.category())),
        }
    }

    /// Decode either float width, narrowing a 64-bit float.
    pub fn decode_f32(&mut self) -> Result<f32> {
        match self.next_element()? {
            Element::F32(v) => Ok(v),
            Element::F64(v) => Ok(v as f32),
            elem => Err(Error::mismatch("float", elem.category())),
        }
    }

    pub fn decode_f64(&mut self) -> Result<f64> {
        match self.next_element()? {
            Element::F32(v) => Ok(v as f64),
            Element::F64(v) => Ok(v),
            elem => Err(Error::mismatch("float", elem.category())),
        }
    }

    pub fn decode_bytes(&mut self) -> Result<Vec<u8>> {
        match self.next_element()? {
            Element::Raw(len) => self.read_payload(len),
            elem => Err(Error::mismatch("Raw", elem.category())),
        }
    }

    /// Decode a raw that must be valid UTF-8.
    pub fn decode_string(&mut self) -> Result<String> {
        let bytes = self.decode_bytes()?;
        String::from_utf8(bytes).map_err(|e| Error::BadEncode(format!("raw is not UTF-8: {}", e)))
    }

    /// Read an array header. The caller must decode that many elements next.
    pub fn decode_array_len(&mut self) -> Result<usize> {
        match self.next_element()? {
            Element::Array(len) => Ok(len),
            elem => Err(Error::mismatch("Array", elem.category())),
        }
    }

    /// Read a map header. The caller must decode that many key/value pairs next.
    pub fn decode_map_len(&mut self) -> Result<usize> {
        match self.next_element()? {
            Element::Map(len) => Ok(len),
            elem => Err(Error::mismatch("Map", elem.category())),
        }
    }

    /// Decode two signed integers, seconds then nanoseconds.
    pub fn decode_time(&mut self) -> Result<Timestamp> {
        let sec = self.decode_i64()?;
        let nsec = self.decode_i64()?;
        Ok(Timestamp::new(sec, nsec))
    }
}
