//! The encoding half of the codec.
//!
//! An [`Encoder`] writes straight to a caller-supplied sink. Every public `encode_*` method
//! emits one complete element; the sink sees each tag and payload as a single write, and an
//! error leaves whatever was already written in place.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;

use crate::coder::Coder;
use crate::config::Config;
use crate::element::{encode_header, Element};
use crate::error::{Error, Result};
use crate::registry::{Entry, Registry};
use crate::timestamp::Timestamp;
use crate::value::Value;

/// Writes values to a sink in the raw-type MessagePack format.
///
/// ```
/// use rawpack::Encoder;
/// let mut buf = Vec::new();
/// let mut enc = Encoder::new(&mut buf);
/// enc.encode_i64(200).unwrap();
/// enc.encode(&("A", 1u8)).unwrap();
/// assert_eq!(buf, &[0xd1, 0x00, 0xc8, 0x92, 0xa1, b'A', 0x01]);
/// ```
pub struct Encoder<'w> {
    w: &'w mut dyn Write,
    registry: Arc<Registry>,
    config: Config,
}

impl<'w> Encoder<'w> {
    /// An encoder using the shared default registry.
    pub fn new(w: &'w mut dyn Write) -> Self {
        Self::with_registry(w, Registry::shared())
    }

    pub fn with_registry(w: &'w mut dyn Write, registry: Arc<Registry>) -> Self {
        Self {
            w,
            registry,
            config: Config::default(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A second encoder with the same registry and options, writing somewhere else.
    pub(crate) fn fork<'b>(&self, w: &'b mut dyn Write) -> Encoder<'b> {
        Encoder {
            w,
            registry: self.registry.clone(),
            config: self.config,
        }
    }

    pub(crate) fn registered(&self, name: &str) -> Option<Entry> {
        if self.registry.is_empty() {
            None
        } else {
            self.registry.get(name).copied()
        }
    }

    /// Hand bytes to the sink in one call. A sink that takes fewer than all of them is an error.
    pub(crate) fn write(&mut self, data: &[u8]) -> Result<()> {
        let actual = self.w.write(data)?;
        if actual < data.len() {
            return Err(Error::ShortWrite {
                expected: data.len(),
                actual,
            });
        }
        Ok(())
    }

    pub(crate) fn encode_element(&mut self, elem: Element) -> Result<()> {
        let header = encode_header(elem, self.config.int_policy())?;
        self.write(header.as_bytes())
    }

    /// Encode any serializable value. See the [crate docs](crate) for how types map onto the
    /// wire.
    pub fn encode<T: Serialize + ?Sized>(&mut self, v: &T) -> Result<()> {
        v.serialize(self)
    }

    /// Encode each value in turn, one after the other, with nothing around them.
    pub fn encode_all<T: Serialize>(&mut self, values: &[T]) -> Result<()> {
        for v in values {
            self.encode(v)?;
        }
        Ok(())
    }

    pub fn encode_nil(&mut self) -> Result<()> {
        self.encode_element(Element::Nil)
    }

    pub fn encode_bool(&mut self, v: bool) -> Result<()> {
        self.encode_element(Element::Bool(v))
    }

    pub fn encode_u8(&mut self, v: u8) -> Result<()> {
        self.encode_u64(v as u64)
    }

    pub fn encode_u16(&mut self, v: u16) -> Result<()> {
        self.encode_u64(v as u64)
    }

    pub fn encode_u32(&mut self, v: u32) -> Result<()> {
        self.encode_u64(v as u64)
    }

    /// Encode an unsigned integer in the narrowest unsigned form.
    pub fn encode_u64(&mut self, v: u64) -> Result<()> {
        self.encode_element(Element::Uint(v))
    }

    pub fn encode_i8(&mut self, v: i8) -> Result<()> {
        self.encode_i64(v as i64)
    }

    pub fn encode_i16(&mut self, v: i16) -> Result<()> {
        self.encode_i64(v as i64)
    }

    pub fn encode_i32(&mut self, v: i32) -> Result<()> {
        self.encode_i64(v as i64)
    }

    /// Encode a signed integer. Values from -32 to 127 are a single byte; beyond that the
    /// signed forms are used, unless [`Config::compact_ints`] is set.
    pub fn encode_i64(&mut self, v: i64) -> Result<()> {
        self.encode_element(Element::Int(v))
    }

    pub fn encode_f32(&mut self, v: f32) -> Result<()> {
        self.encode_element(Element::F32(v))
    }

    pub fn encode_f64(&mut self, v: f64) -> Result<()> {
        self.encode_element(Element::F64(v))
    }

    /// Encode a raw: length prefix, then the bytes unchanged.
    pub fn encode_bytes(&mut self, v: &[u8]) -> Result<()> {
        self.encode_element(Element::Raw(v.len()))?;
        if v.is_empty() {
            return Ok(());
        }
        self.write(v)
    }

    pub fn encode_str(&mut self, v: &str) -> Result<()> {
        self.encode_bytes(v.as_bytes())
    }

    /// Start an array. Exactly `len` elements must be encoded after it.
    pub fn encode_array_len(&mut self, len: usize) -> Result<()> {
        self.encode_element(Element::Array(len))
    }

    /// Start a map. Exactly `len` key/value pairs must be encoded after it.
    pub fn encode_map_len(&mut self, len: usize) -> Result<()> {
        self.encode_element(Element::Map(len))
    }

    /// Encode a list of strings as an array of raws.
    pub fn encode_strings<S: AsRef<str>>(&mut self, v: &[S]) -> Result<()> {
        self.encode_array_len(v.len())?;
        for s in v {
            self.encode_str(s.as_ref())?;
        }
        Ok(())
    }

    /// Encode string pairs as a map of raws, in iteration order.
    pub fn encode_str_map<I, K, V>(&mut self, map: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        I::IntoIter: ExactSizeIterator,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let iter = map.into_iter();
        self.encode_map_len(iter.len())?;
        for (k, v) in iter {
            self.encode_str(k.as_ref())?;
            self.encode_str(v.as_ref())?;
        }
        Ok(())
    }

    /// Encode a timestamp as two signed integers: seconds, then nanoseconds.
    pub fn encode_time(&mut self, t: &Timestamp) -> Result<()> {
        self.encode_i64(t.timestamp_utc())?;
        self.encode_i64(t.timestamp_subsec_nanos() as i64)
    }

    /// Let a value write its own encoding directly to the sink.
    pub fn encode_coder<C: Coder + ?Sized>(&mut self, v: &C) -> Result<()> {
        v.encode_msgpack(&mut *self.w)
    }

    /// Encode a [`Value`].
    pub fn encode_value(&mut self, v: &Value) -> Result<()> {
        self.encode(v)
    }

    /// Run a value through this encoder's rules with hooks off, and read it back as a `Value`.
    /// Registered encode functions receive their input this way.
    pub(crate) fn capture<T: Serialize + ?Sized>(&self, v: &T) -> Result<Value> {
        let mut buf = Vec::new();
        let mut enc = Encoder::with_registry(&mut buf, Registry::empty()).with_config(self.config);
        v.serialize(&mut enc)?;
        let mut data = buf.as_slice();
        crate::decode::Decoder::with_registry(&mut data, Registry::empty())
            .with_config(Config::default().max_depth(usize::MAX))
            .decode_value()
    }
}
