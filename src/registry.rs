//! Custom encode/decode functions for named types.
//!
//! A registry maps a type identity to an [`Entry`] holding an encode function and a decode
//! function. The identity is the type's serde container name: the name handed to
//! `serialize_struct`, `serialize_newtype_struct` and friends, which `#[serde(rename = "...")]`
//! controls. Pick qualified names (`"myapp::Point"`) so unrelated types don't collide.
//!
//! Whenever the encoder meets a struct, newtype struct, tuple struct, or unit struct whose name
//! is registered, it hands the registered function a [`Value`] holding the type's ordinary serde
//! representation instead of writing that representation itself. On decode, the registered
//! function reads whatever it wrote and returns a `Value` that the type's `Deserialize` impl then
//! consumes. `Option` and references are looked through, so `Some(registered)` uses the entry.
//!
//! A registry is built up front and then shared, immutably, through an `Arc`:
//!
//! ```
//! use std::sync::Arc;
//! use rawpack::{Registry, Encoder, Decoder, Value, Result};
//!
//! fn encode_point(enc: &mut Encoder<'_>, v: &Value) -> Result<()> {
//!     let x = v.get("x").and_then(Value::as_i64).unwrap_or_default();
//!     let y = v.get("y").and_then(Value::as_i64).unwrap_or_default();
//!     enc.encode_i64(x)?;
//!     enc.encode_i64(y)
//! }
//!
//! fn decode_point(dec: &mut Decoder<'_>) -> Result<Value> {
//!     let x = dec.decode_i64()?;
//!     let y = dec.decode_i64()?;
//!     Ok(Value::Map(vec![("x".into(), x.into()), ("y".into(), y.into())]))
//! }
//!
//! let mut registry = Registry::default();
//! registry.register("myapp::Point", encode_point, decode_point);
//! let registry = Arc::new(registry);
//! # let _ = registry;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::error::Result;
use crate::timestamp::{self, TIMESTAMP_NAME};
use crate::value::Value;

/// Writes a registered type. Receives the type's generic serde representation.
pub type EncodeFn = fn(&mut Encoder<'_>, &Value) -> Result<()>;
/// Reads a registered type back, returning it in generic form for its `Deserialize` impl.
pub type DecodeFn = fn(&mut Decoder<'_>) -> Result<Value>;

/// A registered pair of functions.
#[derive(Clone, Copy)]
pub struct Entry {
    pub encode: EncodeFn,
    pub decode: DecodeFn,
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Entry { .. }")
    }
}

/// Table of custom codecs keyed by type name.
#[derive(Clone, Debug)]
pub struct Registry {
    entries: HashMap<&'static str, Entry>,
}

impl Registry {
    /// An empty registry. Timestamps encode as a plain two-element array through it.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Install the functions for a type name, replacing and returning any previous entry.
    pub fn register(
        &mut self,
        name: &'static str,
        encode: EncodeFn,
        decode: DecodeFn,
    ) -> Option<Entry> {
        let previous = self.entries.insert(name, Entry { encode, decode });
        if previous.is_some() {
            log::debug!("registry: replaced codec for {}", name);
        } else {
            log::debug!("registry: installed codec for {}", name);
        }
        previous
    }

    /// Look up the entry for an exact type name.
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The process-wide default registry, built on first use. Used by [`marshal`](crate::marshal),
    /// [`unmarshal`](crate::unmarshal), [`Encoder::new`], and [`Decoder::new`].
    pub fn shared() -> Arc<Registry> {
        static SHARED: OnceLock<Arc<Registry>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(Registry::default())).clone()
    }

    /// A shared registry with nothing in it.
    pub(crate) fn empty() -> Arc<Registry> {
        static EMPTY: OnceLock<Arc<Registry>> = OnceLock::new();
        EMPTY.get_or_init(|| Arc::new(Registry::new())).clone()
    }
}

impl Default for Registry {
    /// A registry with the built-in [`Timestamp`](crate::Timestamp) codec installed.
    fn default() -> Self {
        let mut registry = Registry::new();
        registry.register(
            TIMESTAMP_NAME,
            timestamp::encode_timestamp,
            timestamp::decode_timestamp,
        );
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename = "test::Point")]
    struct Point {
        x: i64,
        y: i64,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename = "test::Celsius")]
    struct Celsius(f64);

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Reading {
        at: Option<Point>,
        temp: Celsius,
    }

    // Points travel as two bare integers.
    fn encode_point(enc: &mut Encoder<'_>, v: &Value) -> Result<()> {
        let field = |name| {
            v.get(name)
                .and_then(Value::as_i64)
                .ok_or_else(|| Error::SerdeFail(format!("point without {}", name)))
        };
        enc.encode_i64(field("x")?)?;
        enc.encode_i64(field("y")?)
    }

    fn decode_point(dec: &mut Decoder<'_>) -> Result<Value> {
        let x = dec.decode_i64()?;
        let y = dec.decode_i64()?;
        Ok(Value::Map(vec![
            (Value::from("x"), Value::from(x)),
            (Value::from("y"), Value::from(y)),
        ]))
    }

    // Temperatures travel as hundredths of a degree.
    fn encode_celsius(enc: &mut Encoder<'_>, v: &Value) -> Result<()> {
        let t = v
            .as_f64()
            .ok_or_else(|| Error::SerdeFail("expected a float".into()))?;
        enc.encode_i64((t * 100.0).round() as i64)
    }

    fn decode_celsius(dec: &mut Decoder<'_>) -> Result<Value> {
        Ok(Value::F64(dec.decode_i64()? as f64 / 100.0))
    }

    fn registry() -> Arc<Registry> {
        let mut registry = Registry::default();
        registry.register("test::Point", encode_point, decode_point);
        registry.register("test::Celsius", encode_celsius, decode_celsius);
        Arc::new(registry)
    }

    fn encode_with<T: Serialize>(registry: Arc<Registry>, v: &T) -> Vec<u8> {
        let mut buf = Vec::new();
        Encoder::with_registry(&mut buf, registry).encode(v).unwrap();
        buf
    }

    #[test]
    fn defaults() {
        assert!(Registry::new().is_empty());
        let registry = Registry::default();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(TIMESTAMP_NAME));
        assert!(Registry::shared().contains(TIMESTAMP_NAME));
    }

    #[test]
    fn register_overwrites() {
        let mut registry = Registry::new();
        assert!(registry
            .register("test::Point", encode_point, decode_point)
            .is_none());
        assert!(registry
            .register("test::Point", encode_celsius, decode_celsius)
            .is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registered_struct_wins_over_map() {
        let point = Point { x: 1, y: -2 };
        let enc = encode_with(registry(), &point);
        assert_eq!(enc, &[0x01, 0xfe]);

        let mut data = enc.as_slice();
        let mut dec = Decoder::with_registry(&mut data, registry());
        assert_eq!(dec.decode::<Point>().unwrap(), point);
        assert!(data.is_empty());
    }

    #[test]
    fn unregistered_struct_is_a_map() {
        let point = Point { x: 1, y: 2 };
        let enc = encode_with(Arc::new(Registry::new()), &point);
        assert_eq!(enc, &[0x82, 0xa1, b'x', 0x01, 0xa1, b'y', 0x02]);
    }

    #[test]
    fn registered_newtype_and_option() {
        let reading = Reading {
            at: Some(Point { x: 3, y: 4 }),
            temp: Celsius(21.5),
        };
        let enc = encode_with(registry(), &reading);
        // map(2), "at", 3, 4, "temp", 2150 as int16
        assert_eq!(
            enc,
            &[0x82, 0xa2, b'a', b't', 0x03, 0x04, 0xa4, b't', b'e', b'm', b'p', 0xd1, 0x08, 0x66]
        );
        let mut data = enc.as_slice();
        let back: Reading = Decoder::with_registry(&mut data, registry())
            .decode()
            .unwrap();
        assert_eq!(back, reading);

        let empty = Reading {
            at: None,
            temp: Celsius(-1.0),
        };
        let enc = encode_with(registry(), &empty);
        let mut data = enc.as_slice();
        let back: Reading = Decoder::with_registry(&mut data, registry())
            .decode()
            .unwrap();
        assert_eq!(back, empty);
    }
}
