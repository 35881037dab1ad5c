//! Types that write their own encoding.
//!
//! A [`Coder`] takes full control of its bytes: the encoder hands it the sink and writes
//! nothing of its own for that value. It takes priority over everything else, including a
//! registry entry under the same type name.
//!
//! To make a `Coder` work inside derived `Serialize` impls, point its `Serialize` at
//! [`serialize`]:
//!
//! ```
//! use std::io::Write;
//! use serde::Serialize;
//! use rawpack::{Coder, Encoder, Result};
//!
//! struct Flag(bool);
//!
//! impl Coder for Flag {
//!     fn encode_msgpack(&self, w: &mut dyn Write) -> Result<()> {
//!         Encoder::new(w).encode_str(if self.0 { "yes" } else { "no" })
//!     }
//! }
//!
//! impl Serialize for Flag {
//!     fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
//!         rawpack::coder::serialize(self, s)
//!     }
//! }
//!
//! let enc = rawpack::marshal(&vec![Flag(true)]).unwrap();
//! assert_eq!(enc, &[0x91, 0xa3, b'y', b'e', b's']);
//! ```
//!
//! Other serde formats see the written bytes as a byte string.

use std::io::Write;

use serde::{ser::Error as SerError, Serializer};

use crate::error::Result;

/// Newtype name that marks pre-encoded bytes.
pub(crate) const CODER_NAME: &str = "rawpack::Coder";

/// A value that serializes itself directly to the sink.
pub trait Coder {
    /// Write exactly one complete encoded element to `w`.
    fn encode_msgpack(&self, w: &mut dyn Write) -> Result<()>;
}

impl<T: Coder + ?Sized> Coder for &T {
    fn encode_msgpack(&self, w: &mut dyn Write) -> Result<()> {
        (**self).encode_msgpack(w)
    }
}

impl<T: Coder + ?Sized> Coder for Box<T> {
    fn encode_msgpack(&self, w: &mut dyn Write) -> Result<()> {
        (**self).encode_msgpack(w)
    }
}

/// Serialize a [`Coder`] through any serde serializer. The encoder of this crate writes the
/// coder's bytes verbatim.
pub fn serialize<T, S>(v: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Coder + ?Sized,
    S: Serializer,
{
    let mut buf = Vec::new();
    v.encode_msgpack(&mut buf).map_err(S::Error::custom)?;
    serializer.serialize_newtype_struct(CODER_NAME, serde_bytes::Bytes::new(&buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::Encoder;
    use crate::error::Error;
    use crate::registry::Registry;
    use crate::value::Value;
    use serde::Serialize;
    use std::sync::Arc;

    /// Writes its inner number as a one-element array.
    struct Boxed(u16);

    impl Coder for Boxed {
        fn encode_msgpack(&self, w: &mut dyn Write) -> Result<()> {
            let mut enc = Encoder::new(w);
            enc.encode_array_len(1)?;
            enc.encode_u16(self.0)
        }
    }

    impl Serialize for Boxed {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            serialize(self, s)
        }
    }

    #[derive(Serialize)]
    struct Holder {
        inner: Boxed,
        list: Vec<Boxed>,
    }

    struct Failing;

    impl Coder for Failing {
        fn encode_msgpack(&self, _: &mut dyn Write) -> Result<()> {
            Err(Error::Unsupported("Failing"))
        }
    }

    impl Serialize for Failing {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            serialize(self, s)
        }
    }

    #[test]
    fn direct() {
        let mut buf = Vec::new();
        Encoder::new(&mut buf).encode_coder(&Boxed(300)).unwrap();
        assert_eq!(buf, &[0x91, 0xcd, 0x01, 0x2c]);
    }

    #[test]
    fn inside_traversal() {
        let holder = Holder {
            inner: Boxed(1),
            list: vec![Boxed(2), Boxed(3)],
        };
        let enc = crate::marshal(&holder).unwrap();
        assert_eq!(
            enc,
            &[
                0x82, 0xa5, b'i', b'n', b'n', b'e', b'r', 0x91, 0x01, 0xa4, b'l', b'i', b's', b't',
                0x92, 0x91, 0x02, 0x91, 0x03
            ]
        );
        let back: Value = crate::unmarshal(&enc).unwrap();
        assert_eq!(back["list"][1][0].as_u64(), Some(3));
    }

    #[test]
    fn beats_registry() {
        fn never(_: &mut Encoder<'_>, _: &Value) -> Result<()> {
            Err(Error::SerdeFail("registry consulted".into()))
        }
        fn never_decode(_: &mut crate::decode::Decoder<'_>) -> Result<Value> {
            Ok(Value::Nil)
        }
        let mut registry = Registry::new();
        registry.register(CODER_NAME, never, never_decode);
        let mut buf = Vec::new();
        Encoder::with_registry(&mut buf, Arc::new(registry))
            .encode(&Boxed(5))
            .unwrap();
        assert_eq!(buf, &[0x91, 0x05]);
    }

    #[test]
    fn failure_propagates() {
        let err = crate::marshal(&Failing).unwrap_err();
        assert!(matches!(err, Error::SerdeFail(_)));
    }
}
