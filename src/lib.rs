//! rawpack reads and writes the raw-type flavor of MessagePack: the older format, from before
//! strings and binary were split apart, where every byte string is a single "raw" type.
//!
//! Values go through serde. Any `Serialize` type can be encoded and any `Deserialize` type can
//! be decoded:
//!
//! - Integers use the narrowest form that holds them. Signed values from -32 to 127 take one
//!   byte; past that, signed types keep to the signed forms (so `200i32` is `d1 00 c8`) unless
//!   [`Config::compact_ints`] is set.
//! - Strings, chars, and byte strings (`serde_bytes`) are raws. A plain `Vec<u8>` is an array
//!   of integers, as serde sees it, but decodes happily from a raw too.
//! - Structs are maps from field name to value, in declaration order. Only serialized fields
//!   appear, under their serde names.
//! - Sequences, tuples, and tuple structs are arrays. Maps keep their iteration order and may
//!   have keys of any type.
//! - `None` and `()` are nil. Enums follow serde's externally tagged layout: a unit variant is
//!   its name, anything else is a one-entry map from its name to its content.
//! - `i128` and `u128` are [unsupported](Error::Unsupported).
//!
//! Types can opt out of all of this in two ways: by registering encode/decode functions under
//! their serde name in a [`Registry`], or by implementing [`Coder`] to write their own bytes.
//! [`Timestamp`] is registered by default, and goes out as two bare signed integers.
//!
//! ```
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! #[allow(non_snake_case)]
//! struct Record {
//!     A: i32,
//!     B: String,
//! }
//!
//! let rec = Record { A: 1, B: "x".into() };
//! let enc = rawpack::marshal(&rec).unwrap();
//! assert_eq!(enc, &[0x82, 0xa1, b'A', 0x01, 0xa1, b'B', 0xa1, b'x']);
//! let back: Record = rawpack::unmarshal(&enc).unwrap();
//! assert_eq!(back, rec);
//! ```

mod de;
mod depth_tracking;
mod element;
mod error;
mod integer;
mod marker;
mod ser;
mod value;

pub mod coder;
pub mod config;
pub mod decode;
pub mod encode;
pub mod fields;
pub mod registry;
pub mod timestamp;

pub use self::coder::Coder;
pub use self::config::Config;
pub use self::decode::Decoder;
pub use self::element::{Category, MAX_LEN};
pub use self::encode::Encoder;
pub use self::error::{Error, Result};
pub use self::integer::Integer;
pub use self::registry::Registry;
pub use self::timestamp::Timestamp;
pub use self::value::Value;

/// Encode a value into a new byte vector, using the shared default registry.
pub fn marshal<T: serde::Serialize + ?Sized>(v: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    Encoder::new(&mut buf).encode(v)?;
    Ok(buf)
}

/// Decode one value from the start of a byte slice, using the shared default registry. Bytes
/// after the value are ignored.
pub fn unmarshal<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
    let mut data = data;
    Decoder::new(&mut data).decode()
}
