use std::convert::TryFrom;
use std::fmt;

use serde::{
    de::{Deserialize, Deserializer, Error as DeError, Visitor},
    ser::{Serialize, Serializer},
};

use crate::element::Category;

/// An integer read off the wire, whether it was tagged signed or unsigned.
///
/// Decoding into a [`Value`](crate::Value) widens every integer into this type. It holds
/// anything from `i64::MIN` to `u64::MAX`, and compares by numeric value, so `200u8` and
/// `200i64` are the same `Integer`.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Integer(i128);

/// An integer split by the wire form it takes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Split {
    Unsigned(u64),
    Negative(i64),
}

impl Integer {
    pub fn min_value() -> Integer {
        Integer(i64::MIN as i128)
    }

    pub fn max_value() -> Integer {
        Integer(u64::MAX as i128)
    }

    pub fn is_i64(&self) -> bool {
        self.as_i64().is_some()
    }

    pub fn is_u64(&self) -> bool {
        self.0 >= 0
    }

    pub fn as_i64(&self) -> Option<i64> {
        i64::try_from(self.0).ok()
    }

    pub fn as_u64(&self) -> Option<u64> {
        u64::try_from(self.0).ok()
    }

    /// The nearest `f64`.
    pub fn as_f64(&self) -> f64 {
        self.0 as f64
    }

    /// The category the narrowest encoding of this integer falls in. Non-negative values are
    /// unsigned, whatever type they came from.
    pub fn category(&self) -> Category {
        match self.split() {
            Split::Unsigned(_) => Category::UnsignedInt,
            Split::Negative(_) => Category::SignedInt,
        }
    }

    pub(crate) fn split(&self) -> Split {
        // The constructors keep the value inside i64::MIN..=u64::MAX
        if self.0 < 0 {
            Split::Negative(self.0 as i64)
        } else {
            Split::Unsigned(self.0 as u64)
        }
    }
}

impl fmt::Debug for Integer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Integer({})", self.0)
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

macro_rules! integer_conversions {
    ($($t: ty),*) => {
        $(
            impl From<$t> for Integer {
                fn from(v: $t) -> Self {
                    Integer(v as i128)
                }
            }

            impl TryFrom<Integer> for $t {
                type Error = Integer;
                fn try_from(v: Integer) -> Result<Self, Self::Error> {
                    <$t>::try_from(v.0).map_err(|_| v)
                }
            }
        )*
    };
}

integer_conversions!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl Serialize for Integer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.split() {
            Split::Unsigned(v) => serializer.serialize_u64(v),
            Split::Negative(v) => serializer.serialize_i64(v),
        }
    }
}

impl<'de> Deserialize<'de> for Integer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IntegerVisitor;

        impl<'de> Visitor<'de> for IntegerVisitor {
            type Value = Integer;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an integer between i64::MIN and u64::MAX")
            }

            fn visit_i64<E: DeError>(self, v: i64) -> Result<Integer, E> {
                Ok(Integer::from(v))
            }

            fn visit_u64<E: DeError>(self, v: u64) -> Result<Integer, E> {
                Ok(Integer::from(v))
            }
        }

        deserializer.deserialize_any(IntegerVisitor)
    }
}
