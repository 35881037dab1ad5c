use std::cmp;
use std::fmt;
use std::ops;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{
    de::{Deserialize, Deserializer, Error as DeError, SeqAccess},
    ser::{Serialize, Serializer},
};

use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::error::{Error, Result};
use crate::value::Value;

/// Name the timestamp codec is registered under.
pub const TIMESTAMP_NAME: &str = "rawpack::Timestamp";

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// A point in time: whole seconds since the Unix epoch plus a nanosecond offset.
///
/// With the default registry, a timestamp goes on the wire as exactly two signed integers, the
/// seconds then the nanoseconds, with no surrounding array:
///
/// ```
/// use rawpack::Timestamp;
/// let enc = rawpack::marshal(&Timestamp::new(1000, 500_000)).unwrap();
/// assert_eq!(enc, &[0xd1, 0x03, 0xe8, 0xd2, 0x00, 0x07, 0xa1, 0x20]);
/// ```
///
/// Through a registry without the codec, it is instead a two-element array.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Timestamp {
    sec: i64,
    nano: u32,
}

impl Timestamp {
    /// Build a timestamp, carrying whole seconds out of `nsec` so that the stored nanosecond part
    /// always lies in `0..1_000_000_000`.
    pub fn new(sec: i64, nsec: i64) -> Timestamp {
        Timestamp {
            sec: sec.saturating_add(nsec.div_euclid(NANOS_PER_SEC)),
            nano: nsec.rem_euclid(NANOS_PER_SEC) as u32,
        }
    }

    pub fn from_sec(sec: i64) -> Timestamp {
        Timestamp { sec, nano: 0 }
    }

    /// Minimum possible time that can be represented
    pub fn min_value() -> Timestamp {
        Timestamp {
            sec: i64::MIN,
            nano: 0,
        }
    }

    /// Maximum possible time that can be represented
    pub fn max_value() -> Timestamp {
        Timestamp {
            sec: i64::MAX,
            nano: (NANOS_PER_SEC - 1) as u32,
        }
    }

    /// Current system time.
    pub fn now() -> Timestamp {
        Timestamp::from(SystemTime::now())
    }

    /// Seconds since January 1, 1970 0:00:00 UTC.
    pub fn timestamp_utc(&self) -> i64 {
        self.sec
    }

    /// Nanoseconds past the second count.
    pub fn timestamp_subsec_nanos(&self) -> u32 {
        self.nano
    }

    /// Convert to a `SystemTime`, or `None` if the platform can't represent this instant.
    pub fn to_system_time(&self) -> Option<SystemTime> {
        let since = if self.sec >= 0 {
            UNIX_EPOCH.checked_add(Duration::from_secs(self.sec as u64))?
        } else {
            UNIX_EPOCH.checked_sub(Duration::from_secs(self.sec.unsigned_abs()))?
        };
        since.checked_add(Duration::from_nanos(self.nano as u64))
    }
}

impl From<SystemTime> for Timestamp {
    fn from(t: SystemTime) -> Timestamp {
        match t.duration_since(UNIX_EPOCH) {
            Ok(d) => Timestamp::new(
                i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
                d.subsec_nanos() as i64,
            ),
            Err(e) => {
                let d = e.duration();
                Timestamp::new(
                    i64::try_from(d.as_secs()).map_or(i64::MIN, |s| -s),
                    -(d.subsec_nanos() as i64),
                )
            }
        }
    }
}

impl ops::Add<i64> for Timestamp {
    type Output = Timestamp;
    fn add(self, rhs: i64) -> Self {
        Timestamp {
            sec: self.sec.saturating_add(rhs),
            nano: self.nano,
        }
    }
}

impl ops::Sub<i64> for Timestamp {
    type Output = Timestamp;
    fn sub(self, rhs: i64) -> Self {
        Timestamp {
            sec: self.sec.saturating_sub(rhs),
            nano: self.nano,
        }
    }
}

impl cmp::Ord for Timestamp {
    fn cmp(&self, other: &Timestamp) -> cmp::Ordering {
        if self.sec == other.sec {
            self.nano.cmp(&other.nano)
        } else {
            self.sec.cmp(&other.sec)
        }
    }
}

impl cmp::PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Timestamp) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "UTC: {} sec + {} ns", self.sec, self.nano)
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_newtype_struct(TIMESTAMP_NAME, &(self.sec, self.nano as i64))
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TimeVisitor;

        impl<'de> serde::de::Visitor<'de> for TimeVisitor {
            type Value = Timestamp;

            fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(fmt, "a (seconds, nanoseconds) pair")
            }

            fn visit_newtype_struct<D>(self, d: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                let (sec, nsec) = <(i64, i64)>::deserialize(d)?;
                Ok(Timestamp::new(sec, nsec))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let sec: i64 = seq
                    .next_element()?
                    .ok_or_else(|| A::Error::invalid_length(0, &self))?;
                let nsec: i64 = seq
                    .next_element()?
                    .ok_or_else(|| A::Error::invalid_length(1, &self))?;
                Ok(Timestamp::new(sec, nsec))
            }
        }

        deserializer.deserialize_newtype_struct(TIMESTAMP_NAME, TimeVisitor)
    }
}

/// Registered encode function for [`Timestamp`].
pub(crate) fn encode_timestamp(enc: &mut Encoder<'_>, v: &Value) -> Result<()> {
    let pair = match v.as_array() {
        Some([sec, nsec]) => sec.as_i64().zip(nsec.as_i64()),
        _ => None,
    };
    let (sec, nsec) =
        pair.ok_or_else(|| Error::SerdeFail("timestamp must be a pair of integers".into()))?;
    enc.encode_time(&Timestamp::new(sec, nsec))
}

/// Registered decode function for [`Timestamp`].
pub(crate) fn decode_timestamp(dec: &mut Decoder<'_>) -> Result<Value> {
    let t = dec.decode_time()?;
    Ok(Value::Array(vec![Value::from(t.sec), Value::from(t.nano)]))
}
