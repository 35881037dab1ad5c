use crate::element::IntPolicy;

/// Default limit on how deeply arrays and maps may nest when decoding.
pub const MAX_DEPTH: usize = 256;

/// Runtime options for an [`Encoder`](crate::Encoder) or [`Decoder`](crate::Decoder).
///
/// ```
/// let config = rawpack::Config::default().max_depth(32).compact_ints(true);
/// assert_eq!(config.get_max_depth(), 32);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    max_depth: usize,
    compact_ints: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            compact_ints: false,
        }
    }
}

impl Config {
    /// Limit how deeply arrays and maps may nest when decoding. Exceeding it fails with
    /// [`Error::ParseLimit`](crate::Error::ParseLimit).
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Encode non-negative signed integers with the unsigned width rules, so that e.g. 200
    /// takes 2 bytes instead of 3. Off by default, which keeps output byte-identical with
    /// other encoders of this format. Decoding is unaffected.
    pub fn compact_ints(mut self, compact: bool) -> Self {
        self.compact_ints = compact;
        self
    }

    pub fn get_max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn get_compact_ints(&self) -> bool {
        self.compact_ints
    }

    pub(crate) fn int_policy(&self) -> IntPolicy {
        if self.compact_ints {
            IntPolicy::Compact
        } else {
            IntPolicy::Compatible
        }
    }
}
