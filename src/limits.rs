use core::time::Duration;

use crate::{CborError, ErrorCode};

/// Default maximum input size (10 MB).
pub const DEFAULT_MAX_INPUT_SIZE: usize = 10 * 1024 * 1024;
/// Default maximum encoder output size (100 MB).
pub const DEFAULT_MAX_OUTPUT_SIZE: usize = 100 * 1024 * 1024;
/// Default maximum byte/text string length (1 MB).
pub const DEFAULT_MAX_STRING_LENGTH: usize = 1024 * 1024;
/// Default maximum array length.
pub const DEFAULT_MAX_ARRAY_LENGTH: usize = 10_000;
/// Default maximum map size in pairs.
pub const DEFAULT_MAX_MAP_SIZE: usize = 10_000;
/// Default maximum nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;
/// Default maximum tag nesting depth.
pub const DEFAULT_MAX_TAG_DEPTH: usize = 64;
/// Default maximum bignum magnitude length in bytes.
pub const DEFAULT_MAX_BIGNUM_BYTES: usize = 1024;
/// Default parse deadline in milliseconds.
pub const DEFAULT_MAX_PARSE_TIME_MS: u64 = 1_000;

/// Resource limits for one decode or encode call.
///
/// Limits are fixed for the duration of the call. Length limits are checked against the
/// declared length before any allocation is attempted, so a hostile length field cannot force
/// a large reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct Limits {
    /// Maximum total input length in bytes.
    pub max_input_size: usize,
    /// Maximum encoder output length in bytes.
    pub max_output_size: usize,
    /// Maximum byte-string or text-string length (total, for indefinite strings).
    pub max_string_length: usize,
    /// Maximum array length.
    pub max_array_length: usize,
    /// Maximum map length (pairs).
    pub max_map_size: usize,
    /// Maximum nesting depth shared by arrays, maps, and tags.
    pub max_depth: usize,
    /// Maximum number of tags on any path from the root.
    pub max_tag_depth: usize,
    /// Maximum bignum (tag 2/3) magnitude length in bytes.
    pub max_bignum_bytes: usize,
    /// Wall-clock budget for one decode call, in milliseconds.
    #[cfg_attr(feature = "serde", serde(rename = "maxParseTime"))]
    pub max_parse_time_ms: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
            max_output_size: DEFAULT_MAX_OUTPUT_SIZE,
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            max_array_length: DEFAULT_MAX_ARRAY_LENGTH,
            max_map_size: DEFAULT_MAX_MAP_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            max_tag_depth: DEFAULT_MAX_TAG_DEPTH,
            max_bignum_bytes: DEFAULT_MAX_BIGNUM_BYTES,
            max_parse_time_ms: DEFAULT_MAX_PARSE_TIME_MS,
        }
    }
}

impl Limits {
    /// Limits sized for a single message of `max_message_bytes`.
    ///
    /// Input and string limits follow the message size; the remaining limits keep their defaults.
    #[must_use]
    pub fn for_bytes(max_message_bytes: usize) -> Self {
        Self {
            max_input_size: max_message_bytes,
            max_string_length: max_message_bytes.min(DEFAULT_MAX_STRING_LENGTH),
            ..Self::default()
        }
    }

    /// The parse deadline as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn max_parse_time(&self) -> Duration {
        Duration::from_millis(self.max_parse_time_ms)
    }

    /// Check that the limits are usable.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLimits` if the parse budget is zero or the output limit is zero.
    pub const fn validate(&self) -> Result<(), CborError> {
        if self.max_parse_time_ms == 0 || self.max_output_size == 0 {
            return Err(CborError::new(ErrorCode::InvalidLimits, 0));
        }
        Ok(())
    }
}
