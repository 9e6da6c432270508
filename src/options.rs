//! Per-call codec options.
//!
//! Options are immutable records. `strict` is shorthand that [`DecodeOptions::resolve`] expands
//! once, at call entry, into the fixed set of flags it implies.

use crate::{CborError, ErrorCode, Limits};

/// How the decoder treats a map key whose canonical encoding repeats an earlier key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DupMapKeyMode {
    /// Overwrite the earlier value silently (last write wins).
    #[default]
    Allow,
    /// Log a warning and overwrite.
    Warn,
    /// Fail with `DuplicateMapKey`.
    Reject,
}

/// Decoder options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct DecodeOptions {
    /// Enables canonical validation, duplicate-key rejection, definite lengths only,
    /// strict UTF-8, tag semantics, and set uniqueness.
    pub strict: bool,
    /// Require shortest-form heads, definite lengths, and sorted map keys.
    pub validate_canonical: bool,
    /// Accept indefinite-length strings, arrays, and maps.
    pub allow_indefinite: bool,
    /// Duplicate map key policy.
    pub dup_map_key_mode: DupMapKeyMode,
    /// Reject invalid UTF-8 instead of substituting U+FFFD.
    pub validate_utf8_strict: bool,
    /// Validate the content shape of recognized tags.
    pub validate_tag_semantics: bool,
    /// Reject tag-258 sets whose elements repeat.
    pub validate_set_uniqueness: bool,
    /// Resource limits.
    pub limits: Limits,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            strict: false,
            validate_canonical: false,
            allow_indefinite: true,
            dup_map_key_mode: DupMapKeyMode::Allow,
            validate_utf8_strict: false,
            validate_tag_semantics: false,
            validate_set_uniqueness: false,
            limits: Limits::default(),
        }
    }
}

impl DecodeOptions {
    /// Options with `strict` enabled and default limits.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Options with `validate_canonical` enabled and default limits.
    #[must_use]
    pub fn canonical() -> Self {
        Self {
            validate_canonical: true,
            ..Self::default()
        }
    }

    /// Replace the limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Expand `strict` into the effective flag set.
    ///
    /// Canonical validation also forbids indefinite lengths.
    #[must_use]
    pub const fn resolve(self) -> Self {
        let mut out = self;
        if out.strict {
            out.validate_canonical = true;
            out.dup_map_key_mode = DupMapKeyMode::Reject;
            out.validate_utf8_strict = true;
            out.validate_tag_semantics = true;
            out.validate_set_uniqueness = true;
        }
        if out.validate_canonical {
            out.allow_indefinite = false;
        }
        out
    }
}

/// Encoder options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct EncodeOptions {
    /// Emit shortest floats, sorted map keys, and definite lengths only.
    pub canonical: bool,
    /// Re-emit indefinite-length strings that were decoded from chunks.
    pub allow_indefinite: bool,
    /// Fail with `DuplicateMapKey` when two keys encode identically.
    pub reject_duplicate_keys: bool,
    /// Resource limits (only `max_output_size` and `max_depth` apply).
    pub limits: Limits,
}

impl EncodeOptions {
    /// Canonical options with default limits.
    #[must_use]
    pub fn canonical() -> Self {
        Self {
            canonical: true,
            ..Self::default()
        }
    }

    /// Replace the limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Check option consistency and expand implied flags.
    ///
    /// Canonical output never carries duplicate keys.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOptions` if `canonical` and `allow_indefinite` are both set, or
    /// `InvalidLimits` if the limits are unusable.
    pub fn resolve(self) -> Result<Self, CborError> {
        if self.canonical && self.allow_indefinite {
            return Err(CborError::new(ErrorCode::InvalidOptions, 0));
        }
        self.limits.validate()?;
        let mut out = self;
        if out.canonical {
            out.reject_duplicate_keys = true;
        }
        Ok(out)
    }
}
