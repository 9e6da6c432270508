//! # cbor-lens
//!
//! A hardened CBOR (RFC 8949) codec for untrusted input: a recursive decoder with opt-in
//! canonical validation, a semantic tag table, a mirrored encoder with canonical output, a
//! resource-limit layer, and byte-range source maps for hex/value highlighting.
//!
//! ## Design principles
//!
//! - **Every length is checked before it is trusted.**
//!   Declared string, array and map lengths are compared against [`Limits`] before any
//!   allocation, and initial reservations never exceed what the remaining input could hold.
//! - **Depth is counted, not inferred from the stack.**
//!   Arrays, maps and tags share one nesting counter; tags also have their own counter, so a
//!   chain of tags cannot evade the bound.
//! - **Options are values.**
//!   [`DecodeOptions`] and [`EncodeOptions`] are plain records. `strict` is expanded once per call.
//!
//! ## Canonical rules
//!
//! With [`DecodeOptions::validate_canonical`] (or `strict`):
//!
//! - Heads use the shortest argument form.
//! - No indefinite-length strings, arrays or maps.
//! - Map keys are strictly increasing by `(encoded length, then encoded bytes)`.
//!
//! [`EncodeOptions::canonical`] produces exactly this form, and additionally writes each float
//! at the narrowest width that holds it exactly.
//!
//! ## Integers
//!
//! Integers in `[-(2^53-1), 2^53-1]` are native; anything outside is a [`BigInt`]. Tag 2/3
//! bignums whose value fits the native range are demoted.
//!
//! ## Feature flags
//!
//! - `sha2` *(default)*: [`CborValue::sha256_canonical`].
//! - `serde`: `Serialize`/`Deserialize` for options, limits and [`SourceMapEntry`].
//! - `json`: the sentinel JSON projection ([`to_json`], [`from_json`]).
//! - `simdutf8`: SIMD-accelerated strict UTF-8 validation.
//!
//! ## Example
//!
//! ```
//! use cbor_lens::{decode, encode, CborValue, DecodeOptions, EncodeOptions};
//!
//! let bytes = [0x83, 0x01, 0x02, 0x03];
//! let out = decode(&bytes, &DecodeOptions::strict()).unwrap();
//! assert_eq!(out.value, CborValue::Array(vec![1.into(), 2.into(), 3.into()]));
//! assert_eq!(encode(&out.value, &EncodeOptions::canonical()).unwrap(), bytes);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

mod alloc_util;
mod collection;
mod decode;
mod encode;
mod error;
mod float;
mod int;
#[cfg(feature = "json")]
mod json;
mod limits;
mod options;
mod sourcemap;
mod tags;
mod utf8;
mod value;
mod wire;

pub use crate::decode::{
    decode, decode_sequence, decode_sequence_with_source_map, decode_with_source_map, Decoded,
    DecodedWithSourceMap,
};
pub use crate::encode::{cmp_encoded_keys, encode, encode_sequence, Encoder};
pub use crate::error::{CborError, CborErrorKind, ErrorCode, ErrorContext};
pub use crate::limits::{
    Limits, DEFAULT_MAX_ARRAY_LENGTH, DEFAULT_MAX_BIGNUM_BYTES, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_INPUT_SIZE, DEFAULT_MAX_MAP_SIZE, DEFAULT_MAX_OUTPUT_SIZE,
    DEFAULT_MAX_PARSE_TIME_MS, DEFAULT_MAX_STRING_LENGTH, DEFAULT_MAX_TAG_DEPTH,
};
pub use crate::options::{DecodeOptions, DupMapKeyMode, EncodeOptions};
pub use crate::sourcemap::SourceMapEntry;
pub use crate::tags::{
    constructor_index, constructor_tag, TAG_BASE64, TAG_BASE64URL, TAG_BIGFLOAT,
    TAG_CONSTRUCTOR_GENERIC, TAG_DATE_TIME, TAG_DECIMAL_FRACTION, TAG_EMBEDDED_CBOR, TAG_EPOCH,
    TAG_NEG_BIGNUM, TAG_POS_BIGNUM, TAG_REGEX, TAG_SELF_DESCRIBED, TAG_SET, TAG_URI,
};
pub use crate::value::{
    BigInt, ByteString, CborInteger, CborMap, CborValue, Constructor, Float, FloatWidth, Fraction,
    FractionBase, ParseIntegerError, Tag, TextString, MAX_SAFE_INTEGER, MAX_SAFE_INTEGER_I64,
    MIN_SAFE_INTEGER,
};

#[cfg(feature = "json")]
#[cfg_attr(docsrs, doc(cfg(feature = "json")))]
pub use crate::json::{from_json, to_json, JsonError};
