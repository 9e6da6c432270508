//! Tag decoding and the semantic tag table.
//!
//! | Tag | Result | Checked under `validate_tag_semantics` |
//! |---|---|---|
//! | 0 | generic tag | text, RFC 3339 date-time |
//! | 1 | generic tag | integer or float |
//! | 2, 3 | [`CborInteger`] | byte string (length always bounded by `max_bignum_bytes`) |
//! | 4, 5 | [`Fraction`] | `[exponent, mantissa]`, both integers |
//! | 21..=24 | generic tag | byte string |
//! | 32 | generic tag | text with a URI scheme |
//! | 33, 34 | generic tag | text in base64url / base64 |
//! | 35 | generic tag | text that parses as a regular expression |
//! | 102 | [`Constructor`] | `[index, [fields...]]` |
//! | 121..=127, 1280..=1400 | [`Constructor`] | array of fields |
//! | 258 | [`CborValue::Set`] | array; elements unique under `validate_set_uniqueness` |
//! | 55799 | the content itself | none |
//!
//! A recognized tag whose content has the wrong shape is kept as a generic tag unless semantic
//! validation is on, in which case it fails with `InvalidTagContent`.

use std::collections::HashSet;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::decode::{definite_arg, Decoder};
use crate::encode::canonical_key_bytes;
use crate::error::ErrorContext;
use crate::sourcemap::EntryId;
use crate::value::{CborValue, Constructor, Fraction, FractionBase};
use crate::wire::{read_header, Argument, Header, MAJOR_BYTES};
use crate::{CborError, CborInteger, ErrorCode};

/// RFC 3339 date-time string.
pub const TAG_DATE_TIME: u64 = 0;
/// Epoch-based date-time.
pub const TAG_EPOCH: u64 = 1;
/// Unsigned bignum.
pub const TAG_POS_BIGNUM: u64 = 2;
/// Negative bignum.
pub const TAG_NEG_BIGNUM: u64 = 3;
/// Decimal fraction.
pub const TAG_DECIMAL_FRACTION: u64 = 4;
/// Bigfloat.
pub const TAG_BIGFLOAT: u64 = 5;
/// Embedded CBOR data item.
pub const TAG_EMBEDDED_CBOR: u64 = 24;
/// URI.
pub const TAG_URI: u64 = 32;
/// base64url text.
pub const TAG_BASE64URL: u64 = 33;
/// base64 text.
pub const TAG_BASE64: u64 = 34;
/// Regular expression.
pub const TAG_REGEX: u64 = 35;
/// Generic constructor `[index, fields]`.
pub const TAG_CONSTRUCTOR_GENERIC: u64 = 102;
/// Mathematical finite set.
pub const TAG_SET: u64 = 258;
/// Self-described CBOR.
pub const TAG_SELF_DESCRIBED: u64 = 55_799;

const COMPACT_CONSTRUCTOR_BASE: u64 = 121;
const COMPACT_CONSTRUCTOR_MAX: u64 = 6;
const EXTENDED_CONSTRUCTOR_BASE: u64 = 1280;
const EXTENDED_CONSTRUCTOR_MAX: u64 = 127;

/// The compact tag for constructor `index`, or `None` when it needs the generic form (tag 102).
#[inline]
#[must_use]
pub const fn constructor_tag(index: u64) -> Option<u64> {
    if index <= COMPACT_CONSTRUCTOR_MAX {
        Some(COMPACT_CONSTRUCTOR_BASE + index)
    } else if index <= EXTENDED_CONSTRUCTOR_MAX {
        Some(EXTENDED_CONSTRUCTOR_BASE + index - (COMPACT_CONSTRUCTOR_MAX + 1))
    } else {
        None
    }
}

/// The constructor index carried by a compact tag.
#[inline]
#[must_use]
pub const fn constructor_index(tag: u64) -> Option<u64> {
    match tag {
        121..=127 => Some(tag - COMPACT_CONSTRUCTOR_BASE),
        1280..=1400 => Some(tag - EXTENDED_CONSTRUCTOR_BASE + COMPACT_CONSTRUCTOR_MAX + 1),
        _ => None,
    }
}

impl Decoder<'_> {
    pub(crate) fn tag(
        &mut self,
        h: &Header,
        path: &str,
        parent: Option<EntryId>,
    ) -> Result<CborValue, CborError> {
        let number = definite_arg(h)?;
        self.enter_tag(h.offset)?;
        if matches!(number, TAG_POS_BIGNUM | TAG_NEG_BIGNUM) {
            self.precheck_bignum(h)?;
        }
        let id = self.record(path, parent, h, true, || format!("tag({number})"));
        let content_path = self.child_path(path, format_args!(".value"));
        let content = self.item(&content_path, id)?;
        self.leave_tag();
        self.interpret(number, content, h.offset)
    }

    /// Reject an oversized bignum from its length field, before the payload is read.
    fn precheck_bignum(&self, tag: &Header) -> Result<(), CborError> {
        let mut ahead = self.cur;
        let Ok(inner) = read_header(&mut ahead, false) else {
            return Ok(());
        };
        if let (MAJOR_BYTES, Argument::Value(n)) = (inner.major, inner.arg) {
            self.check_bignum_len(n, tag.offset)?;
        }
        Ok(())
    }

    fn check_bignum_len(&self, len: u64, offset: usize) -> Result<(), CborError> {
        let max = self.opts.limits.max_bignum_bytes;
        if len > max as u64 {
            return Err(CborError::limit(ErrorCode::BignumTooLarge, offset, max as u64, len));
        }
        Ok(())
    }

    fn interpret(
        &self,
        number: u64,
        content: CborValue,
        offset: usize,
    ) -> Result<CborValue, CborError> {
        let strict = self.opts.validate_tag_semantics;
        let invalid = |code: ErrorCode| {
            CborError::new(code, offset).with_context(ErrorContext::Tag(number))
        };
        // Shape mismatch: an error under semantic validation, otherwise a generic tag.
        let mismatch = |content: CborValue| {
            if strict {
                Err(invalid(ErrorCode::InvalidTagContent))
            } else {
                Ok(CborValue::tag(number, content))
            }
        };

        match number {
            TAG_DATE_TIME => match &content {
                CborValue::Text(t) => {
                    if strict && OffsetDateTime::parse(t.as_str(), &Rfc3339).is_err() {
                        return Err(invalid(ErrorCode::InvalidTagContent));
                    }
                    Ok(CborValue::tag(number, content))
                }
                _ => mismatch(content),
            },
            TAG_EPOCH => match content {
                CborValue::Integer(_) | CborValue::Float(_) => Ok(CborValue::tag(number, content)),
                other => mismatch(other),
            },
            TAG_POS_BIGNUM | TAG_NEG_BIGNUM => match content {
                CborValue::Bytes(b) => {
                    self.check_bignum_len(b.as_slice().len() as u64, offset)?;
                    Ok(CborValue::Integer(CborInteger::from_parts(
                        number == TAG_NEG_BIGNUM,
                        b.as_slice(),
                    )))
                }
                other => mismatch(other),
            },
            TAG_DECIMAL_FRACTION | TAG_BIGFLOAT => match content {
                CborValue::Array(items) => match <[CborValue; 2]>::try_from(items) {
                    Ok([CborValue::Integer(exponent), CborValue::Integer(mantissa)]) => {
                        Ok(CborValue::Fraction(Fraction {
                            base: if number == TAG_DECIMAL_FRACTION {
                                FractionBase::Decimal
                            } else {
                                FractionBase::Binary
                            },
                            exponent,
                            mantissa,
                        }))
                    }
                    Ok(pair) => mismatch(CborValue::Array(pair.into())),
                    Err(items) => mismatch(CborValue::Array(items)),
                },
                other => mismatch(other),
            },
            21..=TAG_EMBEDDED_CBOR => match content {
                CborValue::Bytes(_) => Ok(CborValue::tag(number, content)),
                other => mismatch(other),
            },
            TAG_URI => match &content {
                CborValue::Text(t) => {
                    if strict && !has_uri_scheme(t.as_str()) {
                        return Err(invalid(ErrorCode::InvalidUri));
                    }
                    Ok(CborValue::tag(number, content))
                }
                _ => mismatch(content),
            },
            TAG_BASE64URL | TAG_BASE64 | TAG_REGEX => match &content {
                CborValue::Text(t) => {
                    if strict && !text_tag_valid(number, t.as_str()) {
                        return Err(invalid(ErrorCode::InvalidTagContent));
                    }
                    Ok(CborValue::tag(number, content))
                }
                _ => mismatch(content),
            },
            TAG_CONSTRUCTOR_GENERIC => match content {
                CborValue::Array(items) => match <[CborValue; 2]>::try_from(items) {
                    Ok([CborValue::Integer(index), CborValue::Array(fields)])
                        if index.as_i64().is_some_and(|i| i >= 0) =>
                    {
                        let index = index.as_i64().map_or(0, i64::unsigned_abs);
                        Ok(CborValue::Constructor(Constructor { index, fields }))
                    }
                    Ok(pair) => mismatch(CborValue::Array(pair.into())),
                    Err(items) => mismatch(CborValue::Array(items)),
                },
                other => mismatch(other),
            },
            TAG_SET => match content {
                CborValue::Array(items) => {
                    if self.opts.validate_set_uniqueness {
                        check_unique(&items, offset)?;
                    }
                    Ok(CborValue::Set(items))
                }
                other => mismatch(other),
            },
            TAG_SELF_DESCRIBED => Ok(content),
            _ => match constructor_index(number) {
                Some(index) => match content {
                    CborValue::Array(fields) => {
                        Ok(CborValue::Constructor(Constructor { index, fields }))
                    }
                    other => mismatch(other),
                },
                None => Ok(CborValue::tag(number, content)),
            },
        }
    }
}

fn check_unique(items: &[CborValue], offset: usize) -> Result<(), CborError> {
    let mut seen: HashSet<Vec<u8>> = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(canonical_key_bytes(item)?) {
            return Err(CborError::new(ErrorCode::DuplicateSetElement, offset)
                .with_context(ErrorContext::Tag(TAG_SET)));
        }
    }
    Ok(())
}

/// `scheme ":"` where `scheme = ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`.
fn has_uri_scheme(s: &str) -> bool {
    let Some((scheme, _)) = s.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn text_tag_valid(number: u64, s: &str) -> bool {
    match number {
        TAG_BASE64URL => URL_SAFE_NO_PAD.decode(s.trim_end_matches('=')).is_ok(),
        TAG_BASE64 => STANDARD.decode(s).is_ok(),
        TAG_REGEX => regex_syntax::Parser::new().parse(s).is_ok(),
        _ => true,
    }
}

