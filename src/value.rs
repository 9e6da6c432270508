use core::fmt;
use core::str::FromStr;

use crate::int;

/// Maximum exactly representable integer magnitude (2^53-1).
///
/// Integers in `[-(2^53-1), +(2^53-1)]` use the native form; everything else is promoted to
/// [`BigInt`].
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

/// Maximum safe integer as i64 (2^53-1).
pub const MAX_SAFE_INTEGER_I64: i64 = 9_007_199_254_740_991;

/// Minimum safe integer (-(2^53-1)).
pub const MIN_SAFE_INTEGER: i64 = -MAX_SAFE_INTEGER_I64;

/// An arbitrary-precision integer in CBOR sign/magnitude form.
///
/// A non-negative value `n` is stored as `(false, n)`. A negative value `v` is stored as
/// `(true, -1 - v)`, the same argument CBOR carries for major type 1 and tag 3.
/// Magnitudes are normalized (no leading zero bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BigInt {
    negative: bool,
    magnitude: Vec<u8>,
}

impl BigInt {
    /// Construct from the sign flag and a big-endian magnitude.
    #[must_use]
    pub fn new(negative: bool, magnitude: &[u8]) -> Self {
        Self {
            negative,
            magnitude: int::strip_leading_zeros(magnitude).to_vec(),
        }
    }

    /// Construct from an `i128`.
    #[must_use]
    pub fn from_i128(v: i128) -> Self {
        if v < 0 {
            // -1 - v is non-negative for every negative i128.
            let n = (-1 - v).unsigned_abs();
            Self {
                negative: true,
                magnitude: int::magnitude_from_u128(n),
            }
        } else {
            Self {
                negative: false,
                magnitude: int::magnitude_from_u128(v.unsigned_abs()),
            }
        }
    }

    /// Sign flag: `true` if this is a negative value (tag 3 / major type 1).
    #[inline]
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.negative
    }

    /// The normalized big-endian CBOR argument (`n` for `n`, `-1 - v` for negative `v`).
    #[inline]
    #[must_use]
    pub fn magnitude(&self) -> &[u8] {
        &self.magnitude
    }

    /// Convert to `i128` if it fits.
    #[must_use]
    pub fn to_i128(&self) -> Option<i128> {
        let n = i128::try_from(int::magnitude_to_u128(&self.magnitude)?).ok()?;
        if self.negative {
            Some(-1 - n)
        } else {
            Some(n)
        }
    }
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-{}", int::to_decimal(&int::add_one(&self.magnitude)))
        } else {
            f.write_str(&int::to_decimal(&self.magnitude))
        }
    }
}

/// Error returned when parsing a decimal integer string fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseIntegerError;

impl fmt::Display for ParseIntegerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid decimal integer")
    }
}

impl std::error::Error for ParseIntegerError {}

impl FromStr for BigInt {
    type Err = ParseIntegerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(digits) = s.strip_prefix('-') {
            let mag = int::from_decimal(digits).ok_or(ParseIntegerError)?;
            if mag.is_empty() {
                return Ok(Self::new(false, &[]));
            }
            Ok(Self {
                negative: true,
                magnitude: int::sub_one(&mag),
            })
        } else {
            let mag = int::from_decimal(s).ok_or(ParseIntegerError)?;
            Ok(Self {
                negative: false,
                magnitude: mag,
            })
        }
    }
}

/// An integer: native when inside the safe range, arbitrary precision otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CborInteger(IntegerRepr);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IntegerRepr {
    Small(i64),
    Big(BigInt),
}

impl CborInteger {
    /// Construct from sign/magnitude form, choosing the native form when the value is safe.
    #[must_use]
    pub fn from_parts(negative: bool, magnitude: &[u8]) -> Self {
        match int::magnitude_to_u64(magnitude) {
            Some(n) if negative && n < MAX_SAFE_INTEGER => {
                // -1 - n >= -(2^53 - 1)
                Self(IntegerRepr::Small(-1 - n as i64))
            }
            Some(n) if !negative && n <= MAX_SAFE_INTEGER => Self(IntegerRepr::Small(n as i64)),
            _ => Self(IntegerRepr::Big(BigInt::new(negative, magnitude))),
        }
    }

    /// Construct from a major-type 0 argument.
    #[must_use]
    pub fn from_unsigned(n: u64) -> Self {
        Self::from_parts(false, &n.to_be_bytes())
    }

    /// Construct from a major-type 1 argument (value `-1 - n`).
    #[must_use]
    pub fn from_negative_arg(n: u64) -> Self {
        Self::from_parts(true, &n.to_be_bytes())
    }

    /// Construct from an `i128`.
    #[must_use]
    pub fn from_i128(v: i128) -> Self {
        if v >= i128::from(MIN_SAFE_INTEGER) && v <= i128::from(MAX_SAFE_INTEGER_I64) {
            #[allow(clippy::cast_possible_truncation)]
            return Self(IntegerRepr::Small(v as i64));
        }
        Self(IntegerRepr::Big(BigInt::from_i128(v)))
    }

    /// Construct from an arbitrary-precision value, demoting it when safe.
    #[must_use]
    pub fn from_bigint(big: BigInt) -> Self {
        Self::from_parts(big.negative, &big.magnitude)
    }

    /// Returns `true` iff this uses the native form.
    #[inline]
    #[must_use]
    pub const fn is_small(&self) -> bool {
        matches!(self.0, IntegerRepr::Small(_))
    }

    /// Returns `true` iff this uses the arbitrary-precision form.
    #[inline]
    #[must_use]
    pub const fn is_big(&self) -> bool {
        matches!(self.0, IntegerRepr::Big(_))
    }

    /// Return the native value if this is in the safe range.
    #[inline]
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match &self.0 {
            IntegerRepr::Small(v) => Some(*v),
            IntegerRepr::Big(_) => None,
        }
    }

    /// Return the arbitrary-precision value, if promoted.
    #[inline]
    #[must_use]
    pub const fn as_bigint(&self) -> Option<&BigInt> {
        match &self.0 {
            IntegerRepr::Big(b) => Some(b),
            IntegerRepr::Small(_) => None,
        }
    }

    /// Convert to `i128` if it fits.
    #[must_use]
    pub fn to_i128(&self) -> Option<i128> {
        match &self.0 {
            IntegerRepr::Small(v) => Some(i128::from(*v)),
            IntegerRepr::Big(b) => b.to_i128(),
        }
    }

    /// Returns `true` for values below zero.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        match &self.0 {
            IntegerRepr::Small(v) => *v < 0,
            IntegerRepr::Big(b) => b.negative,
        }
    }

    /// The CBOR sign flag and argument magnitude.
    #[must_use]
    pub fn to_parts(&self) -> (bool, Vec<u8>) {
        match &self.0 {
            IntegerRepr::Small(v) if *v < 0 => {
                let n = (-1 - *v).unsigned_abs();
                (true, int::magnitude_from_u128(u128::from(n)))
            }
            IntegerRepr::Small(v) => (false, int::magnitude_from_u128(u128::from(v.unsigned_abs()))),
            IntegerRepr::Big(b) => (b.negative, b.magnitude.clone()),
        }
    }
}

impl fmt::Display for CborInteger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            IntegerRepr::Small(v) => write!(f, "{v}"),
            IntegerRepr::Big(b) => write!(f, "{b}"),
        }
    }
}

impl FromStr for CborInteger {
    type Err = ParseIntegerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<BigInt>().map(Self::from_bigint)
    }
}

impl From<BigInt> for CborInteger {
    fn from(value: BigInt) -> Self {
        Self::from_bigint(value)
    }
}

macro_rules! impl_integer_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for CborInteger {
                fn from(v: $t) -> Self {
                    Self::from_i128(i128::from(v))
                }
            }

            impl From<$t> for CborValue {
                fn from(v: $t) -> Self {
                    Self::Integer(CborInteger::from(v))
                }
            }
        )*
    };
}

impl_integer_from!(i8, i16, i32, i64, u8, u16, u32, u64);

/// The encoded width a float was read with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FloatWidth {
    /// binary16.
    Half,
    /// binary32.
    Single,
    /// binary64.
    Double,
}

/// A floating-point value with the width it was decoded from.
///
/// Equality compares the `f64` bit pattern and ignores the width, so `-0.0 != 0.0` and a NaN
/// equals a NaN with the same payload.
#[derive(Debug, Clone, Copy)]
pub struct Float {
    value: f64,
    width: FloatWidth,
}

impl Float {
    /// A double-width float.
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self {
            value,
            width: FloatWidth::Double,
        }
    }

    /// A float remembered as having been encoded at `width`.
    #[must_use]
    pub const fn with_width(value: f64, width: FloatWidth) -> Self {
        Self { value, width }
    }

    /// The value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> f64 {
        self.value
    }

    /// The encoded width.
    #[inline]
    #[must_use]
    pub const fn width(self) -> FloatWidth {
        self.width
    }
}

impl PartialEq for Float {
    fn eq(&self, other: &Self) -> bool {
        self.value.to_bits() == other.value.to_bits()
    }
}

impl Eq for Float {}

impl From<f64> for CborValue {
    fn from(v: f64) -> Self {
        Self::Float(Float::new(v))
    }
}

/// A byte string. Indefinite-length strings keep their chunks.
#[derive(Debug, Clone, Default)]
pub struct ByteString {
    bytes: Vec<u8>,
    chunks: Option<Vec<Vec<u8>>>,
}

impl ByteString {
    /// A definite-length byte string.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            chunks: None,
        }
    }

    /// An indefinite-length byte string built from chunks.
    #[must_use]
    pub fn from_chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            bytes: chunks.concat(),
            chunks: Some(chunks),
        }
    }

    /// The concatenated content.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// The chunks, if this was indefinite-length.
    #[must_use]
    pub fn chunks(&self) -> Option<&[Vec<u8>]> {
        self.chunks.as_deref()
    }

    /// Consume and return the content.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

impl PartialEq for ByteString {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for ByteString {}

/// A text string. Indefinite-length strings keep their chunks.
#[derive(Debug, Clone, Default)]
pub struct TextString {
    text: String,
    chunks: Option<Vec<String>>,
}

impl TextString {
    /// A definite-length text string.
    #[must_use]
    pub const fn new(text: String) -> Self {
        Self { text, chunks: None }
    }

    /// An indefinite-length text string built from chunks.
    #[must_use]
    pub fn from_chunks(chunks: Vec<String>) -> Self {
        Self {
            text: chunks.concat(),
            chunks: Some(chunks),
        }
    }

    /// The concatenated content.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The chunks, if this was indefinite-length.
    #[must_use]
    pub fn chunks(&self) -> Option<&[String]> {
        self.chunks.as_deref()
    }

    /// Consume and return the content.
    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}

impl PartialEq for TextString {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for TextString {}

/// A map as ordered key/value entries, in encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CborMap {
    entries: Vec<(CborValue, CborValue)>,
}

impl CborMap {
    /// An empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Wrap entries as given. Order and duplicates are preserved.
    #[must_use]
    pub const fn from_entries(entries: Vec<(CborValue, CborValue)>) -> Self {
        Self { entries }
    }

    /// Insert, replacing the value of an equal key in place. Returns the previous value.
    pub fn insert(&mut self, key: CborValue, value: CborValue) -> Option<CborValue> {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(core::mem::replace(&mut slot.1, value));
        }
        self.entries.push((key, value));
        None
    }

    /// Look up a value by key.
    #[must_use]
    pub fn get(&self, key: &CborValue) -> Option<&CborValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Look up a value by text key.
    #[must_use]
    pub fn get_text(&self, key: &str) -> Option<&CborValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_text() == Some(key))
            .map(|(_, v)| v)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&CborValue, &CborValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Borrow the entries.
    #[must_use]
    pub fn entries(&self) -> &[(CborValue, CborValue)] {
        &self.entries
    }

    /// Consume into entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<(CborValue, CborValue)> {
        self.entries
    }
}

/// An unrecognized (or informational) tag and its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Tag number.
    pub number: u64,
    /// Tagged content.
    pub content: Box<CborValue>,
}

/// A constructor value (tags 121..=127, 1280..=1400, and 102).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructor {
    /// Constructor alternative.
    pub index: u64,
    /// Constructor fields.
    pub fields: Vec<CborValue>,
}

/// Base of a [`Fraction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FractionBase {
    /// Decimal fraction (tag 4): `mantissa * 10^exponent`.
    Decimal,
    /// Bigfloat (tag 5): `mantissa * 2^exponent`.
    Binary,
}

/// A decimal fraction or bigfloat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fraction {
    /// Base of the exponent.
    pub base: FractionBase,
    /// Exponent.
    pub exponent: CborInteger,
    /// Mantissa.
    pub mantissa: CborInteger,
}

/// An owned decoded data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CborValue {
    /// Major type 0/1, or a tag 2/3 bignum.
    Integer(CborInteger),
    /// Major type 2.
    Bytes(ByteString),
    /// Major type 3.
    Text(TextString),
    /// Major type 4.
    Array(Vec<CborValue>),
    /// Major type 5.
    Map(CborMap),
    /// Major type 6 with no dedicated interpretation.
    Tag(Tag),
    /// Constructor tag.
    Constructor(Constructor),
    /// Tag 4 or 5.
    Fraction(Fraction),
    /// Tag 258.
    Set(Vec<CborValue>),
    /// Simple values 20/21.
    Bool(bool),
    /// Simple value 22.
    Null,
    /// Simple value 23.
    Undefined,
    /// Any other simple value.
    Simple(u8),
    /// Major type 7 float.
    Float(Float),
}

impl CborValue {
    /// A definite-length text string.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(TextString::new(s.into()))
    }

    /// A definite-length byte string.
    #[must_use]
    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(ByteString::new(b.into()))
    }

    /// A generic tag.
    #[must_use]
    pub fn tag(number: u64, content: Self) -> Self {
        Self::Tag(Tag {
            number,
            content: Box::new(content),
        })
    }

    /// A map from entries, in the given order.
    #[must_use]
    pub fn map(entries: Vec<(Self, Self)>) -> Self {
        Self::Map(CborMap::from_entries(entries))
    }

    /// Borrow as an integer.
    #[must_use]
    pub const fn as_integer(&self) -> Option<&CborInteger> {
        match self {
            Self::Integer(i) => Some(i),
            _ => None,
        }
    }

    /// Borrow as a native integer.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => i.as_i64(),
            _ => None,
        }
    }

    /// Borrow as text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }

    /// Borrow as bytes.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    /// Borrow as an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Borrow as a map.
    #[must_use]
    pub const fn as_map(&self) -> Option<&CborMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns `true` for null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Deterministic string form used for map-key path segments and JSON object keys.
    pub(crate) fn key_label(&self) -> String {
        match self {
            Self::Text(t) => t.as_str().to_owned(),
            Self::Integer(i) => i.to_string(),
            Self::Bytes(b) => format!("h'{}'", hex::encode(b.as_slice())),
            Self::Bool(b) => b.to_string(),
            Self::Null => "null".to_owned(),
            Self::Undefined => "undefined".to_owned(),
            Self::Simple(v) => format!("simple({v})"),
            Self::Float(f) => f.value().to_string(),
            other => match crate::encode::canonical_key_bytes(other) {
                Ok(encoded) => format!("<{}>", hex::encode(encoded)),
                Err(_) => format!("<{other:?}>"),
            },
        }
    }

    /// Compute the SHA-256 digest of the canonical encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if canonical encoding fails.
    #[cfg(feature = "sha2")]
    #[cfg_attr(docsrs, doc(cfg(feature = "sha2")))]
    pub fn sha256_canonical(&self) -> Result<[u8; 32], crate::CborError> {
        use sha2::{Digest, Sha256};
        let bytes = crate::encode(self, &crate::EncodeOptions::canonical())?;
        let mut h = Sha256::new();
        h.update(&bytes);
        let out = h.finalize();
        let mut digest = [0u8; 32];
        digest.copy_from_slice(out.as_slice());
        Ok(digest)
    }
}

impl From<bool> for CborValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for CborValue {
    fn from(v: &str) -> Self {
        Self::text(v)
    }
}

impl From<String> for CborValue {
    fn from(v: String) -> Self {
        Self::text(v)
    }
}

impl From<Vec<u8>> for CborValue {
    fn from(v: Vec<u8>) -> Self {
        Self::bytes(v)
    }
}

impl From<CborInteger> for CborValue {
    fn from(v: CborInteger) -> Self {
        Self::Integer(v)
    }
}

impl From<Vec<Self>> for CborValue {
    fn from(v: Vec<Self>) -> Self {
        Self::Array(v)
    }
}
