use core::cmp::Ordering;
use std::time::Instant;

use tracing::debug;

use crate::alloc_util::try_reserve;
use crate::decode::elapsed_us;
use crate::error::ErrorContext;
use crate::float::{f64_to_f16_exact, f64_to_f32_exact};
use crate::tags::{
    constructor_tag, TAG_BIGFLOAT, TAG_CONSTRUCTOR_GENERIC, TAG_DECIMAL_FRACTION,
    TAG_NEG_BIGNUM, TAG_POS_BIGNUM, TAG_SET,
};
use crate::value::{
    ByteString, CborMap, CborValue, Constructor, Float, FloatWidth, Fraction, FractionBase,
    TextString,
};
use crate::wire::{
    BREAK, MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE, MAJOR_TAG, MAJOR_TEXT,
    MAJOR_UNSIGNED,
};
use crate::{CborError, CborInteger, EncodeOptions, ErrorCode};

struct VecSink {
    buf: Vec<u8>,
    max: usize,
}

impl VecSink {
    const fn new(max: usize) -> Self {
        Self {
            buf: Vec::new(),
            max,
        }
    }

    #[inline]
    fn reserve(&mut self, additional: usize) -> Result<(), CborError> {
        let offset = self.buf.len();
        let needed = offset
            .checked_add(additional)
            .ok_or_else(|| CborError::new(ErrorCode::LengthOverflow, offset))?;
        if needed > self.max {
            return Err(CborError::limit(
                ErrorCode::OutputSizeExceeded,
                offset,
                self.max as u64,
                needed as u64,
            ));
        }
        let available = self.buf.capacity().saturating_sub(offset);
        if additional <= available {
            return Ok(());
        }
        try_reserve(&mut self.buf, additional, offset)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), CborError> {
        self.reserve(bytes.len())?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn write_u8(&mut self, byte: u8) -> Result<(), CborError> {
        self.reserve(1)?;
        self.buf.push(byte);
        Ok(())
    }

    fn position(&self) -> usize {
        self.buf.len()
    }
}

/// Streaming encoder that writes items directly into a `Vec<u8>`.
///
/// Every head uses the shortest argument form. Output is capped at a maximum size; writes past it
/// fail with `OutputSizeExceeded` instead of growing the buffer.
pub struct Encoder {
    sink: VecSink,
}

impl Encoder {
    /// Create an encoder capped at the default maximum output size.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_max_output(crate::limits::DEFAULT_MAX_OUTPUT_SIZE)
    }

    /// Create an encoder capped at `max_output` bytes.
    #[must_use]
    pub const fn with_max_output(max_output: usize) -> Self {
        Self {
            sink: VecSink::new(max_output),
        }
    }

    /// Return the number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sink.buf.len()
    }

    /// Returns `true` if no bytes have been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sink.buf.is_empty()
    }

    /// Borrow the bytes emitted so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.sink.buf
    }

    /// Consume and return the encoded bytes.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.sink.buf
    }

    fn remaining(&self) -> usize {
        self.sink.max.saturating_sub(self.sink.buf.len())
    }

    /// Write a head with the shortest argument form.
    ///
    /// # Errors
    ///
    /// Returns an error if the output limit is reached.
    pub fn head(&mut self, major: u8, value: u64) -> Result<(), CborError> {
        debug_assert!(major <= 7);
        let ib = major << 5;
        if let Ok(v8) = u8::try_from(value) {
            if v8 < 24 {
                return self.sink.write_u8(ib | v8);
            }
            return self.sink.write(&[ib | 24, v8]);
        }
        if let Ok(v16) = u16::try_from(value) {
            let b = v16.to_be_bytes();
            return self.sink.write(&[ib | 25, b[0], b[1]]);
        }
        if let Ok(v32) = u32::try_from(value) {
            self.sink.write_u8(ib | 26)?;
            return self.sink.write(&v32.to_be_bytes());
        }
        self.sink.write_u8(ib | 27)?;
        self.sink.write(&value.to_be_bytes())
    }

    /// Encode an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns an error if the output limit is reached.
    pub fn uint(&mut self, v: u64) -> Result<(), CborError> {
        self.head(MAJOR_UNSIGNED, v)
    }

    /// Encode a native signed integer.
    ///
    /// # Errors
    ///
    /// Returns an error if the output limit is reached.
    pub fn int(&mut self, v: i64) -> Result<(), CborError> {
        if v >= 0 {
            self.head(MAJOR_UNSIGNED, v.unsigned_abs())
        } else {
            self.head(MAJOR_NEGATIVE, (-1 - v).unsigned_abs())
        }
    }

    /// Encode an integer of any size: major type 0/1 when the argument fits 64 bits, otherwise a
    /// tag 2/3 bignum.
    ///
    /// # Errors
    ///
    /// Returns an error if the output limit is reached.
    pub fn integer(&mut self, v: &CborInteger) -> Result<(), CborError> {
        if let Some(small) = v.as_i64() {
            return self.int(small);
        }
        let (negative, magnitude) = v.to_parts();
        if magnitude.len() <= 8 {
            let mut raw = [0u8; 8];
            raw[8 - magnitude.len()..].copy_from_slice(&magnitude);
            let n = u64::from_be_bytes(raw);
            let major = if negative { MAJOR_NEGATIVE } else { MAJOR_UNSIGNED };
            return self.head(major, n);
        }
        self.tag(if negative { TAG_NEG_BIGNUM } else { TAG_POS_BIGNUM })?;
        self.bytes(&magnitude)
    }

    /// Encode a byte string.
    ///
    /// # Errors
    ///
    /// Returns an error if the output limit is reached.
    pub fn bytes(&mut self, b: &[u8]) -> Result<(), CborError> {
        self.head(MAJOR_BYTES, b.len() as u64)?;
        self.sink.write(b)
    }

    /// Encode a text string.
    ///
    /// # Errors
    ///
    /// Returns an error if the output limit is reached.
    pub fn text(&mut self, s: &str) -> Result<(), CborError> {
        self.head(MAJOR_TEXT, s.len() as u64)?;
        self.sink.write(s.as_bytes())
    }

    /// Write a definite-length array head.
    ///
    /// # Errors
    ///
    /// Returns an error if the output limit is reached.
    pub fn array_header(&mut self, len: usize) -> Result<(), CborError> {
        self.head(MAJOR_ARRAY, len as u64)
    }

    /// Write a definite-length map head.
    ///
    /// # Errors
    ///
    /// Returns an error if the output limit is reached.
    pub fn map_header(&mut self, len: usize) -> Result<(), CborError> {
        self.head(MAJOR_MAP, len as u64)
    }

    /// Write a tag head.
    ///
    /// # Errors
    ///
    /// Returns an error if the output limit is reached.
    pub fn tag(&mut self, tag: u64) -> Result<(), CborError> {
        self.head(MAJOR_TAG, tag)
    }

    /// Start an indefinite-length string, array, or map.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOptions` for a major type without an indefinite form, or an error if the
    /// output limit is reached.
    pub fn begin_indefinite(&mut self, major: u8) -> Result<(), CborError> {
        if !matches!(major, MAJOR_BYTES | MAJOR_TEXT | MAJOR_ARRAY | MAJOR_MAP) {
            return Err(CborError::new(ErrorCode::InvalidOptions, self.sink.position()));
        }
        self.sink.write_u8((major << 5) | 31)
    }

    /// Write the break code.
    ///
    /// # Errors
    ///
    /// Returns an error if the output limit is reached.
    pub fn end_indefinite(&mut self) -> Result<(), CborError> {
        self.sink.write_u8(BREAK)
    }

    /// Encode a boolean.
    ///
    /// # Errors
    ///
    /// Returns an error if the output limit is reached.
    pub fn bool(&mut self, v: bool) -> Result<(), CborError> {
        self.sink.write_u8(if v { 0xf5 } else { 0xf4 })
    }

    /// Encode null.
    ///
    /// # Errors
    ///
    /// Returns an error if the output limit is reached.
    pub fn null(&mut self) -> Result<(), CborError> {
        self.sink.write_u8(0xf6)
    }

    /// Encode undefined.
    ///
    /// # Errors
    ///
    /// Returns an error if the output limit is reached.
    pub fn undefined(&mut self) -> Result<(), CborError> {
        self.sink.write_u8(0xf7)
    }

    /// Encode an unassigned simple value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSimpleValue` for 20..=31, which are either named values or reserved.
    pub fn simple(&mut self, v: u8) -> Result<(), CborError> {
        match v {
            0..=19 => self.sink.write_u8(0xe0 | v),
            20..=31 => Err(CborError::new(ErrorCode::InvalidSimpleValue, self.sink.position())
                .with_context(ErrorContext::Simple(v))),
            _ => self.sink.write(&[0xf8, v]),
        }
    }

    /// Encode a float at the narrowest width that holds it exactly.
    ///
    /// # Errors
    ///
    /// Returns an error if the output limit is reached.
    pub fn float_shortest(&mut self, v: f64) -> Result<(), CborError> {
        if let Some(h) = f64_to_f16_exact(v) {
            return self.float16_bits(h);
        }
        if let Some(s) = f64_to_f32_exact(v) {
            return self.float32(s);
        }
        self.float64(v)
    }

    /// Encode a binary16 bit pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the output limit is reached.
    pub fn float16_bits(&mut self, bits: u16) -> Result<(), CborError> {
        let b = bits.to_be_bytes();
        self.sink.write(&[0xf9, b[0], b[1]])
    }

    /// Encode a binary32 float.
    ///
    /// # Errors
    ///
    /// Returns an error if the output limit is reached.
    pub fn float32(&mut self, v: f32) -> Result<(), CborError> {
        self.sink.write_u8(0xfa)?;
        self.sink.write(&v.to_bits().to_be_bytes())
    }

    /// Encode a binary64 float.
    ///
    /// # Errors
    ///
    /// Returns an error if the output limit is reached.
    pub fn float64(&mut self, v: f64) -> Result<(), CborError> {
        self.sink.write_u8(0xfb)?;
        self.sink.write(&v.to_bits().to_be_bytes())
    }

    /// Splice pre-encoded bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the output limit is reached.
    pub fn raw(&mut self, bytes: &[u8]) -> Result<(), CborError> {
        self.sink.write(bytes)
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare two encoded keys: shorter first, then bytewise.
#[inline]
#[must_use]
pub fn cmp_encoded_keys(a: &[u8], b: &[u8]) -> Ordering {
    match a.len().cmp(&b.len()) {
        Ordering::Equal => a.cmp(b),
        other => other,
    }
}

struct ValueEncoder {
    enc: Encoder,
    opts: EncodeOptions,
}

impl ValueEncoder {
    fn new(opts: EncodeOptions) -> Self {
        Self {
            enc: Encoder::with_max_output(opts.limits.max_output_size),
            opts,
        }
    }

    /// An encoder for a detached fragment, sharing the remaining output budget.
    fn fragment(&self) -> Self {
        Self {
            enc: Encoder::with_max_output(self.enc.remaining()),
            opts: self.opts,
        }
    }

    fn enter(&self, depth: usize) -> Result<usize, CborError> {
        let next = depth + 1;
        if next > self.opts.limits.max_depth {
            return Err(CborError::limit(
                ErrorCode::MaxDepthExceeded,
                self.enc.len(),
                self.opts.limits.max_depth as u64,
                next as u64,
            ));
        }
        Ok(next)
    }

    fn value(&mut self, v: &CborValue, depth: usize) -> Result<(), CborError> {
        match v {
            CborValue::Integer(i) => self.enc.integer(i),
            CborValue::Bytes(b) => self.byte_string(b),
            CborValue::Text(t) => self.text_string(t),
            CborValue::Array(items) => {
                let depth = self.enter(depth)?;
                self.enc.array_header(items.len())?;
                self.items(items, depth)
            }
            CborValue::Map(m) => {
                let depth = self.enter(depth)?;
                self.map(m, depth)
            }
            CborValue::Tag(t) => {
                let depth = self.enter(depth)?;
                self.enc.tag(t.number)?;
                self.value(&t.content, depth)
            }
            CborValue::Constructor(c) => self.constructor(c, depth),
            CborValue::Fraction(f) => self.fraction(f, depth),
            CborValue::Set(items) => {
                let depth = self.enter(depth)?;
                self.enc.tag(TAG_SET)?;
                let depth = self.enter(depth)?;
                self.enc.array_header(items.len())?;
                self.items(items, depth)
            }
            CborValue::Bool(b) => self.enc.bool(*b),
            CborValue::Null => self.enc.null(),
            CborValue::Undefined => self.enc.undefined(),
            CborValue::Simple(s) => self.enc.simple(*s),
            CborValue::Float(f) => self.float(*f),
        }
    }

    fn items(&mut self, items: &[CborValue], depth: usize) -> Result<(), CborError> {
        for item in items {
            self.value(item, depth)?;
        }
        Ok(())
    }

    fn indefinite_allowed(&self) -> bool {
        self.opts.allow_indefinite && !self.opts.canonical
    }

    fn byte_string(&mut self, b: &ByteString) -> Result<(), CborError> {
        match b.chunks() {
            Some(chunks) if self.indefinite_allowed() => {
                self.enc.begin_indefinite(MAJOR_BYTES)?;
                for chunk in chunks {
                    self.enc.bytes(chunk)?;
                }
                self.enc.end_indefinite()
            }
            _ => self.enc.bytes(b.as_slice()),
        }
    }

    fn text_string(&mut self, t: &TextString) -> Result<(), CborError> {
        match t.chunks() {
            Some(chunks) if self.indefinite_allowed() => {
                self.enc.begin_indefinite(MAJOR_TEXT)?;
                for chunk in chunks {
                    self.enc.text(chunk)?;
                }
                self.enc.end_indefinite()
            }
            _ => self.enc.text(t.as_str()),
        }
    }

    fn float(&mut self, f: Float) -> Result<(), CborError> {
        let v = f.value();
        if self.opts.canonical {
            return self.enc.float_shortest(v);
        }
        match f.width() {
            FloatWidth::Half => match f64_to_f16_exact(v) {
                Some(h) => self.enc.float16_bits(h),
                None => self.enc.float64(v),
            },
            FloatWidth::Single => match f64_to_f32_exact(v) {
                Some(s) => self.enc.float32(s),
                None => self.enc.float64(v),
            },
            FloatWidth::Double => self.enc.float64(v),
        }
    }

    fn map(&mut self, m: &CborMap, depth: usize) -> Result<(), CborError> {
        if !self.opts.canonical && !self.opts.reject_duplicate_keys {
            self.enc.map_header(m.len())?;
            for (k, v) in m.iter() {
                self.value(k, depth)?;
                self.value(v, depth)?;
            }
            return Ok(());
        }

        // (comparison key, encoded entry)
        let mut encoded: Vec<(Vec<u8>, Vec<u8>)> = Vec::with_capacity(m.len());
        for (k, v) in m.iter() {
            let mut frag = self.fragment();
            frag.value(k, depth)?;
            let key_len = frag.enc.len();
            frag.value(v, depth)?;
            let entry = frag.enc.into_vec();
            let cmp_key = if self.opts.canonical {
                entry[..key_len].to_vec()
            } else {
                canonical_key_bytes(k)?
            };
            encoded.push((cmp_key, entry));
        }

        if self.opts.canonical {
            encoded.sort_by(|a, b| cmp_encoded_keys(&a.0, &b.0));
            if let Some(pair) = encoded.windows(2).find(|w| w[0].0 == w[1].0) {
                debug!(target: "cbor_lens::encode", key_len = pair[0].0.len(), "duplicate map key");
                return Err(CborError::new(ErrorCode::DuplicateMapKey, self.enc.len()));
            }
        } else {
            let mut seen: Vec<&[u8]> = encoded.iter().map(|e| e.0.as_slice()).collect();
            seen.sort_unstable();
            if seen.windows(2).any(|w| w[0] == w[1]) {
                return Err(CborError::new(ErrorCode::DuplicateMapKey, self.enc.len()));
            }
        }

        self.enc.map_header(encoded.len())?;
        for (_, entry) in &encoded {
            self.enc.raw(entry)?;
        }
        Ok(())
    }

    fn constructor(&mut self, c: &Constructor, depth: usize) -> Result<(), CborError> {
        let depth = self.enter(depth)?;
        if let Some(tag) = constructor_tag(c.index) {
            self.enc.tag(tag)?;
            let depth = self.enter(depth)?;
            self.enc.array_header(c.fields.len())?;
            return self.items(&c.fields, depth);
        }
        self.enc.tag(TAG_CONSTRUCTOR_GENERIC)?;
        let depth = self.enter(depth)?;
        self.enc.array_header(2)?;
        self.enc.uint(c.index)?;
        let depth = self.enter(depth)?;
        self.enc.array_header(c.fields.len())?;
        self.items(&c.fields, depth)
    }

    fn fraction(&mut self, f: &Fraction, depth: usize) -> Result<(), CborError> {
        let depth = self.enter(depth)?;
        self.enc.tag(match f.base {
            FractionBase::Decimal => TAG_DECIMAL_FRACTION,
            FractionBase::Binary => TAG_BIGFLOAT,
        })?;
        self.enter(depth)?;
        self.enc.array_header(2)?;
        self.enc.integer(&f.exponent)?;
        self.enc.integer(&f.mantissa)
    }
}

/// Canonical encoding of a value, used to compare map keys and set elements.
pub(crate) fn canonical_key_bytes(v: &CborValue) -> Result<Vec<u8>, CborError> {
    // Depth was already bounded when the value was decoded or encoded.
    let limits = crate::Limits {
        max_depth: usize::MAX,
        ..crate::Limits::default()
    };
    let mut e = ValueEncoder::new(EncodeOptions::canonical().with_limits(limits));
    e.value(v, 0)?;
    Ok(e.enc.into_vec())
}

/// Encode one value.
///
/// # Errors
///
/// Returns `InvalidOptions` for conflicting options, `OutputSizeExceeded` if the output would
/// exceed `max_output_size`, `MaxDepthExceeded` for values nested deeper than `max_depth`,
/// `DuplicateMapKey` when duplicate keys are rejected, or `InvalidSimpleValue` for a reserved
/// simple value.
pub fn encode(value: &CborValue, options: &EncodeOptions) -> Result<Vec<u8>, CborError> {
    let started = Instant::now();
    let opts = options.resolve()?;
    let mut e = ValueEncoder::new(opts);
    e.value(value, 0)?;
    let out = e.enc.into_vec();
    debug!(
        target: "cbor_lens::encode",
        len = out.len(),
        canonical = opts.canonical,
        elapsed_us = elapsed_us(started),
        "encoded item"
    );
    Ok(out)
}

/// Encode values back to back with no enclosing wrapper (a CBOR sequence).
///
/// # Errors
///
/// Returns the first error produced by any item; see [`encode`].
pub fn encode_sequence(values: &[CborValue], options: &EncodeOptions) -> Result<Vec<u8>, CborError> {
    let started = Instant::now();
    let opts = options.resolve()?;
    let mut e = ValueEncoder::new(opts);
    for v in values {
        e.value(v, 0)?;
    }
    let out = e.enc.into_vec();
    debug!(
        target: "cbor_lens::encode",
        items = values.len(),
        len = out.len(),
        elapsed_us = elapsed_us(started),
        "encoded sequence"
    );
    Ok(out)
}
