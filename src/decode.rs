use std::time::Instant;

use tracing::debug;

use crate::error::ErrorContext;
use crate::float::{f16_to_f64, f32_to_f64};
use crate::sourcemap::{EntryId, NodeSpan, SourceMapBuilder, SourceMapEntry};
use crate::value::{CborValue, Float, FloatWidth};
use crate::wire::{
    read_header, Argument, Cursor, Header, MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE,
    MAJOR_SIMPLE, MAJOR_TAG, MAJOR_TEXT, MAJOR_UNSIGNED,
};
use crate::{CborError, CborInteger, DecodeOptions, ErrorCode};

/// The result of [`decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The decoded item.
    pub value: CborValue,
    /// Number of input bytes the item occupied.
    pub bytes_consumed: usize,
}

/// The result of [`decode_with_source_map`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedWithSourceMap {
    /// The decoded item.
    pub value: CborValue,
    /// Number of input bytes the item occupied.
    pub bytes_consumed: usize,
    /// Byte-range annotations, parent before children.
    pub source_map: Vec<SourceMapEntry>,
}

/// Recursive-descent state for one call.
///
/// Depth counters are threaded through the walk explicitly; nothing here outlives the call.
pub(crate) struct Decoder<'a> {
    pub(crate) cur: Cursor<'a>,
    pub(crate) opts: DecodeOptions,
    started: Instant,
    deadline: Option<Instant>,
    depth: usize,
    tag_depth: usize,
    pub(crate) source_map: Option<SourceMapBuilder>,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8], options: &DecodeOptions, source_map: bool) -> Result<Self, CborError> {
        let opts = options.resolve();
        opts.limits.validate()?;
        if data.len() > opts.limits.max_input_size {
            return Err(CborError::limit(
                ErrorCode::InputTooLarge,
                0,
                opts.limits.max_input_size as u64,
                data.len() as u64,
            ));
        }
        let started = Instant::now();
        Ok(Self {
            cur: Cursor::new(data, 0),
            opts,
            started,
            deadline: started.checked_add(opts.limits.max_parse_time()),
            depth: 0,
            tag_depth: 0,
            source_map: source_map.then(SourceMapBuilder::new),
        })
    }

    #[inline]
    fn check_deadline(&self) -> Result<(), CborError> {
        match self.deadline {
            Some(deadline) if Instant::now() > deadline => Err(CborError::limit(
                ErrorCode::ParseTimeout,
                self.cur.position(),
                self.opts.limits.max_parse_time_ms,
                elapsed_ms_ceil(self.started),
            )),
            _ => Ok(()),
        }
    }

    /// Enter an array, map, or tag.
    pub(crate) fn enter(&mut self, offset: usize) -> Result<(), CborError> {
        let max = self.opts.limits.max_depth;
        if self.depth >= max {
            return Err(CborError::limit(
                ErrorCode::MaxDepthExceeded,
                offset,
                max as u64,
                (self.depth + 1) as u64,
            ));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }

    pub(crate) fn enter_tag(&mut self, offset: usize) -> Result<(), CborError> {
        let max = self.opts.limits.max_tag_depth;
        if self.tag_depth >= max {
            return Err(CborError::limit(
                ErrorCode::TagDepthExceeded,
                offset,
                max as u64,
                (self.tag_depth + 1) as u64,
            ));
        }
        self.tag_depth += 1;
        self.enter(offset)
    }

    pub(crate) fn leave_tag(&mut self) {
        self.tag_depth -= 1;
        self.leave();
    }

    /// Returns `true` while building a source map.
    #[inline]
    pub(crate) const fn mapping(&self) -> bool {
        self.source_map.is_some()
    }

    /// Source-map entries recorded so far; zero when no map is built.
    pub(crate) fn map_mark(&self) -> usize {
        self.source_map.as_ref().map_or(0, SourceMapBuilder::mark)
    }

    /// `base` followed by `segment`, or an empty string when no source map is built.
    pub(crate) fn child_path(&self, base: &str, segment: core::fmt::Arguments<'_>) -> String {
        if self.mapping() {
            format!("{base}{segment}")
        } else {
            String::new()
        }
    }

    /// Record the head (or whole scalar) of an item.
    pub(crate) fn record(
        &mut self,
        path: &str,
        parent: Option<EntryId>,
        h: &Header,
        is_header: bool,
        label: impl FnOnce() -> String,
    ) -> Option<EntryId> {
        let end = self.cur.position();
        let map = self.source_map.as_mut()?;
        Some(map.node(NodeSpan {
            path: path.to_owned(),
            parent,
            start: h.offset,
            end: if is_header { h.end() } else { end },
            major_type: h.major,
            label: label(),
            is_header,
        }))
    }

    pub(crate) fn record_content(&mut self, header: Option<EntryId>, start: usize, end: usize) {
        if let (Some(map), Some(id)) = (self.source_map.as_mut(), header) {
            map.content(id, start, end);
        }
    }

    /// Decode one data item at the cursor.
    pub(crate) fn item(
        &mut self,
        path: &str,
        parent: Option<EntryId>,
    ) -> Result<CborValue, CborError> {
        self.check_deadline()?;
        let h = read_header(&mut self.cur, self.opts.validate_canonical)?;
        match h.major {
            MAJOR_UNSIGNED | MAJOR_NEGATIVE => {
                let n = definite_arg(&h)?;
                let value = if h.major == MAJOR_UNSIGNED {
                    CborInteger::from_unsigned(n)
                } else {
                    CborInteger::from_negative_arg(n)
                };
                self.record(path, parent, &h, false, || {
                    if h.major == MAJOR_UNSIGNED { "uint" } else { "nint" }.to_owned()
                });
                Ok(CborValue::Integer(value))
            }
            MAJOR_BYTES => self.byte_string(&h, path, parent),
            MAJOR_TEXT => self.text_string(&h, path, parent),
            MAJOR_ARRAY => self.array(&h, path, parent),
            MAJOR_MAP => self.map_value(&h, path, parent),
            MAJOR_TAG => self.tag(&h, path, parent),
            MAJOR_SIMPLE => self.simple_or_float(&h, path, parent),
            _ => Err(CborError::new(ErrorCode::InvalidAdditionalInfo, h.offset)),
        }
    }

    fn simple_or_float(
        &mut self,
        h: &Header,
        path: &str,
        parent: Option<EntryId>,
    ) -> Result<CborValue, CborError> {
        let Argument::Value(raw) = h.arg else {
            return Err(CborError::new(ErrorCode::UnexpectedBreak, h.offset));
        };
        let value = match h.ai {
            0..=19 => CborValue::Simple(h.ai),
            20 => CborValue::Bool(false),
            21 => CborValue::Bool(true),
            22 => CborValue::Null,
            23 => CborValue::Undefined,
            24 => match u8::try_from(raw) {
                Ok(v) if v >= 32 => CborValue::Simple(v),
                Ok(v) => {
                    return Err(CborError::new(ErrorCode::InvalidSimpleValue, h.offset)
                        .with_context(ErrorContext::Simple(v)))
                }
                Err(_) => return Err(CborError::new(ErrorCode::InvalidSimpleValue, h.offset)),
            },
            25 => {
                #[allow(clippy::cast_possible_truncation)]
                let v = f16_to_f64(raw as u16);
                CborValue::Float(Float::with_width(v, FloatWidth::Half))
            }
            26 => {
                #[allow(clippy::cast_possible_truncation)]
                let v = f32_to_f64(f32::from_bits(raw as u32));
                CborValue::Float(Float::with_width(v, FloatWidth::Single))
            }
            27 => CborValue::Float(Float::with_width(f64::from_bits(raw), FloatWidth::Double)),
            _ => {
                return Err(CborError::new(ErrorCode::InvalidAdditionalInfo, h.offset)
                    .with_context(ErrorContext::AdditionalInfo(h.ai)))
            }
        };
        self.record(path, parent, h, false, || simple_label(&value));
        Ok(value)
    }

    fn finish(self) -> (usize, Option<SourceMapBuilder>) {
        (self.cur.position(), self.source_map)
    }
}

fn simple_label(v: &CborValue) -> String {
    match v {
        CborValue::Bool(_) => "bool".to_owned(),
        CborValue::Null => "null".to_owned(),
        CborValue::Undefined => "undefined".to_owned(),
        CborValue::Simple(n) => format!("simple({n})"),
        CborValue::Float(f) => match f.width() {
            FloatWidth::Half => "float16",
            FloatWidth::Single => "float32",
            FloatWidth::Double => "float64",
        }
        .to_owned(),
        _ => String::new(),
    }
}

pub(crate) fn elapsed_us(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX)
}

/// Whole milliseconds since `started`, rounded up so a missed deadline never reports its own limit.
fn elapsed_ms_ceil(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

/// The argument of a head that cannot be indefinite.
pub(crate) fn definite_arg(h: &Header) -> Result<u64, CborError> {
    match h.arg {
        Argument::Value(v) => Ok(v),
        Argument::Indefinite => Err(CborError::new(ErrorCode::InvalidAdditionalInfo, h.offset)
            .with_context(ErrorContext::AdditionalInfo(h.ai))),
    }
}

/// Decode the first data item in `bytes`.
///
/// Trailing bytes after the item are not consumed; see [`Decoded::bytes_consumed`].
///
/// # Errors
///
/// Returns an error if the input is malformed, violates an enabled validation rule, or exceeds
/// a configured limit.
///
/// # Example
///
/// ```
/// use cbor_lens::{decode, DecodeOptions};
///
/// let out = decode(&[0x18, 0x64], &DecodeOptions::default()).unwrap();
/// assert_eq!(out.value.as_i64(), Some(100));
/// assert_eq!(out.bytes_consumed, 2);
/// ```
pub fn decode(bytes: &[u8], options: &DecodeOptions) -> Result<Decoded, CborError> {
    let started = Instant::now();
    let mut d = Decoder::new(bytes, options, false)?;
    let value = d.item("", None)?;
    let (bytes_consumed, _) = d.finish();
    debug!(
        target: "cbor_lens::decode",
        input_len = bytes.len(),
        bytes_consumed,
        elapsed_us = elapsed_us(started),
        "decoded item"
    );
    Ok(Decoded {
        value,
        bytes_consumed,
    })
}

/// Decode the first data item in `bytes` and annotate every node with its byte range.
///
/// # Errors
///
/// Same as [`decode`].
pub fn decode_with_source_map(
    bytes: &[u8],
    options: &DecodeOptions,
) -> Result<DecodedWithSourceMap, CborError> {
    let started = Instant::now();
    let mut d = Decoder::new(bytes, options, true)?;
    let value = d.item("", None)?;
    let (bytes_consumed, map) = d.finish();
    let source_map = map.map(SourceMapBuilder::into_entries).unwrap_or_default();
    debug!(
        target: "cbor_lens::decode",
        input_len = bytes.len(),
        bytes_consumed,
        entries = source_map.len(),
        elapsed_us = elapsed_us(started),
        "decoded item with source map"
    );
    Ok(DecodedWithSourceMap {
        value,
        bytes_consumed,
        source_map,
    })
}

/// Decode a CBOR sequence: items back to back until the input is exhausted.
///
/// All items share one set of options and one parse deadline. Empty input yields an empty list.
///
/// # Errors
///
/// The first failing item aborts the whole sequence.
pub fn decode_sequence(bytes: &[u8], options: &DecodeOptions) -> Result<Vec<CborValue>, CborError> {
    let started = Instant::now();
    let mut d = Decoder::new(bytes, options, false)?;
    let mut items = Vec::new();
    while !d.cur.is_at_end() {
        items.push(d.item("", None)?);
    }
    debug!(
        target: "cbor_lens::decode",
        input_len = bytes.len(),
        items = items.len(),
        elapsed_us = elapsed_us(started),
        "decoded sequence"
    );
    Ok(items)
}

/// Decode a CBOR sequence with a source map. Item `i` is rooted at path `[i]`.
///
/// # Errors
///
/// The first failing item aborts the whole sequence.
pub fn decode_sequence_with_source_map(
    bytes: &[u8],
    options: &DecodeOptions,
) -> Result<(Vec<CborValue>, Vec<SourceMapEntry>), CborError> {
    let started = Instant::now();
    let mut d = Decoder::new(bytes, options, true)?;
    let mut items = Vec::new();
    while !d.cur.is_at_end() {
        let path = format!("[{}]", items.len());
        items.push(d.item(&path, None)?);
    }
    let (_, map) = d.finish();
    let source_map = map.map(SourceMapBuilder::into_entries).unwrap_or_default();
    debug!(
        target: "cbor_lens::decode",
        input_len = bytes.len(),
        items = items.len(),
        entries = source_map.len(),
        elapsed_us = elapsed_us(started),
        "decoded sequence with source map"
    );
    Ok((items, source_map))
}
