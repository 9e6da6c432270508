//! Strings, arrays, and maps.

use core::ops::Range;
use std::collections::HashMap;

use tracing::warn;

use crate::alloc_util::{try_vec_for_items, try_vec_from_slice};
use crate::decode::Decoder;
use crate::encode::{canonical_key_bytes, cmp_encoded_keys};
use crate::error::ErrorContext;
use crate::options::DupMapKeyMode;
use crate::sourcemap::{key_segment, EntryId};
use crate::utf8;
use crate::value::{ByteString, CborMap, CborValue, TextString};
use crate::wire::{len_to_usize, read_header, Argument, Header, BREAK, MAJOR_BYTES};
use crate::{CborError, ErrorCode};

fn string_label(h: &Header) -> String {
    let kind = if h.major == MAJOR_BYTES { "bytes" } else { "text" };
    match h.arg {
        Argument::Value(n) => format!("{kind}({n})"),
        Argument::Indefinite => format!("{kind}(*)"),
    }
}

fn collection_label(kind: &str, h: &Header) -> String {
    match h.arg {
        Argument::Value(n) => format!("{kind}({n})"),
        Argument::Indefinite => format!("{kind}(*)"),
    }
}

impl<'a> Decoder<'a> {
    fn check_string_len(&self, len: u64, off: usize) -> Result<usize, CborError> {
        let max = self.opts.limits.max_string_length;
        if len > max as u64 {
            return Err(CborError::limit(
                ErrorCode::StringLenLimitExceeded,
                off,
                max as u64,
                len,
            ));
        }
        len_to_usize(len, off)
    }

    fn indefinite_allowed(&self, h: &Header) -> Result<(), CborError> {
        if self.opts.allow_indefinite {
            Ok(())
        } else {
            Err(CborError::new(ErrorCode::IndefiniteNotAllowed, h.offset))
        }
    }

    /// Consume a break code if one is next. Fails with `MissingBreakCode` at end of input.
    fn at_break(&mut self) -> Result<bool, CborError> {
        match self.cur.peek_u8() {
            None => Err(CborError::new(ErrorCode::MissingBreakCode, self.cur.position())),
            Some(BREAK) => {
                self.cur.read_u8()?;
                Ok(true)
            }
            Some(_) => Ok(false),
        }
    }

    /// Read a string payload, recording its head and content entries.
    fn definite_payload(
        &mut self,
        h: &Header,
        len: u64,
        path: &str,
        parent: Option<EntryId>,
    ) -> Result<&'a [u8], CborError> {
        let len = self.check_string_len(len, h.offset)?;
        let id = self.record(path, parent, h, true, || string_label(h));
        let start = self.cur.position();
        let bytes = self.cur.read_exact(len)?;
        self.record_content(id, start, start + len);
        Ok(bytes)
    }

    /// Walk the chunks of an indefinite-length string, handing each payload to `accept`.
    fn chunks<F>(
        &mut self,
        h: &Header,
        path: &str,
        parent: Option<EntryId>,
        mut accept: F,
    ) -> Result<(), CborError>
    where
        F: FnMut(&[u8], usize) -> Result<(), CborError>,
    {
        self.indefinite_allowed(h)?;
        let id = self.record(path, parent, h, true, || string_label(h));
        let mut total: u64 = 0;
        let mut index = 0usize;
        while !self.at_break()? {
            let chunk = read_header(&mut self.cur, self.opts.validate_canonical)?;
            let Argument::Value(len) = chunk.arg else {
                return Err(CborError::new(ErrorCode::NestedIndefiniteString, chunk.offset));
            };
            if chunk.major != h.major {
                return Err(
                    CborError::new(ErrorCode::NestedIndefiniteString, chunk.offset).with_context(
                        ErrorContext::MajorType {
                            expected: h.major,
                            found: chunk.major,
                        },
                    ),
                );
            }
            total = total.saturating_add(len);
            self.check_string_len(total, chunk.offset)?;
            let chunk_path = self.child_path(path, format_args!("[{index}]"));
            let payload = self.definite_payload(&chunk, len, &chunk_path, id)?;
            accept(payload, chunk.end())?;
            index += 1;
        }
        Ok(())
    }

    pub(crate) fn byte_string(
        &mut self,
        h: &Header,
        path: &str,
        parent: Option<EntryId>,
    ) -> Result<CborValue, CborError> {
        match h.arg {
            Argument::Value(len) => {
                let bytes = self.definite_payload(h, len, path, parent)?;
                let owned = try_vec_from_slice(bytes, h.end())?;
                Ok(CborValue::Bytes(ByteString::new(owned)))
            }
            Argument::Indefinite => {
                let mut parts: Vec<Vec<u8>> = Vec::new();
                self.chunks(h, path, parent, |payload, off| {
                    parts.push(try_vec_from_slice(payload, off)?);
                    Ok(())
                })?;
                Ok(CborValue::Bytes(ByteString::from_chunks(parts)))
            }
        }
    }

    pub(crate) fn text_string(
        &mut self,
        h: &Header,
        path: &str,
        parent: Option<EntryId>,
    ) -> Result<CborValue, CborError> {
        let strict = self.opts.validate_utf8_strict;
        match h.arg {
            Argument::Value(len) => {
                let bytes = self.definite_payload(h, len, path, parent)?;
                let text = to_text(bytes, h.end(), strict)?;
                Ok(CborValue::Text(TextString::new(text)))
            }
            Argument::Indefinite => {
                let mut parts: Vec<String> = Vec::new();
                self.chunks(h, path, parent, |payload, off| {
                    parts.push(to_text(payload, off, strict)?);
                    Ok(())
                })?;
                Ok(CborValue::Text(TextString::from_chunks(parts)))
            }
        }
    }

    pub(crate) fn array(
        &mut self,
        h: &Header,
        path: &str,
        parent: Option<EntryId>,
    ) -> Result<CborValue, CborError> {
        let max = self.opts.limits.max_array_length;
        if let Argument::Value(n) = h.arg {
            if n > max as u64 {
                return Err(CborError::limit(
                    ErrorCode::ArrayLenLimitExceeded,
                    h.offset,
                    max as u64,
                    n,
                ));
            }
        } else {
            self.indefinite_allowed(h)?;
        }
        self.enter(h.offset)?;
        let id = self.record(path, parent, h, true, || collection_label("array", h));

        let items = match h.arg {
            Argument::Value(n) => {
                let len = len_to_usize(n, h.offset)?;
                let mut items = try_vec_for_items(len, self.cur.remaining(), h.offset)?;
                for i in 0..len {
                    let child = self.child_path(path, format_args!("[{i}]"));
                    items.push(self.item(&child, id)?);
                }
                items
            }
            Argument::Indefinite => {
                let mut items = Vec::new();
                while !self.at_break()? {
                    if items.len() >= max {
                        return Err(CborError::limit(
                            ErrorCode::ArrayLenLimitExceeded,
                            self.cur.position(),
                            max as u64,
                            (items.len() + 1) as u64,
                        ));
                    }
                    let child = self.child_path(path, format_args!("[{}]", items.len()));
                    items.push(self.item(&child, id)?);
                }
                items
            }
        };
        self.leave();
        Ok(CborValue::Array(items))
    }

    pub(crate) fn map_value(
        &mut self,
        h: &Header,
        path: &str,
        parent: Option<EntryId>,
    ) -> Result<CborValue, CborError> {
        let max = self.opts.limits.max_map_size;
        let declared = match h.arg {
            Argument::Value(n) => {
                if n > max as u64 {
                    return Err(CborError::limit(
                        ErrorCode::MapLenLimitExceeded,
                        h.offset,
                        max as u64,
                        n,
                    ));
                }
                Some(len_to_usize(n, h.offset)?)
            }
            Argument::Indefinite => {
                self.indefinite_allowed(h)?;
                None
            }
        };
        self.enter(h.offset)?;
        let id = self.record(path, parent, h, true, || collection_label("map", h));

        let mut entries: Vec<(CborValue, CborValue)> = match declared {
            Some(n) => try_vec_for_items(n, self.cur.remaining() / 2, h.offset)?,
            None => Vec::new(),
        };
        let mut seen: HashMap<Vec<u8>, usize> = HashMap::new();
        // Source-map entries of each kept pair, key first.
        let mut spans: Vec<Range<usize>> = Vec::new();
        let mut prev_key: Option<&'a [u8]> = None;
        let mut pairs = 0usize;

        loop {
            match declared {
                Some(n) if pairs == n => break,
                Some(_) => {}
                None => {
                    if self.at_break()? {
                        break;
                    }
                    if pairs >= max {
                        return Err(CborError::limit(
                            ErrorCode::MapLenLimitExceeded,
                            self.cur.position(),
                            max as u64,
                            (pairs + 1) as u64,
                        ));
                    }
                }
            }

            // The key is recorded under the map's own path until its segment is known.
            let pair_start = self.map_mark();
            let key_start = self.cur.position();
            let key = self.item(path, id)?;
            let raw_key = self.cur.consumed(key_start, self.cur.position());

            if declared.is_none() && self.at_break_peek()? {
                return Err(CborError::new(ErrorCode::OddLengthMap, self.cur.position()));
            }

            if self.opts.validate_canonical {
                if let Some(prev) = prev_key {
                    match cmp_encoded_keys(prev, raw_key) {
                        core::cmp::Ordering::Less => {}
                        core::cmp::Ordering::Equal => {
                            return Err(CborError::new(ErrorCode::DuplicateMapKey, key_start));
                        }
                        core::cmp::Ordering::Greater => {
                            return Err(CborError::new(
                                ErrorCode::KeysNotInCanonicalOrder,
                                key_start,
                            ));
                        }
                    }
                }
                prev_key = Some(raw_key);
            }

            let canonical =
                canonical_key_bytes(&key).map_err(|e| CborError::new(e.code, key_start))?;
            let existing = seen.get(&canonical).copied();
            if existing.is_some() && self.opts.dup_map_key_mode == DupMapKeyMode::Reject {
                return Err(CborError::new(ErrorCode::DuplicateMapKey, key_start));
            }

            let value_path = if let Some(map) = self.source_map.as_mut() {
                let value_path = format!("{path}.{}", key_segment(&key, &canonical));
                map.rebase(pair_start, path.len(), &format!("{value_path}#key"));
                value_path
            } else {
                String::new()
            };
            let value = self.item(&value_path, id)?;
            let pair = pair_start..self.map_mark();

            match existing {
                Some(slot) => {
                    if self.opts.dup_map_key_mode == DupMapKeyMode::Warn {
                        warn!(
                            target: "cbor_lens::decode",
                            offset = key_start,
                            key = %key.key_label(),
                            "duplicate map key, later value wins"
                        );
                    }
                    entries[slot].1 = value;
                    let superseded = core::mem::replace(&mut spans[slot], pair);
                    if let Some(map) = self.source_map.as_mut() {
                        map.retire(superseded);
                    }
                }
                None => {
                    seen.insert(canonical, entries.len());
                    entries.push((key, value));
                    spans.push(pair);
                }
            }
            pairs += 1;
        }

        self.leave();
        Ok(CborValue::Map(CborMap::from_entries(entries)))
    }

    /// Like [`Self::at_break`] but leaves the break code in place.
    fn at_break_peek(&self) -> Result<bool, CborError> {
        match self.cur.peek_u8() {
            None => Err(CborError::new(ErrorCode::MissingBreakCode, self.cur.position())),
            Some(b) => Ok(b == BREAK),
        }
    }
}

fn to_text(bytes: &[u8], off: usize, strict: bool) -> Result<String, CborError> {
    if strict {
        let s = utf8::validate(bytes)
            .map_err(|valid_up_to| CborError::new(ErrorCode::InvalidUtf8, off + valid_up_to))?;
        Ok(s.to_owned())
    } else {
        Ok(utf8::lossy(bytes))
    }
}
