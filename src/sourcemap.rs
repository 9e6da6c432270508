//! Byte-range annotations for a decoded tree.
//!
//! The map is a flat list built in the same pass as the value, parent before children. Paths are
//! rooted at the empty string:
//!
//! - array items: `<parent>[i]`
//! - map values: `<parent>.<key>`
//! - map keys: `<parent>.<key>#key`
//! - tag content: `<parent>.value`
//! - string payload: `<parent>#content`
//! - chunks of an indefinite-length string: `<parent>[i]`
//!
//! A text key is written bare when it is a plain word and quoted (`."a.b"`) otherwise. Other keys
//! use a form no text key can take: integers as `1` or `-1`, byte strings as `h'ff'`, `true`,
//! `null`, `simple(16)`, `float(1.5)`, and anything else as `<hex>` of its canonical encoding.
//! When a duplicate key overwrites an earlier pair, the earlier pair's entries are dropped.
//!
//! A container's own entry covers its head bytes only; its children carry their own ranges.

use core::ops::Range;

use crate::value::CborValue;

/// One annotated byte range of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SourceMapEntry {
    /// Path of the node.
    pub path: String,
    /// First byte (inclusive).
    pub start: usize,
    /// End byte (exclusive).
    pub end: usize,
    /// Major type of the item this entry belongs to.
    pub major_type: u8,
    /// Human-readable label such as `array(3)` or `tag(121)`.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub type_label: String,
    /// `true` for the head of a string, array, map, or tag.
    pub is_header: bool,
    /// `true` for the payload of a string.
    pub is_content: bool,
    /// Path of the matching payload entry, on string heads.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub content_path: Option<String>,
    /// Child paths in encounter order.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    pub children: Vec<String>,
    /// Path of the owning entry; `None` at a root.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub parent: Option<String>,
}

impl SourceMapEntry {
    /// Length of the annotated range.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` for an empty range (the payload of an empty string).
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns `true` if `offset` falls inside this entry.
    #[inline]
    #[must_use]
    pub const fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryId(usize);

struct Node {
    entry: SourceMapEntry,
    parent: Option<EntryId>,
    live: bool,
}

/// Append-only entry list. Parent paths and child lists are resolved once, in [`Self::into_entries`].
pub struct SourceMapBuilder {
    nodes: Vec<Node>,
}

pub struct NodeSpan {
    pub path: String,
    pub parent: Option<EntryId>,
    pub start: usize,
    pub end: usize,
    pub major_type: u8,
    pub label: String,
    pub is_header: bool,
}

impl SourceMapBuilder {
    pub const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Number of entries recorded so far, live or retired.
    pub fn mark(&self) -> usize {
        self.nodes.len()
    }

    /// Record a node under its parent.
    pub fn node(&mut self, span: NodeSpan) -> EntryId {
        let id = EntryId(self.nodes.len());
        self.nodes.push(Node {
            entry: SourceMapEntry {
                path: span.path,
                start: span.start,
                end: span.end,
                major_type: span.major_type,
                type_label: span.label,
                is_header: span.is_header,
                is_content: false,
                content_path: None,
                children: Vec::new(),
                parent: None,
            },
            parent: span.parent,
            live: true,
        });
        id
    }

    /// Record the payload of a string whose head is `header`.
    pub fn content(&mut self, header: EntryId, start: usize, end: usize) {
        let head = &mut self.nodes[header.0].entry;
        let path = format!("{}#content", head.path);
        head.content_path = Some(path.clone());
        let entry = SourceMapEntry {
            path,
            start,
            end,
            major_type: head.major_type,
            type_label: format!("content({})", end - start),
            is_header: false,
            is_content: true,
            content_path: None,
            children: Vec::new(),
            parent: None,
        };
        self.nodes.push(Node {
            entry,
            parent: Some(header),
            live: true,
        });
    }

    /// Replace the leading `strip` bytes of every path recorded since `from` with `prefix`.
    pub fn rebase(&mut self, from: usize, strip: usize, prefix: &str) {
        let swap = |path: &str| format!("{prefix}{}", &path[strip..]);
        for node in &mut self.nodes[from..] {
            node.entry.path = swap(&node.entry.path);
            if let Some(content) = &node.entry.content_path {
                node.entry.content_path = Some(swap(content));
            }
        }
    }

    /// Drop the entries in `range`. Children of a retired entry must lie inside the range.
    pub fn retire(&mut self, range: Range<usize>) {
        for node in &mut self.nodes[range] {
            node.live = false;
        }
    }

    /// Resolve parent paths and child lists, dropping retired entries.
    pub fn into_entries(self) -> Vec<SourceMapEntry> {
        let mut out: Vec<SourceMapEntry> = Vec::with_capacity(self.nodes.len());
        let mut slots: Vec<Option<usize>> = Vec::with_capacity(self.nodes.len());
        for node in self.nodes {
            if !node.live {
                slots.push(None);
                continue;
            }
            let mut entry = node.entry;
            if let Some(p) = node.parent.and_then(|p| slots[p.0]) {
                let parent = &mut out[p];
                entry.parent = Some(parent.path.clone());
                if !entry.is_content {
                    parent.children.push(entry.path.clone());
                }
            }
            slots.push(Some(out.len()));
            out.push(entry);
        }
        out
    }
}

/// Path segment for a map key, given the key's canonical encoding.
pub(crate) fn key_segment(key: &CborValue, canonical: &[u8]) -> String {
    match key {
        CborValue::Text(t) => text_segment(t.as_str()),
        CborValue::Integer(i) => i.to_string(),
        CborValue::Bytes(b) => format!("h'{}'", hex::encode(b.as_slice())),
        CborValue::Bool(b) => b.to_string(),
        CborValue::Null => "null".to_owned(),
        CborValue::Undefined => "undefined".to_owned(),
        CborValue::Simple(v) => format!("simple({v})"),
        CborValue::Float(f) => format!("float({:?})", f.value()),
        _ => format!("<{}>", hex::encode(canonical)),
    }
}

const RESERVED_WORDS: [&str; 4] = ["true", "false", "null", "undefined"];

fn is_bare_word(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let word_char = |c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == '$';
    !first.is_ascii_digit()
        && first != '-'
        && word_char(first)
        && chars.all(word_char)
        && !RESERVED_WORDS.contains(&s)
}

fn text_segment(s: &str) -> String {
    if is_bare_word(s) {
        return s.to_owned();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

