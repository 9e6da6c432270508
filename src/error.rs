use core::fmt;

/// The high-level class of an error.
///
/// The codec distinguishes:
/// - **Decode** errors: framing errors such as truncation, reserved additional info, or limits.
/// - **Validate** errors: canonical/strict rule violations and tag-semantic failures.
/// - **Encode** errors: values that cannot be emitted under the requested options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CborErrorKind {
    /// Decode/framing failure.
    Decode,
    /// Canonical or semantic validation failure.
    Validate,
    /// Encoding failure.
    Encode,
}

/// A structured error code identifying the reason an item was rejected.
///
/// This enum is intentionally stable and string-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// Invalid configured limits.
    InvalidLimits,
    /// Mutually exclusive options were combined.
    InvalidOptions,

    /// Fewer bytes remain than the item requires.
    Truncated,
    /// Arithmetic overflow while computing a length/offset.
    LengthOverflow,
    /// Memory allocation failed while building owned structures.
    AllocationFailed,
    /// Input exceeds `max_input_size`.
    InputTooLarge,
    /// Encoded output would exceed `max_output_size`.
    OutputSizeExceeded,
    /// Decoding did not finish before the `max_parse_time` deadline.
    ParseTimeout,

    /// Nesting depth limit exceeded.
    MaxDepthExceeded,
    /// Tag nesting depth limit exceeded.
    TagDepthExceeded,
    /// Array length exceeds limits.
    ArrayLenLimitExceeded,
    /// Map length exceeds limits.
    MapLenLimitExceeded,
    /// Byte or text string length exceeds limits.
    StringLenLimitExceeded,
    /// Bignum magnitude exceeds `max_bignum_bytes`.
    BignumTooLarge,

    /// Reserved additional-info value, or indefinite length on a major type that forbids it.
    InvalidAdditionalInfo,
    /// Two-byte simple value below 32.
    InvalidSimpleValue,
    /// A break code appeared where a data item was expected.
    UnexpectedBreak,
    /// Non-shortest integer/length encoding was used.
    NonCanonicalEncoding,
    /// Indefinite-length encoding was used where forbidden.
    IndefiniteNotAllowed,
    /// An indefinite-length string contained a non-definite or mismatched chunk.
    NestedIndefiniteString,
    /// An indefinite-length item ran off the end of input without a break code.
    MissingBreakCode,
    /// An indefinite-length map ended after a key with no value.
    OddLengthMap,

    /// Duplicate map key detected.
    DuplicateMapKey,
    /// Map keys are not in canonical order.
    KeysNotInCanonicalOrder,
    /// Invalid UTF-8 in a text string.
    InvalidUtf8,

    /// Duplicate element in a tag-258 set.
    DuplicateSetElement,
    /// The tagged item has the wrong shape or type for its tag.
    InvalidTagContent,
    /// Tag 32 content has no URI scheme.
    InvalidUri,
}

impl ErrorCode {
    /// Classify this code.
    #[must_use]
    pub const fn kind(self) -> CborErrorKind {
        match self {
            Self::NonCanonicalEncoding
            | Self::IndefiniteNotAllowed
            | Self::DuplicateMapKey
            | Self::KeysNotInCanonicalOrder
            | Self::InvalidUtf8
            | Self::DuplicateSetElement
            | Self::InvalidTagContent
            | Self::InvalidUri => CborErrorKind::Validate,
            Self::OutputSizeExceeded | Self::InvalidOptions => CborErrorKind::Encode,
            _ => CborErrorKind::Decode,
        }
    }

    const fn message(self) -> &'static str {
        match self {
            Self::InvalidLimits => "invalid CBOR limits",
            Self::InvalidOptions => "conflicting codec options",

            Self::Truncated => "unexpected end of input",
            Self::LengthOverflow => "length overflow",
            Self::AllocationFailed => "allocation failed",
            Self::InputTooLarge => "input exceeds maximum size",
            Self::OutputSizeExceeded => "output exceeds maximum size",
            Self::ParseTimeout => "parse time limit exceeded",

            Self::MaxDepthExceeded => "nesting depth limit exceeded",
            Self::TagDepthExceeded => "tag nesting depth limit exceeded",
            Self::ArrayLenLimitExceeded => "array length exceeds limits",
            Self::MapLenLimitExceeded => "map length exceeds limits",
            Self::StringLenLimitExceeded => "string length exceeds limits",
            Self::BignumTooLarge => "bignum magnitude exceeds limits",

            Self::InvalidAdditionalInfo => "invalid additional info value",
            Self::InvalidSimpleValue => "invalid simple value encoding",
            Self::UnexpectedBreak => "unexpected break code",
            Self::NonCanonicalEncoding => "non-canonical integer/length encoding",
            Self::IndefiniteNotAllowed => "indefinite length forbidden",
            Self::NestedIndefiniteString => "invalid chunk in indefinite-length string",
            Self::MissingBreakCode => "missing break code",
            Self::OddLengthMap => "map has a key without a value",

            Self::DuplicateMapKey => "duplicate map key",
            Self::KeysNotInCanonicalOrder => "map keys not in canonical order",
            Self::InvalidUtf8 => "text must be valid UTF-8",

            Self::DuplicateSetElement => "duplicate set element",
            Self::InvalidTagContent => "invalid content for tag",
            Self::InvalidUri => "URI has no scheme",
        }
    }
}

/// Expected-versus-found detail attached to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorContext {
    /// No further detail.
    #[default]
    None,
    /// A configured limit and the value that broke it.
    Limit {
        /// The configured maximum.
        max: u64,
        /// The value found in the input.
        actual: u64,
    },
    /// A required major type and the one found.
    MajorType {
        /// Major type required at this position.
        expected: u8,
        /// Major type present in the input.
        found: u8,
    },
    /// The tag whose content failed validation.
    Tag(u64),
    /// The offending additional-info value.
    AdditionalInfo(u8),
    /// The offending simple value.
    Simple(u8),
}

/// A codec error with a stable code, the byte offset where it was detected, and context.
///
/// For decode/validate errors the offset points into the input. For encode errors it is the
/// output position at the time of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CborError {
    /// The error code.
    pub code: ErrorCode,
    /// Byte offset where the error was detected.
    pub offset: usize,
    /// Expected-versus-found detail.
    pub context: ErrorContext,
}

impl CborError {
    /// Construct an error at `offset`.
    #[inline]
    #[must_use]
    pub const fn new(code: ErrorCode, offset: usize) -> Self {
        Self {
            code,
            offset,
            context: ErrorContext::None,
        }
    }

    /// Attach context to this error.
    #[inline]
    #[must_use]
    pub const fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = context;
        self
    }

    /// Construct a limit error carrying the configured maximum and the offending value.
    #[inline]
    #[must_use]
    pub const fn limit(code: ErrorCode, offset: usize, max: u64, actual: u64) -> Self {
        Self::new(code, offset).with_context(ErrorContext::Limit { max, actual })
    }

    /// The high-level class of this error.
    #[inline]
    #[must_use]
    pub const fn kind(self) -> CborErrorKind {
        self.code.kind()
    }

    /// Returns true iff this error is a validation error.
    #[inline]
    #[must_use]
    pub const fn is_validation(self) -> bool {
        matches!(self.code.kind(), CborErrorKind::Validate)
    }
}

impl fmt::Display for CborError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = self.code.message();
        match self.kind() {
            CborErrorKind::Encode => write!(f, "cbor encode failed at {}: {msg}", self.offset)?,
            CborErrorKind::Decode => write!(f, "cbor decode failed at {}: {msg}", self.offset)?,
            CborErrorKind::Validate => {
                write!(f, "cbor validation failed at {}: {msg}", self.offset)?;
            }
        }
        match self.context {
            ErrorContext::None => Ok(()),
            ErrorContext::Limit { max, actual } => write!(f, " (max {max}, found {actual})"),
            ErrorContext::MajorType { expected, found } => {
                write!(f, " (expected major type {expected}, found {found})")
            }
            ErrorContext::Tag(tag) => write!(f, " (tag {tag})"),
            ErrorContext::AdditionalInfo(ai) => write!(f, " (additional info {ai})"),
            ErrorContext::Simple(v) => write!(f, " (simple value {v})"),
        }
    }
}

impl std::error::Error for CborError {}
