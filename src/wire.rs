use crate::error::ErrorContext;
use crate::{CborError, ErrorCode};

pub const MAJOR_UNSIGNED: u8 = 0;
pub const MAJOR_NEGATIVE: u8 = 1;
pub const MAJOR_BYTES: u8 = 2;
pub const MAJOR_TEXT: u8 = 3;
pub const MAJOR_ARRAY: u8 = 4;
pub const MAJOR_MAP: u8 = 5;
pub const MAJOR_TAG: u8 = 6;
pub const MAJOR_SIMPLE: u8 = 7;

pub const AI_INDEFINITE: u8 = 31;
pub const BREAK: u8 = 0xff;

#[derive(Clone, Copy)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub const fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub const fn position(&self) -> usize {
        self.pos
    }

    pub const fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Input bytes in `start..end`; both bounds must already have been read past.
    pub fn consumed(&self, start: usize, end: usize) -> &'a [u8] {
        &self.data[start..end.min(self.pos)]
    }

    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn read_u8(&mut self) -> Result<u8, CborError> {
        let off = self.pos;
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| CborError::new(ErrorCode::Truncated, off))?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8], CborError> {
        let off = self.pos;
        let end = self
            .pos
            .checked_add(n)
            .ok_or_else(|| CborError::new(ErrorCode::LengthOverflow, off))?;
        if end > self.data.len() {
            return Err(CborError::limit(
                ErrorCode::Truncated,
                off,
                (self.data.len() - self.pos) as u64,
                n as u64,
            ));
        }
        let s = &self.data[self.pos..end];
        self.pos = end;
        Ok(s)
    }

    pub fn read_be_u16(&mut self) -> Result<u16, CborError> {
        let s = self.read_exact(2)?;
        Ok(u16::from_be_bytes([s[0], s[1]]))
    }

    pub fn read_be_u32(&mut self) -> Result<u32, CborError> {
        let s = self.read_exact(4)?;
        Ok(u32::from_be_bytes([s[0], s[1], s[2], s[3]]))
    }

    pub fn read_be_u64(&mut self) -> Result<u64, CborError> {
        let s = self.read_exact(8)?;
        Ok(u64::from_be_bytes([
            s[0], s[1], s[2], s[3], s[4], s[5], s[6], s[7],
        ]))
    }
}

/// The argument of an item head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument {
    /// Literal value, length, tag number, or raw float/simple bits.
    Value(u64),
    /// Additional info 31: indefinite length, or the break code under major type 7.
    Indefinite,
}

/// One decoded item head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub major: u8,
    pub ai: u8,
    pub arg: Argument,
    /// Offset of the initial byte.
    pub offset: usize,
    /// Bytes consumed by the head.
    pub len: usize,
}

impl Header {
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Read one item head at the cursor.
///
/// When `canonical` is set, integer/length arguments must use their shortest form. Float and
/// simple-value arguments under major type 7 are exempt.
pub fn read_header(cur: &mut Cursor<'_>, canonical: bool) -> Result<Header, CborError> {
    let off = cur.position();
    let ib = cur.read_u8()?;
    let major = ib >> 5;
    let ai = ib & 0x1f;
    let arg = match ai {
        0..=23 => Argument::Value(u64::from(ai)),
        24..=27 => {
            let v = read_uint_trusted(cur, ai, off)?;
            if canonical && major != MAJOR_SIMPLE {
                check_shortest(ai, v, off)?;
            }
            Argument::Value(v)
        }
        AI_INDEFINITE => match major {
            MAJOR_UNSIGNED | MAJOR_NEGATIVE | MAJOR_TAG => {
                return Err(invalid_ai(ai, off));
            }
            _ => Argument::Indefinite,
        },
        _ => return Err(invalid_ai(ai, off)),
    };
    Ok(Header {
        major,
        ai,
        arg,
        offset: off,
        len: cur.position() - off,
    })
}

fn invalid_ai(ai: u8, off: usize) -> CborError {
    CborError::new(ErrorCode::InvalidAdditionalInfo, off).with_context(ErrorContext::AdditionalInfo(ai))
}

fn read_uint_trusted(cur: &mut Cursor<'_>, ai: u8, off: usize) -> Result<u64, CborError> {
    match ai {
        0..=23 => Ok(u64::from(ai)),
        24 => Ok(u64::from(cur.read_u8()?)),
        25 => Ok(u64::from(cur.read_be_u16()?)),
        26 => Ok(u64::from(cur.read_be_u32()?)),
        27 => Ok(cur.read_be_u64()?),
        _ => Err(invalid_ai(ai, off)),
    }
}

fn check_shortest(ai: u8, v: u64, off: usize) -> Result<(), CborError> {
    let wasteful = match ai {
        24 => v < 24,
        25 => u8::try_from(v).is_ok(),
        26 => u16::try_from(v).is_ok(),
        27 => u32::try_from(v).is_ok(),
        _ => false,
    };
    if wasteful {
        return Err(
            CborError::new(ErrorCode::NonCanonicalEncoding, off)
                .with_context(ErrorContext::AdditionalInfo(ai)),
        );
    }
    Ok(())
}

pub fn len_to_usize(len: u64, off: usize) -> Result<usize, CborError> {
    usize::try_from(len).map_err(|_| CborError::new(ErrorCode::LengthOverflow, off))
}
