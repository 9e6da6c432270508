//! Arithmetic on big-endian unsigned magnitudes.
//!
//! Magnitudes are normalized: no leading zero bytes, and zero is the empty slice.

use std::fmt::Write as _;

const CHUNK: u64 = 1_000_000_000;

#[inline]
pub fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[first..]
}

pub fn magnitude_from_u128(n: u128) -> Vec<u8> {
    let leading = (n.leading_zeros() / 8) as usize;
    n.to_be_bytes()[leading..].to_vec()
}

pub fn magnitude_to_u128(mag: &[u8]) -> Option<u128> {
    let mag = strip_leading_zeros(mag);
    if mag.len() > 16 {
        return None;
    }
    Some(mag.iter().fold(0u128, |acc, &b| (acc << 8) | u128::from(b)))
}

pub fn magnitude_to_u64(mag: &[u8]) -> Option<u64> {
    magnitude_to_u128(mag).and_then(|v| u64::try_from(v).ok())
}

/// `mag + 1`.
pub fn add_one(mag: &[u8]) -> Vec<u8> {
    let mut out = strip_leading_zeros(mag).to_vec();
    for b in out.iter_mut().rev() {
        if *b == 0xff {
            *b = 0;
        } else {
            *b += 1;
            return out;
        }
    }
    out.insert(0, 1);
    out
}

/// `mag - 1`, for a non-zero magnitude.
pub fn sub_one(mag: &[u8]) -> Vec<u8> {
    let mut out = strip_leading_zeros(mag).to_vec();
    for b in out.iter_mut().rev() {
        if *b == 0 {
            *b = 0xff;
        } else {
            *b -= 1;
            break;
        }
    }
    strip_leading_zeros(&out).to_vec()
}

/// Render a magnitude in base 10.
pub fn to_decimal(mag: &[u8]) -> String {
    let mut rest = strip_leading_zeros(mag).to_vec();
    if rest.is_empty() {
        return "0".to_owned();
    }
    let mut chunks: Vec<u64> = Vec::new();
    while !rest.is_empty() {
        let mut rem = 0u64;
        let mut quotient = Vec::with_capacity(rest.len());
        for &b in &rest {
            let cur = rem * 256 + u64::from(b);
            let q = cur / CHUNK;
            rem = cur % CHUNK;
            if !(quotient.is_empty() && q == 0) {
                // q < 256 because rem < CHUNK
                quotient.push(q as u8);
            }
        }
        chunks.push(rem);
        rest = quotient;
    }
    let mut out = String::new();
    let mut iter = chunks.iter().rev();
    if let Some(first) = iter.next() {
        let _ = write!(out, "{first}");
    }
    for c in iter {
        let _ = write!(out, "{c:09}");
    }
    out
}

/// Parse an unsigned base-10 string into a magnitude.
pub fn from_decimal(s: &str) -> Option<Vec<u8>> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // little-endian while accumulating
    let mut le: Vec<u8> = Vec::new();
    for d in s.bytes() {
        let mut carry = u32::from(d - b'0');
        for limb in &mut le {
            let v = u32::from(*limb) * 10 + carry;
            *limb = (v & 0xff) as u8;
            carry = v >> 8;
        }
        while carry > 0 {
            le.push((carry & 0xff) as u8);
            carry >>= 8;
        }
    }
    le.reverse();
    Some(strip_leading_zeros(&le).to_vec())
}
