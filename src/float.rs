//! IEEE 754 half/single/double conversions.
//!
//! Narrowing conversions are exact-only: they return `None` when the narrower format cannot hold
//! the value bit-for-bit (NaN payloads included).

const F64_EXP_MASK: u64 = 0x7ff0_0000_0000_0000;
const F64_MANT_MASK: u64 = 0x000f_ffff_ffff_ffff;

/// Widen a binary16 bit pattern to `f64`.
#[must_use]
pub fn f16_to_f64(h: u16) -> f64 {
    let negative = h & 0x8000 != 0;
    let exp = (h >> 10) & 0x1f;
    let mant = h & 0x03ff;
    let magnitude = match exp {
        0 => f64::from(mant) * 2f64.powi(-24),
        31 => {
            if mant == 0 {
                f64::INFINITY
            } else {
                let sign = if negative { 1u64 << 63 } else { 0 };
                return f64::from_bits(sign | F64_EXP_MASK | (u64::from(mant) << 42));
            }
        }
        _ => (1.0 + f64::from(mant) / 1024.0) * 2f64.powi(i32::from(exp) - 15),
    };
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Narrow to binary16 if exact.
#[must_use]
pub fn f64_to_f16_exact(v: f64) -> Option<u16> {
    let bits = v.to_bits();
    let sign = ((bits >> 48) & 0x8000) as u16;
    let exp = ((bits & F64_EXP_MASK) >> 52) as i32;
    let mant = bits & F64_MANT_MASK;
    let low42 = (1u64 << 42) - 1;

    if exp == 0x7ff {
        if mant & low42 != 0 {
            return None;
        }
        return Some(sign | 0x7c00 | (mant >> 42) as u16);
    }
    if exp == 0 {
        // f64 subnormals are far below the binary16 range.
        return if mant == 0 { Some(sign) } else { None };
    }

    let e = exp - 1023;
    if e > 15 {
        return None;
    }
    if e >= -14 {
        if mant & low42 != 0 {
            return None;
        }
        let biased = (e + 15) as u16;
        return Some(sign | (biased << 10) | (mant >> 42) as u16);
    }
    if e < -24 {
        return None;
    }
    // binary16 subnormal: value = m * 2^-24.
    let full = mant | (1u64 << 52);
    let shift = (28 - e) as u32;
    if full & ((1u64 << shift) - 1) != 0 {
        return None;
    }
    Some(sign | (full >> shift) as u16)
}

/// Narrow to binary32 if exact.
#[must_use]
pub fn f64_to_f32_exact(v: f64) -> Option<f32> {
    if v.is_nan() {
        let bits = v.to_bits();
        let mant = bits & F64_MANT_MASK;
        let low29 = (1u64 << 29) - 1;
        if mant & low29 != 0 {
            return None;
        }
        let sign = ((bits >> 32) & 0x8000_0000) as u32;
        return Some(f32::from_bits(sign | 0x7f80_0000 | (mant >> 29) as u32));
    }
    #[allow(clippy::cast_possible_truncation)]
    let narrowed = v as f32;
    if f64::from(narrowed).to_bits() == v.to_bits() {
        Some(narrowed)
    } else {
        None
    }
}

/// Widen a binary32 value to `f64`, keeping NaN payload bits.
#[must_use]
pub fn f32_to_f64(v: f32) -> f64 {
    if v.is_nan() {
        let bits = v.to_bits();
        let sign = u64::from(bits & 0x8000_0000) << 32;
        let mant = u64::from(bits & 0x007f_ffff) << 29;
        return f64::from_bits(sign | F64_EXP_MASK | mant);
    }
    f64::from(v)
}
