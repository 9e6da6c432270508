#[cfg(feature = "simdutf8")]
use simdutf8::compat as simd_utf8;

/// Validates UTF-8 bytes and returns a borrowed `&str` on success.
///
/// Overlong forms, surrogate code points, truncated sequences, and code points above U+10FFFF are
/// all rejected. On failure, returns the length of the valid prefix.
#[inline]
pub fn validate(bytes: &[u8]) -> Result<&str, usize> {
    #[cfg(feature = "simdutf8")]
    {
        simd_utf8::from_utf8(bytes).map_err(|e| e.valid_up_to())
    }

    #[cfg(not(feature = "simdutf8"))]
    {
        core::str::from_utf8(bytes).map_err(|e| e.valid_up_to())
    }
}

/// Decodes UTF-8, substituting U+FFFD for invalid sequences.
#[inline]
pub fn lossy(bytes: &[u8]) -> String {
    match validate(bytes) {
        Ok(s) => s.to_owned(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}
