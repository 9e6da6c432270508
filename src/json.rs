//! JSON projection with sentinel objects for values JSON cannot carry.
//!
//! | CBOR | JSON |
//! |---|---|
//! | byte string | `{"__cbor_bytes__": "<hex>"}` |
//! | NaN, ±Infinity | `{"__cbor_float__": "NaN" \| "Infinity" \| "-Infinity"}` |
//! | integer outside ±(2^53-1) | `{"__cbor_bigint__": "<decimal>"}` |
//! | undefined | `{"__cbor_undefined__": true}` |
//! | other simple value | `{"__cbor_simple__": n}` |
//! | uninterpreted tag, fraction, set | `{"__cbor_tag__": n, "__cbor_value__": v}` |
//! | constructor | `{"constructor": i, "fields": [...]}` |
//!
//! Map keys that are not text are stringified (`1`, `h'ff'`, `true`). Two keys that stringify
//! identically collapse to the later one.

use core::fmt;

use serde_json::{Map, Number, Value};

use crate::tags::{TAG_BIGFLOAT, TAG_DECIMAL_FRACTION, TAG_SET};
use crate::value::{CborMap, CborValue, Constructor, Fraction, FractionBase};
use crate::CborInteger;

const BYTES: &str = "__cbor_bytes__";
const FLOAT: &str = "__cbor_float__";
const BIGINT: &str = "__cbor_bigint__";
const UNDEFINED: &str = "__cbor_undefined__";
const SIMPLE: &str = "__cbor_simple__";
const TAG: &str = "__cbor_tag__";
const TAG_VALUE: &str = "__cbor_value__";
const CONSTRUCTOR: &str = "constructor";
const FIELDS: &str = "fields";

/// Error returned by [`from_json`] for a malformed sentinel object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonError {
    /// `__cbor_bytes__` is not a hex string.
    InvalidBytes,
    /// `__cbor_float__` is not one of the three special values.
    InvalidFloat,
    /// `__cbor_bigint__` is not a decimal integer string.
    InvalidBigInt,
    /// `__cbor_simple__` is not an integer in 0..=255.
    InvalidSimple,
    /// `__cbor_tag__` is not an unsigned integer.
    InvalidTag,
    /// `constructor` is not an unsigned integer or `fields` is not an array.
    InvalidConstructor,
    /// A JSON number that fits neither an integer nor a float.
    InvalidNumber,
}

impl fmt::Display for JsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::InvalidBytes => "byte-string sentinel is not hex",
            Self::InvalidFloat => "float sentinel is not NaN, Infinity, or -Infinity",
            Self::InvalidBigInt => "bigint sentinel is not a decimal integer",
            Self::InvalidSimple => "simple sentinel is not in 0..=255",
            Self::InvalidTag => "tag sentinel is not an unsigned integer",
            Self::InvalidConstructor => "constructor object is malformed",
            Self::InvalidNumber => "unrepresentable JSON number",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for JsonError {}

fn sentinel(key: &str, value: Value) -> Value {
    let mut m = Map::with_capacity(1);
    m.insert(key.to_owned(), value);
    Value::Object(m)
}

fn tagged(number: u64, value: Value) -> Value {
    let mut m = Map::with_capacity(2);
    m.insert(TAG.to_owned(), Value::from(number));
    m.insert(TAG_VALUE.to_owned(), value);
    Value::Object(m)
}

fn integer_to_json(i: &CborInteger) -> Value {
    match i.as_i64() {
        Some(v) => Value::from(v),
        None => sentinel(BIGINT, Value::String(i.to_string())),
    }
}

/// Project a decoded value into JSON.
#[must_use]
pub fn to_json(value: &CborValue) -> Value {
    match value {
        CborValue::Integer(i) => integer_to_json(i),
        CborValue::Bytes(b) => sentinel(BYTES, Value::String(hex::encode(b.as_slice()))),
        CborValue::Text(t) => Value::String(t.as_str().to_owned()),
        CborValue::Array(items) => Value::Array(items.iter().map(to_json).collect()),
        CborValue::Map(m) => {
            let mut out = Map::with_capacity(m.len());
            for (k, v) in m.iter() {
                out.insert(k.key_label(), to_json(v));
            }
            Value::Object(out)
        }
        CborValue::Tag(t) => tagged(t.number, to_json(&t.content)),
        CborValue::Constructor(c) => {
            let mut m = Map::with_capacity(2);
            m.insert(CONSTRUCTOR.to_owned(), Value::from(c.index));
            m.insert(
                FIELDS.to_owned(),
                Value::Array(c.fields.iter().map(to_json).collect()),
            );
            Value::Object(m)
        }
        CborValue::Fraction(f) => {
            let number = match f.base {
                FractionBase::Decimal => TAG_DECIMAL_FRACTION,
                FractionBase::Binary => TAG_BIGFLOAT,
            };
            tagged(
                number,
                Value::Array(vec![integer_to_json(&f.exponent), integer_to_json(&f.mantissa)]),
            )
        }
        CborValue::Set(items) => tagged(TAG_SET, Value::Array(items.iter().map(to_json).collect())),
        CborValue::Bool(b) => Value::Bool(*b),
        CborValue::Null => Value::Null,
        CborValue::Undefined => sentinel(UNDEFINED, Value::Bool(true)),
        CborValue::Simple(s) => sentinel(SIMPLE, Value::from(*s)),
        CborValue::Float(f) => {
            let v = f.value();
            match Number::from_f64(v) {
                Some(n) => Value::Number(n),
                None if v.is_nan() => sentinel(FLOAT, Value::String("NaN".to_owned())),
                None if v > 0.0 => sentinel(FLOAT, Value::String("Infinity".to_owned())),
                None => sentinel(FLOAT, Value::String("-Infinity".to_owned())),
            }
        }
    }
}

/// Rebuild a value from its JSON projection.
///
/// Integral JSON numbers become integers; other numbers become double-width floats.
///
/// # Errors
///
/// Returns [`JsonError`] if a sentinel object carries a malformed payload.
pub fn from_json(value: &Value) -> Result<CborValue, JsonError> {
    match value {
        Value::Null => Ok(CborValue::Null),
        Value::Bool(b) => Ok(CborValue::Bool(*b)),
        Value::Number(n) => number_from_json(n),
        Value::String(s) => Ok(CborValue::text(s.as_str())),
        Value::Array(items) => items
            .iter()
            .map(from_json)
            .collect::<Result<Vec<_>, _>>()
            .map(CborValue::Array),
        Value::Object(m) => object_from_json(m),
    }
}

fn number_from_json(n: &Number) -> Result<CborValue, JsonError> {
    if let Some(i) = n.as_i64() {
        return Ok(CborValue::Integer(CborInteger::from(i)));
    }
    if let Some(u) = n.as_u64() {
        return Ok(CborValue::Integer(CborInteger::from(u)));
    }
    n.as_f64()
        .map(CborValue::from)
        .ok_or(JsonError::InvalidNumber)
}

fn object_from_json(m: &Map<String, Value>) -> Result<CborValue, JsonError> {
    if m.len() == 1 {
        if let Some((key, payload)) = m.iter().next() {
            match key.as_str() {
                BYTES => {
                    let hex_str = payload.as_str().ok_or(JsonError::InvalidBytes)?;
                    let bytes = hex::decode(hex_str).map_err(|_| JsonError::InvalidBytes)?;
                    return Ok(CborValue::bytes(bytes));
                }
                FLOAT => {
                    let v = match payload.as_str() {
                        Some("NaN") => f64::NAN,
                        Some("Infinity") => f64::INFINITY,
                        Some("-Infinity") => f64::NEG_INFINITY,
                        _ => return Err(JsonError::InvalidFloat),
                    };
                    return Ok(CborValue::from(v));
                }
                BIGINT => {
                    let digits = payload.as_str().ok_or(JsonError::InvalidBigInt)?;
                    let i: CborInteger = digits.parse().map_err(|_| JsonError::InvalidBigInt)?;
                    return Ok(CborValue::Integer(i));
                }
                UNDEFINED => return Ok(CborValue::Undefined),
                SIMPLE => {
                    let n = payload
                        .as_u64()
                        .and_then(|n| u8::try_from(n).ok())
                        .ok_or(JsonError::InvalidSimple)?;
                    return Ok(CborValue::Simple(n));
                }
                _ => {}
            }
        }
    }

    if m.len() == 2 {
        if let (Some(number), Some(content)) = (m.get(TAG), m.get(TAG_VALUE)) {
            let number = number.as_u64().ok_or(JsonError::InvalidTag)?;
            return Ok(tag_from_json(number, from_json(content)?));
        }
        if let (Some(index), Some(fields)) = (m.get(CONSTRUCTOR), m.get(FIELDS)) {
            let index = index.as_u64().ok_or(JsonError::InvalidConstructor)?;
            let fields = fields.as_array().ok_or(JsonError::InvalidConstructor)?;
            let fields = fields.iter().map(from_json).collect::<Result<Vec<_>, _>>()?;
            return Ok(CborValue::Constructor(Constructor { index, fields }));
        }
    }

    let mut map = CborMap::new();
    for (k, v) in m {
        map.insert(CborValue::text(k.as_str()), from_json(v)?);
    }
    Ok(CborValue::Map(map))
}

fn tag_from_json(number: u64, content: CborValue) -> CborValue {
    match (number, content) {
        (TAG_SET, CborValue::Array(items)) => CborValue::Set(items),
        (TAG_DECIMAL_FRACTION | TAG_BIGFLOAT, CborValue::Array(items)) => {
            match <[CborValue; 2]>::try_from(items) {
                Ok([CborValue::Integer(exponent), CborValue::Integer(mantissa)]) => {
                    CborValue::Fraction(Fraction {
                        base: if number == TAG_DECIMAL_FRACTION {
                            FractionBase::Decimal
                        } else {
                            FractionBase::Binary
                        },
                        exponent,
                        mantissa,
                    })
                }
                Ok(pair) => CborValue::tag(number, CborValue::Array(pair.into())),
                Err(items) => CborValue::tag(number, CborValue::Array(items)),
            }
        }
        (_, content) => CborValue::tag(number, content),
    }
}

