//! Textual encoding of values in the model description.
//!
//! Floats are written with 16 significant digits so that a start value read back
//! from the description equals the value the model held. The layout follows C's
//! `%.16g`: fixed notation for decimal exponents in `-4..16`, scientific notation
//! otherwise, trailing zeros removed.

use crate::value::Value;

const SIGNIFICANT_DIGITS: i32 = 16;

pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        let zero = if value.is_sign_negative() { "-0" } else { "0" };
        return zero.to_string();
    }

    // Rounding to the significant digits may carry into the exponent, so the
    // exponent is taken from the rounded scientific form.
    let scientific = format!("{:.*e}", (SIGNIFICANT_DIGITS - 1) as usize, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= SIGNIFICANT_DIGITS {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", strip_zeros(mantissa), sign, exponent.abs())
    } else {
        let decimals = (SIGNIFICANT_DIGITS - 1 - exponent) as usize;
        strip_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn strip_zeros(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

/// Encode a start value as an attribute.
///
/// Arrays become space-separated element lists in row-major order. Strings are
/// returned unchanged; the description puts them in a child element instead.
pub fn encode_start(value: &Value) -> String {
    fn join<T>(items: impl Iterator<Item = T>, f: impl Fn(T) -> String) -> String {
        items.map(f).collect::<Vec<_>>().join(" ")
    }

    match value {
        Value::Boolean(b) => b.to_string(),
        Value::Int32(i) => i.to_string(),
        Value::Int64(i) => i.to_string(),
        Value::UInt64(i) => i.to_string(),
        Value::Float64(f) => format_float(*f),
        Value::String(s) => s.clone(),
        Value::BooleanArray(a) => join(a.iter(), |b| b.to_string()),
        Value::Int32Array(a) => join(a.iter(), |i| i.to_string()),
        Value::Int64Array(a) => join(a.iter(), |i| i.to_string()),
        Value::UInt64Array(a) => join(a.iter(), |i| i.to_string()),
        Value::Float64Array(a) => join(a.iter(), |f| format_float(*f)),
    }
}
