//! Tolerant coercion of loosely-typed JSON fields.
//!
//! The station feed is third-party data whose field types drift between
//! releases: numbers arrive as strings, with thousands separators, or as
//! `null`. Every coercion here degrades to a zero value instead of failing,
//! so one malformed field never rejects a record or a batch.

use serde_json::Value;

/// Coerce a value to an integer.
///
/// Floats truncate toward zero. Strings are trimmed and stripped of `,`
/// before parsing. Anything unparseable becomes `0`.
pub fn to_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i
            } else if let Some(u) = n.as_u64() {
                i64::try_from(u).unwrap_or(i64::MAX)
            } else {
                n.as_f64().map(|f| f.trunc() as i64).unwrap_or(0)
            }
        }
        Value::String(s) => {
            let cleaned = clean(s);
            if cleaned.is_empty() {
                return 0;
            }
            cleaned.parse().unwrap_or(0)
        }
        _ => 0,
    }
}

/// Coerce a value to a float, same cleaning and zero-on-failure policy as
/// [`to_int`]. Non-finite results (`"NaN"`, `"inf"`) also become `0.0`.
pub fn to_float64(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let cleaned = clean(s);
            if cleaned.is_empty() {
                return 0.0;
            }
            cleaned.parse().unwrap_or(0.0)
        }
        _ => 0.0,
    };

    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

/// Format any value as a string, trimmed and without `,`. `null` is empty.
pub fn to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => clean(s),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            // Integral floats print without a fraction ("1234", not "1234.0")
            (_, _, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
            (_, _, Some(f)) => f.to_string(),
            _ => String::new(),
        },
        other => clean(&other.to_string()),
    }
}

/// Coerce a 0/1 style flag. Booleans are taken as-is, `"true"` is accepted,
/// everything else is true when its integer value is non-zero.
pub fn to_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) if clean(s).eq_ignore_ascii_case("true") => true,
        other => to_int(other) != 0,
    }
}

fn clean(raw: &str) -> String {
    raw.replace(',', "").trim().to_string()
}
