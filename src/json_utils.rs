use serde_json::{Map, Value};

use crate::record::RecordError;

pub type Object = Map<String, Value>;

/// Fetch a key that must be present (JSON `null` counts as present).
pub fn require<'a>(obj: &'a Object, key: &'static str) -> Result<&'a Value, RecordError> {
    obj.get(key).ok_or(RecordError::MissingField(key))
}

/// Render a value the way it is stored: strings verbatim, `null` as SQL NULL,
/// everything else as its JSON text.
pub fn text_of(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Required key rendered as text; `null` becomes an empty string.
pub fn require_text(obj: &Object, key: &'static str) -> Result<String, RecordError> {
    Ok(text_of(require(obj, key)?).unwrap_or_default())
}

/// Integer coercion: JSON ints, floats (truncated) and numeric strings are accepted.
pub fn int_of(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let t = s.trim();
            t.parse::<i64>().ok().or_else(|| t.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

pub fn require_int(obj: &Object, key: &'static str) -> Result<i64, RecordError> {
    int_of(require(obj, key)?).ok_or(RecordError::InvalidField(key))
}

/// Replace unpaired UTF-16 surrogate escapes (`\ud83d` without its partner) with `�`,
/// so lines carrying broken emoji still parse. Returns `None` when nothing needed fixing.
pub fn repair_lone_surrogates(line: &str) -> Option<String> {
    let b = line.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0usize;
    let mut i = 0usize;

    while i + 1 < b.len() {
        if b[i] != b'\\' {
            i += 1;
            continue;
        }
        if b[i + 1] != b'u' {
            // skip the escaped char (handles `\\u` literals)
            i += 2;
            continue;
        }
        let Some(cu) = hex4(b, i + 2) else {
            i += 2;
            continue;
        };
        let lone = match cu {
            0xD800..=0xDBFF => {
                let paired = b.get(i + 6) == Some(&b'\\')
                    && b.get(i + 7) == Some(&b'u')
                    && matches!(hex4(b, i + 8), Some(0xDC00..=0xDFFF));
                if paired {
                    i += 12;
                    continue;
                }
                true
            }
            0xDC00..=0xDFFF => true,
            _ => false,
        };
        if lone {
            let o = out.get_or_insert_with(|| String::with_capacity(line.len()));
            o.push_str(&line[copied..i]);
            o.push_str("\\ufffd");
            copied = i + 6;
        }
        i += 6;
    }

    out.map(|mut o| {
        o.push_str(&line[copied..]);
        o
    })
}

fn hex4(b: &[u8], at: usize) -> Option<u32> {
    let s = b.get(at..at + 4)?;
    let s = std::str::from_utf8(s).ok()?;
    u32::from_str_radix(s, 16).ok()
}
