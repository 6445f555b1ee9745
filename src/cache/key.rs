// Cache key derivation - input normalization and cheap string hashing
// Author: kelexine (https://github.com/kelexine)
//
// Keys are a 32-bit rolling hash rendered in base 36. Collisions are possible
// and tolerated: a collision serves another entry's reply, it never fails.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Matches every character that is neither a word character nor whitespace
static PUNCTUATION_REGEX: OnceLock<Regex> = OnceLock::new();

/// Matches runs of whitespace
static WHITESPACE_REGEX: OnceLock<Regex> = OnceLock::new();

fn punctuation_regex() -> &'static Regex {
    PUNCTUATION_REGEX.get_or_init(|| Regex::new(r"[^\w\s]").expect("Invalid regex pattern"))
}

fn whitespace_regex() -> &'static Regex {
    WHITESPACE_REGEX.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"))
}

/// Normalize user input so that case, surrounding whitespace, punctuation and
/// whitespace runs do not affect the derived key.
///
/// Steps, in order: lower-case, trim, strip punctuation, collapse whitespace.
pub fn normalize_input(input: &str) -> String {
    let lowered = input.to_lowercase();
    let trimmed = lowered.trim();
    let stripped = punctuation_regex().replace_all(trimmed, "");
    whitespace_regex().replace_all(&stripped, " ").into_owned()
}

/// Serialize a context value with object keys in sorted order, so that two
/// contexts that differ only in key order produce the same string.
pub fn canonical_context(context: &Value) -> String {
    serde_json::to_string(&sorted(context)).unwrap_or_default()
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<(&String, &Value)> = map.iter().collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = Map::with_capacity(map.len());
            for (key, field) in fields {
                out.insert(key.clone(), sorted(field));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// Derive the cache key for `input` and an optional `context`.
pub fn derive_key(input: &str, context: Option<&Value>) -> String {
    let mut material = normalize_input(input);
    if let Some(ctx) = context {
        material.push_str(&canonical_context(ctx));
    }
    to_base36(rolling_hash(&material).unsigned_abs())
}

/// `h = h * 31 + unit` over UTF-16 code units with 32-bit wrap-around.
fn rolling_hash(text: &str) -> i32 {
    text.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(unit as i32)
    })
}

fn to_base36(mut n: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(7);
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}
