//! The in-memory document tree shared by the patch, hash and diff engines.
//!
//! Documents are plain [`serde_json::Value`] trees. The workspace enables
//! serde_json's `preserve_order` feature, so object keys keep their insertion
//! order when serialized; that order carries no meaning. Use [`deep_eq`] for
//! content equality and [`canonical_json`] for anything that must be stable
//! across equivalent documents.

use serde_json::{Map, Number, Value};

/// A recursively defined object / array / scalar value.
pub type DocumentTree = Value;

/// Object node of a [`DocumentTree`].
pub type DocumentMap = Map<String, Value>;

/// Key holding a resource's logical id inside its document.
pub const ID_KEY: &str = "id";

/// Structural equality, independent of object key order.
///
/// Numbers compare by their canonical rendering, so `1` equals `1.0` and
/// `deep_eq` agrees with [`canonical_json`] everywhere.
pub fn deep_eq(a: &DocumentTree, b: &DocumentTree) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_eq(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| deep_eq(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| deep_eq(v, w)))
        }
        _ => a == b,
    }
}

fn numbers_eq(x: &Number, y: &Number) -> bool {
    canonical_number(x) == canonical_number(y)
}

/// Serialize with object keys sorted and no insignificant whitespace.
///
/// Two documents produce the same string exactly when they are [`deep_eq`].
/// Floats with no fractional part are written as integers so `1.0` and `1`
/// agree.
pub fn canonical_json(doc: &DocumentTree) -> String {
    let mut out = String::new();
    write_canonical(doc, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(n, out),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
    }
}

// 2^63: every integral f64 below this converts to i64 exactly.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Integral floats inside the i64 range render as integers; everything else
/// keeps serde_json's own formatting.
fn canonical_number(n: &Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.fract() == 0.0 && f.abs() < I64_BOUND {
                return (f as i64).to_string();
            }
        }
    }
    n.to_string()
}

fn write_number(n: &Number, out: &mut String) {
    out.push_str(&canonical_number(n));
}

fn write_string(s: &str, out: &mut String) {
    // Value's Display applies JSON string escaping.
    out.push_str(&Value::String(s.to_owned()).to_string());
}

/// Copy of `doc` with a top-level `key` removed. Non-objects are returned as-is.
pub fn without_key(doc: &DocumentTree, key: &str) -> DocumentTree {
    let mut copy = doc.clone();
    if let Value::Object(map) = &mut copy {
        map.shift_remove(key);
    }
    copy
}

/// The logical id stored under `document.id`, if it is a string.
pub fn document_id(doc: &DocumentTree) -> Option<&str> {
    doc.get(ID_KEY).and_then(Value::as_str)
}
