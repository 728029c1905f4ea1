//! INI codec.
//!
//! Mapping between INI text and a document:
//!
//! ```text
//! registry = http://registry.npmjs.org      -> {"registry": "http://…",
//! tags[] = a                                    "tags": ["a", "b"],
//! tags[] = b                                    "proxy": {"enabled": true,
//!                                                         "auth": {"user": "me"}}}
//! [proxy]
//! enabled = true
//!
//! [proxy.auth]
//! user = me
//! ```
//!
//! Values are strings except the literals `true`, `false` and `null`.
//! Typed attributes coerce the rest (a `number` attribute accepts `"11"`).
//! A string that would not read back as itself when written bare (one
//! with surrounding whitespace, a leading quote, or spelling a literal) is
//! written as a double-quoted JSON string, and such values are unquoted
//! again on parse. A bare value wrapped in single quotes reads as the text
//! between them.

use ini::{Ini, ParseOption};
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{CodecError, CodecResult};
use crate::{Codec, Document};

/// Suffix marking a repeated key that collects into an array.
const ARRAY_SUFFIX: &str = "[]";

/// Reads and writes config files as INI text.
#[derive(Debug, Clone, Copy, Default)]
pub struct IniCodec;

impl IniCodec {
    /// Name the codec is registered under.
    pub const NAME: &'static str = "ini";
}

impl Codec for IniCodec {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parse(&self, text: &str) -> CodecResult<Document> {
        let mut document = Document::new();
        if text.trim().is_empty() {
            return Ok(document);
        }

        let options = ParseOption {
            enabled_quote: false,
            ..ParseOption::default()
        };
        let parsed = Ini::load_from_str_opt(text, options)
            .map_err(|e| CodecError::parse(Self::NAME, e.to_string()))?;

        for (section, properties) in parsed.iter() {
            let target = match section {
                None => &mut document,
                Some(name) => section_table(&mut document, name),
            };
            for (key, raw) in properties.iter() {
                insert_entry(target, key, raw);
            }
        }

        Ok(document)
    }

    fn stringify(&self, document: &Document) -> CodecResult<String> {
        let mut out = Ini::new();
        write_section(&mut out, None, document);

        let mut buf = Vec::new();
        out.write_to(&mut buf)
            .map_err(|e| CodecError::serialize(Self::NAME, e.to_string()))?;
        String::from_utf8(buf).map_err(|e| CodecError::serialize(Self::NAME, e.to_string()))
    }
}

/// Walk (creating as needed) the nested table for a dotted section name.
fn section_table<'a>(document: &'a mut Document, name: &str) -> &'a mut Document {
    let mut current = document;
    for segment in name.split('.') {
        let slot = current
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            trace!(section = name, segment, "Section shadows a scalar key; replacing");
            *slot = Value::Object(Map::new());
        }
        let Value::Object(table) = slot else {
            unreachable!("slot was just made an object")
        };
        current = table;
    }
    current
}

fn insert_entry(target: &mut Document, key: &str, raw: &str) {
    let value = decode_scalar(raw);
    if let Some(name) = key.strip_suffix(ARRAY_SUFFIX) {
        let slot = target
            .entry(name.to_owned())
            .or_insert_with(|| Value::Array(Vec::new()));
        match slot {
            Value::Array(items) => items.push(value),
            other => *other = Value::Array(vec![value]),
        }
    } else {
        target.insert(key.to_owned(), value);
    }
}

fn decode_scalar(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        quoted if is_wrapped(quoted, '"') => serde_json::from_str::<String>(quoted)
            .map_or_else(|_| Value::String(quoted.to_owned()), Value::String),
        quoted if is_wrapped(quoted, '\'') => {
            Value::String(quoted[1..quoted.len().saturating_sub(1)].to_owned())
        },
        other => Value::String(other.to_owned()),
    }
}

fn is_wrapped(raw: &str, quote: char) -> bool {
    raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote)
}

fn encode_scalar(value: &Value) -> String {
    match value {
        Value::String(s) if needs_quoting(s) => Value::String(s.clone()).to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Whether a bare `s` would parse back as something else.
fn needs_quoting(s: &str) -> bool {
    s.trim() != s
        || s.starts_with(['"', '\''])
        || matches!(s, "true" | "false" | "null")
}

fn write_section(out: &mut Ini, name: Option<&str>, table: &Document) {
    let mut nested = Vec::new();
    for (key, value) in table {
        match value {
            Value::Object(child) => nested.push((key, child)),
            Value::Array(items) => {
                let array_key = format!("{key}{ARRAY_SUFFIX}");
                for item in items {
                    out.with_section(name)
                        .add(array_key.as_str(), encode_scalar(item));
                }
            },
            scalar => {
                out.with_section(name)
                    .set(key.as_str(), encode_scalar(scalar));
            },
        }
    }

    for (key, child) in nested {
        let section = match name {
            Some(parent) => format!("{parent}.{key}"),
            None => key.clone(),
        };
        write_section(out, Some(&section), child);
    }
}
