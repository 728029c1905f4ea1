//! JSON codec.

use serde_json::Value;

use crate::error::{CodecError, CodecResult};
use crate::{Codec, Document};

/// Reads and writes config files as a JSON object.
///
/// Blank input decodes to an empty document so a freshly created, empty
/// config file is not a parse error.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Name the codec is registered under.
    pub const NAME: &'static str = "json";
}

impl Codec for JsonCodec {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parse(&self, text: &str) -> CodecResult<Document> {
        if text.trim().is_empty() {
            return Ok(Document::new());
        }

        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(document)) => Ok(document),
            Ok(other) => Err(CodecError::parse(
                Self::NAME,
                format!("top level must be an object, found {}", kind_of(&other)),
            )),
            Err(e) => Err(CodecError::parse(Self::NAME, e.to_string())),
        }
    }

    fn stringify(&self, document: &Document) -> CodecResult<String> {
        let mut text = serde_json::to_string_pretty(document)
            .map_err(|e| CodecError::serialize(Self::NAME, e.to_string()))?;
        text.push('\n');
        Ok(text)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_blank_input_is_empty_document() {
        assert!(JsonCodec.parse("").unwrap().is_empty());
        assert!(JsonCodec.parse("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_object() {
        let document = JsonCodec.parse(r#"{"a": 11, "b": "x"}"#).unwrap();
        assert_eq!(document.get("a"), Some(&json!(11)));
        assert_eq!(document.get("b"), Some(&json!("x")));
    }

    #[test]
    fn test_non_object_top_level_is_parse_error() {
        let err = JsonCodec.parse("[1, 2]").unwrap_err();
        assert!(matches!(err, CodecError::Parse { ref message, .. } if message.contains("an array")));
    }

    #[test]
    fn test_malformed_is_parse_error() {
        assert!(matches!(
            JsonCodec.parse("{a:"),
            Err(CodecError::Parse { .. })
        ));
    }

    #[test]
    fn test_stringify_is_pretty_and_ordered() {
        let Value::Object(document) = json!({"z": 1, "a": [true, null]}) else {
            unreachable!()
        };
        let text = JsonCodec.stringify(&document).unwrap();
        assert!(text.ends_with('\n'));
        assert!(text.find("\"z\"").unwrap() < text.find("\"a\"").unwrap());
        assert_eq!(JsonCodec.parse(&text).unwrap(), document);
    }
}
