//! Attribute types: the validate → transform → expose pipeline.
//!
//! A type bundles four optional hooks:
//!
//! - `validate` decides whether a candidate value may be written at all
//! - `transform` turns an accepted value into the stored value
//! - `expose` maps the stored value to the value readers see
//! - `setup` runs once at registration and again on every reset
//!
//! The built-in kinds cover the common cases; anything else goes through
//! [`AttributeKind::Custom`].

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Number, Value};

use crate::context::AttrContext;
use crate::error::AttrError;

/// Output of a transform hook.
///
/// An advisory is a note about the conversion (for example a lossy
/// fallback). It is logged but never blocks the write.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    /// Value to store.
    pub value: Value,
    /// Optional advisory message.
    pub advisory: Option<String>,
}

impl Transformed {
    /// A clean conversion.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            value,
            advisory: None,
        }
    }

    /// A conversion that stores `value` but reports `message`.
    #[must_use]
    pub fn advisory(value: Value, message: impl Into<String>) -> Self {
        Self {
            value,
            advisory: Some(message.into()),
        }
    }
}

/// Behaviour attached to an attribute.
///
/// Every hook has a pass-through default, so a custom type only overrides
/// what it needs.
pub trait AttributeType: fmt::Debug + Send + Sync {
    /// Name used in schema documents and diagnostics.
    fn name(&self) -> &str;

    /// Accept or refuse a candidate value.
    ///
    /// # Errors
    ///
    /// Returns the refusal reason. The store stays unchanged.
    fn validate(&self, _value: &Value, _ctx: &AttrContext<'_>) -> Result<(), String> {
        Ok(())
    }

    /// Convert an accepted value into its stored form.
    fn transform(&self, value: Value, _ctx: &AttrContext<'_>) -> Transformed {
        Transformed::new(value)
    }

    /// Map a stored value to the value readers see.
    fn expose(&self, stored: &Value, _ctx: &AttrContext<'_>) -> Value {
        stored.clone()
    }

    /// Side-effecting initializer, run at registration and on reset.
    fn setup(&self, _initial: &Value, _ctx: &AttrContext<'_>) {}
}

/// The closed set of attribute kinds.
#[derive(Debug, Clone, Default)]
pub enum AttributeKind {
    /// Any value, stored as given.
    #[default]
    Plain,
    /// Numbers, coerced from numeric strings, booleans and null.
    Number,
    /// Booleans, coerced from common truthy/falsy spellings.
    Boolean,
    /// Strings, coerced from other scalars.
    Text,
    /// Filesystem paths, resolved to absolute form.
    Path,
    /// URLs that carry a host.
    Url,
    /// A caller-supplied type.
    Custom(Arc<dyn AttributeType>),
}

static PLAIN: PlainType = PlainType;
static NUMBER: NumberType = NumberType;
static BOOLEAN: BooleanType = BooleanType;
static TEXT: TextType = TextType;
static PATH: PathType = PathType;
static URL: UrlType = UrlType;

impl AttributeKind {
    /// Wrap a custom type.
    #[must_use]
    pub fn custom(kind: impl AttributeType + 'static) -> Self {
        Self::Custom(Arc::new(kind))
    }

    /// Hooks implementing this kind.
    #[must_use]
    pub fn hooks(&self) -> &dyn AttributeType {
        match self {
            Self::Plain => &PLAIN,
            Self::Number => &NUMBER,
            Self::Boolean => &BOOLEAN,
            Self::Text => &TEXT,
            Self::Path => &PATH,
            Self::Url => &URL,
            Self::Custom(kind) => kind.as_ref(),
        }
    }

    /// Name of this kind.
    #[must_use]
    pub fn name(&self) -> &str {
        self.hooks().name()
    }

    /// Whether `name` refers to a built-in kind.
    #[must_use]
    pub fn is_builtin_name(name: &str) -> bool {
        name.parse::<Self>().is_ok()
    }
}

impl FromStr for AttributeKind {
    type Err = AttrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "plain" | "any" => Ok(Self::Plain),
            "number" => Ok(Self::Number),
            "boolean" | "bool" => Ok(Self::Boolean),
            "string" => Ok(Self::Text),
            "path" => Ok(Self::Path),
            "url" => Ok(Self::Url),
            other => Err(AttrError::UnknownType {
                key: String::new(),
                type_name: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Built-in kinds
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct PlainType;

impl AttributeType for PlainType {
    fn name(&self) -> &str {
        "plain"
    }
}

#[derive(Debug)]
struct NumberType;

impl AttributeType for NumberType {
    fn name(&self) -> &str {
        "number"
    }

    fn validate(&self, value: &Value, _ctx: &AttrContext<'_>) -> Result<(), String> {
        coerce_number(value)
            .map(|_| ())
            .ok_or_else(|| format!("{value} is not a finite number"))
    }

    fn transform(&self, value: Value, _ctx: &AttrContext<'_>) -> Transformed {
        if value.is_number() {
            return Transformed::new(value);
        }
        match coerce_number(&value).and_then(number_value) {
            Some(number) => Transformed::new(number),
            None => Transformed::advisory(value, "number coercion failed; stored as given"),
        }
    }
}

/// Coerce a scalar to a finite `f64`.
fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        },
        Value::Array(_) | Value::Object(_) => None,
    };
    number.filter(|n| n.is_finite())
}

/// Largest integer an `f64` represents exactly (2^53).
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

#[allow(clippy::cast_possible_truncation)]
fn number_value(n: f64) -> Option<Value> {
    if n.fract() == 0.0 && n.abs() < MAX_EXACT_INTEGER {
        return Some(Value::from(n as i64));
    }
    Number::from_f64(n).map(Value::Number)
}

#[derive(Debug)]
struct BooleanType;

impl AttributeType for BooleanType {
    fn name(&self) -> &str {
        "boolean"
    }

    fn validate(&self, value: &Value, _ctx: &AttrContext<'_>) -> Result<(), String> {
        if value.is_array() || value.is_object() {
            return Err("containers cannot be used as booleans".to_owned());
        }
        Ok(())
    }

    fn transform(&self, value: Value, _ctx: &AttrContext<'_>) -> Transformed {
        let flag = match &value {
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "false" | "no" | "off" | "0" | "" => false,
                _ => true,
            },
            Value::Array(_) | Value::Object(_) => true,
        };
        Transformed::new(Value::Bool(flag))
    }
}

#[derive(Debug)]
struct TextType;

impl AttributeType for TextType {
    fn name(&self) -> &str {
        "string"
    }

    fn validate(&self, value: &Value, _ctx: &AttrContext<'_>) -> Result<(), String> {
        if value.is_array() || value.is_object() {
            return Err("containers cannot be used as strings".to_owned());
        }
        Ok(())
    }

    fn transform(&self, value: Value, _ctx: &AttrContext<'_>) -> Transformed {
        let text = match value {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Transformed::new(Value::String(text))
    }
}

#[derive(Debug)]
struct PathType;

impl AttributeType for PathType {
    fn name(&self) -> &str {
        "path"
    }

    fn validate(&self, value: &Value, _ctx: &AttrContext<'_>) -> Result<(), String> {
        let accepted = match value {
            Value::String(_) | Value::Bool(true) => true,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::Null | Value::Bool(false) | Value::Array(_) | Value::Object(_) => false,
        };
        if accepted {
            Ok(())
        } else {
            Err(format!("{value} is not a path"))
        }
    }

    fn transform(&self, value: Value, ctx: &AttrContext<'_>) -> Transformed {
        let raw = match &value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        let base = match ctx.host().working_dir() {
            Some(dir) => dir.to_path_buf(),
            None => match std::env::current_dir() {
                Ok(dir) => dir,
                Err(e) => {
                    return Transformed::advisory(
                        Value::String(raw),
                        format!("current directory unavailable ({e}); path left relative"),
                    );
                },
            },
        };

        let resolved = resolve_lexically(&base, Path::new(&raw));
        Transformed::new(Value::String(resolved.to_string_lossy().into_owned()))
    }
}

/// Join `raw` onto `base` and fold `.` and `..` without touching the filesystem.
fn resolve_lexically(base: &Path, raw: &Path) -> PathBuf {
    let joined = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        base.join(raw)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                out.pop();
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[derive(Debug)]
struct UrlType;

impl AttributeType for UrlType {
    fn name(&self) -> &str {
        "url"
    }

    fn validate(&self, value: &Value, _ctx: &AttrContext<'_>) -> Result<(), String> {
        let Some(raw) = value.as_str() else {
            return Err(format!("{value} is not a URL string"));
        };
        match url::Url::parse(raw) {
            Ok(parsed) if parsed.host_str().is_some_and(|h| !h.is_empty()) => Ok(()),
            Ok(_) => Err(format!("URL '{raw}' has no host")),
            Err(e) => Err(format!("URL '{raw}' is malformed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::context::HostContext;

    fn run(kind: &AttributeKind, host: &HostContext, value: Value) -> Result<Value, String> {
        let values = HashMap::new();
        let ctx = AttrContext::new("k", host, &values);
        kind.hooks().validate(&value, &ctx)?;
        Ok(kind.hooks().transform(value, &ctx).value)
    }

    #[test]
    fn test_kind_names_round_trip() {
        for name in ["plain", "number", "boolean", "string", "path", "url"] {
            let kind: AttributeKind = name.parse().unwrap();
            assert_eq!(kind.name(), name);
        }
        assert!(AttributeKind::is_builtin_name("any"));
        assert!(matches!(
            "date".parse::<AttributeKind>(),
            Err(AttrError::UnknownType { type_name, .. }) if type_name == "date"
        ));
    }

    #[test]
    fn test_number_coercion() {
        let host = HostContext::new();
        let kind = AttributeKind::Number;
        assert_eq!(run(&kind, &host, json!("11")).unwrap(), json!(11));
        assert_eq!(run(&kind, &host, json!(" 2.5 ")).unwrap(), json!(2.5));
        assert_eq!(run(&kind, &host, json!(true)).unwrap(), json!(1));
        assert_eq!(run(&kind, &host, json!("")).unwrap(), json!(0));
        assert_eq!(run(&kind, &host, json!(7)).unwrap(), json!(7));
        assert!(run(&kind, &host, json!("eleven")).is_err());
        assert!(run(&kind, &host, json!("inf")).is_err());
        assert!(run(&kind, &host, json!([1])).is_err());
    }

    #[test]
    fn test_boolean_coercion() {
        let host = HostContext::new();
        let kind = AttributeKind::Boolean;
        assert_eq!(run(&kind, &host, json!("false")).unwrap(), json!(false));
        assert_eq!(run(&kind, &host, json!("Yes")).unwrap(), json!(true));
        assert_eq!(run(&kind, &host, json!(0)).unwrap(), json!(false));
        assert_eq!(run(&kind, &host, json!("anything")).unwrap(), json!(true));
        assert_eq!(run(&kind, &host, Value::Null).unwrap(), json!(false));
        assert!(run(&kind, &host, json!({})).is_err());
    }

    #[test]
    fn test_text_coercion() {
        let host = HostContext::new();
        let kind = AttributeKind::Text;
        assert_eq!(run(&kind, &host, json!(42)).unwrap(), json!("42"));
        assert_eq!(run(&kind, &host, Value::Null).unwrap(), json!(""));
        assert!(run(&kind, &host, json!(["a"])).is_err());
    }

    #[test]
    fn test_path_resolves_against_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let host = HostContext::new().with_working_dir(dir.path());
        let kind = AttributeKind::Path;

        let resolved = run(&kind, &host, json!("cache/../data/./x")).unwrap();
        assert_eq!(
            resolved,
            json!(dir.path().join("data").join("x").to_string_lossy())
        );

        let empty = run(&kind, &host, json!("")).unwrap();
        assert_eq!(empty, json!(dir.path().to_string_lossy()));

        assert!(run(&kind, &host, Value::Null).is_err());
        assert!(run(&kind, &host, json!(false)).is_err());
        assert!(run(&kind, &host, json!(0)).is_err());
    }

    #[test]
    fn test_path_keeps_absolute_input() {
        let host = HostContext::new().with_working_dir("/srv/app");
        let resolved = run(&AttributeKind::Path, &host, json!("/etc/../var/log")).unwrap();
        assert_eq!(resolved, json!("/var/log"));
    }

    #[test]
    fn test_url_requires_host() {
        let host = HostContext::new();
        let kind = AttributeKind::Url;
        assert_eq!(
            run(&kind, &host, json!("http://registry.npmjs.org")).unwrap(),
            json!("http://registry.npmjs.org")
        );
        assert!(run(&kind, &host, json!("registry.npmjs.org")).is_err());
        assert!(run(&kind, &host, json!("file:///tmp/x")).is_err());
        assert!(run(&kind, &host, json!(3)).is_err());
    }
}
