//! Codec selection.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{CodecError, CodecResult};
use crate::ini_codec::IniCodec;
use crate::json::JsonCodec;
use crate::Codec;

/// How a caller picks the codec for config files.
#[derive(Debug, Clone)]
pub enum CodecSelector {
    /// A codec registered under this name.
    Named(String),
    /// A caller-supplied codec.
    Custom(Arc<dyn Codec>),
}

impl CodecSelector {
    /// Wrap a custom codec.
    #[must_use]
    pub fn custom(codec: impl Codec + 'static) -> Self {
        Self::Custom(Arc::new(codec))
    }

    /// Resolve against `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownCodec`] if a named codec is not registered.
    pub fn resolve(&self, registry: &CodecRegistry) -> CodecResult<Arc<dyn Codec>> {
        match self {
            Self::Named(name) => registry
                .get(name)
                .ok_or_else(|| CodecError::UnknownCodec(name.clone())),
            Self::Custom(codec) => Ok(Arc::clone(codec)),
        }
    }
}

impl Default for CodecSelector {
    fn default() -> Self {
        Self::Named(JsonCodec::NAME.to_owned())
    }
}

impl From<&str> for CodecSelector {
    fn from(name: &str) -> Self {
        Self::Named(name.to_owned())
    }
}

impl From<String> for CodecSelector {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

/// Name → codec table, pre-populated with `json` and `ini`.
#[derive(Debug, Clone)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl CodecRegistry {
    /// Registry with the built-in codecs.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(JsonCodec);
        registry.register(IniCodec);
        registry
    }

    /// Registry with no codecs.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Register `codec` under its name, returning any codec it replaced.
    pub fn register(&mut self, codec: impl Codec + 'static) -> Option<Arc<dyn Codec>> {
        let name = codec.name().to_owned();
        self.codecs.insert(name, Arc::new(codec))
    }

    /// Codec registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Codec>> {
        self.codecs.get(name).cloned()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.codecs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;

    #[derive(Debug)]
    struct Lines;

    impl Codec for Lines {
        fn name(&self) -> &str {
            "lines"
        }

        fn parse(&self, _text: &str) -> CodecResult<Document> {
            Ok(Document::new())
        }

        fn stringify(&self, _document: &Document) -> CodecResult<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn test_builtin_names() {
        assert_eq!(CodecRegistry::new().names(), vec!["ini", "json"]);
    }

    #[test]
    fn test_default_selector_is_json() {
        let codec = CodecSelector::default()
            .resolve(&CodecRegistry::new())
            .unwrap();
        assert_eq!(codec.name(), "json");
    }

    #[test]
    fn test_unknown_name_fails() {
        let err = CodecSelector::from("yaml")
            .resolve(&CodecRegistry::new())
            .unwrap_err();
        assert_eq!(err, CodecError::UnknownCodec("yaml".to_owned()));
    }

    #[test]
    fn test_custom_selector_and_registration() {
        let codec = CodecSelector::custom(Lines)
            .resolve(&CodecRegistry::empty())
            .unwrap();
        assert_eq!(codec.name(), "lines");

        let mut registry = CodecRegistry::new();
        assert!(registry.register(Lines).is_none());
        assert!(CodecSelector::from("lines").resolve(&registry).is_ok());
    }
}
