//! Schema definitions.
//!
//! A [`Schema`] is immutable data: an ordered list of keys, each with an
//! [`AttributeDef`]. Every attribute store is built from a schema by value,
//! so stores never share definitions.
//!
//! Schemas can be written in code or parsed from a JSON/TOML document:
//!
//! ```toml
//! [registry]
//! type = "url"
//! default = "http://registry.npmjs.org"
//!
//! [cache_root]
//! type = "path"
//! default = "/var/cache/app"
//! read_only = true
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{AttrError, AttrResult};
use crate::kind::{AttributeKind, AttributeType};

/// Definition of a single attribute.
#[derive(Debug, Clone)]
pub struct AttributeDef {
    /// Behaviour of the attribute.
    pub kind: AttributeKind,
    /// Value restored on reset. `None` resets to null.
    pub default: Option<Value>,
    /// Read-only attributes only change through reset.
    pub read_only: bool,
    /// Whether the attribute shows up in listings.
    pub enumerable: bool,
}

impl Default for AttributeDef {
    fn default() -> Self {
        Self {
            kind: AttributeKind::Plain,
            default: None,
            read_only: false,
            enumerable: true,
        }
    }
}

impl AttributeDef {
    /// Create a definition of the given kind.
    #[must_use]
    pub fn new(kind: AttributeKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Set the default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Mark the attribute read-only.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Hide the attribute from listings.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.enumerable = false;
        self
    }

    /// Default value as stored after a reset.
    #[must_use]
    pub fn initial_value(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }
}

/// Named custom types available to schema documents.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    custom: HashMap<String, Arc<dyn AttributeType>>,
}

impl TypeRegistry {
    /// Create a registry with only the built-in kinds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a custom type available under its own name.
    ///
    /// Built-in names cannot be shadowed.
    ///
    /// # Errors
    ///
    /// Returns [`AttrError::Duplicate`] if the name is already taken.
    pub fn register(&mut self, kind: impl AttributeType + 'static) -> AttrResult<()> {
        let name = kind.name().to_owned();
        if AttributeKind::is_builtin_name(&name) || self.custom.contains_key(&name) {
            return Err(AttrError::Duplicate(name));
        }
        self.custom.insert(name, Arc::new(kind));
        Ok(())
    }

    /// Resolve a type name to a kind.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<AttributeKind> {
        name.parse::<AttributeKind>().ok().or_else(|| {
            self.custom
                .get(name)
                .map(|kind| AttributeKind::Custom(Arc::clone(kind)))
        })
    }
}

/// Document shape of one schema entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDef {
    #[serde(rename = "type", default)]
    type_name: Option<String>,
    #[serde(default, alias = "value")]
    default: Option<Value>,
    #[serde(default, alias = "readOnly")]
    read_only: bool,
    #[serde(default = "enumerable_default")]
    enumerable: bool,
}

fn enumerable_default() -> bool {
    true
}

/// Ordered, immutable set of attribute definitions.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entries: Vec<(String, AttributeDef)>,
}

impl Schema {
    /// Start building a schema in code.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Parse a schema from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`AttrError::MalformedSchema`] for shape errors and
    /// [`AttrError::UnknownType`] for type names missing from `types`.
    pub fn from_value(document: &Value, types: &TypeRegistry) -> AttrResult<Self> {
        let Some(table) = document.as_object() else {
            return Err(AttrError::MalformedSchema {
                key: String::new(),
                message: "schema document must be an object".to_owned(),
            });
        };

        let mut builder = Self::builder();
        for (key, entry) in table {
            let raw: RawDef =
                serde_json::from_value(entry.clone()).map_err(|e| AttrError::MalformedSchema {
                    key: key.clone(),
                    message: e.to_string(),
                })?;

            let kind = match raw.type_name.as_deref() {
                None => AttributeKind::Plain,
                Some(name) => types.resolve(name).ok_or_else(|| AttrError::UnknownType {
                    key: key.clone(),
                    type_name: name.to_owned(),
                })?,
            };

            builder = builder.attribute(
                key.clone(),
                AttributeDef {
                    kind,
                    default: raw.default,
                    read_only: raw.read_only,
                    enumerable: raw.enumerable,
                },
            );
        }
        builder.build()
    }

    /// Parse a schema from JSON text.
    ///
    /// # Errors
    ///
    /// See [`Schema::from_value`].
    pub fn from_json_str(text: &str, types: &TypeRegistry) -> AttrResult<Self> {
        let document: Value =
            serde_json::from_str(text).map_err(|e| AttrError::MalformedSchema {
                key: String::new(),
                message: e.to_string(),
            })?;
        Self::from_value(&document, types)
    }

    /// Parse a schema from TOML text.
    ///
    /// # Errors
    ///
    /// See [`Schema::from_value`].
    pub fn from_toml_str(text: &str, types: &TypeRegistry) -> AttrResult<Self> {
        let table: toml::Value = toml::from_str(text).map_err(|e| AttrError::MalformedSchema {
            key: String::new(),
            message: e.to_string(),
        })?;
        let document = serde_json::to_value(table).map_err(|e| AttrError::MalformedSchema {
            key: String::new(),
            message: e.to_string(),
        })?;
        Self::from_value(&document, types)
    }

    /// Definitions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeDef)> {
        self.entries.iter().map(|(key, def)| (key.as_str(), def))
    }

    /// Keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Definition for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttributeDef> {
        self.entries
            .iter()
            .find_map(|(k, def)| (k == key).then_some(def))
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the schema has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    entries: Vec<(String, AttributeDef)>,
}

impl SchemaBuilder {
    /// Add an attribute. Redefining a key replaces it in place.
    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, def: AttributeDef) -> Self {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = def;
        } else {
            self.entries.push((key, def));
        }
        self
    }

    /// Finish the schema.
    ///
    /// # Errors
    ///
    /// Returns [`AttrError::InvalidKey`] if any key is empty.
    pub fn build(self) -> AttrResult<Schema> {
        if let Some((key, _)) = self.entries.iter().find(|(k, _)| k.is_empty()) {
            return Err(AttrError::InvalidKey(key.clone()));
        }
        Ok(Schema {
            entries: self.entries,
        })
    }
}
