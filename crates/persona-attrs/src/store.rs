//! The attribute store.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::context::{AttrContext, HostContext};
use crate::error::{AttrError, AttrResult, Rejection};
use crate::kind::Transformed;
use crate::schema::{AttributeDef, Schema};

/// Ordered mapping of attribute keys to values.
pub type Values = Map<String, Value>;

/// Outcome of a batched write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Keys that were written, in input order.
    pub applied: Vec<String>,
    /// Writes that were refused, in input order.
    pub rejected: Vec<Rejection>,
}

impl BatchReport {
    /// Whether every write was applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Schema-driven container of validated values.
///
/// Every registered key always holds a value: registration runs a reset,
/// so a key starts out at its declared default. Writes go through the
/// key's validator and transform; read-only keys only change via
/// [`reset`](Self::reset).
#[derive(Debug, Clone)]
pub struct AttributeStore {
    host: HostContext,
    /// Registration order, used for enumeration.
    order: Vec<String>,
    defs: HashMap<String, AttributeDef>,
    values: HashMap<String, Value>,
}

impl AttributeStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(host: HostContext) -> Self {
        Self {
            host,
            order: Vec::new(),
            defs: HashMap::new(),
            values: HashMap::new(),
        }
    }

    /// Build a store holding every attribute of `schema` at its default.
    #[must_use]
    pub fn from_schema(schema: &Schema, host: HostContext) -> Self {
        let mut store = Self::new(host);
        for (key, def) in schema.iter() {
            if let Err(e) = store.register(key, def.clone()) {
                warn!(key, error = %e, "Skipping schema attribute");
            }
        }
        store
    }

    /// Register an attribute and reset it to its default.
    ///
    /// # Errors
    ///
    /// Returns [`AttrError::Duplicate`] if the key is taken and
    /// [`AttrError::InvalidKey`] if it is empty. The store is unchanged.
    pub fn register(&mut self, key: impl Into<String>, def: AttributeDef) -> AttrResult<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(AttrError::InvalidKey(key));
        }
        if self.defs.contains_key(&key) {
            return Err(AttrError::Duplicate(key));
        }

        debug!(key = %key, kind = %def.kind, read_only = def.read_only, "Registering attribute");
        self.order.push(key.clone());
        self.defs.insert(key.clone(), def);
        self.reset_key(&key);
        Ok(())
    }

    /// Exposed value of `key`, or `None` if it is not registered.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let def = self.defs.get(key)?;
        let stored = self.values.get(key)?;
        let ctx = AttrContext::new(key, &self.host, &self.values);
        Some(def.kind.hooks().expose(stored, &ctx))
    }

    /// Exposed values of every key, in registration order.
    #[must_use]
    pub fn get_all(&self) -> Values {
        self.project(&self.order)
    }

    /// Exposed values of the given keys. Unregistered keys are skipped.
    #[must_use]
    pub fn project<S: AsRef<str>>(&self, keys: &[S]) -> Values {
        keys.iter()
            .filter_map(|key| {
                let key = key.as_ref();
                self.get(key).map(|value| (key.to_owned(), value))
            })
            .collect()
    }

    /// Raw stored value of `key`, before the expose hook.
    #[must_use]
    pub fn stored(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Raw stored values of the given keys. Unregistered keys are skipped.
    #[must_use]
    pub fn snapshot<S: AsRef<str>>(&self, keys: &[S]) -> Values {
        keys.iter()
            .filter_map(|key| {
                let key = key.as_ref();
                self.values
                    .get(key)
                    .map(|value| (key.to_owned(), value.clone()))
            })
            .collect()
    }

    /// Write one attribute.
    ///
    /// The candidate is validated, then transformed, then stored. A
    /// transform advisory is logged and does not block the write. Null
    /// written to an attribute without a default clears it.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] if the key is unknown, read-only, or the
    /// validator refuses the value. The store is unchanged in that case.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), Rejection> {
        let Some(def) = self.defs.get(key) else {
            debug!(key, "Rejected write to unknown attribute");
            return Err(Rejection::Unknown(key.to_owned()));
        };
        if def.read_only {
            debug!(key, "Rejected write to read-only attribute");
            return Err(Rejection::ReadOnly(key.to_owned()));
        }

        if value.is_null() && matches!(def.default, None | Some(Value::Null)) {
            self.values.insert(key.to_owned(), Value::Null);
            return Ok(());
        }

        let hooks = def.kind.hooks();
        let ctx = AttrContext::new(key, &self.host, &self.values);
        if let Err(reason) = hooks.validate(&value, &ctx) {
            debug!(key, reason = %reason, "Rejected invalid attribute value");
            return Err(Rejection::Invalid {
                key: key.to_owned(),
                reason,
            });
        }

        let Transformed { value, advisory } = hooks.transform(value, &ctx);
        if let Some(message) = advisory {
            warn!(key, advisory = %message, "Attribute transform reported a problem");
        }

        self.values.insert(key.to_owned(), value);
        Ok(())
    }

    /// Write every entry of `values` independently.
    ///
    /// One key's rejection does not stop the others.
    pub fn set_many(&mut self, values: &Values) -> BatchReport {
        let mut report = BatchReport::default();
        for (key, value) in values {
            match self.set(key, value.clone()) {
                Ok(()) => report.applied.push(key.clone()),
                Err(rejection) => report.rejected.push(rejection),
            }
        }
        report
    }

    /// Restore `key` to its declared default and rerun its setup hook.
    ///
    /// Bypasses validation and the read-only flag. A declared default goes
    /// through the transform hook so it is stored in the same form a
    /// written value would be; a missing default stays null.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::Unknown`] if the key is not registered.
    pub fn reset(&mut self, key: &str) -> Result<(), Rejection> {
        if self.reset_key(key) {
            Ok(())
        } else {
            Err(Rejection::Unknown(key.to_owned()))
        }
    }

    /// Reset every attribute, in registration order.
    pub fn reset_all(&mut self) {
        let keys = self.order.clone();
        for key in &keys {
            self.reset_key(key);
        }
    }

    fn reset_key(&mut self, key: &str) -> bool {
        let Some(def) = self.defs.get(key) else {
            return false;
        };
        let hooks = def.kind.hooks();
        let initial = def.initial_value();
        let stored = if initial.is_null() {
            initial
        } else {
            let ctx = AttrContext::new(key, &self.host, &self.values);
            let Transformed { value, advisory } = hooks.transform(initial, &ctx);
            if let Some(message) = advisory {
                warn!(key, advisory = %message, "Default value transform reported a problem");
            }
            value
        };
        self.values.insert(key.to_owned(), stored.clone());

        let ctx = AttrContext::new(key, &self.host, &self.values);
        hooks.setup(&stored, &ctx);
        true
    }

    /// Whether `key` is registered.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.defs.contains_key(key)
    }

    /// Definition registered for `key`.
    #[must_use]
    pub fn definition(&self, key: &str) -> Option<&AttributeDef> {
        self.defs.get(key)
    }

    /// Keys in registration order.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.order
    }

    /// Keys that accept writes, in registration order.
    #[must_use]
    pub fn writable(&self) -> Vec<String> {
        self.keys_where(|def| !def.read_only)
    }

    /// Keys that appear in listings, in registration order.
    #[must_use]
    pub fn enumerable(&self) -> Vec<String> {
        self.keys_where(|def| def.enumerable)
    }

    fn keys_where(&self, predicate: impl Fn(&AttributeDef) -> bool) -> Vec<String> {
        self.order
            .iter()
            .filter(|key| self.defs.get(key.as_str()).is_some_and(&predicate))
            .cloned()
            .collect()
    }

    /// Host context handed to hooks.
    #[must_use]
    pub fn host(&self) -> &HostContext {
        &self.host
    }

    /// Number of registered attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no attribute is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::kind::{AttributeKind, AttributeType};

    #[derive(Debug)]
    struct GreaterThanTen;

    impl AttributeType for GreaterThanTen {
        fn name(&self) -> &str {
            "gt10"
        }

        fn validate(&self, value: &Value, _ctx: &AttrContext<'_>) -> Result<(), String> {
            match value.as_f64() {
                Some(n) if n > 10.0 => Ok(()),
                _ => Err(format!("{value} is not greater than 10")),
            }
        }
    }

    #[derive(Debug, Default)]
    struct CountingSetup {
        calls: Arc<AtomicUsize>,
    }

    impl AttributeType for CountingSetup {
        fn name(&self) -> &str {
            "counting"
        }

        fn setup(&self, _initial: &Value, _ctx: &AttrContext<'_>) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Debug)]
    struct Doubled;

    impl AttributeType for Doubled {
        fn name(&self) -> &str {
            "doubled"
        }

        fn expose(&self, stored: &Value, _ctx: &AttrContext<'_>) -> Value {
            json!(stored.as_i64().unwrap_or_default().saturating_mul(2))
        }
    }

    #[derive(Debug)]
    struct AdvisoryEcho;

    impl AttributeType for AdvisoryEcho {
        fn name(&self) -> &str {
            "advisory"
        }

        fn transform(&self, value: Value, _ctx: &AttrContext<'_>) -> Transformed {
            Transformed::advisory(value, "fail")
        }
    }

    fn sample_store() -> AttributeStore {
        let schema = Schema::builder()
            .attribute(
                "a",
                AttributeDef::new(AttributeKind::custom(GreaterThanTen)).with_default(1),
            )
            .attribute("name", AttributeDef::new(AttributeKind::Text).with_default("anon"))
            .attribute(
                "version",
                AttributeDef::new(AttributeKind::Text)
                    .with_default("1.0")
                    .read_only(),
            )
            .attribute("token", AttributeDef::default().hidden())
            .build()
            .unwrap();
        AttributeStore::from_schema(&schema, HostContext::new())
    }

    #[test]
    fn test_registration_applies_defaults() {
        let store = sample_store();
        assert_eq!(store.get("a"), Some(json!(1)));
        assert_eq!(store.get("name"), Some(json!("anon")));
        assert_eq!(store.get("token"), Some(Value::Null));
        assert_eq!(store.get("missing"), None);
        assert_eq!(store.keys(), ["a", "name", "version", "token"]);
    }

    #[test]
    fn test_register_duplicate_is_refused() {
        let mut store = sample_store();
        let result = store.register("a", AttributeDef::default().with_default(99));
        assert_eq!(result, Err(AttrError::Duplicate("a".to_owned())));
        assert_eq!(store.get("a"), Some(json!(1)));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_validator_rejection_leaves_value() {
        let mut store = sample_store();
        assert!(store.set("a", json!(11)).is_ok());
        let rejected = store.set("a", json!(5)).unwrap_err();
        assert!(matches!(rejected, Rejection::Invalid { ref key, .. } if key == "a"));
        assert_eq!(store.get("a"), Some(json!(11)));
    }

    #[test]
    fn test_read_only_only_changes_through_reset() {
        let mut store = sample_store();
        assert_eq!(
            store.set("version", json!("2.0")),
            Err(Rejection::ReadOnly("version".to_owned()))
        );
        assert_eq!(store.get("version"), Some(json!("1.0")));
        assert!(store.reset("version").is_ok());
        assert_eq!(store.get("version"), Some(json!("1.0")));
    }

    #[test]
    fn test_set_many_is_independent_per_key() {
        let mut store = sample_store();
        let mut batch = Values::new();
        batch.insert("a".to_owned(), json!(8));
        batch.insert("name".to_owned(), json!(42));
        batch.insert("version".to_owned(), json!("9"));
        batch.insert("nope".to_owned(), json!(1));

        let report = store.set_many(&batch);
        assert_eq!(report.applied, vec!["name".to_owned()]);
        assert_eq!(report.rejected.len(), 3);
        assert!(!report.is_clean());
        assert_eq!(store.get("name"), Some(json!("42")));
        assert_eq!(store.get("a"), Some(json!(1)));
    }

    #[test]
    fn test_reset_restores_default_and_reruns_setup() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut store = AttributeStore::new(HostContext::new());
        store
            .register(
                "c",
                AttributeDef::new(AttributeKind::custom(CountingSetup {
                    calls: Arc::clone(&calls),
                }))
                .with_default(3),
            )
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        store.set("c", json!(4)).unwrap();
        assert_eq!(store.get("c"), Some(json!(4)));

        store.reset("c").unwrap();
        assert_eq!(store.get("c"), Some(json!(3)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        store.reset_all();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            store.reset("missing"),
            Err(Rejection::Unknown("missing".to_owned()))
        );
    }

    #[test]
    fn test_expose_hook_shapes_reads_not_storage() {
        let mut store = AttributeStore::new(HostContext::new());
        store
            .register(
                "n",
                AttributeDef::new(AttributeKind::custom(Doubled)).with_default(2),
            )
            .unwrap();
        assert_eq!(store.get("n"), Some(json!(4)));
        assert_eq!(store.stored("n"), Some(&json!(2)));
        assert_eq!(store.snapshot(&["n"]).get("n"), Some(&json!(2)));
    }

    #[test]
    fn test_transform_advisory_does_not_block_write() {
        let mut store = AttributeStore::new(HostContext::new());
        store
            .register(
                "c",
                AttributeDef::new(AttributeKind::custom(AdvisoryEcho)).with_default(3),
            )
            .unwrap();
        assert!(store.set("c", json!(4)).is_ok());
        assert_eq!(store.get("c"), Some(json!(4)));
    }

    #[test]
    fn test_writable_and_enumerable() {
        let store = sample_store();
        assert_eq!(store.writable(), vec!["a", "name", "token"]);
        assert_eq!(store.enumerable(), vec!["a", "name", "version"]);

        let listed = store.project(&store.enumerable());
        assert_eq!(
            listed.keys().collect::<Vec<_>>(),
            vec!["a", "name", "version"]
        );
    }

    #[test]
    fn test_get_all_follows_registration_order() {
        let store = sample_store();
        let all = store.get_all();
        assert_eq!(
            all.keys().collect::<Vec<_>>(),
            vec!["a", "name", "version", "token"]
        );
    }

    #[test]
    fn test_defaults_are_stored_in_transformed_form() {
        let schema = Schema::builder()
            .attribute("cache", AttributeDef::new(AttributeKind::Path).with_default("data"))
            .attribute("n", AttributeDef::new(AttributeKind::Number).with_default("3"))
            .attribute("label", AttributeDef::new(AttributeKind::Text))
            .build()
            .unwrap();
        let store =
            AttributeStore::from_schema(&schema, HostContext::new().with_working_dir("/work"));

        assert_eq!(store.get("cache"), Some(json!("/work/data")));
        assert_eq!(store.get("n"), Some(json!(3)));
        assert_eq!(store.get("label"), Some(Value::Null));
    }

    #[test]
    fn test_null_clears_attribute_without_default() {
        let mut store = AttributeStore::new(HostContext::new());
        store
            .register("flag", AttributeDef::new(AttributeKind::Boolean))
            .unwrap();
        store
            .register("n", AttributeDef::new(AttributeKind::Number).with_default(2))
            .unwrap();

        store.set("flag", json!("yes")).unwrap();
        store.set("flag", Value::Null).unwrap();
        assert_eq!(store.get("flag"), Some(Value::Null));

        store.set("n", Value::Null).unwrap();
        assert_eq!(store.get("n"), Some(json!(0)));
    }
}
