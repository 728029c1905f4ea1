//! Test fixtures: schemas, attribute types and temporary profile roots.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use persona::{CURRENT_FILE, PROFILES_FILE, ProfileManager, ProfileOptions};
use persona_attrs::{AttrContext, AttributeDef, AttributeKind, AttributeType, Schema, TypeRegistry};
use serde_json::Value;
use tempfile::TempDir;

/// Accepts only numbers strictly greater than ten.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreaterThanTen;

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

/// Counts how often its setup hook runs.
#[derive(Debug, Clone, Default)]
pub struct CountingSetup {
    calls: Arc<AtomicUsize>,
}

impl CountingSetup {
    /// Create a counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of setup calls so far, across every clone.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AttributeType for CountingSetup {
    fn name(&self) -> &str {
        "counting"
    }

    fn setup(&self, _initial: &Value, _ctx: &AttrContext<'_>) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Type registry with [`GreaterThanTen`] registered as `gt10`.
#[must_use]
pub fn sample_types() -> TypeRegistry {
    let mut types = TypeRegistry::new();
    if let Err(e) = types.register(GreaterThanTen) {
        panic!("failed to register gt10: {e}");
    }
    types
}

/// Schema exercising every built-in kind plus [`GreaterThanTen`].
///
/// | key | kind | default | flags |
/// |-----|------|---------|-------|
/// | `a` | `gt10` | `1` | |
/// | `name` | string | `"anon"` | |
/// | `verbose` | boolean | `false` | |
/// | `retries` | number | `3` | |
/// | `registry` | url | `"http://registry.npmjs.org/"` | |
/// | `cache` | path | `"/var/cache/persona"` | |
/// | `version` | string | `"1.0.0"` | read-only |
/// | `token` | plain | none | hidden |
#[must_use]
pub fn sample_schema() -> Schema {
    let built = Schema::builder()
        .attribute(
            "a",
            AttributeDef::new(AttributeKind::custom(GreaterThanTen)).with_default(1),
        )
        .attribute(
            "name",
            AttributeDef::new(AttributeKind::Text).with_default("anon"),
        )
        .attribute(
            "verbose",
            AttributeDef::new(AttributeKind::Boolean).with_default(false),
        )
        .attribute(
            "retries",
            AttributeDef::new(AttributeKind::Number).with_default(3),
        )
        .attribute(
            "registry",
            AttributeDef::new(AttributeKind::Url).with_default("http://registry.npmjs.org/"),
        )
        .attribute(
            "cache",
            AttributeDef::new(AttributeKind::Path).with_default("/var/cache/persona"),
        )
        .attribute(
            "version",
            AttributeDef::new(AttributeKind::Text)
                .with_default("1.0.0")
                .read_only(),
        )
        .attribute("token", AttributeDef::default().hidden())
        .build();
    match built {
        Ok(schema) => schema,
        Err(e) => panic!("sample schema is invalid: {e}"),
    }
}

/// A temporary directory holding a profile base directory.
///
/// The base directory is `<tempdir>/base` and does not exist until a
/// manager initializes it or a helper writes into it. The directory is
/// removed when the value is dropped.
#[derive(Debug)]
pub struct TestHome {
    dir: TempDir,
}

impl Default for TestHome {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHome {
    /// Create a fresh temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        match tempfile::tempdir() {
            Ok(dir) => Self { dir },
            Err(e) => panic!("failed to create temp dir: {e}"),
        }
    }

    /// The temporary directory itself.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Profile base directory.
    #[must_use]
    pub fn base(&self) -> PathBuf {
        self.dir.path().join("base")
    }

    /// Options for a manager rooted at [`base`](Self::base).
    #[must_use]
    pub fn options(&self, schema: Schema) -> ProfileOptions {
        ProfileOptions::new(self.base(), schema).with_working_dir(self.path())
    }

    /// An initialized manager with default options.
    ///
    /// # Panics
    ///
    /// Panics if construction or `init` fails.
    #[must_use]
    pub fn manager(&self, schema: Schema) -> ProfileManager {
        self.manager_with(self.options(schema))
    }

    /// An initialized manager built from `options`.
    ///
    /// # Panics
    ///
    /// Panics if construction or `init` fails.
    #[must_use]
    pub fn manager_with(&self, options: ProfileOptions) -> ProfileManager {
        let mut manager = match ProfileManager::new(options) {
            Ok(manager) => manager,
            Err(e) => panic!("failed to create manager: {e}"),
        };
        if let Err(e) = manager.init() {
            panic!("failed to init manager: {e}");
        }
        manager
    }

    /// Config file path of `profile` under the default file name.
    #[must_use]
    pub fn config_path(&self, profile: &str) -> PathBuf {
        self.base().join(profile).join("config")
    }

    /// Write `profile`'s config file, creating its directory.
    ///
    /// # Panics
    ///
    /// Panics on I/O failure.
    pub fn write_config(&self, profile: &str, contents: &str) {
        let path = self.config_path(profile);
        write(&path, contents);
    }

    /// Read `profile`'s config file.
    ///
    /// # Panics
    ///
    /// Panics on I/O failure.
    #[must_use]
    pub fn read_config(&self, profile: &str) -> String {
        read(&self.config_path(profile))
    }

    /// Write both index files directly.
    ///
    /// # Panics
    ///
    /// Panics on I/O failure.
    pub fn write_index(&self, profiles: &[&str], current: Option<&str>) {
        let mut listing = profiles.join("\n");
        listing.push('\n');
        write(&self.base().join(PROFILES_FILE), &listing);
        write(
            &self.base().join(CURRENT_FILE),
            &current.map(|c| format!("{c}\n")).unwrap_or_default(),
        );
    }

    /// Contents of the `profiles` index file.
    ///
    /// # Panics
    ///
    /// Panics on I/O failure.
    #[must_use]
    pub fn read_profiles_file(&self) -> String {
        read(&self.base().join(PROFILES_FILE))
    }

    /// Contents of the `current_profile` index file.
    ///
    /// # Panics
    ///
    /// Panics on I/O failure.
    #[must_use]
    pub fn read_current_file(&self) -> String {
        read(&self.base().join(CURRENT_FILE))
    }
}

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            panic!("failed to create {}: {e}", parent.display());
        }
    }
    if let Err(e) = std::fs::write(path, contents) {
        panic!("failed to write {}: {e}", path.display());
    }
}

fn read(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => panic!("failed to read {}: {e}", path.display()),
    }
}
