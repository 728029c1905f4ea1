//! Manager construction options.
//!
//! [`ProfileOptions`] is built in code. [`ManagerConfig`] is the same set
//! of options read from a TOML file, schema included:
//!
//! ```toml
//! path = "~/.myapp"
//! codec = "ini"
//! profile = "work"
//!
//! [schema.registry]
//! type = "url"
//! default = "http://registry.npmjs.org"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use persona_attrs::{Schema, TypeRegistry};
use persona_codec::{CodecRegistry, CodecSelector};
use serde::Deserialize;

use crate::error::{ProfileError, ProfileResult};
use crate::storage::{FsStorage, Storage};

/// Default name of the config file inside each profile directory.
pub const DEFAULT_CONFIG_FILE: &str = "config";

/// Maximum accepted manager config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Everything a [`ProfileManager`](crate::ProfileManager) is built from.
#[derive(Debug, Clone)]
pub struct ProfileOptions {
    pub(crate) path: PathBuf,
    pub(crate) schema: Schema,
    pub(crate) codec: CodecSelector,
    pub(crate) codecs: CodecRegistry,
    pub(crate) profile: Option<String>,
    pub(crate) config_file: String,
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) working_dir: Option<PathBuf>,
}

impl ProfileOptions {
    /// Options for a manager rooted at `path` with the given schema.
    ///
    /// Defaults: JSON codec, `config` file name, real filesystem, no
    /// requested profile.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, schema: Schema) -> Self {
        Self {
            path: path.into(),
            schema,
            codec: CodecSelector::default(),
            codecs: CodecRegistry::new(),
            profile: None,
            config_file: DEFAULT_CONFIG_FILE.to_owned(),
            storage: Arc::new(FsStorage),
            working_dir: None,
        }
    }

    /// Select a codec by name or pass a custom one.
    #[must_use]
    pub fn with_codec(mut self, codec: impl Into<CodecSelector>) -> Self {
        self.codec = codec.into();
        self
    }

    /// Registry consulted when the codec is selected by name.
    #[must_use]
    pub fn with_codec_registry(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    /// Profile to activate on `init` if it is indexed.
    #[must_use]
    pub fn with_profile(mut self, name: impl Into<String>) -> Self {
        self.profile = Some(name.into());
        self
    }

    /// File name used for each profile's config file.
    #[must_use]
    pub fn with_config_file(mut self, name: impl Into<String>) -> Self {
        self.config_file = name.into();
        self
    }

    /// Storage backend.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    /// Directory relative `path` attributes resolve against. Defaults to
    /// the process working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Base directory as given, before `~` expansion.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schema every profile's store is built from.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Requested initial profile.
    #[must_use]
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Config file name.
    #[must_use]
    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}

/// Replace a leading `~` component with the user's home directory.
///
/// Only `~` on its own or followed by a separator is expanded; `~user`
/// forms are left alone.
///
/// # Errors
///
/// Returns [`ProfileError::NoHomeDir`] if the path needs expansion and the
/// home directory cannot be determined.
pub fn expand_home(path: &Path) -> ProfileResult<PathBuf> {
    if path.strip_prefix("~").is_err() {
        return Ok(path.to_path_buf());
    }
    let home = home_directory()?;
    Ok(expand_home_with(path, &home))
}

/// [`expand_home`] with an explicit home directory.
#[must_use]
pub fn expand_home_with(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) if rest.as_os_str().is_empty() => home.to_path_buf(),
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

fn home_directory() -> ProfileResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ProfileError::NoHomeDir)
}

/// Manager options as stored in a TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagerConfig {
    /// Base directory. May start with `~`.
    pub path: PathBuf,
    /// Codec name.
    #[serde(default = "default_codec")]
    pub codec: String,
    /// Requested initial profile.
    #[serde(default)]
    pub profile: Option<String>,
    /// Config file name inside each profile directory.
    #[serde(default = "default_config_file")]
    pub config_file: String,
    /// Directory relative `path` attributes resolve against.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Attribute definitions, keyed by attribute name.
    #[serde(default)]
    pub schema: toml::Table,
}

fn default_codec() -> String {
    persona_codec::JsonCodec::NAME.to_owned()
}

fn default_config_file() -> String {
    DEFAULT_CONFIG_FILE.to_owned()
}

impl ManagerConfig {
    /// Load a manager config file.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::ConfigRead`], [`ProfileError::ConfigTooLarge`]
    /// or [`ProfileError::ConfigParse`].
    pub fn load_file(path: &Path) -> ProfileResult<Self> {
        // Check file size before reading to prevent OOM.
        let metadata = std::fs::metadata(path).map_err(|e| ProfileError::ConfigRead {
            path: path.display().to_string(),
            source: e,
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ProfileError::ConfigTooLarge {
                path: path.display().to_string(),
                size: metadata.len(),
                limit: MAX_CONFIG_FILE_SIZE,
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ProfileError::ConfigRead {
            path: path.display().to_string(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e: toml::de::Error| ProfileError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Parse a manager config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::ConfigParse`] if the text is not a valid
    /// manager config.
    pub fn from_toml_str(text: &str) -> ProfileResult<Self> {
        toml::from_str(text).map_err(|e: toml::de::Error| ProfileError::ConfigParse {
            path: "<inline>".to_owned(),
            message: e.to_string(),
        })
    }

    /// Build the schema and turn this config into [`ProfileOptions`].
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Schema`] if the `[schema]` table is invalid.
    pub fn into_options(self, types: &TypeRegistry) -> ProfileResult<ProfileOptions> {
        let document = serde_json::to_value(&self.schema).map_err(|e| {
            ProfileError::Schema(persona_attrs::AttrError::MalformedSchema {
                key: String::new(),
                message: e.to_string(),
            })
        })?;
        let schema = Schema::from_value(&document, types)?;

        let mut options = ProfileOptions::new(self.path, schema)
            .with_codec(self.codec)
            .with_config_file(self.config_file);
        if let Some(profile) = self.profile {
            options = options.with_profile(profile);
        }
        if let Some(dir) = self.working_dir {
            options = options.with_working_dir(dir);
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_expand_home_with() {
        let home = Path::new("/home/u");
        assert_eq!(expand_home_with(Path::new("~"), home), PathBuf::from("/home/u"));
        assert_eq!(
            expand_home_with(Path::new("~/.app/x"), home),
            PathBuf::from("/home/u/.app/x")
        );
        assert_eq!(
            expand_home_with(Path::new("~other/x"), home),
            PathBuf::from("~other/x")
        );
        assert_eq!(
            expand_home_with(Path::new("/abs/~"), home),
            PathBuf::from("/abs/~")
        );
    }

    #[test]
    fn test_expand_home_leaves_plain_paths() {
        assert_eq!(
            expand_home(Path::new("/srv/app")).unwrap(),
            PathBuf::from("/srv/app")
        );
    }

    #[test]
    fn test_options_defaults() {
        let options = ProfileOptions::new("/base", Schema::default());
        assert_eq!(options.config_file(), "config");
        assert_eq!(options.profile(), None);
        assert!(matches!(options.codec, CodecSelector::Named(ref n) if n == "json"));
    }

    #[test]
    fn test_manager_config_from_toml() {
        let config = ManagerConfig::from_toml_str(
            r#"
            path = "~/.app"
            codec = "ini"
            profile = "work"

            [schema.retries]
            type = "number"
            default = 3

            [schema.verbose]
            type = "boolean"
        "#,
        )
        .unwrap();
        assert_eq!(config.codec, "ini");
        assert_eq!(config.config_file, "config");

        let options = config.into_options(&TypeRegistry::new()).unwrap();
        assert_eq!(options.profile(), Some("work"));
        assert_eq!(
            options.schema().keys().collect::<Vec<_>>(),
            vec!["retries", "verbose"]
        );
        assert_eq!(options.schema().get("retries").unwrap().default, Some(json!(3)));
    }

    #[test]
    fn test_manager_config_rejects_unknown_fields() {
        let result = ManagerConfig::from_toml_str("path = \"/x\"\ncodek = \"ini\"\n");
        assert!(matches!(result, Err(ProfileError::ConfigParse { .. })));
    }

    #[test]
    fn test_manager_config_bad_schema() {
        let config =
            ManagerConfig::from_toml_str("path = \"/x\"\n[schema.a]\ntype = \"date\"\n").unwrap();
        assert!(matches!(
            config.into_options(&TypeRegistry::new()),
            Err(ProfileError::Schema(_))
        ));
    }

    #[test]
    fn test_load_file_missing() {
        let result = ManagerConfig::load_file(Path::new("/nonexistent/persona.toml"));
        assert!(matches!(result, Err(ProfileError::ConfigRead { .. })));
    }

    #[test]
    fn test_oversized_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("huge.toml");
        let data = "path = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        std::fs::write(&file_path, data).unwrap();

        assert!(matches!(
            ManagerConfig::load_file(&file_path),
            Err(ProfileError::ConfigTooLarge { .. })
        ));
    }
}
