//! The profile manager.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use persona_attrs::{AttributeStore, BatchReport, HostContext, Schema, TypeRegistry, Values};
use persona_codec::Codec;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{
    LifecycleError, LoadError, LoadErrorCode, ProfileError, ProfileResult, StorageResult,
};
use crate::events::{EventSubscriber, ProfileEvent, SubscriberId, SubscriberRegistry};
use crate::index::ProfileIndex;
use crate::names::{DEFAULT_PROFILE, validate_name};
use crate::options::{ManagerConfig, ProfileOptions, expand_home};
use crate::outcome::{AddOutcome, DeleteOutcome, ReloadOutcome, SwitchOutcome};
use crate::storage::Storage;

#[derive(Debug)]
struct ActiveProfile {
    name: String,
    dir: PathBuf,
    store: AttributeStore,
    raw: Option<Values>,
}

/// Manages named profiles under a base directory.
///
/// Layout:
///
/// ```text
/// <base>/
/// ├── profiles          # one profile name per line
/// ├── current_profile   # name of the active profile
/// └── <name>/
///     └── config        # codec-encoded settings
/// ```
///
/// Exactly one profile is active after [`init`](Self::init). Its settings
/// live in an [`AttributeStore`] built from the schema; every option
/// method works on that store.
#[derive(Debug)]
pub struct ProfileManager {
    root: PathBuf,
    schema: Schema,
    codec: Arc<dyn Codec>,
    storage: Arc<dyn Storage>,
    index: ProfileIndex,
    config_file: String,
    requested: Option<String>,
    working_dir: Option<PathBuf>,
    active: Option<ActiveProfile>,
    events: SubscriberRegistry,
}

impl ProfileManager {
    /// Create a manager. Nothing is read or written until [`init`](Self::init).
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Codec`] if the codec name is not registered
    /// and [`ProfileError::NoHomeDir`] if `~` cannot be expanded.
    pub fn new(options: ProfileOptions) -> ProfileResult<Self> {
        let codec = options.codec.resolve(&options.codecs)?;
        let root = expand_home(&options.path)?;
        let index = ProfileIndex::new(root.clone(), Arc::clone(&options.storage));

        debug!(
            root = %root.display(),
            codec = codec.name(),
            attributes = options.schema.len(),
            "Profile manager created"
        );

        Ok(Self {
            root,
            schema: options.schema,
            codec,
            storage: options.storage,
            index,
            config_file: options.config_file,
            requested: options.profile,
            working_dir: options.working_dir,
            active: None,
            events: SubscriberRegistry::new(),
        })
    }

    /// Create a manager from a TOML manager config.
    ///
    /// # Errors
    ///
    /// See [`ManagerConfig::into_options`] and [`ProfileManager::new`].
    pub fn from_config(config: ManagerConfig, types: &TypeRegistry) -> ProfileResult<Self> {
        Self::new(config.into_options(types)?)
    }

    /// Prepare the base directory and activate a profile.
    ///
    /// Creates the index files if missing, indexes `default` if absent,
    /// then activates the requested profile if it is indexed, else the
    /// recorded current profile if it is indexed, else `default`. Calling
    /// `init` again re-checks the scaffold and leaves the active profile
    /// alone.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the scaffold or the chosen profile
    /// cannot be created.
    pub fn init(&mut self) -> ProfileResult<()> {
        self.index.ensure_scaffold()?;

        let mut names = self.index.list()?;
        if !names.iter().any(|n| n == DEFAULT_PROFILE) {
            names.push(DEFAULT_PROFILE.to_owned());
            self.index.set_profiles(&names)?;
            info!(root = %self.root.display(), "Created default profile");
        }

        if self.active.is_some() {
            return Ok(());
        }

        let recorded = self.index.current()?;
        let known = |name: &str| names.iter().any(|n| n == name);
        if let Some(requested) = self.requested.as_deref().filter(|&n| !known(n)) {
            warn!(profile = requested, "Requested profile is not indexed, ignoring");
        }
        let target = self
            .requested
            .clone()
            .filter(|n| known(n.as_str()))
            .or_else(|| recorded.filter(|n| known(n.as_str())))
            .unwrap_or_else(|| DEFAULT_PROFILE.to_owned());

        self.activate(&target)?;
        info!(profile = %target, root = %self.root.display(), "Profile manager initialized");
        self.publish(ProfileEvent::Switched(SwitchOutcome {
            err: None,
            former: None,
            current: Some(target),
        }));
        Ok(())
    }

    /// Whether `init` has completed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.active.is_some()
    }

    /// Base directory after `~` expansion.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Codec used for config files.
    #[must_use]
    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    /// Every indexed profile name.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the index cannot be read.
    pub fn all(&self) -> ProfileResult<Vec<String>> {
        Ok(self.index.list()?)
    }

    /// Whether `name` is indexed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the index cannot be read.
    pub fn exists(&self, name: &str) -> ProfileResult<bool> {
        Ok(self.index.list()?.iter().any(|n| n == name))
    }

    /// Name of the active profile.
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.name.as_str())
    }

    /// Directory of the active profile.
    #[must_use]
    pub fn profile_dir(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.dir.as_path())
    }

    /// Config file of the active profile.
    #[must_use]
    pub fn config_path(&self) -> Option<PathBuf> {
        self.active.as_ref().map(|a| a.dir.join(&self.config_file))
    }

    /// Store of the active profile.
    #[must_use]
    pub fn store(&self) -> Option<&AttributeStore> {
        self.active.as_ref().map(|a| &a.store)
    }

    /// Document most recently loaded from or saved to the active
    /// profile's config file.
    #[must_use]
    pub fn raw_data(&self) -> Option<&Values> {
        self.active.as_ref().and_then(|a| a.raw.as_ref())
    }

    /// Index a new profile. Its directory is created on first switch.
    pub fn add(&self, name: &str) -> AddOutcome {
        let outcome = AddOutcome {
            err: self.try_add(name).err(),
            name: name.to_owned(),
        };
        match &outcome.err {
            None => info!(profile = name, "Profile added"),
            Some(e) => debug!(profile = name, error = %e, "Profile not added"),
        }
        self.publish(ProfileEvent::Added(outcome.clone()));
        outcome
    }

    fn try_add(&self, name: &str) -> Result<(), LifecycleError> {
        self.ensure_ready()?;
        validate_name(name)?;
        let mut names = self.index.list()?;
        if names.iter().any(|n| n == name) {
            return Err(LifecycleError::AlreadyExists(name.to_owned()));
        }
        names.push(name.to_owned());
        self.index.set_profiles(&names)?;
        Ok(())
    }

    /// Make `name` the active profile.
    ///
    /// The new store starts from schema defaults and is overlaid with the
    /// profile's config file. The previous profile's unsaved changes are
    /// dropped.
    ///
    /// A config file that cannot be read or parsed does not fail the
    /// switch: the profile stays on its defaults and the failure is
    /// published as [`ProfileEvent::Error`].
    pub fn switch_to(&mut self, name: &str) -> SwitchOutcome {
        let former = self.current().map(str::to_owned);
        let err = self.try_switch(name).err();
        let outcome = SwitchOutcome {
            err,
            former,
            current: self.current().map(str::to_owned),
        };
        match &outcome.err {
            None => info!(
                profile = name,
                former = outcome.former.as_deref().unwrap_or_default(),
                "Switched profile"
            ),
            Some(e) => debug!(profile = name, error = %e, "Profile not switched"),
        }
        self.publish(ProfileEvent::Switched(outcome.clone()));
        outcome
    }

    fn try_switch(&mut self, name: &str) -> Result<(), LifecycleError> {
        self.ensure_ready()?;
        if self.current() == Some(name) {
            return Err(LifecycleError::AlreadyCurrent(name.to_owned()));
        }
        if !self.index.list()?.iter().any(|n| n == name) {
            return Err(LifecycleError::NotFound(name.to_owned()));
        }
        self.activate(name).map_err(LifecycleError::from)
    }

    /// Remove `name` from the index, and its directory if `remove_data`.
    pub fn del(&self, name: &str, remove_data: bool) -> DeleteOutcome {
        let outcome = DeleteOutcome {
            err: self.try_del(name, remove_data).err(),
            name: name.to_owned(),
        };
        match &outcome.err {
            None => info!(profile = name, remove_data, "Profile deleted"),
            Some(e) => debug!(profile = name, error = %e, "Profile not deleted"),
        }
        self.publish(ProfileEvent::Deleted(outcome.clone()));
        outcome
    }

    fn try_del(&self, name: &str, remove_data: bool) -> Result<(), LifecycleError> {
        self.ensure_ready()?;
        if self.current() == Some(name) {
            return Err(LifecycleError::DeleteCurrent(name.to_owned()));
        }
        let mut names = self.index.list()?;
        if !names.iter().any(|n| n == name) {
            return Err(LifecycleError::NotFound(name.to_owned()));
        }
        names.retain(|n| n != name);
        self.index.set_profiles(&names)?;
        if remove_data {
            self.storage.remove(&self.root.join(name))?;
        }
        Ok(())
    }

    /// Exposed value of `key` in the active profile.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.active.as_ref().and_then(|a| a.store.get(key))
    }

    /// Every value of the active profile, hidden keys included.
    #[must_use]
    pub fn get_all(&self) -> Values {
        self.active
            .as_ref()
            .map(|a| a.store.get_all())
            .unwrap_or_default()
    }

    /// Keys that accept writes.
    #[must_use]
    pub fn writable(&self) -> Vec<String> {
        self.active
            .as_ref()
            .map(|a| a.store.writable())
            .unwrap_or_default()
    }

    /// Keys that show up in listings.
    #[must_use]
    pub fn enumerable(&self) -> Vec<String> {
        self.active
            .as_ref()
            .map(|a| a.store.enumerable())
            .unwrap_or_default()
    }

    /// Exposed values of the writable keys.
    #[must_use]
    pub fn get_writable(&self) -> Values {
        self.active
            .as_ref()
            .map(|a| a.store.project(&a.store.writable()))
            .unwrap_or_default()
    }

    /// Exposed values of the enumerable keys.
    #[must_use]
    pub fn get_enumerable(&self) -> Values {
        self.active
            .as_ref()
            .map(|a| a.store.project(&a.store.enumerable()))
            .unwrap_or_default()
    }

    /// Write one option of the active profile.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotInitialized`] before `init` and
    /// [`ProfileError::Rejected`] if the store refuses the value.
    pub fn set(&mut self, key: &str, value: Value) -> ProfileResult<()> {
        let active = self.active.as_mut().ok_or(ProfileError::NotInitialized)?;
        let former = active.store.get(key);
        active.store.set(key, value)?;
        let value = active.store.get(key).unwrap_or(Value::Null);
        self.publish(ProfileEvent::OptionChanged {
            key: key.to_owned(),
            value,
            former,
        });
        Ok(())
    }

    /// Write several options. Each key is applied or rejected on its own.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotInitialized`] before `init`.
    pub fn set_many(&mut self, values: &Values) -> ProfileResult<BatchReport> {
        self.ensure_ready().map_err(|_| ProfileError::NotInitialized)?;
        let mut report = BatchReport::default();
        for (key, value) in values {
            match self.set(key, value.clone()) {
                Ok(()) => report.applied.push(key.clone()),
                Err(ProfileError::Rejected(rejection)) => report.rejected.push(rejection),
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Restore one option to its default.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotInitialized`] before `init` and
    /// [`ProfileError::Rejected`] for unknown keys.
    pub fn reset(&mut self, key: &str) -> ProfileResult<()> {
        let active = self.active.as_mut().ok_or(ProfileError::NotInitialized)?;
        let former = active.store.get(key);
        active.store.reset(key)?;
        let value = active.store.get(key).unwrap_or(Value::Null);
        self.publish(ProfileEvent::OptionChanged {
            key: key.to_owned(),
            value,
            former,
        });
        Ok(())
    }

    /// Restore every option to its default.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotInitialized`] before `init`.
    pub fn reset_all(&mut self) -> ProfileResult<()> {
        let keys = self
            .active
            .as_ref()
            .map(|a| a.store.keys().to_vec())
            .ok_or(ProfileError::NotInitialized)?;
        for key in &keys {
            self.reset(key)?;
        }
        Ok(())
    }

    /// Write the active profile's config file.
    ///
    /// With `data`, that document is written as is. Without it, the stored
    /// values of the writable keys are written.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotInitialized`] before `init`, a codec
    /// error if the document cannot be encoded, and a storage error if the
    /// file cannot be written.
    pub fn save(&mut self, data: Option<&Values>) -> ProfileResult<()> {
        let active = self.active.as_mut().ok_or(ProfileError::NotInitialized)?;
        let document = match data {
            Some(data) => data.clone(),
            None => active.store.snapshot(&active.store.writable()),
        };
        let text = self.codec.stringify(&document)?;

        if !self.storage.is_dir(&active.dir) {
            self.storage.mkdir(&active.dir)?;
        }
        let path = active.dir.join(&self.config_file);
        self.storage.write(&path, &text)?;
        debug!(
            profile = %active.name,
            path = %path.display(),
            keys = document.len(),
            "Saved profile config"
        );
        active.raw = Some(document);
        Ok(())
    }

    /// Re-read the active profile's config file and overlay it on the
    /// store.
    ///
    /// Read and parse failures are reported in the outcome and as a
    /// [`ProfileEvent::Error`]; the store is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotInitialized`] before `init`.
    pub fn reload(&mut self) -> ProfileResult<ReloadOutcome> {
        if self.active.is_none() {
            return Err(ProfileError::NotInitialized);
        }
        Ok(self.load_active())
    }

    /// Register an event subscriber.
    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) -> SubscriberId {
        self.events.register(subscriber)
    }

    /// Remove an event subscriber.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.events.unregister(id)
    }

    /// The subscriber registry.
    #[must_use]
    pub fn events(&self) -> &SubscriberRegistry {
        &self.events
    }

    fn ensure_ready(&self) -> Result<(), LifecycleError> {
        if self.active.is_some() {
            Ok(())
        } else {
            Err(LifecycleError::NotInitialized)
        }
    }

    fn publish(&self, event: ProfileEvent) {
        self.events.notify(&event);
    }

    /// Point the index at `name`, materialize its directory and load it.
    fn activate(&mut self, name: &str) -> StorageResult<()> {
        self.index.set_current(Some(name))?;

        let dir = self.root.join(name);
        let config = dir.join(&self.config_file);
        let existed = match self.materialize(&dir, &config) {
            Ok(existed) => existed,
            Err(e) => {
                if let Err(restore) = self.index.set_current(self.current()) {
                    warn!(error = %restore, "Failed to restore current profile pointer");
                }
                return Err(e);
            },
        };

        let mut host = HostContext::new().with_profile(name).with_profile_dir(&dir);
        if let Some(working_dir) = &self.working_dir {
            host = host.with_working_dir(working_dir);
        }
        self.active = Some(ActiveProfile {
            name: name.to_owned(),
            dir,
            store: AttributeStore::from_schema(&self.schema, host),
            raw: None,
        });

        if existed {
            let outcome = self.load_active();
            if !outcome.applied.is_clean() {
                debug!(
                    profile = name,
                    rejected = outcome.applied.rejected.len(),
                    "Config entries rejected on activation"
                );
            }
        } else {
            debug!(profile = name, "Created profile directory");
        }
        Ok(())
    }

    /// Ensure the profile directory and config file exist. Returns whether
    /// the config file was already there.
    fn materialize(&self, dir: &Path, config: &Path) -> StorageResult<bool> {
        if !self.storage.is_dir(dir) {
            self.storage.mkdir(dir)?;
        }
        if self.storage.exists(config) {
            return Ok(true);
        }
        self.storage.write(config, "")?;
        Ok(false)
    }

    fn load_active(&mut self) -> ReloadOutcome {
        let Some(active) = self.active.as_mut() else {
            return ReloadOutcome::default();
        };
        let path = active.dir.join(&self.config_file);

        let parsed = self
            .storage
            .read(&path)
            .map_err(|e| LoadError {
                code: LoadErrorCode::Read,
                path: path.clone(),
                message: e.to_string(),
            })
            .and_then(|text| {
                self.codec.parse(&text).map_err(|e| LoadError {
                    code: LoadErrorCode::Parse,
                    path: path.clone(),
                    message: e.to_string(),
                })
            });

        match parsed {
            Ok(document) => {
                let applied = active.store.set_many(&document);
                for rejection in &applied.rejected {
                    debug!(
                        profile = %active.name,
                        key = rejection.key(),
                        reason = %rejection,
                        "Ignored config entry"
                    );
                }
                debug!(
                    profile = %active.name,
                    applied = applied.applied.len(),
                    rejected = applied.rejected.len(),
                    "Loaded profile config"
                );
                active.raw = Some(document);
                ReloadOutcome { applied, err: None }
            },
            Err(err) => {
                warn!(
                    profile = %active.name,
                    code = %err.code,
                    path = %err.path.display(),
                    message = %err.message,
                    "Failed to load profile config"
                );
                self.events.notify(&ProfileEvent::Error(err.clone()));
                ReloadOutcome {
                    applied: BatchReport::default(),
                    err: Some(err),
                }
            },
        }
    }
}
