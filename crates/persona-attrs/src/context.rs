//! Host context handed to attribute type hooks.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

/// Ambient information about the owner of an attribute store.
///
/// Every hook of an [`AttributeType`](crate::AttributeType) receives the
/// host through its [`AttrContext`], so a type can resolve relative paths
/// or derive values from the profile it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostContext {
    profile: Option<String>,
    profile_dir: Option<PathBuf>,
    working_dir: Option<PathBuf>,
}

impl HostContext {
    /// Create an empty host context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the profile name this store belongs to.
    #[must_use]
    pub fn with_profile(mut self, name: impl Into<String>) -> Self {
        self.profile = Some(name.into());
        self
    }

    /// Set the on-disk directory of the owning profile.
    #[must_use]
    pub fn with_profile_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profile_dir = Some(dir.into());
        self
    }

    /// Set the directory relative paths resolve against.
    ///
    /// When unset, the process current directory is used.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Name of the owning profile, if any.
    #[must_use]
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Directory of the owning profile, if any.
    #[must_use]
    pub fn profile_dir(&self) -> Option<&Path> {
        self.profile_dir.as_deref()
    }

    /// Explicit working directory, if any.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }
}

/// Per-call view passed to attribute type hooks.
#[derive(Debug, Clone, Copy)]
pub struct AttrContext<'a> {
    key: &'a str,
    host: &'a HostContext,
    values: &'a HashMap<String, Value>,
}

impl<'a> AttrContext<'a> {
    pub(crate) fn new(
        key: &'a str,
        host: &'a HostContext,
        values: &'a HashMap<String, Value>,
    ) -> Self {
        Self { key, host, values }
    }

    /// Key of the attribute being processed.
    #[must_use]
    pub fn key(&self) -> &'a str {
        self.key
    }

    /// Host the store belongs to.
    #[must_use]
    pub fn host(&self) -> &'a HostContext {
        self.host
    }

    /// Raw stored value of another attribute in the same store.
    ///
    /// Attributes registered later than the current one are not visible
    /// while the current one is being registered.
    #[must_use]
    pub fn stored(&self, key: &str) -> Option<&'a Value> {
        self.values.get(key)
    }
}
