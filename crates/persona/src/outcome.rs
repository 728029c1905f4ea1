//! Results of lifecycle and reload operations.
//!
//! Lifecycle operations report failure inside the outcome instead of
//! returning `Err`, so the same value can be handed to event subscribers.

use persona_attrs::BatchReport;
use serde::Serialize;

use crate::error::{LifecycleError, LoadError};

/// Result of [`ProfileManager::add`](crate::ProfileManager::add).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[must_use]
pub struct AddOutcome {
    /// Why the profile was not added.
    pub err: Option<LifecycleError>,
    /// Requested name.
    pub name: String,
}

/// Result of [`ProfileManager::switch_to`](crate::ProfileManager::switch_to).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[must_use]
pub struct SwitchOutcome {
    /// Why the switch did not happen.
    pub err: Option<LifecycleError>,
    /// Profile active before the call.
    pub former: Option<String>,
    /// Profile active after the call.
    pub current: Option<String>,
}

/// Result of [`ProfileManager::del`](crate::ProfileManager::del).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[must_use]
pub struct DeleteOutcome {
    /// Why the profile was not deleted.
    pub err: Option<LifecycleError>,
    /// Requested name.
    pub name: String,
}

impl AddOutcome {
    /// Whether the operation succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }
}

impl SwitchOutcome {
    /// Whether the operation succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }
}

impl DeleteOutcome {
    /// Whether the operation succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }
}

/// Result of [`ProfileManager::reload`](crate::ProfileManager::reload).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct ReloadOutcome {
    /// Which keys from the file were applied or refused.
    pub applied: BatchReport,
    /// Read or parse failure. The store is untouched when set.
    pub err: Option<LoadError>,
}

impl ReloadOutcome {
    /// Whether the file loaded and every key was applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.err.is_none() && self.applied.is_clean()
    }
}
