//! Persona - named configuration profiles on disk.
//!
//! A [`ProfileManager`] keeps a set of named profiles under a base
//! directory, tracks which one is current, and exposes the current
//! profile's settings through a schema-driven
//! [`AttributeStore`](persona_attrs::AttributeStore). Settings are
//! persisted with a pluggable [`Codec`](persona_codec::Codec).
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use persona::{MemoryStorage, ProfileManager, ProfileOptions};
//! use persona_attrs::{AttributeDef, AttributeKind, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::builder()
//!     .attribute("retries", AttributeDef::new(AttributeKind::Number).with_default(3))
//!     .build()
//!     .unwrap();
//! let options = ProfileOptions::new("/app", schema).with_storage(Arc::new(MemoryStorage::new()));
//!
//! let mut manager = ProfileManager::new(options).unwrap();
//! manager.init().unwrap();
//! assert_eq!(manager.current(), Some("default"));
//!
//! assert!(manager.add("work").is_ok());
//! assert!(manager.switch_to("work").is_ok());
//! manager.set("retries", json!(5)).unwrap();
//! manager.save(None).unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod events;
mod index;
mod manager;
mod names;
mod options;
mod outcome;
mod storage;

pub use error::{
    LifecycleError, LoadError, LoadErrorCode, ProfileError, ProfileResult, StorageError,
    StorageResult,
};
pub use events::{EventSubscriber, ProfileEvent, SubscriberId, SubscriberRegistry};
pub use index::ProfileIndex;
pub use manager::ProfileManager;
pub use names::{CURRENT_FILE, DEFAULT_PROFILE, PROFILES_FILE, RESERVED_NAMES, validate_name};
pub use options::{
    DEFAULT_CONFIG_FILE, ManagerConfig, ProfileOptions, expand_home, expand_home_with,
};
pub use outcome::{AddOutcome, DeleteOutcome, ReloadOutcome, SwitchOutcome};
pub use storage::{FsStorage, MemoryStorage, Storage};
