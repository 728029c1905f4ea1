//! Prelude module - commonly used types for convenient import.
//!
//! Use `use persona::prelude::*;` to import all essential types.

pub use crate::{
    AddOutcome, DeleteOutcome, LifecycleError, ProfileError, ProfileEvent, ProfileManager,
    ProfileOptions, ProfileResult, ReloadOutcome, SwitchOutcome,
};
pub use persona_attrs::{AttributeDef, AttributeKind, Schema, Values};
