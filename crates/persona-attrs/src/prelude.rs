//! Prelude module - commonly used types for convenient import.
//!
//! Use `use persona_attrs::prelude::*;` to import all essential types.

pub use crate::{
    AttrContext, AttributeDef, AttributeKind, AttributeStore, AttributeType, HostContext,
    Rejection, Schema, Transformed, Values,
};
