//! Persona Attributes - schema-driven typed attribute store.
//!
//! This crate provides:
//! - [`Schema`]: immutable, ordered attribute definitions (code or JSON/TOML)
//! - [`AttributeKind`]: the closed set of attribute behaviours plus custom types
//! - [`AttributeStore`]: validated, transformable values with reset semantics
//!
//! # Example
//!
//! ```rust
//! use persona_attrs::{AttributeDef, AttributeKind, AttributeStore, HostContext, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::builder()
//!     .attribute("retries", AttributeDef::new(AttributeKind::Number).with_default(3))
//!     .build()
//!     .unwrap();
//!
//! let mut store = AttributeStore::from_schema(&schema, HostContext::new());
//! store.set("retries", json!("5")).unwrap();
//! assert_eq!(store.get("retries"), Some(json!(5)));
//!
//! store.reset("retries").unwrap();
//! assert_eq!(store.get("retries"), Some(json!(3)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod kind;
mod schema;
mod store;

pub use context::{AttrContext, HostContext};
pub use error::{AttrError, AttrResult, Rejection};
pub use kind::{AttributeKind, AttributeType, Transformed};
pub use schema::{AttributeDef, Schema, SchemaBuilder, TypeRegistry};
pub use store::{AttributeStore, BatchReport, Values};
