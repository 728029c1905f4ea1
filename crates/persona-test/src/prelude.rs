//! Prelude module - commonly used types for convenient import.
//!
//! Use `use persona_test::prelude::*;` to import all essential types.

pub use crate::{
    CountingSetup, GreaterThanTen, RecordingSubscriber, TestHome, init_test_tracing, sample_schema,
    sample_types,
};
