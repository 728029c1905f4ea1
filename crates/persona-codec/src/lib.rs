//! Persona Codec - text formats for profile config files.
//!
//! A [`Codec`] is a pure `parse`/`stringify` pair over a [`Document`].
//! The [`CodecRegistry`] maps names to codecs and ships with `json`
//! ([`JsonCodec`]) and `ini` ([`IniCodec`]). Callers pick one through a
//! [`CodecSelector`].
//!
//! # Example
//!
//! ```rust
//! use persona_codec::{CodecRegistry, CodecSelector};
//!
//! let codec = CodecSelector::from("ini").resolve(&CodecRegistry::new()).unwrap();
//! let document = codec.parse("name = work\n").unwrap();
//! assert_eq!(document["name"], "work");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::fmt;

mod error;
mod ini_codec;
mod json;
mod registry;

pub use error::{CodecError, CodecResult};
pub use ini_codec::IniCodec;
pub use json::JsonCodec;
pub use registry::{CodecRegistry, CodecSelector};

/// A decoded config file: an ordered mapping of keys to values.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// A text format for config files.
pub trait Codec: fmt::Debug + Send + Sync {
    /// Name the codec is selected by.
    fn name(&self) -> &str;

    /// Decode `text` into a document.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Parse`] if the text is malformed.
    fn parse(&self, text: &str) -> CodecResult<Document>;

    /// Encode `document` as text.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Serialize`] if the document cannot be encoded.
    fn stringify(&self, document: &Document) -> CodecResult<String>;
}
