//! # Greeting Table
//!
//! The server answers every `LotsOfReplies` call by walking a fixed, ordered
//! list of `(language, phrase)` pairs. The list ships inside the binary as a
//! JSON document and is parsed exactly once at startup into a
//! [`GreetingTable`], which is immutable and cheap to clone afterwards.
//!
//! ## Message format
//!
//! - Unary: [`format_hello`] produces `"Hello <name>"`.
//! - Streaming: [`GreetingEntry::greet`] produces
//!   `"[<language>] <phrase> <name>"`.

use crate::{Error, Result};
use serde::Deserialize;
use std::sync::Arc;

/// The JSON document compiled into the binary.
///
/// Each element has a `language` and a `hello` key.
pub const EMBEDDED_GREETINGS: &str = include_str!("../../data/greetings.json");

/// Formats the reply for a unary `SayHello` call.
pub fn format_hello(name: &str) -> String {
    format!("Hello {name}")
}

/// One localized greeting.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GreetingEntry {
    pub language: String,
    #[serde(rename = "hello")]
    pub phrase: String,
}

impl GreetingEntry {
    pub fn new(language: impl Into<String>, phrase: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            phrase: phrase.into(),
        }
    }

    /// Formats the streamed reply for this entry addressed to `name`.
    pub fn greet(&self, name: &str) -> String {
        format!("[{}] {} {}", self.language, self.phrase, name)
    }
}

/// Ordered, read-only list of greetings shared by the service and its workers.
///
/// Cloning only bumps a reference count; the entries themselves are never
/// mutated after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GreetingTable {
    entries: Arc<[GreetingEntry]>,
}

impl GreetingTable {
    pub fn new(entries: Vec<GreetingEntry>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    /// Parses the table compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GreetingTable`] if the embedded document is malformed
    /// or contains no entries.
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_GREETINGS)
    }

    /// Parses a JSON array of `{"language": ..., "hello": ...}` objects.
    ///
    /// Unlike a plain deserialize, an empty array `[]` is a load error here,
    /// so a server never starts with a table that streams nothing. Build an
    /// empty table explicitly with [`GreetingTable::new`] if one is wanted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GreetingTable`] on invalid JSON or an empty array.
    pub fn from_json(raw: &str) -> Result<Self> {
        let entries: Vec<GreetingEntry> =
            serde_json::from_str(raw).map_err(|e| Error::GreetingTable {
                reason: e.to_string(),
            })?;

        if entries.is_empty() {
            return Err(Error::GreetingTable {
                reason: "table contains no entries".to_string(),
            });
        }

        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[GreetingEntry] {
        &self.entries
    }

    pub fn iter(&self) -> core::slice::Iter<'_, GreetingEntry> {
        self.entries.iter()
    }

    /// Every streamed message for `name`, in table order.
    pub fn greetings_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = String> + 'a {
        self.entries.iter().map(move |entry| entry.greet(name))
    }
}

impl<'a> IntoIterator for &'a GreetingTable {
    type Item = &'a GreetingEntry;
    type IntoIter = core::slice::Iter<'a, GreetingEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
