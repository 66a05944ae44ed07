//! Object path grammar.
//!
//! ```text
//! <base>/collection/<cid>
//! <base>/collection/<cid>/<iid>
//! <base>/session/<sid>
//! <base>/aliases/<name>
//! ```
//!
//! Anything else is `NoSuchObject`.

use crate::core::constants::{ALIAS_SEGMENT, BASE_PATH, COLLECTION_SEGMENT, SESSION_SEGMENT};
use crate::error::{Error, Result};

/// A syntactically valid address, not yet checked against live objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Collection(String),
    Alias(String),
    Item { collection: String, item: String },
    Session(String),
}

/// Builds and parses object paths below a configured base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    base: String,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new(BASE_PATH)
    }
}

impl Paths {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn collection(&self, id: &str) -> String {
        format!("{}/{}/{}", self.base, COLLECTION_SEGMENT, id)
    }

    pub fn item(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}/{}", self.base, COLLECTION_SEGMENT, collection, id)
    }

    pub fn session(&self, id: &str) -> String {
        format!("{}/{}/{}", self.base, SESSION_SEGMENT, id)
    }

    pub fn alias(&self, name: &str) -> String {
        format!("{}/{}/{}", self.base, ALIAS_SEGMENT, name)
    }

    /// Parse `path` into a `Target`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoSuchObject` if the path is outside the base or does
    /// not match the grammar.
    pub fn parse(&self, path: &str) -> Result<Target> {
        let no_such_object = || Error::NoSuchObject(path.to_string());

        let relative = path
            .strip_prefix(self.base.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(no_such_object)?;

        let parts: Vec<&str> = relative.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(no_such_object());
        }

        match parts.as_slice() {
            [COLLECTION_SEGMENT, id] => Ok(Target::Collection(id.to_string())),
            [COLLECTION_SEGMENT, collection, item] => Ok(Target::Item {
                collection: collection.to_string(),
                item: item.to_string(),
            }),
            [ALIAS_SEGMENT, name] => Ok(Target::Alias(name.to_string())),
            [SESSION_SEGMENT, id] => Ok(Target::Session(id.to_string())),
            _ => Err(no_such_object()),
        }
    }
}

/// Whether `element` can be used as one object path element.
pub fn is_valid_element(element: &str) -> bool {
    !element.is_empty()
        && element
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether `path` is a valid absolute object path other than `/`.
pub fn is_valid_base(path: &str) -> bool {
    match path.strip_prefix('/') {
        Some(rest) => rest.split('/').all(is_valid_element),
        None => false,
    }
}
