//! Domain types and type aliases.
//!
//! Entity metadata travels on the wire and on disk as a generic property
//! map. Internally it is read as `CollectionProperties`/`ItemProperties`
//! by `from_map`; writes go back to the store as partial maps.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::core::constants::{COLLECTION_LABEL, CONTENT_TYPE, ITEM_ATTRIBUTES, ITEM_LABEL};

/// A collection identifier (its storage directory name).
pub type CollectionId = String;

/// An item identifier (its storage file basename).
pub type ItemId = String;

/// A session identifier (`session<N>`).
pub type SessionId = String;

/// Searchable item attributes.
pub type Attributes = BTreeMap<String, String>;

/// Generic property map, as exchanged with clients and the store.
pub type PropertyMap = BTreeMap<String, Value>;

/// A transported secret: `(session, parameters, value, content_type)`.
///
/// `parameters` holds the AES IV for keyed sessions and is empty otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secret {
    pub session: String,
    pub parameters: Vec<u8>,
    pub value: Vec<u8>,
    pub content_type: String,
}

impl Secret {
    /// A `text/plain` secret bound to `session`.
    pub fn new(session: impl Into<String>, parameters: Vec<u8>, value: Vec<u8>) -> Self {
        Self {
            session: session.into(),
            parameters,
            value,
            content_type: CONTENT_TYPE.to_string(),
        }
    }
}

/// Typed view of a collection's property map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionProperties {
    pub label: String,
    /// Properties this daemon does not interpret, kept verbatim.
    pub extra: PropertyMap,
}

impl CollectionProperties {
    pub fn from_map(map: &PropertyMap) -> Self {
        let mut extra = map.clone();
        let label = extra
            .remove(COLLECTION_LABEL)
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self { label, extra }
    }
}

/// Typed view of an item's property map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemProperties {
    pub label: String,
    pub attributes: Attributes,
    pub extra: PropertyMap,
}

impl ItemProperties {
    pub fn from_map(map: &PropertyMap) -> Self {
        let mut extra = map.clone();
        let label = extra
            .remove(ITEM_LABEL)
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let attributes = extra
            .remove(ITEM_ATTRIBUTES)
            .as_ref()
            .and_then(Value::as_object)
            .map(|object| {
                object
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            label,
            attributes,
            extra,
        }
    }

    /// Subset match: every queried key is present with an identical value.
    pub fn matches(&self, query: &Attributes) -> bool {
        query
            .iter()
            .all(|(key, value)| self.attributes.get(key) == Some(value))
    }
}

/// JSON form of an attribute map.
pub fn attributes_value(attributes: &Attributes) -> Value {
    Value::Object(
        attributes
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
            .collect(),
    )
}
