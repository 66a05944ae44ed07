//! Persistent storage of collections, items and aliases.
//!
//! `Store` is the boundary to the password store. Every method is blocking;
//! the service runs them on the blocking pool.
//!
//! ## Backends
//!
//! - `PassStore`: pass-compatible directory tree, passwords encrypted by a
//!   [`Cipher`](crate::core::cipher::Cipher).
//! - `MemoryStore`: in-process, for tests and embedding.
//!
//! Identifiers handed out by `create_collection`/`create_item` never collide
//! with an entry that already exists in the store.

use std::collections::BTreeMap;

use uuid::Uuid;
use zeroize::Zeroizing;

use crate::core::constants::MAX_ID_ATTEMPTS;
use crate::core::types::{CollectionId, ItemId, PropertyMap};
use crate::error::{Result, StoreError};

mod memory;
mod pass;

pub use memory::MemoryStore;
pub use pass::PassStore;

/// Alias table as persisted: alias name to collection id.
pub type AliasTable = BTreeMap<String, CollectionId>;

/// Storage backend trait.
pub trait Store: Send + Sync {
    /// Ids of every stored collection.
    fn list_collections(&self) -> Result<Vec<CollectionId>>;

    /// Create an empty collection with `properties`, returning its new id.
    fn create_collection(&self, properties: &PropertyMap) -> Result<CollectionId>;

    /// Remove a collection and everything below it.
    fn delete_collection(&self, id: &str) -> Result<()>;

    /// A collection's property map (empty if none was saved).
    fn collection_properties(&self, id: &str) -> Result<PropertyMap>;

    /// Merge `partial` into a collection's properties, returning the result.
    fn update_collection_properties(&self, id: &str, partial: &PropertyMap)
        -> Result<PropertyMap>;

    /// Ids of every item in a collection.
    fn list_items(&self, collection: &str) -> Result<Vec<ItemId>>;

    /// Store a new item, returning its new id.
    fn create_item(
        &self,
        collection: &str,
        password: &str,
        properties: &PropertyMap,
    ) -> Result<ItemId>;

    /// Remove an item's password and properties.
    fn delete_item(&self, collection: &str, id: &str) -> Result<()>;

    /// Decrypt and return an item's password.
    fn item_password(&self, collection: &str, id: &str) -> Result<Zeroizing<String>>;

    /// Replace an item's password.
    fn set_item_password(&self, collection: &str, id: &str, password: &str) -> Result<()>;

    /// An item's property map (empty if none was saved).
    fn item_properties(&self, collection: &str, id: &str) -> Result<PropertyMap>;

    /// Merge `partial` into an item's properties, returning the result.
    fn update_item_properties(
        &self,
        collection: &str,
        id: &str,
        partial: &PropertyMap,
    ) -> Result<PropertyMap>;

    /// The persisted alias table (empty if none was saved).
    fn aliases(&self) -> Result<AliasTable>;

    /// Replace the persisted alias table.
    fn save_aliases(&self, aliases: &AliasTable) -> Result<()>;
}

/// A fresh identifier usable as a file name and an object path element.
pub fn new_identifier() -> String {
    Uuid::new_v4().to_string().replace('-', "_")
}

/// Generate identifiers until `taken` reports a free one.
///
/// # Errors
///
/// Returns `StoreError::IdentifierExhausted` after `MAX_ID_ATTEMPTS` clashes.
pub fn unique_identifier(taken: impl Fn(&str) -> bool) -> Result<String> {
    for _ in 0..MAX_ID_ATTEMPTS {
        let id = new_identifier();
        if !taken(&id) {
            return Ok(id);
        }
    }
    Err(StoreError::IdentifierExhausted(MAX_ID_ATTEMPTS).into())
}

/// Merge `partial` over `base`, key by key.
pub(crate) fn merge(mut base: PropertyMap, partial: &PropertyMap) -> PropertyMap {
    for (key, value) in partial {
        base.insert(key.clone(), value.clone());
    }
    base
}
