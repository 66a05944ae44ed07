//! In-memory store.
//!
//! Same contract as `PassStore`, without disk or gpg. Counts mutating
//! calls so callers can observe how often state was persisted.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use zeroize::Zeroizing;

use super::{merge, unique_identifier, AliasTable, Store};
use crate::core::types::{CollectionId, ItemId, PropertyMap};
use crate::error::{Result, StoreError};

#[derive(Default)]
struct StoredItem {
    password: Zeroizing<String>,
    properties: PropertyMap,
}

#[derive(Default)]
struct StoredCollection {
    properties: PropertyMap,
    items: BTreeMap<ItemId, StoredItem>,
}

#[derive(Default)]
struct Contents {
    collections: BTreeMap<CollectionId, StoredCollection>,
    aliases: AliasTable,
}

/// In-process `Store` implementation.
#[derive(Default)]
pub struct MemoryStore {
    contents: Mutex<Contents>,
    writes: AtomicUsize,
    alias_writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutating calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of `save_aliases` calls so far.
    pub fn alias_writes(&self) -> usize {
        self.alias_writes.load(Ordering::SeqCst)
    }

    fn contents(&self) -> MutexGuard<'_, Contents> {
        self.contents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn collection_mut<'a>(
    contents: &'a mut Contents,
    id: &str,
) -> Result<&'a mut StoredCollection> {
    contents
        .collections
        .get_mut(id)
        .ok_or_else(|| StoreError::NotFound(id.to_string()).into())
}

fn item_mut<'a>(contents: &'a mut Contents, collection: &str, id: &str) -> Result<&'a mut StoredItem> {
    collection_mut(contents, collection)?
        .items
        .get_mut(id)
        .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collection, id)).into())
}

impl Store for MemoryStore {
    fn list_collections(&self) -> Result<Vec<CollectionId>> {
        Ok(self.contents().collections.keys().cloned().collect())
    }

    fn create_collection(&self, properties: &PropertyMap) -> Result<CollectionId> {
        let mut contents = self.contents();
        let id = unique_identifier(|id| contents.collections.contains_key(id))?;
        contents.collections.insert(
            id.clone(),
            StoredCollection {
                properties: properties.clone(),
                items: BTreeMap::new(),
            },
        );
        self.wrote();
        Ok(id)
    }

    fn delete_collection(&self, id: &str) -> Result<()> {
        self.contents()
            .collections
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.wrote();
        Ok(())
    }

    fn collection_properties(&self, id: &str) -> Result<PropertyMap> {
        let mut contents = self.contents();
        Ok(collection_mut(&mut contents, id)?.properties.clone())
    }

    fn update_collection_properties(
        &self,
        id: &str,
        partial: &PropertyMap,
    ) -> Result<PropertyMap> {
        let mut contents = self.contents();
        let collection = collection_mut(&mut contents, id)?;
        collection.properties = merge(std::mem::take(&mut collection.properties), partial);
        self.wrote();
        Ok(collection.properties.clone())
    }

    fn list_items(&self, collection: &str) -> Result<Vec<ItemId>> {
        let mut contents = self.contents();
        Ok(collection_mut(&mut contents, collection)?
            .items
            .keys()
            .cloned()
            .collect())
    }

    fn create_item(
        &self,
        collection: &str,
        password: &str,
        properties: &PropertyMap,
    ) -> Result<ItemId> {
        let mut contents = self.contents();
        let stored = collection_mut(&mut contents, collection)?;
        let id = unique_identifier(|id| stored.items.contains_key(id))?;
        stored.items.insert(
            id.clone(),
            StoredItem {
                password: Zeroizing::new(password.to_string()),
                properties: properties.clone(),
            },
        );
        self.wrote();
        Ok(id)
    }

    fn delete_item(&self, collection: &str, id: &str) -> Result<()> {
        let mut contents = self.contents();
        collection_mut(&mut contents, collection)?
            .items
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collection, id)))?;
        self.wrote();
        Ok(())
    }

    fn item_password(&self, collection: &str, id: &str) -> Result<Zeroizing<String>> {
        let mut contents = self.contents();
        Ok(item_mut(&mut contents, collection, id)?.password.clone())
    }

    fn set_item_password(&self, collection: &str, id: &str, password: &str) -> Result<()> {
        let mut contents = self.contents();
        item_mut(&mut contents, collection, id)?.password = Zeroizing::new(password.to_string());
        self.wrote();
        Ok(())
    }

    fn item_properties(&self, collection: &str, id: &str) -> Result<PropertyMap> {
        let mut contents = self.contents();
        Ok(item_mut(&mut contents, collection, id)?.properties.clone())
    }

    fn update_item_properties(
        &self,
        collection: &str,
        id: &str,
        partial: &PropertyMap,
    ) -> Result<PropertyMap> {
        let mut contents = self.contents();
        let item = item_mut(&mut contents, collection, id)?;
        item.properties = merge(std::mem::take(&mut item.properties), partial);
        self.wrote();
        Ok(item.properties.clone())
    }

    fn aliases(&self) -> Result<AliasTable> {
        Ok(self.contents().aliases.clone())
    }

    fn save_aliases(&self, aliases: &AliasTable) -> Result<()> {
        self.contents().aliases = aliases.clone();
        self.wrote();
        self.alias_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
