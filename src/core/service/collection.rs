//! Collection handles.

use serde_json::Value;
use tracing::{debug, info, warn};

use super::{Item, Service};
use crate::core::bus::{Object, Signal};
use crate::core::constants::COLLECTION_LABEL;
use crate::core::types::{Attributes, CollectionId, CollectionProperties, ItemProperties, PropertyMap, Secret};
use crate::error::{Error, Result};

/// A registered collection.
#[derive(Clone)]
pub struct Collection {
    service: Service,
    id: CollectionId,
    path: String,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection").field("id", &self.id).finish()
    }
}

impl Collection {
    pub(super) fn new(service: Service, id: CollectionId) -> Self {
        let path = service.inner.paths.collection(&id);
        Self { service, id, path }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Canonical path, `<base>/collection/<id>`.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn missing(&self) -> Error {
        Error::NoSuchObject(self.path.clone())
    }

    /// Read from the collection's table entry.
    fn with_entry<T>(&self, f: impl FnOnce(&super::CollectionEntry) -> T) -> Result<T> {
        let state = self.service.state();
        state
            .collections
            .get(&self.id)
            .map(f)
            .ok_or_else(|| self.missing())
    }

    pub fn label(&self) -> Result<String> {
        self.with_entry(|entry| entry.properties.label.clone())
    }

    /// Set the label. A write of the current value is a no-op.
    pub async fn set_label(&self, label: &str) -> Result<()> {
        if self.label()? == label {
            return Ok(());
        }

        let id = self.id.clone();
        let mut partial = PropertyMap::new();
        partial.insert(COLLECTION_LABEL.to_string(), Value::from(label));
        let merged = self
            .service
            .blocking(move |store| store.update_collection_properties(&id, &partial))
            .await?;

        if let Some(entry) = self.service.state().collections.get_mut(&self.id) {
            entry.properties = CollectionProperties::from_map(&merged);
        }
        self.service
            .emit(
                self.service.path(),
                Signal::CollectionChanged(self.path.clone()),
            )
            .await;
        Ok(())
    }

    /// In-memory only. Nothing checks it before reading or writing
    /// secrets.
    pub fn locked(&self) -> Result<bool> {
        self.with_entry(|entry| entry.locked)
    }

    /// Timestamps are not tracked.
    pub fn created(&self) -> u64 {
        0
    }

    pub fn modified(&self) -> u64 {
        0
    }

    /// Paths of the collection's items.
    pub fn items(&self) -> Result<Vec<String>> {
        self.with_entry(|entry| {
            entry
                .items
                .keys()
                .map(|item| self.service.inner.paths.item(&self.id, item))
                .collect()
        })
    }

    /// Paths of the items whose attributes include every pair in
    /// `attributes`.
    pub fn search_items(&self, attributes: &Attributes) -> Result<Vec<String>> {
        self.with_entry(|entry| {
            entry
                .items
                .iter()
                .filter(|(_, item)| item.matches(attributes))
                .map(|(item, _)| self.service.inner.paths.item(&self.id, item))
                .collect()
        })
    }

    /// Store a new item, or with `replace` overwrite the first item whose
    /// attributes match those in `properties`.
    ///
    /// The secret is decoded before anything is written.
    ///
    /// # Errors
    ///
    /// Returns `NoSession`/`NoSuchObject` if the secret's session does not
    /// resolve, a crypto error if it does not decode, or a store error.
    pub async fn create_item(
        &self,
        properties: PropertyMap,
        secret: &Secret,
        replace: bool,
    ) -> Result<Item> {
        let password = self.service.decode_secret(secret)?;
        let typed = ItemProperties::from_map(&properties);

        if replace {
            let existing = self.search_items(&typed.attributes)?;
            if let Some(path) = existing.first() {
                let item = self.service.item(path)?;
                self.ensure_live()?;
                item.set_label(&typed.label).await?;
                item.store_password(password).await?;
                self.ensure_live()?;
                debug!(item = %item.path(), "replaced item");
                return Ok(item);
            }
        }

        self.ensure_live()?;

        let collection = self.id.clone();
        let stored = properties;
        let id = self
            .service
            .blocking(move |store| store.create_item(&collection, &password, &stored))
            .await?;

        let item = Item::new(self.service.clone(), self.id.clone(), id.clone());
        let object = Object::Item {
            collection: self.id.clone(),
            id: id.clone(),
        };
        if let Err(e) = self.service.export(item.path(), &object).await {
            self.discard(&id).await;
            return Err(e);
        }

        // A delete that claimed the collection while the store was
        // writing has already taken its item snapshot.
        let inserted = {
            let mut state = self.service.state();
            match state.collections.get_mut(&self.id) {
                Some(entry) if !entry.deleting => {
                    entry.items.insert(id.clone(), typed);
                    true
                }
                _ => false,
            }
        };
        if !inserted {
            self.service.unexport(item.path(), &object).await;
            self.discard(&id).await;
            return Err(self.missing());
        }

        self.service
            .emit_from_collection(&self.id, Signal::ItemCreated(item.path().to_string()))
            .await;
        debug!(item = %item.path(), "created item");
        Ok(item)
    }

    /// Fail with `NoSuchObject` once the collection is gone or claimed by
    /// a delete.
    fn ensure_live(&self) -> Result<()> {
        if self.with_entry(|entry| entry.deleting)? {
            return Err(self.missing());
        }
        Ok(())
    }

    /// Remove a stored item that never made it into the table.
    async fn discard(&self, id: &str) {
        let (collection, item) = (self.id.clone(), id.to_string());
        let removed = self
            .service
            .blocking(move |store| store.delete_item(&collection, &item))
            .await;
        if let Err(e) = removed {
            warn!(collection = %self.id, item = %id, error = %e, "failed to discard item");
        }
    }

    /// Delete the collection with all of its items and aliases.
    ///
    /// Steps, in order: delete each item, clear the aliases bound here
    /// (one table write), deregister, unexport, remove from the store,
    /// signal `CollectionDeleted`.
    ///
    /// # Errors
    ///
    /// Returns `NoSuchObject` if the collection is gone or already being
    /// deleted.
    pub async fn delete(&self) -> Result<()> {
        {
            let mut state = self.service.state();
            match state.collections.get_mut(&self.id) {
                Some(entry) if !entry.deleting => entry.deleting = true,
                _ => return Err(self.missing()),
            }
        }

        let result = self.remove().await;
        if result.is_err() {
            if let Some(entry) = self.service.state().collections.get_mut(&self.id) {
                entry.deleting = false;
            }
        }
        result
    }

    async fn remove(&self) -> Result<()> {
        let items: Vec<_> = self.with_entry(|entry| entry.items.keys().cloned().collect())?;
        for id in items {
            let item = Item::new(self.service.clone(), self.id.clone(), id);
            match item.delete().await {
                Err(Error::NoSuchObject(_)) => continue,
                result => result?,
            }
        }

        let stale = self
            .service
            .aliases_of(&self.id)
            .into_iter()
            .map(|name| (name, None))
            .collect();
        self.service.set_aliases(stale).await?;

        self.service.state().collections.remove(&self.id);
        self.service
            .unexport(&self.path, &Object::Collection { id: self.id.clone() })
            .await;

        let id = self.id.clone();
        self.service
            .blocking(move |store| store.delete_collection(&id))
            .await?;
        self.service
            .emit(
                self.service.path(),
                Signal::CollectionDeleted(self.path.clone()),
            )
            .await;
        info!(collection = %self.id, "deleted collection");
        Ok(())
    }
}
