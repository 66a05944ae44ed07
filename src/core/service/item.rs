//! Item handles.

use serde_json::Value;
use tracing::debug;
use zeroize::Zeroizing;

use super::Service;
use crate::core::bus::{Object, Signal};
use crate::core::constants::{ITEM_ATTRIBUTES, ITEM_LABEL};
use crate::core::types::{attributes_value, Attributes, CollectionId, ItemId, ItemProperties, PropertyMap, Secret};
use crate::error::{Error, Result};

/// A registered item.
#[derive(Clone)]
pub struct Item {
    service: Service,
    collection: CollectionId,
    id: ItemId,
    path: String,
}

impl std::fmt::Debug for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Item")
            .field("collection", &self.collection)
            .field("id", &self.id)
            .finish()
    }
}

impl Item {
    pub(super) fn new(service: Service, collection: CollectionId, id: ItemId) -> Self {
        let path = service.inner.paths.item(&collection, &id);
        Self {
            service,
            collection,
            id,
            path,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn collection_id(&self) -> &str {
        &self.collection
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn missing(&self) -> Error {
        Error::NoSuchObject(self.path.clone())
    }

    /// Label, attributes and any other properties the client stored.
    pub fn properties(&self) -> Result<ItemProperties> {
        let state = self.service.state();
        state
            .collections
            .get(&self.collection)
            .and_then(|entry| entry.items.get(&self.id))
            .cloned()
            .ok_or_else(|| self.missing())
    }

    pub fn label(&self) -> Result<String> {
        Ok(self.properties()?.label)
    }

    pub fn attributes(&self) -> Result<Attributes> {
        Ok(self.properties()?.attributes)
    }

    /// Set the label. A write of the current value is a no-op.
    pub async fn set_label(&self, label: &str) -> Result<()> {
        if self.label()? == label {
            return Ok(());
        }
        self.update(ITEM_LABEL, Value::from(label)).await
    }

    /// Replace the attributes. A write of the current value is a no-op.
    pub async fn set_attributes(&self, attributes: Attributes) -> Result<()> {
        if self.attributes()? == attributes {
            return Ok(());
        }
        self.update(ITEM_ATTRIBUTES, attributes_value(&attributes))
            .await
    }

    /// Persist one property, refresh the cached map and signal the change.
    async fn update(&self, key: &str, value: Value) -> Result<()> {
        let (collection, id) = (self.collection.clone(), self.id.clone());
        let mut partial = PropertyMap::new();
        partial.insert(key.to_string(), value);
        let merged = self
            .service
            .blocking(move |store| store.update_item_properties(&collection, &id, &partial))
            .await?;

        {
            let mut state = self.service.state();
            let cached = state
                .collections
                .get_mut(&self.collection)
                .and_then(|entry| entry.items.get_mut(&self.id));
            if let Some(cached) = cached {
                *cached = ItemProperties::from_map(&merged);
            }
        }
        self.changed().await;
        Ok(())
    }

    async fn changed(&self) {
        self.service
            .emit_from_collection(&self.collection, Signal::ItemChanged(self.path.clone()))
            .await;
    }

    /// Items are never locked individually.
    pub fn locked(&self) -> bool {
        false
    }

    pub fn created(&self) -> u64 {
        0
    }

    pub fn modified(&self) -> u64 {
        0
    }

    /// The stored password, fetched from the store on every call.
    pub(super) async fn password(&self) -> Result<Zeroizing<String>> {
        self.properties()?;
        let (collection, id) = (self.collection.clone(), self.id.clone());
        self.service
            .blocking(move |store| store.item_password(&collection, &id))
            .await
    }

    /// Persist a new password and signal `ItemChanged`.
    pub(super) async fn store_password(&self, password: Zeroizing<String>) -> Result<()> {
        self.properties()?;
        let (collection, id) = (self.collection.clone(), self.id.clone());
        self.service
            .blocking(move |store| store.set_item_password(&collection, &id, &password))
            .await?;
        self.changed().await;
        Ok(())
    }

    /// The secret encoded for the session at `session`.
    ///
    /// # Errors
    ///
    /// Returns `NoSession`/`NoSuchObject` if the session does not resolve.
    pub async fn get_secret(&self, session: &str) -> Result<Secret> {
        let session = self.service.session(session)?;
        let password = self.password().await?;
        session.encode(&password)
    }

    /// Decode `secret` under its session and store it.
    pub async fn set_secret(&self, secret: &Secret) -> Result<()> {
        let password = self.service.decode_secret(secret)?;
        self.store_password(password).await
    }

    /// Remove the item.
    ///
    /// Leaves the collection's table first, so a concurrent delete fails
    /// with `NoSuchObject`; then unexports, removes the stored files and
    /// signals `ItemDeleted`.
    pub async fn delete(&self) -> Result<()> {
        {
            let mut state = self.service.state();
            state
                .collections
                .get_mut(&self.collection)
                .and_then(|entry| entry.items.remove(&self.id))
                .ok_or_else(|| self.missing())?;
        }

        let object = Object::Item {
            collection: self.collection.clone(),
            id: self.id.clone(),
        };
        self.service.unexport(&self.path, &object).await;

        let (collection, id) = (self.collection.clone(), self.id.clone());
        self.service
            .blocking(move |store| store.delete_item(&collection, &id))
            .await?;
        self.service
            .emit_from_collection(&self.collection, Signal::ItemDeleted(self.path.clone()))
            .await;
        debug!(item = %self.path, "deleted item");
        Ok(())
    }
}
