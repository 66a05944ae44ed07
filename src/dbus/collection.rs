//! `org.freedesktop.Secret.Collection`, at a collection's own path and at
//! every alias path bound to it.

use std::collections::HashMap;

use zbus::zvariant::{OwnedObjectPath, Value};

use super::error::fdo;
use super::{object_path, object_paths, prompt, secret_from_wire, SecretError, WireSecret};
use crate::core::service::{Collection, Service};
use crate::core::types::CollectionId;
use crate::error::Error;

type Result<T> = std::result::Result<T, SecretError>;

pub struct CollectionInterface {
    service: Service,
    id: CollectionId,
}

impl CollectionInterface {
    pub fn new(service: Service, id: CollectionId) -> Self {
        Self { service, id }
    }

    fn collection(&self) -> crate::error::Result<Collection> {
        self.service
            .collection_by_id(&self.id)
            .ok_or_else(|| Error::NoSuchObject(self.service.paths().collection(&self.id)))
    }
}

#[zbus::interface(name = "org.freedesktop.Secret.Collection")]
impl CollectionInterface {
    async fn delete(&self) -> Result<OwnedObjectPath> {
        self.collection()?.delete().await?;
        prompt()
    }

    async fn search_items(&self, attributes: HashMap<String, String>) -> Result<Vec<OwnedObjectPath>> {
        let found = self
            .collection()?
            .search_items(&super::attributes(attributes))?;
        object_paths(found)
    }

    async fn create_item(
        &self,
        properties: HashMap<String, Value<'_>>,
        secret: WireSecret,
        replace: bool,
    ) -> Result<(OwnedObjectPath, OwnedObjectPath)> {
        let item = self
            .collection()?
            .create_item(
                super::properties(properties),
                &secret_from_wire(secret),
                replace,
            )
            .await?;
        Ok((object_path(item.path())?, prompt()?))
    }

    #[zbus(property)]
    async fn items(&self) -> zbus::fdo::Result<Vec<OwnedObjectPath>> {
        let items = self.collection().and_then(|c| c.items()).map_err(fdo)?;
        items
            .into_iter()
            .map(|path| {
                OwnedObjectPath::try_from(path)
                    .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
            })
            .collect()
    }

    #[zbus(property)]
    async fn label(&self) -> zbus::fdo::Result<String> {
        self.collection().and_then(|c| c.label()).map_err(fdo)
    }

    #[zbus(property)]
    async fn set_label(&mut self, label: String) -> zbus::fdo::Result<()> {
        let collection = self.collection().map_err(fdo)?;
        collection.set_label(&label).await.map_err(fdo)
    }

    #[zbus(property)]
    async fn locked(&self) -> zbus::fdo::Result<bool> {
        self.collection().and_then(|c| c.locked()).map_err(fdo)
    }

    #[zbus(property)]
    async fn created(&self) -> u64 {
        0
    }

    #[zbus(property)]
    async fn modified(&self) -> u64 {
        0
    }
}
