//! `org.freedesktop.Secret.Item`.

use std::collections::HashMap;

use zbus::zvariant::OwnedObjectPath;

use super::error::fdo;
use super::{prompt, secret_from_wire, secret_to_wire, SecretError, WireSecret};
use crate::core::service::{Item, Service};
use crate::core::types::{CollectionId, ItemId};
use crate::error::Error;

type Result<T> = std::result::Result<T, SecretError>;

pub struct ItemInterface {
    service: Service,
    collection: CollectionId,
    id: ItemId,
}

impl ItemInterface {
    pub fn new(service: Service, collection: CollectionId, id: ItemId) -> Self {
        Self {
            service,
            collection,
            id,
        }
    }

    fn item(&self) -> crate::error::Result<Item> {
        self.service
            .item_by_id(&self.collection, &self.id)
            .ok_or_else(|| {
                Error::NoSuchObject(self.service.paths().item(&self.collection, &self.id))
            })
    }
}

#[zbus::interface(name = "org.freedesktop.Secret.Item")]
impl ItemInterface {
    async fn delete(&self) -> Result<OwnedObjectPath> {
        self.item()?.delete().await?;
        prompt()
    }

    async fn get_secret(&self, session: OwnedObjectPath) -> Result<WireSecret> {
        let secret = self.item()?.get_secret(session.as_str()).await?;
        secret_to_wire(secret)
    }

    async fn set_secret(&self, secret: WireSecret) -> Result<()> {
        self.item()?.set_secret(&secret_from_wire(secret)).await?;
        Ok(())
    }

    #[zbus(property)]
    async fn locked(&self) -> bool {
        false
    }

    #[zbus(property)]
    async fn attributes(&self) -> zbus::fdo::Result<HashMap<String, String>> {
        let attributes = self.item().and_then(|i| i.attributes()).map_err(fdo)?;
        Ok(attributes.into_iter().collect())
    }

    #[zbus(property)]
    async fn set_attributes(&mut self, attributes: HashMap<String, String>) -> zbus::fdo::Result<()> {
        let item = self.item().map_err(fdo)?;
        item.set_attributes(super::attributes(attributes))
            .await
            .map_err(fdo)
    }

    #[zbus(property)]
    async fn label(&self) -> zbus::fdo::Result<String> {
        self.item().and_then(|i| i.label()).map_err(fdo)
    }

    #[zbus(property)]
    async fn set_label(&mut self, label: String) -> zbus::fdo::Result<()> {
        let item = self.item().map_err(fdo)?;
        item.set_label(&label).await.map_err(fdo)
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
