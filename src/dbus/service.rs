//! `org.freedesktop.Secret.Service`.

use std::collections::HashMap;

use zbus::zvariant::{OwnedObjectPath, Value};

use super::{object_path, object_paths, prompt, secret_to_wire, SecretError, WireSecret};
use crate::core::service::Service;
use crate::core::session::{Algorithm, SessionOutput};

type Result<T> = std::result::Result<T, SecretError>;

pub struct ServiceInterface {
    service: Service,
}

impl ServiceInterface {
    pub fn new(service: Service) -> Self {
        Self { service }
    }
}

/// The client's DH public value from an `ay` variant.
fn public_key(input: Value<'_>) -> Result<Vec<u8>> {
    match input {
        Value::Value(inner) => public_key(*inner),
        other => Ok(Vec::<u8>::try_from(other)?),
    }
}

#[zbus::interface(name = "org.freedesktop.Secret.Service")]
impl ServiceInterface {
    async fn open_session(
        &self,
        algorithm: &str,
        input: Value<'_>,
    ) -> Result<(Value<'static>, OwnedObjectPath)> {
        // plain ignores its input
        let input = match algorithm.parse::<Algorithm>()? {
            Algorithm::Plain => Vec::new(),
            Algorithm::DhIetf1024Sha256Aes128CbcPkcs7 => public_key(input)?,
        };
        let (output, path) = self.service.open_session(algorithm, &input).await?;
        let output = match output {
            SessionOutput::Plain => Value::from(String::new()),
            SessionOutput::PublicKey(key) => Value::from(key),
        };
        Ok((output, object_path(path)?))
    }

    async fn create_collection(
        &self,
        properties: HashMap<String, Value<'_>>,
        alias: &str,
    ) -> Result<(OwnedObjectPath, OwnedObjectPath)> {
        let collection = self
            .service
            .create_collection(super::properties(properties), alias)
            .await?;
        Ok((object_path(collection.path())?, prompt()?))
    }

    async fn search_items(
        &self,
        attributes: HashMap<String, String>,
    ) -> Result<(Vec<OwnedObjectPath>, Vec<OwnedObjectPath>)> {
        let (unlocked, locked) = self.service.search_items(&super::attributes(attributes));
        Ok((object_paths(unlocked)?, object_paths(locked)?))
    }

    async fn unlock(
        &self,
        objects: Vec<OwnedObjectPath>,
    ) -> Result<(Vec<OwnedObjectPath>, OwnedObjectPath)> {
        let paths = to_strings(objects);
        Ok((object_paths(self.service.unlock(&paths))?, prompt()?))
    }

    async fn lock(
        &self,
        objects: Vec<OwnedObjectPath>,
    ) -> Result<(Vec<OwnedObjectPath>, OwnedObjectPath)> {
        let paths = to_strings(objects);
        Ok((object_paths(self.service.lock(&paths))?, prompt()?))
    }

    async fn get_secrets(
        &self,
        items: Vec<OwnedObjectPath>,
        session: OwnedObjectPath,
    ) -> Result<HashMap<OwnedObjectPath, WireSecret>> {
        let secrets = self
            .service
            .get_secrets(&to_strings(items), session.as_str())
            .await?;
        secrets
            .into_iter()
            .map(|(path, secret)| Ok((object_path(path)?, secret_to_wire(secret)?)))
            .collect()
    }

    async fn read_alias(&self, name: &str) -> Result<OwnedObjectPath> {
        object_path(self.service.read_alias(name))
    }

    async fn set_alias(&self, name: &str, collection: OwnedObjectPath) -> Result<()> {
        Ok(self.service.set_alias(name, collection.as_str()).await?)
    }

    #[zbus(property)]
    async fn collections(&self) -> zbus::fdo::Result<Vec<OwnedObjectPath>> {
        self.service
            .collections()
            .into_iter()
            .map(|path| {
                OwnedObjectPath::try_from(path)
                    .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
            })
            .collect()
    }
}

fn to_strings(paths: Vec<OwnedObjectPath>) -> Vec<String> {
    paths.iter().map(|p| p.as_str().to_string()).collect()
}
