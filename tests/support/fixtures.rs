//! Property maps and a password store on disk.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Barrier, Mutex};

use serde_json::Value;
use tempfile::TempDir;
use zeroize::Zeroizing;

use pass_secret_service::core::cipher::Cipher;
use pass_secret_service::core::constants::{
    COLLECTION_LABEL, GPG_ID_FILE, ITEM_ATTRIBUTES, ITEM_LABEL,
};
use pass_secret_service::core::store::{AliasTable, Store};
use pass_secret_service::core::types::{CollectionId, ItemId, PropertyMap};
use pass_secret_service::error::{CipherError, Result};
use pass_secret_service::{MemoryBus, MemoryStore, PassStore, Paths, Service};

/// Properties for `CreateCollection`.
pub fn collection_properties(label: &str) -> PropertyMap {
    let mut map = PropertyMap::new();
    map.insert(COLLECTION_LABEL.to_string(), Value::from(label));
    map
}

/// Properties for `CreateItem`.
pub fn item_properties(label: &str, attributes: &[(&str, &str)]) -> PropertyMap {
    let attributes = attributes
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect();
    let mut map = PropertyMap::new();
    map.insert(ITEM_LABEL.to_string(), Value::from(label));
    map.insert(ITEM_ATTRIBUTES.to_string(), Value::Object(attributes));
    map
}

/// Reversible stand-in for gpg: `<recipients>\n<reversed plaintext>`.
pub struct Mirror;

impl Cipher for Mirror {
    fn encrypt(&self, plaintext: &str, recipients: &[String]) -> Result<Vec<u8>> {
        if recipients.is_empty() {
            return Err(CipherError::EncryptionFailed("no recipients".into()).into());
        }
        let reversed: String = plaintext.chars().rev().collect();
        Ok(format!("{}\n{}", recipients.join(","), reversed).into_bytes())
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<String>> {
        let text = String::from_utf8_lossy(ciphertext);
        let (_, body) = text
            .split_once('\n')
            .ok_or_else(|| CipherError::DecryptionFailed("bad format".into()))?;
        Ok(Zeroizing::new(body.chars().rev().collect()))
    }

    fn name(&self) -> &'static str {
        "mirror"
    }
}

/// A pass-style store directory that survives service restarts.
pub struct PassDir {
    pub dir: TempDir,
}

impl PassDir {
    /// An initialized store (`.gpg-id` written) with nothing in it.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        fs::write(dir.path().join(GPG_ID_FILE), "test@example.com\n")
            .expect("failed to write .gpg-id");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Start a service over this directory.
    pub async fn start(&self) -> (Service, Arc<MemoryBus>) {
        let store = PassStore::open(self.root(), Mirror).expect("failed to open store");
        let bus = Arc::new(MemoryBus::new());
        let service = Service::init(Arc::new(store), bus.clone(), Paths::default())
            .await
            .expect("service failed to start");
        (service, bus)
    }
}

/// A one-shot pause point: the first call through it waits for the test
/// twice, once on arrival and once to be let go.
#[derive(Default)]
pub struct Gate(Mutex<Option<Arc<Barrier>>>);

impl Gate {
    /// Arm the gate. Returns the barrier the test meets the store at.
    pub fn arm(&self) -> Arc<Barrier> {
        let barrier = Arc::new(Barrier::new(2));
        *self.0.lock().unwrap() = Some(barrier.clone());
        barrier
    }

    fn pass(&self) {
        let barrier = self.0.lock().unwrap().take();
        if let Some(barrier) = barrier {
            barrier.wait();
            barrier.wait();
        }
    }
}

/// Wait on `barrier` without stalling the runtime.
pub async fn meet(barrier: &Arc<Barrier>) {
    let barrier = barrier.clone();
    tokio::task::spawn_blocking(move || {
        barrier.wait();
    })
    .await
    .unwrap();
}

/// A `MemoryStore` that can be paused after an item write and before an
/// alias table write.
#[derive(Default)]
pub struct Gated {
    pub inner: MemoryStore,
    pub item_written: Gate,
    pub saving_aliases: Gate,
}

impl Store for Gated {
    fn list_collections(&self) -> Result<Vec<CollectionId>> {
        self.inner.list_collections()
    }

    fn create_collection(&self, properties: &PropertyMap) -> Result<CollectionId> {
        self.inner.create_collection(properties)
    }

    fn delete_collection(&self, id: &str) -> Result<()> {
        self.inner.delete_collection(id)
    }

    fn collection_properties(&self, id: &str) -> Result<PropertyMap> {
        self.inner.collection_properties(id)
    }

    fn update_collection_properties(
        &self,
        id: &str,
        partial: &PropertyMap,
    ) -> Result<PropertyMap> {
        self.inner.update_collection_properties(id, partial)
    }

    fn list_items(&self, collection: &str) -> Result<Vec<ItemId>> {
        self.inner.list_items(collection)
    }

    fn create_item(
        &self,
        collection: &str,
        password: &str,
        properties: &PropertyMap,
    ) -> Result<ItemId> {
        let id = self.inner.create_item(collection, password, properties)?;
        self.item_written.pass();
        Ok(id)
    }

    fn delete_item(&self, collection: &str, id: &str) -> Result<()> {
        self.inner.delete_item(collection, id)
    }

    fn item_password(&self, collection: &str, id: &str) -> Result<Zeroizing<String>> {
        self.inner.item_password(collection, id)
    }

    fn set_item_password(&self, collection: &str, id: &str, password: &str) -> Result<()> {
        self.inner.set_item_password(collection, id, password)
    }

    fn item_properties(&self, collection: &str, id: &str) -> Result<PropertyMap> {
        self.inner.item_properties(collection, id)
    }

    fn update_item_properties(
        &self,
        collection: &str,
        id: &str,
        partial: &PropertyMap,
    ) -> Result<PropertyMap> {
        self.inner.update_item_properties(collection, id, partial)
    }

    fn aliases(&self) -> Result<AliasTable> {
        self.inner.aliases()
    }

    fn save_aliases(&self, aliases: &AliasTable) -> Result<()> {
        self.saving_aliases.pass();
        self.inner.save_aliases(aliases)
    }
}
