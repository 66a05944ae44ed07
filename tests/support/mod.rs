//! Test support utilities for pass-secret-service integration tests.
//!
//! Provides an in-process service fixture and client-side helpers for
//! opening sessions and building secrets.

#![allow(dead_code)]

pub mod assertions;
pub mod client;
pub mod commands;
pub mod fixtures;
pub mod skip;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use client::*;
#[allow(unused_imports)]
pub use commands::*;
#[allow(unused_imports)]
pub use fixtures::*;

use std::sync::Arc;

use pass_secret_service::core::constants::DEFAULT_ALIAS;
use pass_secret_service::{Collection, Item, MemoryBus, MemoryStore, Paths, Service};

/// A service over an in-memory store, recording every bus call.
///
/// Each test gets its own service; nothing is shared between tests.
pub struct Test {
    pub service: Service,
    pub store: Arc<MemoryStore>,
    pub bus: Arc<MemoryBus>,
}

impl Test {
    /// Start a fresh service. The default collection already exists.
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(MemoryBus::new());
        let service = Service::init(store.clone(), bus.clone(), Paths::default())
            .await
            .expect("service failed to start");
        Self {
            service,
            store,
            bus,
        }
    }

    /// The collection behind the `default` alias.
    pub fn default_collection(&self) -> Collection {
        let path = self.service.read_alias(DEFAULT_ALIAS);
        self.service
            .collection(&path)
            .expect("default collection missing")
    }

    /// Open a plain session and return its path.
    pub async fn plain_session(&self) -> String {
        let (_, path) = self
            .service
            .open_session("plain", &[])
            .await
            .expect("failed to open plain session");
        path
    }

    /// Create a collection labelled `label` with no alias.
    pub async fn collection(&self, label: &str) -> Collection {
        self.service
            .create_collection(collection_properties(label), "")
            .await
            .expect("failed to create collection")
    }

    /// Store `password` as a new item of `collection` over a plain session.
    pub async fn item(
        &self,
        collection: &Collection,
        label: &str,
        attributes: &[(&str, &str)],
        password: &str,
    ) -> Item {
        let session = self.plain_session().await;
        collection
            .create_item(
                item_properties(label, attributes),
                &plain_secret(&session, password),
                false,
            )
            .await
            .expect("failed to create item")
    }
}
