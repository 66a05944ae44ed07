//! Object registry and router.
//!
//! `Service` owns every live session, collection and alias binding. Items
//! and collections are not objects of their own: they are entries in the
//! service's tables, reached through lightweight [`Collection`] and
//! [`Item`] handles that carry an id and a clone of the service.
//!
//! Store calls are blocking and run on tokio's blocking pool. The table
//! lock is never held across an `.await`; multi-step operations claim
//! their target first (see `Collection::delete` and `Item::delete`) so two
//! concurrent deletes cannot both succeed.

mod alias;
mod collection;
mod item;

pub use collection::Collection;
pub use item::Item;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::core::bus::{Bus, Object, Signal};
use crate::core::constants::{
    COLLECTION_LABEL, DEFAULT_ALIAS, DEFAULT_COLLECTION_LABEL, ROOT_PATH,
};
use crate::core::path::{Paths, Target};
use crate::core::session::{Algorithm, Session, SessionOutput};
use crate::core::store::Store;
use crate::core::types::{
    Attributes, CollectionId, CollectionProperties, ItemId, ItemProperties, PropertyMap, Secret,
    SessionId,
};
use crate::error::{Error, Result};

/// The Secret Service root object.
#[derive(Clone)]
pub struct Service {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn Store>,
    bus: Arc<dyn Bus>,
    paths: Paths,
    next_session: AtomicU64,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    sessions: HashMap<SessionId, Arc<Session>>,
    collections: BTreeMap<CollectionId, CollectionEntry>,
    aliases: BTreeMap<String, AliasEntry>,
}

struct CollectionEntry {
    properties: CollectionProperties,
    locked: bool,
    /// Set while `Collection::delete` runs.
    deleting: bool,
    items: BTreeMap<ItemId, ItemProperties>,
}

struct AliasEntry {
    collection: CollectionId,
    path: String,
}

/// What an object path resolved to.
pub enum Resolved {
    Collection(Collection),
    Item(Item),
    Session(Arc<Session>),
}

impl Service {
    /// Build the object graph from `store` and export it on `bus`.
    ///
    /// Every stored collection and item is registered, persisted aliases
    /// are rebound (aliases naming a missing collection are dropped), and
    /// a `default` collection is created if no `default` alias exists.
    /// The service object itself is exported last.
    ///
    /// # Errors
    ///
    /// Returns the first store or bus error encountered.
    pub async fn init(store: Arc<dyn Store>, bus: Arc<dyn Bus>, paths: Paths) -> Result<Service> {
        let service = Service {
            inner: Arc::new(Inner {
                store,
                bus,
                paths,
                next_session: AtomicU64::new(1),
                state: Mutex::new(State::default()),
            }),
        };

        let ids = service.blocking(|store| store.list_collections()).await?;
        for id in ids {
            service.load_collection(id).await?;
        }

        let persisted = service.blocking(|store| store.aliases()).await?;
        let mut bindings = Vec::new();
        let mut dropped = false;
        for (name, collection) in persisted {
            if alias::validate_name(&name).is_err() {
                warn!(alias = %name, "dropping alias with unusable name");
                dropped = true;
            } else if service.has_collection(&collection) {
                bindings.push((name, Some(collection)));
            } else {
                warn!(alias = %name, collection = %collection, "dropping alias to missing collection");
                dropped = true;
            }
        }
        for (name, target) in bindings {
            service.rebind_alias(&name, target).await?;
        }
        if dropped {
            service.save_aliases().await?;
        }

        if !service.has_alias(DEFAULT_ALIAS) {
            let mut properties = PropertyMap::new();
            properties.insert(
                COLLECTION_LABEL.to_string(),
                Value::from(DEFAULT_COLLECTION_LABEL),
            );
            service.create_collection(properties, DEFAULT_ALIAS).await?;
        }

        let base = service.paths().base().to_string();
        service.export(&base, &Object::Service).await?;

        info!(
            collections = service.collections().len(),
            base = %base,
            "secret service ready"
        );
        Ok(service)
    }

    pub fn paths(&self) -> &Paths {
        &self.inner.paths
    }

    pub fn path(&self) -> &str {
        self.inner.paths.base()
    }

    // Sessions

    /// Negotiate a new session.
    ///
    /// Returns the algorithm output and the new session's path.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotSupported` for an unknown algorithm.
    pub async fn open_session(&self, algorithm: &str, input: &[u8]) -> Result<(SessionOutput, String)> {
        let algorithm: Algorithm = algorithm.parse()?;
        let negotiation = match algorithm {
            Algorithm::Plain => algorithm.negotiate(input)?,
            Algorithm::DhIetf1024Sha256Aes128CbcPkcs7 => {
                let input = input.to_vec();
                offload(move || algorithm.negotiate(&input)).await?
            }
        };

        let serial = self.inner.next_session.fetch_add(1, Ordering::SeqCst);
        let id = format!("session{}", serial);
        let path = self.inner.paths.session(&id);
        let session = Arc::new(Session::new(id.clone(), path.clone(), negotiation.key));
        self.state().sessions.insert(id.clone(), session);
        self.export(&path, &Object::Session { id: id.clone() }).await?;

        debug!(session = %id, algorithm = %algorithm, "opened session");
        Ok((negotiation.output, path))
    }

    /// Close session `id`. It can never be resolved again.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoSession` if it is not open.
    pub async fn close_session(&self, id: &str) -> Result<()> {
        let session = self
            .state()
            .sessions
            .remove(id)
            .ok_or_else(|| Error::NoSession(self.inner.paths.session(id)))?;
        self.unexport(session.path(), &Object::Session { id: id.to_string() })
            .await;
        debug!(session = %id, "closed session");
        Ok(())
    }

    /// Decode a secret under the session it names.
    pub fn decode_secret(&self, secret: &Secret) -> Result<Zeroizing<String>> {
        self.session(&secret.session)?.decode(secret)
    }

    // Collections

    /// Create a collection, optionally binding `alias` to it.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` for an alias that cannot be used as
    /// a path element, or a store error.
    pub async fn create_collection(&self, properties: PropertyMap, alias: &str) -> Result<Collection> {
        if !alias.is_empty() {
            alias::validate_name(alias)?;
        }

        let stored = properties.clone();
        let id = self
            .blocking(move |store| store.create_collection(&stored))
            .await?;

        self.state().collections.insert(
            id.clone(),
            CollectionEntry {
                properties: CollectionProperties::from_map(&properties),
                locked: false,
                deleting: false,
                items: BTreeMap::new(),
            },
        );
        let collection = Collection::new(self.clone(), id.clone());
        self.export(collection.path(), &Object::Collection { id: id.clone() })
            .await?;
        self.emit(self.path(), Signal::CollectionCreated(collection.path().to_string()))
            .await;
        info!(collection = %id, "created collection");

        if !alias.is_empty() {
            self.set_aliases(vec![(alias.to_string(), Some(id))]).await?;
        }
        Ok(collection)
    }

    /// Paths of every registered collection.
    pub fn collections(&self) -> Vec<String> {
        self.state()
            .collections
            .keys()
            .map(|id| self.inner.paths.collection(id))
            .collect()
    }

    /// Items matching `attributes` in every collection, split into
    /// `(unlocked, locked)` by their collection's flag.
    pub fn search_items(&self, attributes: &Attributes) -> (Vec<String>, Vec<String>) {
        let mut unlocked = Vec::new();
        let mut locked = Vec::new();
        let state = self.state();
        for (id, entry) in &state.collections {
            let bucket = if entry.locked { &mut locked } else { &mut unlocked };
            bucket.extend(
                entry
                    .items
                    .iter()
                    .filter(|(_, item)| item.matches(attributes))
                    .map(|(item, _)| self.inner.paths.item(id, item)),
            );
        }
        (unlocked, locked)
    }

    /// Unlock the collections named by `paths` (directly or through one of
    /// their items). Paths that do not resolve are skipped.
    pub fn unlock(&self, paths: &[String]) -> Vec<String> {
        self.set_locked(paths, false)
    }

    /// Lock the collections named by `paths`. See [`Service::unlock`].
    pub fn lock(&self, paths: &[String]) -> Vec<String> {
        self.set_locked(paths, true)
    }

    fn set_locked(&self, paths: &[String], locked: bool) -> Vec<String> {
        let mut affected = Vec::new();
        for path in paths {
            let collection = match self.resolve(path) {
                Ok(Resolved::Collection(collection)) => collection.id().to_string(),
                Ok(Resolved::Item(item)) => item.collection_id().to_string(),
                _ => {
                    debug!(path = %path, "skipping unresolvable path");
                    continue;
                }
            };
            if let Some(entry) = self.state().collections.get_mut(&collection) {
                entry.locked = locked;
                affected.push(path.clone());
            }
        }
        affected
    }

    /// Fetch and encode the secrets of `items` under `session`.
    ///
    /// The session and every item path are resolved before the store is
    /// touched.
    ///
    /// # Errors
    ///
    /// Returns `NoSession`/`NoSuchObject` on a bad path, or the first store
    /// or crypto error.
    pub async fn get_secrets(
        &self,
        items: &[String],
        session: &str,
    ) -> Result<BTreeMap<String, Secret>> {
        let session = self.session(session)?;
        let items = items
            .iter()
            .map(|path| self.item(path).map(|item| (path.clone(), item)))
            .collect::<Result<Vec<_>>>()?;

        let mut secrets = BTreeMap::new();
        for (path, item) in items {
            let password = item.password().await?;
            secrets.insert(path, session.encode(&password)?);
        }
        Ok(secrets)
    }

    // Aliases

    /// Path of the collection `name` points at, or `/` if unbound.
    pub fn read_alias(&self, name: &str) -> String {
        self.state()
            .aliases
            .get(name)
            .map(|alias| self.inner.paths.collection(&alias.collection))
            .unwrap_or_else(|| ROOT_PATH.to_string())
    }

    /// Point `name` at the collection at `collection`, or clear it when
    /// `collection` is `/`.
    ///
    /// # Errors
    ///
    /// Returns `NoSuchObject` if `collection` does not resolve to a
    /// collection and `InvalidArgument` for an unusable alias name.
    pub async fn set_alias(&self, name: &str, collection: &str) -> Result<()> {
        alias::validate_name(name)?;
        let target = if collection == ROOT_PATH {
            None
        } else {
            Some(self.collection(collection)?.id().to_string())
        };
        self.set_aliases(vec![(name.to_string(), target)]).await
    }

    // Resolution

    /// Resolve `path` to a live object.
    ///
    /// # Errors
    ///
    /// Returns `NoSuchObject` for malformed paths and unknown collections
    /// or items, `NoSession` for unknown session ids.
    pub fn resolve(&self, path: &str) -> Result<Resolved> {
        let target = self.inner.paths.parse(path)?;
        let state = self.state();
        let no_such_object = || Error::NoSuchObject(path.to_string());

        match target {
            Target::Collection(id) => {
                if !state.collections.contains_key(&id) {
                    return Err(no_such_object());
                }
                Ok(Resolved::Collection(Collection::new(self.clone(), id)))
            }
            Target::Alias(name) => {
                let alias = state.aliases.get(&name).ok_or_else(no_such_object)?;
                Ok(Resolved::Collection(Collection::new(
                    self.clone(),
                    alias.collection.clone(),
                )))
            }
            Target::Item { collection, item } => {
                let entry = state.collections.get(&collection).ok_or_else(no_such_object)?;
                if !entry.items.contains_key(&item) {
                    return Err(no_such_object());
                }
                Ok(Resolved::Item(Item::new(self.clone(), collection, item)))
            }
            Target::Session(id) => state
                .sessions
                .get(&id)
                .cloned()
                .map(Resolved::Session)
                .ok_or_else(|| Error::NoSession(path.to_string())),
        }
    }

    /// Resolve a collection path or alias path.
    pub fn collection(&self, path: &str) -> Result<Collection> {
        match self.resolve(path)? {
            Resolved::Collection(collection) => Ok(collection),
            _ => Err(Error::NoSuchObject(path.to_string())),
        }
    }

    /// Resolve an item path.
    pub fn item(&self, path: &str) -> Result<Item> {
        match self.resolve(path)? {
            Resolved::Item(item) => Ok(item),
            _ => Err(Error::NoSuchObject(path.to_string())),
        }
    }

    /// Resolve a session path.
    pub fn session(&self, path: &str) -> Result<Arc<Session>> {
        match self.resolve(path)? {
            Resolved::Session(session) => Ok(session),
            _ => Err(Error::NoSuchObject(path.to_string())),
        }
    }

    /// Handle for collection `id`, if registered.
    pub fn collection_by_id(&self, id: &str) -> Option<Collection> {
        self.has_collection(id)
            .then(|| Collection::new(self.clone(), id.to_string()))
    }

    /// Handle for item `id` of collection `collection`, if registered.
    pub fn item_by_id(&self, collection: &str, id: &str) -> Option<Item> {
        let exists = self
            .state()
            .collections
            .get(collection)
            .is_some_and(|entry| entry.items.contains_key(id));
        exists.then(|| Item::new(self.clone(), collection.to_string(), id.to_string()))
    }

    /// Take every object off the bus: sessions, aliases, items and
    /// collections, then the service itself.
    pub async fn unregister(&self) {
        let (sessions, aliases, collections) = {
            let mut state = self.state();
            let sessions: Vec<_> = state.sessions.drain().map(|(_, s)| s).collect();
            let aliases: Vec<_> = std::mem::take(&mut state.aliases).into_iter().collect();
            let collections: Vec<_> = state
                .collections
                .iter()
                .map(|(id, entry)| (id.clone(), entry.items.keys().cloned().collect::<Vec<_>>()))
                .collect();
            (sessions, aliases, collections)
        };

        for session in sessions {
            let object = Object::Session {
                id: session.id().to_string(),
            };
            self.unexport(session.path(), &object).await;
        }
        for (name, alias) in aliases {
            let object = Object::Alias {
                name,
                collection: alias.collection,
            };
            self.unexport(&alias.path, &object).await;
        }
        for (id, items) in collections {
            for item in items {
                let path = self.inner.paths.item(&id, &item);
                let object = Object::Item {
                    collection: id.clone(),
                    id: item,
                };
                self.unexport(&path, &object).await;
            }
            let path = self.inner.paths.collection(&id);
            self.unexport(&path, &Object::Collection { id }).await;
        }
        let base = self.path().to_string();
        self.unexport(&base, &Object::Service).await;
        info!("unregistered secret service");
    }

    // Internals

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn has_collection(&self, id: &str) -> bool {
        self.state().collections.contains_key(id)
    }

    fn has_alias(&self, name: &str) -> bool {
        self.state().aliases.contains_key(name)
    }

    /// Register a stored collection and its items.
    async fn load_collection(&self, id: CollectionId) -> Result<()> {
        let key = id.clone();
        let (properties, items) = self
            .blocking(move |store| {
                let properties = store.collection_properties(&key)?;
                let mut items = BTreeMap::new();
                for item in store.list_items(&key)? {
                    let properties = store.item_properties(&key, &item)?;
                    items.insert(item, ItemProperties::from_map(&properties));
                }
                Ok((properties, items))
            })
            .await?;

        let item_ids: Vec<ItemId> = items.keys().cloned().collect();
        self.state().collections.insert(
            id.clone(),
            CollectionEntry {
                properties: CollectionProperties::from_map(&properties),
                locked: false,
                deleting: false,
                items,
            },
        );

        for item in item_ids {
            let path = self.inner.paths.item(&id, &item);
            let object = Object::Item {
                collection: id.clone(),
                id: item,
            };
            self.export(&path, &object).await?;
        }
        let path = self.inner.paths.collection(&id);
        self.export(&path, &Object::Collection { id: id.clone() })
            .await?;
        debug!(collection = %id, "loaded collection");
        Ok(())
    }

    /// Run a store call on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn Store) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.inner.store);
        offload(move || f(store.as_ref())).await
    }

    async fn export(&self, path: &str, object: &Object) -> Result<()> {
        self.inner.bus.export(self, path, object).await
    }

    async fn unexport(&self, path: &str, object: &Object) {
        if let Err(e) = self.inner.bus.unexport(path, object).await {
            warn!(path = %path, error = %e, "failed to unexport object");
        }
    }

    async fn emit(&self, emitter: &str, signal: Signal) {
        if let Err(e) = self.inner.bus.emit(emitter, &signal).await {
            warn!(emitter = %emitter, signal = signal.member(), error = %e, "failed to emit signal");
        }
    }

    /// Emit `signal` from collection `id` at its own path and every alias
    /// path bound to it.
    async fn emit_from_collection(&self, id: &str, signal: Signal) {
        let mut emitters = vec![self.inner.paths.collection(id)];
        emitters.extend(
            self.state()
                .aliases
                .values()
                .filter(|alias| alias.collection == id)
                .map(|alias| alias.path.clone()),
        );
        for emitter in emitters {
            self.emit(&emitter, signal.clone()).await;
        }
    }
}

/// Run CPU-bound or blocking work on the blocking pool.
async fn offload<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Worker(e.to_string()))?
}
