//! Transport seam.
//!
//! The service never talks to D-Bus directly. It announces which objects
//! exist at which paths and which signals fire through a `Bus`; the
//! transport adapter turns those calls into registrations on a connection.
//! `MemoryBus` records them instead.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::core::constants::{COLLECTION_INTERFACE, SERVICE_INTERFACE};
use crate::core::service::Service;
use crate::core::types::{CollectionId, ItemId, SessionId};
use crate::error::Result;

/// What lives at an exported path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Service,
    Collection { id: CollectionId },
    /// A second path for a collection.
    Alias { name: String, collection: CollectionId },
    Item { collection: CollectionId, id: ItemId },
    Session { id: SessionId },
}

/// A change notification. The payload is the affected object's path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    CollectionCreated(String),
    CollectionDeleted(String),
    CollectionChanged(String),
    ItemCreated(String),
    ItemDeleted(String),
    ItemChanged(String),
}

impl Signal {
    /// Interface the signal belongs to.
    pub fn interface(&self) -> &'static str {
        match self {
            Signal::CollectionCreated(_)
            | Signal::CollectionDeleted(_)
            | Signal::CollectionChanged(_) => SERVICE_INTERFACE,
            Signal::ItemCreated(_) | Signal::ItemDeleted(_) | Signal::ItemChanged(_) => {
                COLLECTION_INTERFACE
            }
        }
    }

    /// Signal member name.
    pub fn member(&self) -> &'static str {
        match self {
            Signal::CollectionCreated(_) => "CollectionCreated",
            Signal::CollectionDeleted(_) => "CollectionDeleted",
            Signal::CollectionChanged(_) => "CollectionChanged",
            Signal::ItemCreated(_) => "ItemCreated",
            Signal::ItemDeleted(_) => "ItemDeleted",
            Signal::ItemChanged(_) => "ItemChanged",
        }
    }

    /// The object path carried by the signal.
    pub fn path(&self) -> &str {
        match self {
            Signal::CollectionCreated(p)
            | Signal::CollectionDeleted(p)
            | Signal::CollectionChanged(p)
            | Signal::ItemCreated(p)
            | Signal::ItemDeleted(p)
            | Signal::ItemChanged(p) => p,
        }
    }
}

/// Object registration and signal emission.
#[async_trait]
pub trait Bus: Send + Sync {
    /// Make `object` reachable at `path`.
    async fn export(&self, service: &Service, path: &str, object: &Object) -> Result<()>;

    /// Remove whatever `object` registered at `path`.
    async fn unexport(&self, path: &str, object: &Object) -> Result<()>;

    /// Emit `signal` from the object at `emitter`.
    async fn emit(&self, emitter: &str, signal: &Signal) -> Result<()>;
}

/// One recorded bus call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Exported { path: String, object: Object },
    Unexported { path: String, object: Object },
    Signal { emitter: String, signal: Signal },
}

/// A `Bus` that only remembers what it was asked to do.
#[derive(Debug, Default)]
pub struct MemoryBus {
    events: Mutex<Vec<Event>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self) -> MutexGuard<'_, Vec<Event>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every call so far, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.log().clone()
    }

    /// Emitted signals as `(emitter, signal)` pairs.
    pub fn signals(&self) -> Vec<(String, Signal)> {
        self.log()
            .iter()
            .filter_map(|event| match event {
                Event::Signal { emitter, signal } => Some((emitter.clone(), signal.clone())),
                _ => None,
            })
            .collect()
    }

    /// Paths currently exported, in export order.
    pub fn exported(&self) -> Vec<String> {
        let mut live: Vec<String> = Vec::new();
        for event in self.log().iter() {
            match event {
                Event::Exported { path, .. } => live.push(path.clone()),
                Event::Unexported { path, .. } => {
                    if let Some(pos) = live.iter().position(|p| p == path) {
                        live.remove(pos);
                    }
                }
                Event::Signal { .. } => {}
            }
        }
        live
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.log().clear();
    }
}

#[async_trait]
impl Bus for MemoryBus {
    async fn export(&self, _service: &Service, path: &str, object: &Object) -> Result<()> {
        self.log().push(Event::Exported {
            path: path.to_string(),
            object: object.clone(),
        });
        Ok(())
    }

    async fn unexport(&self, path: &str, object: &Object) -> Result<()> {
        self.log().push(Event::Unexported {
            path: path.to_string(),
            object: object.clone(),
        });
        Ok(())
    }

    async fn emit(&self, emitter: &str, signal: &Signal) -> Result<()> {
        self.log().push(Event::Signal {
            emitter: emitter.to_string(),
            signal: signal.clone(),
        });
        Ok(())
    }
}
