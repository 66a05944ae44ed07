//! pass-secret-service - a freedesktop Secret Service daemon backed by a
//! `pass` password store.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line flags, settings, terminal output
//! ├── core/             # Transport-independent engine
//! │   ├── service/      # Object registry, router, collections, items, aliases
//! │   ├── session       # Negotiated secret transport
//! │   ├── crypto/       # DH key agreement and AES-128-CBC secret codec
//! │   ├── store/        # Store trait, pass-compatible and in-memory backends
//! │   ├── cipher/       # Password encryption at rest (gpg)
//! │   ├── bus           # Export/signal seam, in-memory recorder
//! │   ├── path          # Object path grammar
//! │   └── config        # config.toml
//! └── dbus/             # zbus adapter (feature "dbus")
//! ```
//!
//! # Features
//!
//! - `plain` and `dh-ietf1024-sha256-aes128-cbc-pkcs7` sessions
//! - Collections, items, attribute search and aliases persisted in the
//!   password store next to regular `pass` entries
//! - Passwords encrypted with gpg for the store's `.gpg-id` recipients
//!
//! Locking is tracked but not enforced: a locked collection still hands
//! out its secrets.

pub mod cli;
pub mod core;
#[cfg(feature = "dbus")]
pub mod dbus;
pub mod error;

pub use crate::core::bus::{Bus, MemoryBus};
pub use crate::core::path::Paths;
pub use crate::core::service::{Collection, Item, Service};
pub use crate::core::store::{MemoryStore, PassStore, Store};
pub use crate::error::{Error, Result};
