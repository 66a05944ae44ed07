//! D-Bus transport over zbus.
//!
//! `ZbusBus` implements the core's [`Bus`] by registering one interface
//! object per exported path on the connection's object server. The
//! interface types translate wire values to core types and back; they hold
//! ids, never state.

mod collection;
mod error;
mod item;
mod service;
mod session;

pub use collection::CollectionInterface;
pub use error::SecretError;
pub use item::ItemInterface;
pub use service::ServiceInterface;
pub use session::SessionInterface;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use zbus::names::BusName;
use zbus::zvariant::{ObjectPath, OwnedObjectPath, Value};
use zbus::Connection;

use crate::cli::Settings;
use crate::core::bus::{Bus, Object, Signal};
use crate::core::cipher::Gpg;
use crate::core::constants::ROOT_PATH;
use crate::core::path::Paths;
use crate::core::service::Service;
use crate::core::store::PassStore;
use crate::core::types::{Attributes, PropertyMap, Secret};
use crate::error::{Error, Result};

use self::error::transport;

/// The `(oayays)` secret struct.
pub type WireSecret = (OwnedObjectPath, Vec<u8>, Vec<u8>, String);

/// `Bus` backed by a zbus connection.
#[derive(Clone)]
pub struct ZbusBus {
    conn: Connection,
}

impl ZbusBus {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Bus for ZbusBus {
    async fn export(&self, service: &Service, path: &str, object: &Object) -> Result<()> {
        let server = self.conn.object_server();
        let added = match object {
            Object::Service => server.at(path, ServiceInterface::new(service.clone())).await,
            Object::Collection { id } | Object::Alias { collection: id, .. } => {
                server
                    .at(path, CollectionInterface::new(service.clone(), id.clone()))
                    .await
            }
            Object::Item { collection, id } => {
                server
                    .at(
                        path,
                        ItemInterface::new(service.clone(), collection.clone(), id.clone()),
                    )
                    .await
            }
            Object::Session { id } => {
                server
                    .at(path, SessionInterface::new(service.clone(), id.clone()))
                    .await
            }
        }
        .map_err(transport)?;

        if !added {
            debug!(path = %path, "path already exported");
        }
        Ok(())
    }

    async fn unexport(&self, path: &str, object: &Object) -> Result<()> {
        let server = self.conn.object_server();
        let removed = match object {
            Object::Service => server.remove::<ServiceInterface, _>(path).await,
            Object::Collection { .. } | Object::Alias { .. } => {
                server.remove::<CollectionInterface, _>(path).await
            }
            Object::Item { .. } => server.remove::<ItemInterface, _>(path).await,
            Object::Session { .. } => server.remove::<SessionInterface, _>(path).await,
        }
        .map_err(transport)?;

        if !removed {
            debug!(path = %path, "path was not exported");
        }
        Ok(())
    }

    async fn emit(&self, emitter: &str, signal: &Signal) -> Result<()> {
        let argument = ObjectPath::try_from(signal.path()).map_err(|e| transport(e.into()))?;
        self.conn
            .emit_signal(
                None::<BusName<'_>>,
                emitter,
                signal.interface(),
                signal.member(),
                &(argument,),
            )
            .await
            .map_err(transport)
    }
}

/// Run the daemon until SIGINT or SIGTERM.
///
/// Opens the password store, connects to the session bus, exports the
/// service, claims the bus name and on shutdown unexports everything.
///
/// # Errors
///
/// Returns an error if gpg is missing, the store cannot be opened, the
/// bus is unreachable or the name is taken.
pub async fn serve(settings: &Settings) -> Result<()> {
    let gpg = Gpg::new(settings.gpg.as_str());
    gpg.check()?;
    let store = PassStore::open(&settings.store_root, gpg)?;

    let conn = Connection::session().await.map_err(transport)?;
    let bus = Arc::new(ZbusBus::new(conn.clone()));
    let service = Service::init(
        Arc::new(store),
        bus,
        Paths::new(settings.base_path.as_str()),
    )
    .await?;

    conn.request_name(settings.bus_name.as_str())
        .await
        .map_err(transport)?;
    info!(name = %settings.bus_name, store = %settings.store_root.display(), "serving");

    shutdown_signal().await?;
    info!("exiting");
    service.unregister().await;
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())
        .map_err(|e| Error::Worker(format!("failed to install SIGTERM handler: {}", e)))?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.map_err(|e| Error::Worker(format!("failed to wait for SIGINT: {}", e)))
        }
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| Error::Worker(format!("failed to wait for Ctrl-C: {}", e)))
}

// Wire conversions

fn object_path(path: impl Into<String>) -> std::result::Result<OwnedObjectPath, SecretError> {
    Ok(OwnedObjectPath::try_from(path.into())?)
}

fn object_paths(paths: Vec<String>) -> std::result::Result<Vec<OwnedObjectPath>, SecretError> {
    paths.into_iter().map(object_path).collect()
}

fn prompt() -> std::result::Result<OwnedObjectPath, SecretError> {
    object_path(ROOT_PATH)
}

fn secret_to_wire(secret: Secret) -> std::result::Result<WireSecret, SecretError> {
    Ok((
        object_path(secret.session)?,
        secret.parameters,
        secret.value,
        secret.content_type,
    ))
}

fn secret_from_wire(secret: WireSecret) -> Secret {
    let (session, parameters, value, content_type) = secret;
    Secret {
        session: session.as_str().to_string(),
        parameters,
        value,
        content_type,
    }
}

fn attributes(map: HashMap<String, String>) -> Attributes {
    map.into_iter().collect()
}

/// Convert an `a{sv}` property map to the store's JSON form.
fn properties(map: HashMap<String, Value<'_>>) -> PropertyMap {
    map.into_iter()
        .map(|(key, value)| (key, json_value(value)))
        .collect()
}

fn json_value(value: Value<'_>) -> serde_json::Value {
    use serde_json::Value as Json;

    match value {
        Value::Str(s) => Json::from(s.as_str()),
        Value::Bool(b) => Json::from(b),
        Value::U8(n) => Json::from(n),
        Value::U16(n) => Json::from(n),
        Value::U32(n) => Json::from(n),
        Value::U64(n) => Json::from(n),
        Value::I16(n) => Json::from(n),
        Value::I32(n) => Json::from(n),
        Value::I64(n) => Json::from(n),
        Value::F64(n) => Json::from(n),
        Value::ObjectPath(p) => Json::from(p.as_str()),
        Value::Value(inner) => json_value(*inner),
        dict @ Value::Dict(_) => match HashMap::<String, String>::try_from(dict) {
            Ok(map) => Json::Object(map.into_iter().map(|(k, v)| (k, Json::from(v))).collect()),
            Err(e) => {
                debug!(error = %e, "dropping non-string dictionary property");
                Json::Null
            }
        },
        array @ Value::Array(_) => match Vec::<String>::try_from(array) {
            Ok(items) => Json::from(items),
            Err(e) => {
                debug!(error = %e, "dropping non-string array property");
                Json::Null
            }
        },
        other => {
            debug!(signature = %other.value_signature(), "dropping unsupported property");
            Json::Null
        }
    }
}
