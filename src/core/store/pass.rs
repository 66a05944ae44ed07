//! Pass-compatible on-disk store.
//!
//! Everything lives under `<root>/secret_service/`:
//!
//! ```text
//! secret_service/
//! ├── .aliases               {alias: collection id}
//! └── <cid>/
//!     ├── .properties        collection properties
//!     ├── <iid>.gpg          encrypted password
//!     └── <iid>.properties   item properties
//! ```
//!
//! Passwords are encrypted for the recipients of the nearest `.gpg-id`,
//! so `pass show secret_service/<cid>/<iid>` decrypts them too.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};
use zeroize::Zeroizing;

use super::{merge, unique_identifier, AliasTable, Store};
use crate::core::cipher::Cipher;
use crate::core::constants::{
    ALIASES_FILE, GPG_ID_FILE, PASSWORD_SUFFIX, PROPERTIES_FILE, STORE_PREFIX,
};
use crate::core::types::{CollectionId, ItemId, PropertyMap};
use crate::error::{Result, StoreError};

/// Store backed by a `pass` password store directory.
pub struct PassStore {
    root: PathBuf,
    base: PathBuf,
    cipher: Box<dyn Cipher>,
}

impl PassStore {
    /// Open the store rooted at `root`, creating `secret_service/` if needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Write` if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>, cipher: impl Cipher + 'static) -> Result<Self> {
        let root = root.into();
        let base = root.join(STORE_PREFIX);
        fs::create_dir_all(&base).map_err(|source| StoreError::Write {
            path: base.display().to_string(),
            source,
        })?;
        debug!(root = %root.display(), cipher = cipher.name(), "opened pass store");
        Ok(Self {
            root,
            base,
            cipher: Box::new(cipher),
        })
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.base.join(collection)
    }

    fn password_file(&self, collection: &str, id: &str) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{}{}", id, PASSWORD_SUFFIX))
    }

    fn item_properties_file(&self, collection: &str, id: &str) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{}{}", id, PROPERTIES_FILE))
    }

    /// Recipients from the nearest `.gpg-id`, searching upwards from `dir`
    /// to the store root.
    fn recipients(&self, dir: &Path) -> Result<Vec<String>> {
        let mut current = Some(dir);
        while let Some(dir) = current {
            let file = dir.join(GPG_ID_FILE);
            if file.is_file() {
                let content = fs::read_to_string(&file).map_err(|source| StoreError::Read {
                    path: file.display().to_string(),
                    source,
                })?;
                let recipients: Vec<String> = content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(str::to_string)
                    .collect();
                trace!(file = %file.display(), count = recipients.len(), "found gpg ids");
                return Ok(recipients);
            }
            if dir == self.root {
                break;
            }
            current = dir.parent();
        }
        Err(StoreError::NoGpgId {
            file: GPG_ID_FILE,
            path: dir.display().to_string(),
        }
        .into())
    }

    fn write_password(&self, collection: &str, id: &str, password: &str) -> Result<()> {
        let dir = self.collection_dir(collection);
        if !dir.is_dir() {
            return Err(StoreError::NotFound(collection.to_string()).into());
        }
        let recipients = self.recipients(&dir)?;
        let ciphertext = self.cipher.encrypt(password, &recipients)?;
        write_atomic(&self.password_file(collection, id), &ciphertext)
    }
}

/// Names of the non-hidden entries of `dir` accepted by `select`.
fn list_dir(dir: &Path, select: impl Fn(&fs::DirEntry, &str) -> Option<String>) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|source| StoreError::Read {
        path: dir.display().to_string(),
        source,
    })?;

    let mut names = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if let Some(name) = select(&entry, &name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Read a JSON property map; anything unreadable counts as empty.
fn read_map<T>(path: &Path) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    match fs::read(path) {
        Ok(bytes) => match serde_json::from_slice::<Option<T>>(&bytes) {
            Ok(map) => map.unwrap_or_default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring malformed metadata");
                T::default()
            }
        },
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no metadata file");
            T::default()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable metadata");
            T::default()
        }
    }
}

fn write_map<T: serde::Serialize>(path: &Path, map: &T) -> Result<()> {
    let json = serde_json::to_vec(map).map_err(StoreError::from)?;
    write_atomic(path, &json)
}

/// Write `contents` to a hidden sibling and rename it over `path`.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let write_err = |source| StoreError::Write {
        path: path.display().to_string(),
        source,
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    let mut options = fs::OpenOptions::new();
    options.create(true).truncate(true).write(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let result = (|| {
        let mut file = options.open(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(e).into());
    }
    Ok(())
}

fn remove_file(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            StoreError::NotFound(path.display().to_string())
        } else {
            StoreError::Write {
                path: path.display().to_string(),
                source,
            }
        }
        .into()
    })
}

impl Store for PassStore {
    fn list_collections(&self) -> Result<Vec<CollectionId>> {
        list_dir(&self.base, |entry, name| {
            entry
                .file_type()
                .ok()
                .filter(|t| t.is_dir())
                .map(|_| name.to_string())
        })
    }

    fn create_collection(&self, properties: &PropertyMap) -> Result<CollectionId> {
        let id = unique_identifier(|id| self.collection_dir(id).exists())?;
        let dir = self.collection_dir(&id);
        fs::create_dir(&dir).map_err(|source| StoreError::Write {
            path: dir.display().to_string(),
            source,
        })?;
        write_map(&dir.join(PROPERTIES_FILE), properties)?;
        debug!(collection = %id, "created collection directory");
        Ok(id)
    }

    fn delete_collection(&self, id: &str) -> Result<()> {
        let dir = self.collection_dir(id);
        fs::remove_dir_all(&dir).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                StoreError::NotFound(id.to_string())
            } else {
                StoreError::Write {
                    path: dir.display().to_string(),
                    source,
                }
            }
        })?;
        debug!(collection = %id, "removed collection directory");
        Ok(())
    }

    fn collection_properties(&self, id: &str) -> Result<PropertyMap> {
        Ok(read_map(&self.collection_dir(id).join(PROPERTIES_FILE)))
    }

    fn update_collection_properties(
        &self,
        id: &str,
        partial: &PropertyMap,
    ) -> Result<PropertyMap> {
        let file = self.collection_dir(id).join(PROPERTIES_FILE);
        let merged = merge(read_map(&file), partial);
        write_map(&file, &merged)?;
        Ok(merged)
    }

    fn list_items(&self, collection: &str) -> Result<Vec<ItemId>> {
        list_dir(&self.collection_dir(collection), |entry, name| {
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                return None;
            }
            name.strip_suffix(PASSWORD_SUFFIX)
                .filter(|stem| !stem.is_empty())
                .map(str::to_string)
        })
    }

    fn create_item(
        &self,
        collection: &str,
        password: &str,
        properties: &PropertyMap,
    ) -> Result<ItemId> {
        let id = unique_identifier(|id| {
            self.password_file(collection, id).exists()
                || self.item_properties_file(collection, id).exists()
        })?;
        self.write_password(collection, &id, password)?;
        write_map(&self.item_properties_file(collection, &id), properties)?;
        debug!(collection = %collection, item = %id, "stored item");
        Ok(id)
    }

    fn delete_item(&self, collection: &str, id: &str) -> Result<()> {
        remove_file(&self.password_file(collection, id))?;
        let properties = self.item_properties_file(collection, id);
        if let Err(e) = fs::remove_file(&properties) {
            if e.kind() != ErrorKind::NotFound {
                return Err(StoreError::Write {
                    path: properties.display().to_string(),
                    source: e,
                }
                .into());
            }
        }
        debug!(collection = %collection, item = %id, "removed item files");
        Ok(())
    }

    fn item_password(&self, collection: &str, id: &str) -> Result<Zeroizing<String>> {
        let file = self.password_file(collection, id);
        let ciphertext = fs::read(&file).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                StoreError::NotFound(format!("{}/{}", collection, id))
            } else {
                StoreError::Read {
                    path: file.display().to_string(),
                    source,
                }
            }
        })?;
        self.cipher.decrypt(&ciphertext)
    }

    fn set_item_password(&self, collection: &str, id: &str, password: &str) -> Result<()> {
        self.write_password(collection, id, password)
    }

    fn item_properties(&self, collection: &str, id: &str) -> Result<PropertyMap> {
        Ok(read_map(&self.item_properties_file(collection, id)))
    }

    fn update_item_properties(
        &self,
        collection: &str,
        id: &str,
        partial: &PropertyMap,
    ) -> Result<PropertyMap> {
        let file = self.item_properties_file(collection, id);
        let merged = merge(read_map(&file), partial);
        write_map(&file, &merged)?;
        Ok(merged)
    }

    fn aliases(&self) -> Result<AliasTable> {
        Ok(read_map(&self.base.join(ALIASES_FILE)))
    }

    fn save_aliases(&self, aliases: &AliasTable) -> Result<()> {
        write_map(&self.base.join(ALIASES_FILE), aliases)
    }
}
