//! Alias bindings.
//!
//! An alias is a second export path for a collection. The service is the
//! only writer of the persisted alias table, which is keyed by collection
//! id so it survives a change of base path.

use tracing::debug;

use super::{AliasEntry, Service};
use crate::core::bus::Object;
use crate::core::path::is_valid_element;
use crate::core::store::AliasTable;
use crate::core::types::CollectionId;
use crate::error::{Error, Result};

/// Alias names become object path elements.
pub(super) fn validate_name(name: &str) -> Result<()> {
    if is_valid_element(name) {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "alias name {:?} must be non-empty and contain only [A-Za-z0-9_]",
            name
        )))
    }
}

impl Service {
    /// Apply a batch of bindings (`None` clears), persisting the table once
    /// if anything changed.
    pub(super) async fn set_aliases(
        &self,
        bindings: Vec<(String, Option<CollectionId>)>,
    ) -> Result<()> {
        let mut changed = false;
        for (name, target) in bindings {
            if self.rebind_alias(&name, target).await? {
                changed = true;
            }
        }
        if changed {
            self.save_aliases().await?;
        }
        Ok(())
    }

    /// Point `name` at `target`. Returns `false` if it already did.
    ///
    /// The previous binding's path is unexported before the new one is
    /// exported. Nothing is persisted here.
    pub(super) async fn rebind_alias(
        &self,
        name: &str,
        target: Option<CollectionId>,
    ) -> Result<bool> {
        let (previous, path) = {
            let mut state = self.state();
            let current = state.aliases.get(name).map(|alias| &alias.collection);
            if current == target.as_ref() {
                return Ok(false);
            }
            if let Some(id) = &target {
                let live = state
                    .collections
                    .get(id)
                    .is_some_and(|entry| !entry.deleting);
                if !live {
                    return Err(Error::NoSuchObject(self.inner.paths.collection(id)));
                }
            }

            let previous = state.aliases.remove(name);
            let path = target.as_ref().map(|id| {
                let path = self.inner.paths.alias(name);
                state.aliases.insert(
                    name.to_string(),
                    AliasEntry {
                        collection: id.clone(),
                        path: path.clone(),
                    },
                );
                path
            });
            (previous, path)
        };

        if let Some(previous) = previous {
            let object = Object::Alias {
                name: name.to_string(),
                collection: previous.collection,
            };
            self.unexport(&previous.path, &object).await;
        }
        if let (Some(path), Some(collection)) = (path, target) {
            debug!(alias = %name, collection = %collection, "bound alias");
            let object = Object::Alias {
                name: name.to_string(),
                collection,
            };
            self.export(&path, &object).await?;
        } else {
            debug!(alias = %name, "cleared alias");
        }
        Ok(true)
    }

    /// Write the current alias table to the store.
    pub(super) async fn save_aliases(&self) -> Result<()> {
        let table: AliasTable = self
            .state()
            .aliases
            .iter()
            .map(|(name, alias)| (name.clone(), alias.collection.clone()))
            .collect();
        self.blocking(move |store| store.save_aliases(&table)).await
    }

    /// Names of the aliases bound to collection `id`.
    pub(super) fn aliases_of(&self, id: &str) -> Vec<String> {
        self.state()
            .aliases
            .iter()
            .filter(|(_, alias)| alias.collection == id)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_names() {
        assert!(validate_name("default").is_ok());
        assert!(validate_name("login_2").is_ok());
        assert!(matches!(validate_name(""), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            validate_name("has/slash"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_name("dash-ed"),
            Err(Error::InvalidArgument(_))
        ));
    }
}
