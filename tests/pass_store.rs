//! The service over a pass directory: restarts, aliases on disk, layout.

mod support;

use std::fs;

use pass_secret_service::core::constants::{
    ALIASES_FILE, DEFAULT_ALIAS, GPG_ID_FILE, ROOT_PATH, STORE_PREFIX,
};
use pass_secret_service::core::store::AliasTable;
use pass_secret_service::error::{Error, StoreError};
use support::*;

fn read_aliases(dir: &PassDir) -> AliasTable {
    let file = dir.root().join(STORE_PREFIX).join(ALIASES_FILE);
    serde_json::from_slice(&fs::read(file).unwrap()).unwrap()
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = PassDir::new();

    let (item_path, collection_path, session) = {
        let (service, _) = dir.start().await;
        let work = service
            .create_collection(collection_properties("work"), "work")
            .await
            .unwrap();
        let (_, session) = service.open_session("plain", &[]).await.unwrap();
        let item = work
            .create_item(
                item_properties("mail", &[("user", "alice")]),
                &plain_secret(&session, "hunter2"),
                false,
            )
            .await
            .unwrap();
        service.unregister().await;
        (item.path().to_string(), work.path().to_string(), session)
    };

    let (service, _) = dir.start().await;
    assert_eq!(service.read_alias("work"), collection_path);
    assert_eq!(service.collections().len(), 2);

    let item = service.item(&item_path).unwrap();
    assert_eq!(item.label().unwrap(), "mail");
    assert_eq!(
        item.attributes().unwrap().get("user").map(String::as_str),
        Some("alice")
    );

    // sessions do not survive
    assert!(matches!(
        item.get_secret(&session).await,
        Err(Error::NoSession(_))
    ));
    let (_, session) = service.open_session("plain", &[]).await.unwrap();
    assert_eq!(item.get_secret(&session).await.unwrap().value, b"hunter2");
}

#[tokio::test]
async fn test_default_collection_created_once() {
    let dir = PassDir::new();
    let first = {
        let (service, _) = dir.start().await;
        service.read_alias(DEFAULT_ALIAS)
    };
    let (service, _) = dir.start().await;
    assert_eq!(service.read_alias(DEFAULT_ALIAS), first);
    assert_eq!(service.collections(), vec![first]);
}

#[tokio::test]
async fn test_dangling_alias_is_dropped() {
    let dir = PassDir::new();
    let default = {
        let (service, _) = dir.start().await;
        service.read_alias(DEFAULT_ALIAS)
    };

    let default_id = default.rsplit('/').next().unwrap().to_string();
    let mut aliases = read_aliases(&dir);
    aliases.insert("ghost".to_string(), "no_such_collection".to_string());
    aliases.insert("bad-name".to_string(), default_id);
    let file = dir.root().join(STORE_PREFIX).join(ALIASES_FILE);
    fs::write(&file, serde_json::to_vec(&aliases).unwrap()).unwrap();

    let (service, _) = dir.start().await;
    assert_eq!(service.read_alias("ghost"), ROOT_PATH);
    assert_eq!(service.read_alias(DEFAULT_ALIAS), default);
    let saved = read_aliases(&dir);
    assert!(!saved.contains_key("ghost"));
    assert!(!saved.contains_key("bad-name"));
    assert!(saved.contains_key(DEFAULT_ALIAS));
}

#[tokio::test]
async fn test_alias_file_tracks_changes() {
    let dir = PassDir::new();
    let (service, _) = dir.start().await;
    let work = service
        .create_collection(collection_properties("work"), "")
        .await
        .unwrap();

    service.set_alias("work", work.path()).await.unwrap();
    assert_eq!(read_aliases(&dir).get("work").map(String::as_str), Some(work.id()));

    work.delete().await.unwrap();
    assert!(!read_aliases(&dir).contains_key("work"));
    assert!(!dir.root().join(STORE_PREFIX).join(work.id()).exists());
}

#[tokio::test]
async fn test_collections_written_elsewhere_are_loaded() {
    let dir = PassDir::new();
    let base = dir.root().join(STORE_PREFIX);
    fs::create_dir_all(base.join("imported")).unwrap();
    fs::write(
        base.join("imported").join(".properties"),
        r#"{"org.freedesktop.Secret.Collection.Label":"from disk"}"#,
    )
    .unwrap();

    let (service, _) = dir.start().await;
    let imported = service.collection_by_id("imported").unwrap();
    assert_eq!(imported.label().unwrap(), "from disk");
    assert!(imported.items().unwrap().is_empty());
}

#[tokio::test]
async fn test_uninitialized_store_refuses_items() {
    let dir = PassDir::new();
    fs::remove_file(dir.root().join(GPG_ID_FILE)).unwrap();

    let (service, _) = dir.start().await;
    let default = service.collection(&service.read_alias(DEFAULT_ALIAS)).unwrap();
    let (_, session) = service.open_session("plain", &[]).await.unwrap();
    let result = default
        .create_item(
            item_properties("a", &[]),
            &plain_secret(&session, "x"),
            false,
        )
        .await;
    assert!(matches!(
        result,
        Err(Error::Store(StoreError::NoGpgId { .. }))
    ));
    assert!(default.items().unwrap().is_empty());
}

#[tokio::test]
async fn test_nested_gpg_id_wins() {
    let dir = PassDir::new();
    let (service, _) = dir.start().await;
    let default = service.collection(&service.read_alias(DEFAULT_ALIAS)).unwrap();
    let collection_dir = dir.root().join(STORE_PREFIX).join(default.id());
    fs::write(collection_dir.join(GPG_ID_FILE), "team@example.com\n").unwrap();

    let (_, session) = service.open_session("plain", &[]).await.unwrap();
    let item = default
        .create_item(
            item_properties("a", &[]),
            &plain_secret(&session, "x"),
            false,
        )
        .await
        .unwrap();

    let stored = fs::read_to_string(collection_dir.join(format!("{}.gpg", item.id()))).unwrap();
    assert!(stored.starts_with("team@example.com\n"));
}
