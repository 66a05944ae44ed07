//! Collection operations: creation, labels, items, replace, deletion.

mod support;

use std::sync::Arc;

use pass_secret_service::core::bus::Signal;
use pass_secret_service::core::constants::{BASE_PATH, DEFAULT_ALIAS, ROOT_PATH};
use pass_secret_service::core::types::Attributes;
use pass_secret_service::core::store::Store;
use pass_secret_service::error::Error;
use pass_secret_service::{MemoryBus, Paths, Service};
use support::*;

// Creation

#[tokio::test]
async fn test_create_collection_with_alias() {
    let t = Test::new().await;
    let work = t
        .service
        .create_collection(collection_properties("work"), "work")
        .await
        .unwrap();

    assert_eq!(work.label().unwrap(), "work");
    assert!(work.items().unwrap().is_empty());
    assert_eq!(t.service.read_alias("work"), work.path());
    assert!(t.service.collections().contains(&work.path().to_string()));
    assert!(t
        .bus
        .exported()
        .contains(&format!("{}/aliases/work", BASE_PATH)));
}

#[tokio::test]
async fn test_create_collection_bad_alias_creates_nothing() {
    let t = Test::new().await;
    let before = t.service.collections();
    let result = t
        .service
        .create_collection(collection_properties("x"), "no/slash")
        .await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(t.service.collections(), before);
}

#[tokio::test]
async fn test_create_collection_can_steal_default() {
    let t = Test::new().await;
    let old = t.default_collection();
    let new = t
        .service
        .create_collection(collection_properties("new default"), DEFAULT_ALIAS)
        .await
        .unwrap();
    assert_eq!(t.service.read_alias(DEFAULT_ALIAS), new.path());
    assert_eq!(t.service.collections().len(), 2);
    assert!(t.service.collection(old.path()).is_ok());
}

// Labels

#[tokio::test]
async fn test_set_label_persists_and_signals() {
    let t = Test::new().await;
    let work = t.collection("work").await;
    let writes = t.store.writes();
    t.bus.clear();

    work.set_label("office").await.unwrap();
    assert_eq!(work.label().unwrap(), "office");
    assert_eq!(t.store.writes(), writes + 1);
    assert_eq!(
        t.bus.signals(),
        vec![(
            BASE_PATH.to_string(),
            Signal::CollectionChanged(work.path().to_string())
        )]
    );
}

#[tokio::test]
async fn test_set_same_label_is_a_no_op() {
    let t = Test::new().await;
    let work = t.collection("work").await;
    let writes = t.store.writes();
    t.bus.clear();

    work.set_label("work").await.unwrap();
    assert_eq!(t.store.writes(), writes);
    assert!(t.bus.signals().is_empty());
}

// Items

#[tokio::test]
async fn test_create_then_delete_item() {
    let t = Test::new().await;
    let work = t.collection("work").await;
    let item = t.item(&work, "mail", &[("service", "mail")], "pw").await;

    assert_eq!(work.items().unwrap(), vec![item.path().to_string()]);
    let query: Attributes = [("service".to_string(), "mail".to_string())].into();
    assert_eq!(work.search_items(&query).unwrap(), vec![item.path().to_string()]);

    item.delete().await.unwrap();
    assert!(work.items().unwrap().is_empty());
    assert!(work.search_items(&query).unwrap().is_empty());
    assert!(t.service.search_items(&query).0.is_empty());
    assert!(matches!(t.service.item(item.path()), Err(Error::NoSuchObject(_))));
}

#[tokio::test]
async fn test_item_paths_live_under_collection() {
    let t = Test::new().await;
    let work = t.collection("work").await;
    let item = t.item(&work, "a", &[], "pw").await;
    assert!(item.path().starts_with(&format!("{}/", work.path())));
    assert_eq!(item.collection_id(), work.id());
}

#[tokio::test]
async fn test_create_item_with_bad_session_writes_nothing() {
    let t = Test::new().await;
    let work = t.collection("work").await;
    let writes = t.store.writes();

    let secret = plain_secret(&format!("{}/session/session42", BASE_PATH), "pw");
    let result = work
        .create_item(item_properties("a", &[]), &secret, false)
        .await;
    assert!(matches!(result, Err(Error::NoSession(_))));
    assert_eq!(t.store.writes(), writes);
    assert!(work.items().unwrap().is_empty());
}

#[tokio::test]
async fn test_replace_updates_matching_item() {
    let t = Test::new().await;
    let work = t.collection("work").await;
    let original = t.item(&work, "old", &[("user", "alice")], "first").await;
    let session = t.plain_session().await;

    let replaced = work
        .create_item(
            item_properties("new", &[("user", "alice")]),
            &plain_secret(&session, "second"),
            true,
        )
        .await
        .unwrap();
    assert_eq!(replaced.path(), original.path());
    assert_eq!(work.items().unwrap().len(), 1);
    assert_eq!(replaced.label().unwrap(), "new");

    let secret = replaced.get_secret(&session).await.unwrap();
    assert_eq!(secret.value, b"second");
}

#[tokio::test]
async fn test_no_replace_always_adds() {
    let t = Test::new().await;
    let work = t.collection("work").await;
    let first = t.item(&work, "a", &[("user", "alice")], "1").await;
    let session = t.plain_session().await;

    let second = work
        .create_item(
            item_properties("a", &[("user", "alice")]),
            &plain_secret(&session, "2"),
            false,
        )
        .await
        .unwrap();
    assert_ne!(second.path(), first.path());
    assert_eq!(work.items().unwrap().len(), 2);
}

#[tokio::test]
async fn test_replace_without_match_creates() {
    let t = Test::new().await;
    let work = t.collection("work").await;
    t.item(&work, "a", &[("user", "alice")], "1").await;
    let session = t.plain_session().await;

    work.create_item(
        item_properties("b", &[("user", "bob")]),
        &plain_secret(&session, "2"),
        true,
    )
    .await
    .unwrap();
    assert_eq!(work.items().unwrap().len(), 2);
}

#[tokio::test]
async fn test_item_signals_come_from_every_collection_path() {
    let t = Test::new().await;
    let work = t
        .service
        .create_collection(collection_properties("work"), "work")
        .await
        .unwrap();
    t.bus.clear();

    let item = t.item(&work, "a", &[], "pw").await;
    let alias_path = format!("{}/aliases/work", BASE_PATH);
    let created: Vec<_> = t
        .bus
        .signals()
        .into_iter()
        .filter(|(_, signal)| *signal == Signal::ItemCreated(item.path().to_string()))
        .map(|(emitter, _)| emitter)
        .collect();
    assert_eq!(created.len(), 2);
    assert!(created.contains(&work.path().to_string()));
    assert!(created.contains(&alias_path));
}

// Deletion

#[tokio::test]
async fn test_delete_clears_aliases() {
    let t = Test::new().await;
    let work = t
        .service
        .create_collection(collection_properties("work"), "work")
        .await
        .unwrap();
    t.service.set_alias("job", work.path()).await.unwrap();
    let alias_writes = t.store.alias_writes();

    work.delete().await.unwrap();
    assert_eq!(t.service.read_alias("work"), ROOT_PATH);
    assert_eq!(t.service.read_alias("job"), ROOT_PATH);
    assert_eq!(t.store.alias_writes(), alias_writes + 1);
    assert!(!t.service.collections().contains(&work.path().to_string()));
}

#[tokio::test]
async fn test_delete_removes_items() {
    let t = Test::new().await;
    let work = t.collection("work").await;
    let a = t.item(&work, "a", &[("k", "v")], "1").await;
    let b = t.item(&work, "b", &[("k", "v")], "2").await;

    work.delete().await.unwrap();
    assert!(t.service.item(a.path()).is_err());
    assert!(t.service.item(b.path()).is_err());
    let exported = t.bus.exported();
    assert!(!exported.iter().any(|p| p.starts_with(work.path())));

    let deleted: Vec<_> = t
        .bus
        .signals()
        .into_iter()
        .filter(|(_, s)| matches!(s, Signal::ItemDeleted(_)))
        .collect();
    assert_eq!(deleted.len(), 2);
}

#[tokio::test]
async fn test_delete_twice() {
    let t = Test::new().await;
    let work = t.collection("work").await;
    work.delete().await.unwrap();
    assert!(matches!(work.delete().await, Err(Error::NoSuchObject(_))));
    assert!(matches!(work.label(), Err(Error::NoSuchObject(_))));
}

#[tokio::test]
async fn test_concurrent_deletes_succeed_once() {
    let t = Test::new().await;
    let work = t.collection("work").await;
    t.item(&work, "a", &[], "1").await;

    let other = t.service.collection(work.path()).unwrap();
    let (first, second) = tokio::join!(work.delete(), other.delete());
    assert!(first.is_ok() != second.is_ok());
}

#[tokio::test]
async fn test_item_created_during_delete_is_discarded() {
    let store = Arc::new(Gated::default());
    let bus = Arc::new(MemoryBus::new());
    let service = Service::init(store.clone(), bus.clone(), Paths::default())
        .await
        .unwrap();
    let work = service
        .create_collection(collection_properties("work"), "work_alias")
        .await
        .unwrap();
    let (_, session) = service.open_session("plain", &[]).await.unwrap();

    // hold the item write until delete has claimed the collection
    let written = store.item_written.arm();
    let creating = {
        let work = work.clone();
        let secret = plain_secret(&session, "hunter2");
        tokio::spawn(async move {
            work.create_item(item_properties("mail", &[]), &secret, false)
                .await
        })
    };
    meet(&written).await;

    let saving = store.saving_aliases.arm();
    let deleting = {
        let work = work.clone();
        tokio::spawn(async move { work.delete().await })
    };
    meet(&saving).await;

    meet(&written).await;
    let created = creating.await.unwrap();
    assert!(matches!(created, Err(Error::NoSuchObject(_))));

    meet(&saving).await;
    deleting.await.unwrap().unwrap();

    assert!(!bus.exported().iter().any(|p| p.starts_with(work.path())));
    assert!(!store.inner.list_collections().unwrap().contains(&work.id().to_string()));
    assert_eq!(service.read_alias("work_alias"), ROOT_PATH);
}

#[tokio::test]
async fn test_deleting_default_leaves_it_unbound() {
    let t = Test::new().await;
    let default = t.default_collection();
    default.delete().await.unwrap();
    assert_eq!(t.service.read_alias(DEFAULT_ALIAS), ROOT_PATH);
    assert!(t.service.collections().is_empty());
}
