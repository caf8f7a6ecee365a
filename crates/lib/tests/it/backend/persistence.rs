use std::sync::Arc;

use idcache::{
    Config, DirectoryBackend, DomainConfig, Entry, FixedClock, InMemory, MembershipMode, SysDb,
    dn,
};

use crate::helpers::*;

fn config(dir: &std::path::Path) -> Config {
    let mut proxy = DomainConfig::new("PROXY");
    proxy.membership = MembershipMode::Legacy;
    Config::new(dir)
        .with_domain(DomainConfig::new("LOCAL"))
        .with_domain(proxy)
}

#[tokio::test]
async fn committed_state_survives_reopen() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = config(dir.path());

    {
        let db = SysDb::open(&config).await.unwrap();
        let domain = db.domain("LOCAL").unwrap().clone();
        db.add_user(&domain, alice()).await.unwrap();
        db.add_group(&domain, "wheel", 10).await.unwrap();
        let (member, group) = (
            domain.user_dn("alice").unwrap(),
            domain.group_dn("wheel").unwrap(),
        );
        db.add_group_member(&domain, &member, &group).await.unwrap();

        let proxy = db.domain("PROXY").unwrap().clone();
        db.legacy_store_group(&proxy, "users", 100, &["alice", "bob"])
            .await
            .unwrap();
        db.shutdown().await;
    }
    assert!(config.db_file_path().exists());

    let db = SysDb::open(&config).await.unwrap();
    let domain = db.domain("LOCAL").unwrap().clone();
    let alice = db.get_user_by_name(&domain, "alice").await.unwrap().remove(0);
    assert_eq!(alice.home.as_deref(), Some("/home/alice"));
    assert_eq!(alice.member_of, vec![domain.group_dn("wheel").unwrap()]);

    let proxy = db.domain("PROXY").unwrap().clone();
    let users = db.get_group_by_name(&proxy, "users").await.unwrap().remove(0);
    assert_eq!(users.members.names(), vec!["alice", "bob"]);
}

#[tokio::test]
async fn failed_transactions_are_not_written() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = config(dir.path());

    {
        let db = SysDb::open(&config).await.unwrap();
        let domain = db.domain("LOCAL").unwrap().clone();
        db.add_user(&domain, alice()).await.unwrap();
        // Duplicate uid, rolled back.
        let mallory = idcache::UserRecord::new("mallory", 1000, 1000);
        assert!(db.add_user(&domain, mallory).await.is_err());
    }

    let db = SysDb::open(&config).await.unwrap();
    let domain = db.domain("LOCAL").unwrap().clone();
    assert_eq!(db.enumerate_users(&domain, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn save_and_load_round_trip() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("snapshot.json");

    let engine = Arc::new(InMemory::new());
    let db = SysDb::with_backend(
        engine.clone(),
        vec![local()],
        Arc::new(FixedClock::default()),
    )
    .await
    .unwrap();
    db.add_user(&local(), alice()).await.unwrap();
    engine.save_to_file(&path).await.unwrap();

    let loaded = InMemory::load_from_file(&path).await.unwrap();
    assert_eq!(loaded.all_dns().await, engine.all_dns().await);
    assert_eq!(loaded.path(), None);

    let user_dn = local().user_dn("alice").unwrap();
    let entry = loaded
        .search(&user_dn, idcache::Scope::Base, &idcache::Filter::everything(), &[])
        .await
        .unwrap()
        .remove(0);
    assert_eq!(entry.attributes().first_u32("uidNumber"), Some(1000));
}

#[tokio::test]
async fn open_transaction_is_not_saved() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("snapshot.json");

    let engine = InMemory::new();
    engine.begin_transaction().await.unwrap();
    engine.add(Entry::new(dn::sysdb_dn())).await.unwrap();
    assert_eq!(engine.entry_count().await, 1);
    engine.save_to_file(&path).await.unwrap();

    let loaded = InMemory::load_from_file(&path).await.unwrap();
    assert_eq!(loaded.entry_count().await, 0);

    // A missing file is an empty store.
    let missing = InMemory::load_from_file(dir.path().join("absent.json"))
        .await
        .unwrap();
    assert_eq!(missing.entry_count().await, 0);
}

#[tokio::test]
async fn corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("cache.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = InMemory::open(&path).await.unwrap_err();
    assert!(err.is_io_error());
}
