use idcache::{ALLOCATE_ID, Domain, ErrorKind, UserRecord, identity::IdentityError};

use crate::helpers::*;

fn ranged(min: u32, max: u32) -> Domain {
    Domain::new("RANGED")
        .expect("valid domain name")
        .with_id_range(Some(min), Some(max))
}

#[tokio::test]
async fn ids_come_from_the_domain_range() {
    let domain = ranged(5000, 5002);
    let (db, _) = test_db_with(vec![domain.clone()]).await;

    db.add_group(&domain, "staff", ALLOCATE_ID).await.unwrap();
    assert_eq!(db.get_group_by_name(&domain, "staff").await.unwrap()[0].gid, 5000);

    db.add_user(&domain, UserRecord::new("alice", ALLOCATE_ID, 5000))
        .await
        .unwrap();
    let alice = db.get_user_by_name(&domain, "alice").await.unwrap().remove(0);
    assert_eq!((alice.uid, alice.gid), (5001, 5000));

    db.add_group(&domain, "wheel", ALLOCATE_ID).await.unwrap();
    assert_eq!(db.get_group_by_id(&domain, 5002).await.unwrap()[0].name, "wheel");
}

#[tokio::test]
async fn exhausted_range_is_refused() {
    let domain = ranged(5000, 5001);
    let (db, _) = test_db_with(vec![domain.clone()]).await;
    db.add_group(&domain, "a", ALLOCATE_ID).await.unwrap();
    db.add_group(&domain, "b", ALLOCATE_ID).await.unwrap();

    let err = db.add_group(&domain, "c", ALLOCATE_ID).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    assert!(matches!(
        err,
        idcache::Error::Identity(IdentityError::IdRangeExhausted { max: 5001, .. })
    ));
    assert!(db.get_group_by_name(&domain, "c").await.unwrap().is_empty());
}

#[tokio::test]
async fn ids_in_use_are_skipped() {
    let (db, _) = test_db_with(vec![local()]).await;
    let domain = local();
    db.add_user(&domain, UserRecord::new("root", 1, 2))
        .await
        .unwrap();
    db.add_group(&domain, "wheel", 3).await.unwrap();

    // 1 is a uid, 2 a primary gid and 3 a group.
    db.add_group(&domain, "staff", ALLOCATE_ID).await.unwrap();
    assert_eq!(db.get_group_by_name(&domain, "staff").await.unwrap()[0].gid, 4);
}

#[tokio::test]
async fn failed_transaction_returns_its_id() {
    let domain = ranged(5000, 5010);
    let (db, _) = test_db_with(vec![domain.clone()]).await;

    let inner = domain.clone();
    let err = db
        .transaction(move |req| async move {
            req.add_group(&inner, "staff", ALLOCATE_ID).await?;
            req.add_group(&inner, "staff", ALLOCATE_ID).await
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    db.add_group(&domain, "wheel", ALLOCATE_ID).await.unwrap();
    assert_eq!(db.get_group_by_name(&domain, "wheel").await.unwrap()[0].gid, 5000);
}

#[tokio::test]
async fn merged_users_get_matching_ids() {
    let db = test_db().await;
    let domain = merged();
    db.add_user(&domain, UserRecord::new("carol", ALLOCATE_ID, ALLOCATE_ID))
        .await
        .unwrap();

    let carol = db.get_user_by_name(&domain, "carol").await.unwrap().remove(0);
    assert_eq!(carol.uid, carol.gid);
    assert_eq!(db.get_group_by_id(&domain, carol.gid).await.unwrap()[0].name, "carol");
}

#[tokio::test]
async fn legacy_replacement_keeps_the_stored_id() {
    let db = test_db().await;
    let domain = proxy();
    db.legacy_store_group(&domain, "users", ALLOCATE_ID, &["alice"])
        .await
        .unwrap();
    let gid = db.get_group_by_name(&domain, "users").await.unwrap()[0].gid;
    assert_ne!(gid, ALLOCATE_ID);

    db.legacy_store_group(&domain, "users", ALLOCATE_ID, &["bob"])
        .await
        .unwrap();
    let users = db.get_group_by_name(&domain, "users").await.unwrap().remove(0);
    assert_eq!(users.gid, gid);
    assert_eq!(users.members.names(), ["bob"]);
}
