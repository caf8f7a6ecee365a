use idcache::{ErrorKind, UserRecord};

use crate::helpers::*;

#[tokio::test]
async fn add_and_look_up_group() {
    let db = test_db().await;
    let domain = local();
    db.add_group(&domain, "wheel", 10).await.unwrap();

    let by_id = db.get_group_by_id(&domain, 10).await.unwrap();
    assert_eq!(by_id.len(), 1);
    assert_eq!(by_id[0].name, "wheel");
    assert!(by_id[0].members.is_empty());
    assert_eq!(db.get_group_by_name(&domain, "wheel").await.unwrap(), by_id);

    assert!(db.get_group_by_id(&domain, 99999).await.unwrap().is_empty());
    assert!(db.get_group_by_name(&domain, "nogroup").await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_groups_are_refused() {
    let db = test_db().await;
    let domain = local();
    db.add_group(&domain, "wheel", 10).await.unwrap();

    let err = db.add_group(&domain, "wheel", 11).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let err = db.add_group(&domain, "admins", 10).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
}

#[tokio::test]
async fn set_group_gid() {
    let db = test_db().await;
    let domain = local();
    db.add_group(&domain, "wheel", 10).await.unwrap();
    db.add_group(&domain, "staff", 20).await.unwrap();

    db.set_group_gid(&domain, "wheel", 11).await.unwrap();
    assert!(db.get_group_by_id(&domain, 10).await.unwrap().is_empty());
    assert_eq!(db.get_group_by_id(&domain, 11).await.unwrap()[0].name, "wheel");

    // Re-setting its own gid is fine, taking another group's is not.
    db.set_group_gid(&domain, "wheel", 11).await.unwrap();
    let err = db.set_group_gid(&domain, "wheel", 20).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

    let err = db.set_group_gid(&domain, "nogroup", 30).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn delete_group_by_gid() {
    let db = test_db().await;
    let domain = local();
    db.add_group(&domain, "wheel", 10).await.unwrap();

    db.delete_group_by_gid(&domain, 4242).await.unwrap();
    db.delete_group_by_gid(&domain, 10).await.unwrap();
    assert!(db.get_group_by_name(&domain, "wheel").await.unwrap().is_empty());
}

#[tokio::test]
async fn enumerate_groups() {
    let db = test_db().await;
    let domain = local();
    db.add_group(&domain, "wheel", 10).await.unwrap();
    db.add_group(&domain, "staff", 20).await.unwrap();

    let gids: Vec<_> = db
        .enumerate_groups(&domain, None)
        .await
        .unwrap()
        .iter()
        .map(|g| g.gid)
        .collect();
    assert_eq!(gids, vec![10, 20]);

    let narrowed = db
        .enumerate_groups(&domain, Some(idcache::Filter::wildcard("name", "st*")))
        .await
        .unwrap();
    assert_eq!(narrowed.len(), 1);
    assert_eq!(narrowed[0].name, "staff");
}

#[tokio::test]
async fn users_double_as_groups_in_merged_domains() {
    let db = test_db().await;
    let domain = merged();
    db.add_user(&domain, UserRecord::new("carol", 3000, 3000))
        .await
        .unwrap();
    db.add_group(&domain, "project", 4000).await.unwrap();

    let private = db.get_group_by_name(&domain, "carol").await.unwrap();
    assert_eq!(private.len(), 1);
    assert_eq!(private[0].gid, 3000);
    assert_eq!(private[0].dn, domain.user_dn("carol").unwrap());

    assert_eq!(db.get_group_by_id(&domain, 3000).await.unwrap().len(), 1);
    assert_eq!(db.enumerate_groups(&domain, None).await.unwrap().len(), 2);

    // Not so in a regular domain.
    let regular = local();
    db.add_user(&regular, UserRecord::new("carol", 3000, 3000))
        .await
        .unwrap();
    assert!(db.get_group_by_name(&regular, "carol").await.unwrap().is_empty());
}

#[tokio::test]
async fn merged_gid_lookup_returns_user_and_group() {
    let db = test_db().await;
    let domain = merged();
    db.add_user(&domain, UserRecord::new("alice", 1000, 10))
        .await
        .unwrap();
    // Only groups are checked for a clashing gid.
    db.add_group(&domain, "wheel", 10).await.unwrap();

    let mut names: Vec<String> = db
        .get_group_by_id(&domain, 10)
        .await
        .unwrap()
        .into_iter()
        .map(|group| group.name)
        .collect();
    names.sort();
    assert_eq!(names, ["alice", "wheel"]);
}

#[tokio::test]
async fn delete_entry_refuses_non_leaves() {
    let db = test_db().await;
    let domain = local();
    db.add_group(&domain, "wheel", 10).await.unwrap();

    let err = db.delete_entry(domain.group_base()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

    db.delete_entry(&domain.group_dn("wheel").unwrap()).await.unwrap();
    let err = db
        .delete_entry(&domain.group_dn("wheel").unwrap())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
