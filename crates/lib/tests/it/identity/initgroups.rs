use idcache::UserRecord;

use crate::helpers::*;

#[tokio::test]
async fn primary_group_comes_first() {
    let db = test_db().await;
    let domain = local();
    let domain_in = domain.clone();
    db.transaction(move |req| async move {
        let domain = domain_in;
        req.add_group(&domain, "staff", 5000).await?;
        req.add_group(&domain, "wheel", 10).await?;
        req.add_group(&domain, "audio", 63).await?;
        req.add_user(&domain, &UserRecord::new("alice", 1000, 5000))
            .await?;
        let alice = domain.user_dn("alice")?;
        for group in ["wheel", "staff", "audio"] {
            req.add_group_member(&domain, &alice, &domain.group_dn(group)?)
                .await?;
        }
        Ok(())
    })
    .await
    .unwrap();

    let initgroups = db
        .get_initgroups_for_user(&domain, "alice")
        .await
        .unwrap()
        .expect("alice exists");
    assert_eq!(initgroups.user.name, "alice");
    // staff is both primary and supplementary but listed once.
    assert_eq!(initgroups.gids(), vec![5000, 10, 63]);
}

#[tokio::test]
async fn missing_primary_group_is_skipped() {
    let db = test_db().await;
    let domain = local();
    db.add_user(&domain, alice()).await.unwrap();

    let initgroups = db
        .get_initgroups_for_user(&domain, "alice")
        .await
        .unwrap()
        .unwrap();
    assert!(initgroups.groups.is_empty());

    assert!(
        db.get_initgroups_for_user(&domain, "nobody")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn legacy_membership_is_by_name() {
    let db = test_db().await;
    let domain = proxy();
    db.legacy_store_user(&domain, alice()).await.unwrap();
    db.legacy_store_group(&domain, "alice", 1000, &[]).await.unwrap();
    db.legacy_store_group(&domain, "users", 100, &["bob", "alice"])
        .await
        .unwrap();
    db.legacy_store_group(&domain, "others", 200, &["bob"])
        .await
        .unwrap();

    let initgroups = db
        .get_initgroups_for_user(&domain, "alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(initgroups.gids(), vec![1000, 100]);
}
