use idcache::{Attrs, Clock, Domain, ErrorKind, UserRecord, identity::IdentityError};

use crate::helpers::*;

#[tokio::test]
async fn add_and_look_up_user() {
    let db = test_db().await;
    let domain = local();
    db.add_user(&domain, alice()).await.unwrap();

    let by_name = db.get_user_by_name(&domain, "alice").await.unwrap();
    assert_eq!(by_name.len(), 1);
    let user = &by_name[0];
    assert_eq!((user.uid, user.gid), (1000, 1000));
    assert_eq!(user.gecos.as_deref(), Some("Alice"));
    assert_eq!(user.home.as_deref(), Some("/home/alice"));
    assert_eq!(user.shell.as_deref(), Some("/bin/sh"));
    assert_eq!(user.dn, domain.user_dn("alice").unwrap());

    let by_id = db.get_user_by_id(&domain, 1000).await.unwrap();
    assert_eq!(by_id, by_name);

    assert!(db.get_user_by_name(&domain, "nobody").await.unwrap().is_empty());
    assert!(db.get_user_by_id(&domain, 4242).await.unwrap().is_empty());
}

#[tokio::test]
async fn users_are_scoped_to_their_domain() {
    let db = test_db().await;
    db.add_user(&local(), alice()).await.unwrap();
    assert!(db.get_user_by_name(&proxy(), "alice").await.unwrap().is_empty());

    // The same uid is free in another domain.
    db.add_user(&merged(), alice()).await.unwrap();
}

#[tokio::test]
async fn duplicate_name_and_uid_are_refused() {
    let db = test_db().await;
    let domain = local();
    db.add_user(&domain, alice()).await.unwrap();

    let err = db.add_user(&domain, alice()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let err = db
        .add_user(&domain, UserRecord::new("mallory", 1000, 1000))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    assert!(db.get_user_by_name(&domain, "mallory").await.unwrap().is_empty());
}

#[tokio::test]
async fn ids_outside_the_range_are_refused() {
    let domain = Domain::new("RANGED")
        .unwrap()
        .with_id_range(Some(1000), Some(1999));
    let (db, _) = test_db_with(vec![domain.clone()]).await;

    db.add_user(&domain, numbered(1000)).await.unwrap();
    db.add_user(&domain, numbered(1999)).await.unwrap();
    for uid in [999, 2000] {
        let err = db.add_user(&domain, numbered(uid)).await.unwrap_err();
        assert!(matches!(
            err,
            idcache::Error::Identity(IdentityError::IdOutOfRange { .. })
        ));
    }
}

fn numbered(uid: u32) -> UserRecord {
    UserRecord::new(format!("user{uid}"), uid, 1500)
}

#[tokio::test]
async fn set_user_attr_replaces_values() {
    let db = test_db().await;
    let domain = local();
    db.add_user(&domain, alice()).await.unwrap();

    let mut attrs = Attrs::new();
    attrs
        .add_string("loginShell", "/bin/zsh")
        .add_long("gidNumber", 2000);
    db.set_user_attr(&domain, "alice", attrs).await.unwrap();

    let user = db.get_user_by_name(&domain, "alice").await.unwrap().remove(0);
    assert_eq!(user.shell.as_deref(), Some("/bin/zsh"));
    assert_eq!(user.gid, 2000);
    assert_eq!(user.home.as_deref(), Some("/home/alice"));
}

#[tokio::test]
async fn set_user_attr_rejections() {
    let db = test_db().await;
    let domain = local();
    db.add_user(&domain, alice()).await.unwrap();
    db.add_user(&domain, bob()).await.unwrap();

    let err = db
        .set_user_attr(&domain, "alice", Attrs::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let mut rename = Attrs::new();
    rename.add_string("name", "eve");
    let err = db.set_user_attr(&domain, "alice", rename).await.unwrap_err();
    assert!(matches!(
        err,
        idcache::Error::Identity(IdentityError::ProtectedAttribute { .. })
    ));

    let mut steal = Attrs::new();
    steal.add_long("uidNumber", 1001);
    let err = db.set_user_attr(&domain, "alice", steal).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

    let mut shell = Attrs::new();
    shell.add_string("loginShell", "/bin/zsh");
    let err = db.set_user_attr(&domain, "nobody", shell).await.unwrap_err();
    assert!(err.is_not_found());

    let alice = db.get_user_by_name(&domain, "alice").await.unwrap().remove(0);
    assert_eq!(alice.uid, 1000);
}

#[tokio::test]
async fn timestamps_never_move_backwards() {
    let (db, clock) = test_db_with(vec![local()]).await;
    let domain = local();
    let created = clock.now_secs();
    db.add_user(&domain, alice()).await.unwrap();

    let user = db.get_user_by_name(&domain, "alice").await.unwrap().remove(0);
    assert_eq!(user.create_time, Some(created));
    assert_eq!(user.last_update, Some(created));

    let shell = |path: &str| {
        let mut attrs = Attrs::new();
        attrs.add_string("loginShell", path);
        attrs
    };

    clock.set(created - 3600);
    db.set_user_attr(&domain, "alice", shell("/bin/zsh")).await.unwrap();
    let user = db.get_user_by_name(&domain, "alice").await.unwrap().remove(0);
    assert_eq!(user.last_update, Some(created));

    clock.set(created + 60);
    db.set_user_attr(&domain, "alice", shell("/bin/bash")).await.unwrap();
    let user = db.get_user_by_name(&domain, "alice").await.unwrap().remove(0);
    assert_eq!(user.create_time, Some(created));
    assert_eq!(user.last_update, Some(created + 60));
}

#[tokio::test]
async fn get_user_attr_projects() {
    let db = test_db().await;
    let domain = local();
    db.add_user(&domain, alice().password("secret")).await.unwrap();

    // Ordinary lookups never carry the password.
    let user = db.get_user_by_name(&domain, "alice").await.unwrap().remove(0);
    assert_eq!(user.password, None);

    let entries = db
        .get_user_attr(&domain, "alice", &["userPassword", "uidNumber"])
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    let attrs = entries[0].attributes();
    assert_eq!(attrs.first_str("userPassword"), Some("secret"));
    assert_eq!(attrs.first_u32("uidNumber"), Some(1000));
    assert!(!attrs.contains("loginShell"));

    let all = db.get_user_attr(&domain, "alice", &[]).await.unwrap();
    assert!(all[0].attributes().contains("loginShell"));
}

#[tokio::test]
async fn delete_user_by_uid() {
    let db = test_db().await;
    let domain = local();
    db.add_user(&domain, alice()).await.unwrap();

    // Unknown uid is a no-op.
    db.delete_user_by_uid(&domain, 4242).await.unwrap();

    db.delete_user_by_uid(&domain, 1000).await.unwrap();
    assert!(db.get_user_by_id(&domain, 1000).await.unwrap().is_empty());
}

#[tokio::test]
async fn enumeration_honours_the_domain_setting() {
    let hidden = Domain::new("HIDDEN").unwrap().with_enumerate(false);
    let (db, _) = test_db_with(vec![local(), hidden.clone()]).await;

    for domain in [local(), hidden.clone()] {
        db.add_user(&domain, alice()).await.unwrap();
        db.add_user(&domain, bob()).await.unwrap();
    }

    let names: Vec<_> = db
        .enumerate_users(&local(), None)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.name)
        .collect();
    assert_eq!(names, vec!["alice", "bob"]);

    let narrowed = db
        .enumerate_users(&local(), Some(idcache::Filter::eq("loginShell", "/bin/bash")))
        .await
        .unwrap();
    assert_eq!(narrowed.len(), 1);
    assert_eq!(narrowed[0].name, "bob");

    assert!(db.enumerate_users(&hidden, None).await.unwrap().is_empty());
    // Direct lookups still work.
    assert_eq!(db.get_user_by_name(&hidden, "bob").await.unwrap().len(), 1);
}

#[tokio::test]
async fn unregistered_domains_are_refused() {
    let db = test_db().await;

    let stranger = Domain::new("STRANGER").unwrap();
    let err = db.get_user_by_name(&stranger, "alice").await.unwrap_err();
    assert!(matches!(
        err,
        idcache::Error::Identity(IdentityError::UnknownDomain { .. })
    ));

    // Same name, different settings.
    let impostor = local().with_mpg(true);
    let err = db.add_user(&impostor, alice()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    assert_eq!(db.domain("local").unwrap(), &local());
    assert!(db.domain("nowhere").is_err());
}
