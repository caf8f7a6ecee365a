use idcache::Membership;

use crate::helpers::*;

#[tokio::test]
async fn add_member_maintains_back_references() {
    let db = test_db().await;
    let domain = local();
    db.add_user(&domain, alice()).await.unwrap();
    db.add_group(&domain, "wheel", 10).await.unwrap();
    let (member, group) = (
        domain.user_dn("alice").unwrap(),
        domain.group_dn("wheel").unwrap(),
    );

    db.add_group_member(&domain, &member, &group).await.unwrap();
    // Idempotent.
    db.add_group_member(&domain, &member, &group).await.unwrap();

    let wheel = db.get_group_by_name(&domain, "wheel").await.unwrap().remove(0);
    assert_eq!(wheel.members, Membership::Native(vec![member.clone()]));
    let alice = db.get_user_by_name(&domain, "alice").await.unwrap().remove(0);
    assert_eq!(alice.member_of, vec![group.clone()]);

    db.remove_group_member(&domain, &member, &group).await.unwrap();
    // Removing a non-member is a no-op.
    db.remove_group_member(&domain, &member, &group).await.unwrap();

    let wheel = db.get_group_by_name(&domain, "wheel").await.unwrap().remove(0);
    assert!(wheel.members.is_empty());
    let alice = db.get_user_by_name(&domain, "alice").await.unwrap().remove(0);
    assert!(alice.member_of.is_empty());
}

#[tokio::test]
async fn members_must_exist() {
    let db = test_db().await;
    let domain = local();
    db.add_group(&domain, "wheel", 10).await.unwrap();

    let ghost = domain.user_dn("ghost").unwrap();
    let wheel = domain.group_dn("wheel").unwrap();
    let err = db.add_group_member(&domain, &ghost, &wheel).await.unwrap_err();
    assert!(err.is_not_found());

    let nogroup = domain.group_dn("nogroup").unwrap();
    let err = db.add_group_member(&domain, &wheel, &nogroup).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn deleting_a_user_drops_it_from_groups() {
    let db = test_db().await;
    let domain = local();
    db.add_user(&domain, alice()).await.unwrap();
    db.add_user(&domain, bob()).await.unwrap();
    db.add_group(&domain, "wheel", 10).await.unwrap();
    let group = domain.group_dn("wheel").unwrap();
    for name in ["alice", "bob"] {
        let member = domain.user_dn(name).unwrap();
        db.add_group_member(&domain, &member, &group).await.unwrap();
    }

    db.delete_user_by_uid(&domain, 1000).await.unwrap();

    let wheel = db.get_group_by_name(&domain, "wheel").await.unwrap().remove(0);
    assert_eq!(
        wheel.members,
        Membership::Native(vec![domain.user_dn("bob").unwrap()])
    );
}

#[tokio::test]
async fn deleting_a_group_drops_every_reference() {
    let db = test_db().await;
    let domain = local();
    db.add_user(&domain, alice()).await.unwrap();
    db.add_group(&domain, "wheel", 10).await.unwrap();
    db.add_group(&domain, "staff", 20).await.unwrap();
    let alice_dn = domain.user_dn("alice").unwrap();
    let wheel = domain.group_dn("wheel").unwrap();
    let staff = domain.group_dn("staff").unwrap();

    // alice in staff, staff nested in wheel.
    db.add_group_member(&domain, &alice_dn, &staff).await.unwrap();
    db.add_group_member(&domain, &staff, &wheel).await.unwrap();

    db.delete_group_by_gid(&domain, 20).await.unwrap();

    let alice = db.get_user_by_name(&domain, "alice").await.unwrap().remove(0);
    assert!(alice.member_of.is_empty());
    let wheel = db.get_group_by_name(&domain, "wheel").await.unwrap().remove(0);
    assert!(wheel.members.is_empty());
}

#[tokio::test]
async fn membership_changes_bump_last_update() {
    let (db, clock) = test_db_with(vec![local()]).await;
    let domain = local();
    db.add_user(&domain, alice()).await.unwrap();
    db.add_group(&domain, "wheel", 10).await.unwrap();

    clock.advance(30);
    let member = domain.user_dn("alice").unwrap();
    let group = domain.group_dn("wheel").unwrap();
    db.add_group_member(&domain, &member, &group).await.unwrap();

    let wheel = db.get_group_by_name(&domain, "wheel").await.unwrap().remove(0);
    let alice = db.get_user_by_name(&domain, "alice").await.unwrap().remove(0);
    assert_eq!(wheel.last_update, Some(wheel.create_time.unwrap() + 30));
    assert_eq!(alice.last_update, Some(alice.create_time.unwrap() + 30));
}
