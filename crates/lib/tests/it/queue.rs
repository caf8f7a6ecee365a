//! Request serializer behaviour observed through real units.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use idcache::{
    Directory, Entry, ErrorKind, FixedClock, InMemory, RequestQueue, RequestState, dn,
    queue::QueueError,
};

use crate::helpers::*;

fn queue() -> RequestQueue {
    RequestQueue::new(
        Directory::new(Arc::new(InMemory::new())),
        Arc::new(FixedClock::default()),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn only_one_unit_is_active() {
    let queue = queue();
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut submissions = Vec::new();
    for i in 0..20 {
        let (running, peak) = (running.clone(), peak.clone());
        let body = move |req: idcache::Request| async move {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            // Suspend inside the unit a few times.
            for _ in 0..3 {
                req.get(&dn::sysdb_dn(), &[]).await?;
                tokio::task::yield_now().await;
            }
            running.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        };
        submissions.push(if i % 2 == 0 {
            queue.submit_operation(body)
        } else {
            queue.submit_transaction(body)
        });
    }

    for submission in submissions {
        submission.await.expect("unit failed");
    }
    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert!(queue.is_idle());
}

#[tokio::test]
async fn units_are_admitted_in_submission_order() {
    let queue = queue();
    let order = Arc::new(Mutex::new(Vec::new()));

    let submissions: Vec<_> = (0..10)
        .map(|i| {
            let order = order.clone();
            queue.submit_operation(move |_| async move {
                order.lock().unwrap().push(i);
                Ok(())
            })
        })
        .collect();
    assert_eq!(queue.pending_len(), 9);

    for submission in submissions {
        submission.await.unwrap();
    }
    assert_eq!(*order.lock().unwrap(), (0..10).collect::<Vec<_>>());
}

#[tokio::test]
async fn failed_transaction_leaves_no_trace() {
    let db = test_db().await;
    let domain = local();

    let inner = domain.clone();
    let err = db
        .transaction(move |req| async move {
            req.add_user(&inner, &alice()).await?;
            req.add_group(&inner, "wheel", 10).await?;
            // Same gid again violates uniqueness.
            req.add_group(&inner, "admins", 10).await
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

    assert!(db.get_user_by_name(&domain, "alice").await.unwrap().is_empty());
    assert!(db.get_group_by_id(&domain, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn commit_failure_is_rolled_back() {
    let (db, faulty) = faulty_db().await;
    let domain = local();
    faulty.fail_commit(true);

    let err = db.add_user(&domain, alice()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CommitFailed);
    assert_eq!(faulty.calls().last(), Some(&"rollback"));

    faulty.fail_commit(false);
    assert!(db.get_user_by_name(&domain, "alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn rollback_failure_still_advances() {
    let (db, faulty) = faulty_db().await;
    let domain = local();
    faulty.fail_rollback(true);

    let err = db.add_group(&domain, "bad,name", 10).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RollbackFailed);
    match err {
        idcache::Error::Queue(QueueError::RollbackFailed { trigger, .. }) => {
            assert_eq!(trigger.kind(), ErrorKind::InvalidArgument);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    faulty.fail_rollback(false);
    db.add_group(&domain, "wheel", 10).await.unwrap();
    assert_eq!(db.get_group_by_id(&domain, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn begin_failure_skips_the_body() {
    let (db, faulty) = faulty_db().await;
    let domain = local();
    faulty.fail_begin(true);

    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();
    let err = db
        .transaction(move |_| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IoFailure);
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(faulty.calls(), vec!["begin"]);

    faulty.fail_begin(false);
    db.add_user(&domain, alice()).await.unwrap();
}

#[tokio::test]
async fn failed_write_rolls_back_earlier_writes() {
    let (db, faulty) = faulty_db().await;
    let domain = local();
    db.add_user(&domain, alice()).await.unwrap();
    db.add_group(&domain, "wheel", 10).await.unwrap();

    // The membership write fails after staff was added.
    let member = domain.user_dn("alice").unwrap();
    let group = domain.group_dn("wheel").unwrap();
    let inner = domain.clone();
    let err = db
        .transaction(move |req| {
            let faulty = faulty.clone();
            async move {
                req.add_group(&inner, "staff", 20).await?;
                faulty.fail_next_write();
                req.add_group_member(&inner, &member, &group).await
            }
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IoFailure);

    assert!(db.get_group_by_name(&domain, "staff").await.unwrap().is_empty());
    let wheel = db.get_group_by_name(&domain, "wheel").await.unwrap();
    assert!(wheel[0].members.is_empty());
}

#[tokio::test]
async fn nested_submissions_run_inline() {
    let db = test_db().await;
    let domain = local();

    let (outer_db, inner) = (db.clone(), domain.clone());
    let err = db
        .transaction(move |req| async move {
            req.add_user(&inner, &alice()).await?;
            // Queued normally, this would wait behind the running unit forever.
            let seen = outer_db.get_user_by_name(&inner, "alice").await?;
            assert_eq!(seen.len(), 1);
            outer_db.add_group(&inner, "wheel", 10).await?;

            let nested = outer_db.queue().submit_operation(|r| async move { Ok(r.id()) });
            assert_eq!(nested.id(), req.id());
            assert_eq!(nested.await?, req.id());

            Err::<(), _>(idcache::Error::Io(std::io::Error::other("abort")))
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IoFailure);

    // The nested writes belonged to the outer transaction and rolled back too.
    assert!(db.get_user_by_name(&domain, "alice").await.unwrap().is_empty());
    assert!(db.get_group_by_name(&domain, "wheel").await.unwrap().is_empty());
}

#[tokio::test]
async fn retained_request_cannot_reach_later_units() {
    let queue = queue();
    queue
        .submit_transaction(|req| async move { req.add(Entry::new(dn::sysdb_dn())).await })
        .await
        .unwrap();

    let stale = queue
        .submit_transaction(|req| async move { Ok(req) })
        .await
        .unwrap();
    assert!(!stale.is_active());

    let err = queue
        .submit_transaction(move |_| async move {
            stale.add(Entry::new(dn::domain_dn("X")?)).await?;
            Ok(())
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(matches!(
        err,
        idcache::Error::Queue(QueueError::Inactive { .. })
    ));

    let stale = queue
        .submit_operation(|req| async move { Ok(req) })
        .await
        .unwrap();
    let err = stale.get(&dn::sysdb_dn(), &[]).await.unwrap_err();
    assert!(matches!(
        err,
        idcache::Error::Queue(QueueError::Inactive { .. })
    ));

    let found = queue
        .submit_operation(|req| async move { req.get(&dn::domain_dn("X")?, &[]).await })
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn withdrawn_unit_never_runs() {
    let queue = queue();
    let ran = Arc::new(AtomicUsize::new(0));

    let first = queue.submit_operation(|_| async { Ok(()) });
    let counter = ran.clone();
    let second = queue.submit_operation(move |_| async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let third = queue.submit_operation(|_| async { Ok(3) });

    assert_eq!(queue.state(second.id()), Some(RequestState::Pending));
    queue.withdraw(second.id()).unwrap();
    assert_eq!(queue.state(second.id()), Some(RequestState::Completed));

    let err = queue.withdraw(first.id()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    first.await.unwrap();
    assert!(second.await.is_err());
    assert_eq!(third.await.unwrap(), 3);
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn panicking_body_releases_the_queue() {
    let queue = queue();
    queue
        .submit_transaction(|req| async move { req.add(Entry::new(dn::sysdb_dn())).await })
        .await
        .unwrap();

    let err = queue
        .submit_transaction(|req| async move {
            req.add(Entry::new(dn::domain_dn("LOCAL")?)).await?;
            if req.is_transaction() {
                panic!("body blew up");
            }
            Ok(())
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        idcache::Error::Queue(QueueError::Abandoned { .. })
    ));

    let found = queue
        .submit_operation(|req| async move { req.get(&dn::domain_dn("LOCAL")?, &[]).await })
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn dropped_submission_still_completes() {
    let queue = queue();
    drop(queue.submit_transaction(|req| async move { req.add(Entry::new(dn::sysdb_dn())).await }));

    let found = queue
        .submit_operation(|req| async move { req.get(&dn::sysdb_dn(), &[]).await })
        .await
        .unwrap();
    assert!(found.is_some());
}
