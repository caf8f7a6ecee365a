use std::sync::Arc;

use idcache::{
    Domain, FixedClock, InMemory, MembershipMode, SysDb, UserRecord,
    backend::testing::FaultyBackend,
};

// ==========================
// DOMAINS
// ==========================

/// Native-membership domain "LOCAL".
pub fn local() -> Domain {
    Domain::new("LOCAL").expect("valid domain name")
}

/// Legacy-membership domain "PROXY".
pub fn proxy() -> Domain {
    Domain::new("PROXY")
        .expect("valid domain name")
        .with_membership(MembershipMode::Legacy)
}

/// Native domain "MERGED" where users double as private groups.
pub fn merged() -> Domain {
    Domain::new("MERGED")
        .expect("valid domain name")
        .with_mpg(true)
}

// ==========================
// CACHE FACTORIES
// ==========================

/// A cache over a fresh in-memory engine serving `domains`.
pub async fn test_db_with(domains: Vec<Domain>) -> (SysDb, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::default());
    let db = SysDb::with_backend(Arc::new(InMemory::new()), domains, clock.clone())
        .await
        .expect("Failed to open test cache");
    (db, clock)
}

/// A cache serving [`local`], [`proxy`] and [`merged`].
pub async fn test_db() -> SysDb {
    test_db_with(vec![local(), proxy(), merged()]).await.0
}

/// A cache over a fault-injecting engine, with the setup calls cleared.
pub async fn faulty_db() -> (SysDb, Arc<FaultyBackend>) {
    let faulty = Arc::new(FaultyBackend::new(Arc::new(InMemory::new())));
    let db = SysDb::with_backend(
        faulty.clone(),
        vec![local()],
        Arc::new(FixedClock::default()),
    )
    .await
    .expect("Failed to open test cache");
    faulty.clear_calls();
    (db, faulty)
}

// ==========================
// RECORDS
// ==========================

pub fn alice() -> UserRecord {
    UserRecord::new("alice", 1000, 1000)
        .gecos("Alice")
        .home("/home/alice")
        .shell("/bin/sh")
}

pub fn bob() -> UserRecord {
    UserRecord::new("bob", 1001, 1001).shell("/bin/bash")
}
