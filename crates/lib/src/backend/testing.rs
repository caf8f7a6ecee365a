//! Fault injection for exercising commit and rollback failure paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{DirectoryBackend, Modification, Scope, errors::BackendError};
use crate::Result;
use crate::dn::Dn;
use crate::entry::Entry;
use crate::filter::Filter;

/// Wraps another engine and fails selected calls on demand.
///
/// Every call is recorded by name in [`FaultyBackend::calls`], so tests can
/// assert on the exact sequence the queue issued.
pub struct FaultyBackend {
    inner: Arc<dyn DirectoryBackend>,
    fail_begin: AtomicBool,
    fail_commit: AtomicBool,
    fail_rollback: AtomicBool,
    fail_next_write: AtomicBool,
    calls: Mutex<Vec<&'static str>>,
}

impl FaultyBackend {
    pub fn new(inner: Arc<dyn DirectoryBackend>) -> Self {
        Self {
            inner,
            fail_begin: AtomicBool::new(false),
            fail_commit: AtomicBool::new(false),
            fail_rollback: AtomicBool::new(false),
            fail_next_write: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_begin(&self, fail: bool) {
        self.fail_begin.store(fail, Ordering::SeqCst);
    }

    pub fn fail_commit(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst);
    }

    pub fn fail_rollback(&self, fail: bool) {
        self.fail_rollback.store(fail, Ordering::SeqCst);
    }

    /// Fail the next add, modify or delete with `Unavailable`.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// Names of the calls issued so far.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn injected(call: &str) -> crate::Error {
        BackendError::Unavailable {
            reason: format!("injected {call} failure"),
        }
        .into()
    }

    fn check_write(&self, call: &'static str) -> Result<()> {
        self.record(call);
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(Self::injected(call));
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryBackend for FaultyBackend {
    async fn begin_transaction(&self) -> Result<()> {
        self.record("begin");
        if self.fail_begin.load(Ordering::SeqCst) {
            return Err(Self::injected("begin"));
        }
        self.inner.begin_transaction().await
    }

    async fn commit_transaction(&self) -> Result<()> {
        self.record("commit");
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(Self::injected("commit"));
        }
        self.inner.commit_transaction().await
    }

    async fn rollback_transaction(&self) -> Result<()> {
        self.record("rollback");
        if self.fail_rollback.load(Ordering::SeqCst) {
            // Still discard the writes so later units see a clean engine.
            let _ = self.inner.rollback_transaction().await;
            return Err(Self::injected("rollback"));
        }
        self.inner.rollback_transaction().await
    }

    async fn add(&self, entry: Entry) -> Result<()> {
        self.check_write("add")?;
        self.inner.add(entry).await
    }

    async fn modify(&self, dn: &Dn, mods: Vec<Modification>) -> Result<()> {
        self.check_write("modify")?;
        self.inner.modify(dn, mods).await
    }

    async fn delete(&self, dn: &Dn) -> Result<()> {
        self.check_write("delete")?;
        self.inner.delete(dn).await
    }

    async fn search(
        &self,
        base: &Dn,
        scope: Scope,
        filter: &Filter,
        attrs: &[&str],
    ) -> Result<Vec<Entry>> {
        self.record("search");
        self.inner.search(base, scope, filter, attrs).await
    }
}
