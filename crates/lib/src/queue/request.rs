//! The handle a unit's body works through.

use std::fmt;
use std::sync::{Arc, Weak};

use handle_trait::Handle;
use serde::{Deserialize, Serialize};

use super::{QueueError, QueueInner};
use crate::Result;
use crate::backend::{Directory, Modification, Scope};
use crate::clock::Clock;
use crate::dn::Dn;
use crate::entry::Entry;
use crate::filter::Filter;

/// Identifier of a submitted unit, unique per queue and increasing in
/// submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub(crate) u64);

impl RequestId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a unit is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    /// Read-only; runs without a storage transaction.
    Operation,
    /// Runs inside a storage transaction that commits when the body succeeds
    /// and rolls back when it fails.
    Transaction,
}

/// Handle to the active unit, passed to its body.
///
/// All storage access of a unit goes through its `Request`. Writes are only
/// accepted when the unit is a [`RequestKind::Transaction`]. Once the unit has
/// completed, every call through a retained handle fails with
/// [`QueueError::Inactive`].
#[derive(Clone, Handle)]
pub struct Request {
    inner: Arc<RequestInner>,
}

struct RequestInner {
    id: RequestId,
    kind: RequestKind,
    directory: Directory,
    clock: Arc<dyn Clock>,
    queue: Weak<QueueInner>,
}

impl Request {
    pub(crate) fn new(
        id: RequestId,
        kind: RequestKind,
        directory: Directory,
        clock: Arc<dyn Clock>,
        queue: Weak<QueueInner>,
    ) -> Self {
        Self {
            inner: Arc::new(RequestInner {
                id,
                kind,
                directory,
                clock,
                queue,
            }),
        }
    }

    pub fn id(&self) -> RequestId {
        self.inner.id
    }

    pub fn kind(&self) -> RequestKind {
        self.inner.kind
    }

    pub fn is_transaction(&self) -> bool {
        self.inner.kind == RequestKind::Transaction
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// Whether this request was admitted by the queue `inner`.
    pub(crate) fn belongs_to(&self, inner: &Arc<QueueInner>) -> bool {
        std::ptr::eq(self.inner.queue.as_ptr(), Arc::as_ptr(inner))
    }

    /// Whether this unit is still the one the queue has admitted.
    pub fn is_active(&self) -> bool {
        self.inner
            .queue
            .upgrade()
            .is_some_and(|queue| queue.is_active(self.id()))
    }

    fn require_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(QueueError::Inactive { id: self.id() }.into())
        }
    }

    fn require_write(&self) -> Result<()> {
        self.require_active()?;
        if self.is_transaction() {
            Ok(())
        } else {
            Err(QueueError::ReadOnly { id: self.id() }.into())
        }
    }

    pub async fn add(&self, entry: Entry) -> Result<()> {
        self.require_write()?;
        self.inner.directory.add(entry).await
    }

    pub async fn modify(&self, dn: &Dn, mods: Vec<Modification>) -> Result<()> {
        self.require_write()?;
        self.inner.directory.modify(dn, mods).await
    }

    pub async fn delete(&self, dn: &Dn) -> Result<()> {
        self.require_write()?;
        self.inner.directory.delete(dn).await
    }

    pub async fn search(
        &self,
        base: &Dn,
        scope: Scope,
        filter: &Filter,
        attrs: &[&str],
    ) -> Result<Vec<Entry>> {
        self.require_active()?;
        self.inner.directory.search(base, scope, filter, attrs).await
    }

    /// Fetch one entry by address, `None` if it does not exist.
    pub async fn get(&self, dn: &Dn, attrs: &[&str]) -> Result<Option<Entry>> {
        self.require_active()?;
        self.inner.directory.get(dn, attrs).await
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .finish()
    }
}
