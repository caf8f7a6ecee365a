//! Shared handle to the storage engine.

use std::sync::Arc;

use handle_trait::Handle;
use tracing::trace;

use super::{DirectoryBackend, Modification, Scope};
use crate::Result;
use crate::dn::Dn;
use crate::entry::Entry;
use crate::filter::Filter;

/// Cheap-to-clone handle wrapping a [`DirectoryBackend`].
///
/// Every unit admitted by the request queue reaches the engine through a
/// `Directory`. The handle itself does no locking; exclusive use is guaranteed
/// by the queue only ever running one unit at a time.
#[derive(Clone, Handle)]
pub struct Directory {
    backend: Arc<dyn DirectoryBackend>,
}

impl Directory {
    pub fn new(backend: Arc<dyn DirectoryBackend>) -> Self {
        Self { backend }
    }

    pub async fn begin_transaction(&self) -> Result<()> {
        trace!("begin transaction");
        self.backend.begin_transaction().await
    }

    pub async fn commit_transaction(&self) -> Result<()> {
        trace!("commit transaction");
        self.backend.commit_transaction().await
    }

    pub async fn rollback_transaction(&self) -> Result<()> {
        trace!("rollback transaction");
        self.backend.rollback_transaction().await
    }

    pub async fn add(&self, entry: Entry) -> Result<()> {
        trace!(dn = %entry.dn(), "add");
        self.backend.add(entry).await
    }

    pub async fn modify(&self, dn: &Dn, mods: Vec<Modification>) -> Result<()> {
        trace!(%dn, count = mods.len(), "modify");
        self.backend.modify(dn, mods).await
    }

    pub async fn delete(&self, dn: &Dn) -> Result<()> {
        trace!(%dn, "delete");
        self.backend.delete(dn).await
    }

    pub async fn search(
        &self,
        base: &Dn,
        scope: Scope,
        filter: &Filter,
        attrs: &[&str],
    ) -> Result<Vec<Entry>> {
        trace!(%base, ?scope, %filter, "search");
        self.backend.search(base, scope, filter, attrs).await
    }

    /// Fetch a single entry by address, `None` if it does not exist.
    pub async fn get(&self, dn: &Dn, attrs: &[&str]) -> Result<Option<Entry>> {
        match self
            .backend
            .search(dn, Scope::Base, &Filter::everything(), attrs)
            .await
        {
            Ok(mut entries) => Ok(entries.pop()),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl std::fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory")
            .field("backend", &"<DirectoryBackend>")
            .finish()
    }
}
