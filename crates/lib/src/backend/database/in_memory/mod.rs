//! In-memory storage engine
//!
//! This module provides the reference implementation of
//! [`DirectoryBackend`]: a hierarchical entry tree held in memory, with
//! optional JSON persistence of every committed transaction.

mod persistence;
mod storage;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::Result;
use crate::backend::errors::BackendError;
use crate::backend::{DirectoryBackend, Modification, Scope};
use crate::dn::Dn;
use crate::entry::Entry;
use crate::filter::Filter;
use storage::Tree;

#[derive(Debug, Default)]
struct State {
    tree: Tree,
    /// Tree as of `begin_transaction`; `Some` while a transaction is open.
    snapshot: Option<Tree>,
}

impl State {
    fn require_transaction(&self) -> Result<()> {
        if self.snapshot.is_none() {
            return Err(BackendError::NoActiveTransaction.into());
        }
        Ok(())
    }
}

/// A hierarchical store kept in memory.
///
/// Writes are only accepted inside a transaction. When the engine was opened
/// with a file path, `commit_transaction` writes the committed tree to that
/// file before the commit is reported; if the write fails the transaction
/// stays open so the caller can roll it back.
///
/// Every call suspends the caller at least once before completing, like a
/// real engine would.
#[derive(Debug, Default)]
pub struct InMemory {
    state: Mutex<State>,
    path: Option<PathBuf>,
}

impl InMemory {
    /// Creates a new, empty engine without persistence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the store backed by `path`, loading it if the file exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tree = persistence::load(&path).await?;
        debug!(path = %path.display(), entries = tree.entries.len(), "Opened store");
        Ok(Self {
            state: Mutex::new(State {
                tree,
                snapshot: None,
            }),
            path: Some(path),
        })
    }

    /// File committed transactions are written to, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of stored entries, including uncommitted writes.
    pub async fn entry_count(&self) -> usize {
        self.state.lock().await.tree.entries.len()
    }

    /// Addresses of every stored entry in creation order.
    pub async fn all_dns(&self) -> Vec<Dn> {
        let state = self.state.lock().await;
        state
            .tree
            .ordered()
            .into_iter()
            .map(|entry| entry.dn().clone())
            .collect()
    }

    /// Whether a transaction is currently open.
    pub async fn in_transaction(&self) -> bool {
        self.state.lock().await.snapshot.is_some()
    }

    /// Write the committed state to `path` as JSON.
    ///
    /// Uncommitted writes of an open transaction are not included.
    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = {
            let state = self.state.lock().await;
            persistence::to_json(state.snapshot.as_ref().unwrap_or(&state.tree))?
        };
        persistence::write_atomic(path.as_ref(), &json).await
    }

    /// Load a store from a JSON file without binding it to that file.
    ///
    /// If the file does not exist, a new, empty engine is returned.
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let tree = persistence::load(path.as_ref()).await?;
        Ok(Self {
            state: Mutex::new(State {
                tree,
                snapshot: None,
            }),
            path: None,
        })
    }
}

#[async_trait]
impl DirectoryBackend for InMemory {
    async fn begin_transaction(&self) -> Result<()> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().await;
        if state.snapshot.is_some() {
            return Err(BackendError::TransactionActive.into());
        }
        state.snapshot = Some(state.tree.clone());
        Ok(())
    }

    async fn commit_transaction(&self) -> Result<()> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().await;
        state.require_transaction()?;
        if let Some(path) = &self.path {
            let json = persistence::to_json(&state.tree)?;
            if let Err(err) = persistence::write_atomic(path, &json).await {
                warn!(path = %path.display(), error = %err, "Failed to persist commit");
                return Err(err);
            }
        }
        state.snapshot = None;
        Ok(())
    }

    async fn rollback_transaction(&self) -> Result<()> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().await;
        match state.snapshot.take() {
            Some(snapshot) => {
                state.tree = snapshot;
                Ok(())
            }
            None => Err(BackendError::NoActiveTransaction.into()),
        }
    }

    async fn add(&self, entry: Entry) -> Result<()> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().await;
        state.require_transaction()?;
        storage::add(&mut state.tree, entry)
    }

    async fn modify(&self, dn: &Dn, mods: Vec<Modification>) -> Result<()> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().await;
        state.require_transaction()?;
        storage::modify(&mut state.tree, dn, mods)
    }

    async fn delete(&self, dn: &Dn) -> Result<()> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().await;
        state.require_transaction()?;
        storage::delete(&mut state.tree, dn)
    }

    async fn search(
        &self,
        base: &Dn,
        scope: Scope,
        filter: &Filter,
        attrs: &[&str],
    ) -> Result<Vec<Entry>> {
        tokio::task::yield_now().await;
        let state = self.state.lock().await;
        storage::search(&state.tree, base, scope, filter, attrs)
    }
}
