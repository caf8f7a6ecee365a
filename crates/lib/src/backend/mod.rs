//! Directory Adapter over the hierarchical storage engine.
//!
//! The [`DirectoryBackend`] trait is the capability interface every storage
//! engine implements: native transaction control, entry add/modify/delete and
//! filtered search. All calls are asynchronous; an engine completes them on the
//! caller's runtime and the caller resumes when the future resolves.
//!
//! The queue and identity layers never hold a backend directly; they go through
//! [`Directory`], a cheap-to-clone handle that logs each call.

use async_trait::async_trait;

use crate::Result;
use crate::attrs::{Attrs, Value};
use crate::dn::Dn;
use crate::entry::Entry;
use crate::filter::Filter;

pub mod database;
mod directory;
pub mod errors;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use directory::Directory;
pub use errors::BackendError;

/// Search scope relative to the base address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Only the base entry itself.
    Base,
    /// Direct children of the base.
    OneLevel,
    /// The base and everything below it.
    Subtree,
}

/// How a [`Modification`] applies its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifyMode {
    /// Append values; fails if any is already present.
    Add,
    /// Replace all values; an empty list removes the attribute.
    Replace,
    /// Remove the listed values, or the whole attribute when none are listed.
    Delete,
}

/// One attribute change within a modify request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    pub mode: ModifyMode,
    pub attribute: String,
    pub values: Vec<Value>,
}

impl Modification {
    pub fn add(attribute: &str, values: Vec<Value>) -> Self {
        Self {
            mode: ModifyMode::Add,
            attribute: attribute.to_string(),
            values,
        }
    }

    pub fn replace(attribute: &str, values: Vec<Value>) -> Self {
        Self {
            mode: ModifyMode::Replace,
            attribute: attribute.to_string(),
            values,
        }
    }

    pub fn delete(attribute: &str, values: Vec<Value>) -> Self {
        Self {
            mode: ModifyMode::Delete,
            attribute: attribute.to_string(),
            values,
        }
    }

    /// One modification per staged attribute, all with `mode`.
    pub fn from_attrs(mode: ModifyMode, attrs: Attrs) -> Vec<Self> {
        attrs
            .into_attributes()
            .iter()
            .map(|(name, values)| Self {
                mode,
                attribute: name.to_string(),
                values: values.to_vec(),
            })
            .collect()
    }
}

/// Capability interface over a transactional hierarchical store.
///
/// Engines must be `Send` and `Sync` so a handle can be shared by every unit
/// the request queue admits.
///
/// Expected failures are returned as [`BackendError`]s wrapped in
/// [`crate::Error`]; an engine never aborts the process for them.
#[async_trait]
pub trait DirectoryBackend: Send + Sync {
    /// Open a native transaction. Writes are only accepted inside one.
    async fn begin_transaction(&self) -> Result<()>;

    /// Make every write since `begin_transaction` durable.
    async fn commit_transaction(&self) -> Result<()>;

    /// Discard every write since `begin_transaction`.
    async fn rollback_transaction(&self) -> Result<()>;

    /// Store a new entry. Fails if the address is taken or its parent is missing.
    async fn add(&self, entry: Entry) -> Result<()>;

    /// Apply `mods` to an existing entry, all or nothing.
    async fn modify(&self, dn: &Dn, mods: Vec<Modification>) -> Result<()>;

    /// Remove a leaf entry.
    async fn delete(&self, dn: &Dn) -> Result<()>;

    /// Entries under `base` within `scope` that match `filter`.
    ///
    /// Each returned entry carries only the attributes named in `attrs`, or all
    /// of them when `attrs` is empty. Fails with `NoSuchObject` if `base` does
    /// not exist.
    async fn search(
        &self,
        base: &Dn,
        scope: Scope,
        filter: &Filter,
        attrs: &[&str],
    ) -> Result<Vec<Entry>>;
}
