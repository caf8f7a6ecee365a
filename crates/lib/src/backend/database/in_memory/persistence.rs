//! Persistence operations for the InMemory engine
//!
//! The committed tree is stored as a single JSON document. Writes go to a
//! sibling temporary file which is then renamed over the target, so a crash
//! mid-write leaves the previous commit intact.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::storage::Tree;
use crate::{Error, Result, backend::errors::BackendError, entry::Entry};

/// The current persistence file format version.
/// v0 indicates this is an unstable format subject to breaking changes.
const PERSISTENCE_VERSION: u8 = 0;

/// Helper to check if version is default (0) for serde skip_serializing_if
fn is_v0(v: &u8) -> bool {
    *v == 0
}

/// On-disk form of the tree. Entries are kept in creation order so search
/// results come back in the same order after a reload.
#[derive(Serialize, Deserialize)]
struct SerializableDirectory {
    #[serde(rename = "_v", default, skip_serializing_if = "is_v0")]
    version: u8,
    entries: Vec<Entry>,
}

pub(crate) fn to_json(tree: &Tree) -> Result<String> {
    let serializable = SerializableDirectory {
        version: PERSISTENCE_VERSION,
        entries: tree.ordered().into_iter().cloned().collect(),
    };
    serde_json::to_string_pretty(&serializable)
        .map_err(|e| -> Error { BackendError::SerializationFailed { source: e }.into() })
}

pub(crate) fn from_json(json: &str) -> Result<Tree> {
    let serializable: SerializableDirectory = serde_json::from_str(json)
        .map_err(|e| -> Error { BackendError::DeserializationFailed { source: e }.into() })?;
    if serializable.version != PERSISTENCE_VERSION {
        return Err(BackendError::UnsupportedVersion {
            version: serializable.version,
        }
        .into());
    }
    let mut tree = Tree::default();
    for entry in serializable.entries {
        tree.insert(entry);
    }
    Ok(tree)
}

/// Write `json` to `path` through a temporary sibling and a rename.
pub(crate) async fn write_atomic(path: &Path, json: &str) -> Result<()> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| -> Error { BackendError::FileIo { source: e }.into() })?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| -> Error { BackendError::FileIo { source: e }.into() })
}

/// Load the tree stored at `path`.
///
/// If the file does not exist, an empty tree is returned.
pub(crate) async fn load(path: &Path) -> Result<Tree> {
    match tokio::fs::read_to_string(path).await {
        Ok(json) => from_json(&json),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Tree::default()),
        Err(e) => Err(BackendError::FileIo { source: e }.into()),
    }
}
