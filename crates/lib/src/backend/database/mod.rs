//! Storage engine implementations
//!
//! These engines implement [`DirectoryBackend`](super::DirectoryBackend) for
//! hierarchical, transactional entry storage.

mod in_memory;

pub use in_memory::InMemory;
