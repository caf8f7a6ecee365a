//!
//! idcache: a local cache of identity records for a host's identity service.
//!
//! The cache stores users and groups sourced from remote directories in a
//! hierarchical entry store, so that login and lookup queries can be answered
//! without a round-trip to the backing directory.
//!
//! ## Core Concepts
//!
//! * **Entries (`entry::Entry`)**: An addressable node of the store: a [`Dn`] plus a multi-valued attribute mapping.
//! * **Backends (`backend::DirectoryBackend`)**: A pluggable, transactional storage engine. [`InMemory`] is the reference engine, with JSON persistence.
//! * **Request queue (`queue::RequestQueue`)**: Serializes every unit of work. Exactly one *Operation* (read-only) or *Transaction* (begin/commit/rollback) is active at a time, and pending units are admitted in FIFO order.
//! * **Identity operations (`identity::SysDb`)**: Domain-scoped lookups and mutations of users, groups and membership, each run as a unit on the queue.
//! * **Domains (`identity::Domain`)**: Named identity sources, each owning the subtree `cn=<domain>,cn=sysdb`.

pub mod attrs;
pub mod backend;
pub mod clock;
pub mod config;
pub mod constants;
pub mod dn;
pub mod entry;
pub mod filter;
pub mod identity;
pub mod queue;

pub use attrs::{Attributes, Attrs, Value};
pub use backend::database::InMemory;
pub use backend::{Directory, DirectoryBackend, Modification, ModifyMode, Scope};
#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
pub use clock::{Clock, SystemClock};
pub use config::{Config, DomainConfig};
pub use dn::Dn;
pub use entry::{Entry, EntryClass, Group, Member, Membership, MembershipMode, User};
pub use filter::Filter;
pub use identity::{ALLOCATE_ID, Domain, Initgroups, SysDb, UserRecord};
pub use queue::{Request, RequestId, RequestKind, RequestQueue, RequestState, Submission};

/// Result type used throughout the idcache library.
pub type Result<T> = std::result::Result<T, Error>;

/// Closed classification of every failure the library reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    ConstraintViolation,
    Busy,
    IoFailure,
    Other,
    /// The storage engine refused to commit; the transaction was rolled back.
    CommitFailed,
    /// Rolling back a failed transaction also failed.
    RollbackFailed,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::NotFound => "not found",
            ErrorKind::AlreadyExists => "already exists",
            ErrorKind::ConstraintViolation => "constraint violation",
            ErrorKind::Busy => "busy",
            ErrorKind::IoFailure => "I/O failure",
            ErrorKind::Other => "other",
            ErrorKind::CommitFailed => "commit failed",
            ErrorKind::RollbackFailed => "rollback failed",
        };
        f.write_str(name)
    }
}

/// Common error type for the idcache library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured address errors from the dn module
    #[error(transparent)]
    Dn(dn::DnError),

    /// Structured storage engine errors from the backend module
    #[error(transparent)]
    Backend(backend::BackendError),

    /// Structured serializer errors from the queue module
    #[error(transparent)]
    Queue(queue::QueueError),

    /// Structured identity errors from the identity module
    #[error(transparent)]
    Identity(identity::IdentityError),

    /// Structured configuration errors from the config module
    #[error(transparent)]
    Config(config::ConfigError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Dn(_) => "dn",
            Error::Backend(_) => "backend",
            Error::Queue(_) => "queue",
            Error::Identity(_) => "identity",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Dn(_) => ErrorKind::InvalidArgument,
            Error::Backend(err) => err.kind(),
            Error::Queue(err) => err.kind(),
            Error::Identity(err) => err.kind(),
            Error::Config(_) => ErrorKind::InvalidArgument,
            Error::Io(_) => ErrorKind::IoFailure,
            Error::Serialize(_) => ErrorKind::IoFailure,
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Check if this error indicates a conflict (already exists).
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::AlreadyExists
    }

    /// Check if this error indicates a broken uniqueness or structural rule.
    pub fn is_constraint_violation(&self) -> bool {
        self.kind() == ErrorKind::ConstraintViolation
    }

    /// Check if this error is about caller input.
    pub fn is_invalid_argument(&self) -> bool {
        self.kind() == ErrorKind::InvalidArgument
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        self.kind() == ErrorKind::IoFailure
    }

    /// Check if the storage engine was busy.
    pub fn is_busy(&self) -> bool {
        self.kind() == ErrorKind::Busy
    }

    /// Check if this error is storage-engine related.
    pub fn is_backend_error(&self) -> bool {
        matches!(self, Error::Backend(_))
    }
}
