//! Storage engine error types.
//!
//! [`BackendError`] carries the engine-native failure codes. The rest of the
//! crate never matches on them directly; [`BackendError::kind`] translates them
//! into the closed [`ErrorKind`] taxonomy that callers see.

use thiserror::Error;

use crate::ErrorKind;

/// Errors raised by a storage engine.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `kind()` and `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    /// No entry at the given address (or its parent is missing).
    #[error("No such object: {dn}")]
    NoSuchObject {
        /// The address that was not found
        dn: String,
    },

    /// A value to delete is not present.
    #[error("No such attribute value: {attribute} on {dn}")]
    NoSuchAttribute { dn: String, attribute: String },

    /// An entry already exists at the address.
    #[error("Entry already exists: {dn}")]
    EntryAlreadyExists { dn: String },

    /// A value to add is already present.
    #[error("Attribute value already exists: {attribute} on {dn}")]
    AttributeOrValueExists { dn: String, attribute: String },

    /// A uniqueness or structural constraint would be broken.
    #[error("Constraint violation: {reason}")]
    ConstraintViolation { reason: String },

    /// The entry still has children.
    #[error("Entry has children: {dn}")]
    NotAllowedOnNonLeaf { dn: String },

    /// The engine is in use by another writer.
    #[error("Storage engine busy: {reason}")]
    Busy { reason: String },

    /// `begin_transaction` while one is already open.
    #[error("A transaction is already active")]
    TransactionActive,

    /// A write or commit/rollback outside a transaction.
    #[error("No active transaction")]
    NoActiveTransaction,

    #[error("Invalid address syntax: {dn}")]
    InvalidDnSyntax { dn: String },

    #[error("Invalid attribute {attribute}: {reason}")]
    InvalidAttributeSyntax { attribute: String, reason: String },

    /// File I/O error.
    #[error("File I/O error")]
    FileIo {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Serialization failed.
    #[error("Serialization failed")]
    SerializationFailed {
        #[source]
        source: serde_json::Error,
    },

    /// Deserialization failed.
    #[error("Deserialization failed")]
    DeserializationFailed {
        #[source]
        source: serde_json::Error,
    },

    /// Storage file uses an unknown format version.
    #[error("Unsupported storage format version {version}")]
    UnsupportedVersion { version: u8 },

    /// The engine cannot be reached.
    #[error("Storage engine unavailable: {reason}")]
    Unavailable { reason: String },

    /// Any other engine failure.
    #[error("Storage engine operation failed: {reason}")]
    Operations { reason: String },
}

impl BackendError {
    /// Translate the engine code into the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackendError::NoSuchObject { .. } | BackendError::NoSuchAttribute { .. } => {
                ErrorKind::NotFound
            }
            BackendError::EntryAlreadyExists { .. }
            | BackendError::AttributeOrValueExists { .. } => ErrorKind::AlreadyExists,
            BackendError::ConstraintViolation { .. } | BackendError::NotAllowedOnNonLeaf { .. } => {
                ErrorKind::ConstraintViolation
            }
            BackendError::Busy { .. } | BackendError::TransactionActive => ErrorKind::Busy,
            BackendError::FileIo { .. }
            | BackendError::SerializationFailed { .. }
            | BackendError::DeserializationFailed { .. }
            | BackendError::UnsupportedVersion { .. }
            | BackendError::Unavailable { .. } => ErrorKind::IoFailure,
            BackendError::InvalidDnSyntax { .. }
            | BackendError::InvalidAttributeSyntax { .. }
            | BackendError::NoActiveTransaction => ErrorKind::InvalidArgument,
            BackendError::Operations { .. } => ErrorKind::Other,
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Check if this error is related to I/O operations.
    pub fn is_io_error(&self) -> bool {
        self.kind() == ErrorKind::IoFailure
    }

    /// Check if the engine asked the caller to come back later.
    pub fn is_busy(&self) -> bool {
        self.kind() == ErrorKind::Busy
    }
}

impl From<BackendError> for crate::Error {
    fn from(err: BackendError) -> Self {
        crate::Error::Backend(err)
    }
}
