//! Identity operation error types.

use thiserror::Error;

use crate::ErrorKind;
use crate::entry::MembershipMode;

/// Errors raised by identity lookups and mutations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `kind()` and `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The domain is not configured on this cache.
    #[error("Unknown domain: {name}")]
    UnknownDomain { name: String },

    /// Two configured domains share a name.
    #[error("Domain configured twice: {name}")]
    DuplicateDomain { name: String },

    /// A stored entry lacks a required attribute or holds an unparsable value.
    #[error("Malformed entry {dn}: {reason}")]
    MalformedEntry { dn: String, reason: String },

    /// Another user or group in the domain already holds the id.
    #[error("{what} {id} already in use in domain {domain}")]
    DuplicateId {
        domain: String,
        /// "uid" or "gid"
        what: &'static str,
        id: u32,
    },

    /// The id falls outside the domain's configured range.
    #[error("Id {id} outside the allowed range {min:?}..={max:?}")]
    IdOutOfRange {
        id: u32,
        min: Option<u32>,
        max: Option<u32>,
    },

    /// Every id in the domain's range is taken.
    #[error("No free id left in domain {domain} (max {max})")]
    IdRangeExhausted { domain: String, max: u32 },

    /// The user or group a mutation targets does not exist.
    #[error("No such {what}: {name}")]
    NotFound { what: &'static str, name: String },

    /// The user or group to add already exists.
    #[error("{what} already exists: {name}")]
    AlreadyExists { what: &'static str, name: String },

    /// More than one entry carries an id that should be unique.
    #[error("Several {what} entries carry id {id}")]
    Ambiguous { what: &'static str, id: u32 },

    /// An attribute update with nothing to set.
    #[error("No attributes to set")]
    EmptyAttrs,

    /// The attribute is managed by the cache and cannot be set directly.
    #[error("Attribute {attribute} cannot be modified")]
    ProtectedAttribute { attribute: String },

    /// The verb needs a domain with the other membership representation.
    #[error("Domain {domain} does not use {expected:?} membership")]
    WrongMembershipMode {
        domain: String,
        expected: MembershipMode,
    },
}

impl IdentityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::NotFound { .. } => ErrorKind::NotFound,
            IdentityError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            IdentityError::DuplicateId { .. }
            | IdentityError::Ambiguous { .. }
            | IdentityError::IdRangeExhausted { .. } => ErrorKind::ConstraintViolation,
            IdentityError::UnknownDomain { .. }
            | IdentityError::DuplicateDomain { .. }
            | IdentityError::IdOutOfRange { .. }
            | IdentityError::EmptyAttrs
            | IdentityError::ProtectedAttribute { .. }
            | IdentityError::WrongMembershipMode { .. } => ErrorKind::InvalidArgument,
            IdentityError::MalformedEntry { .. } => ErrorKind::Other,
        }
    }

    /// Check if this error indicates the target entry was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, IdentityError::NotFound { .. })
    }

    /// Check if this error reports an id collision.
    pub fn is_duplicate_id(&self) -> bool {
        matches!(self, IdentityError::DuplicateId { .. })
    }
}

impl From<IdentityError> for crate::Error {
    fn from(err: IdentityError) -> Self {
        crate::Error::Identity(err)
    }
}
