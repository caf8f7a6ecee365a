//! Address construction errors.

use thiserror::Error;

/// Errors that can occur while building or parsing a [`Dn`](super::Dn).
///
/// All variants translate to [`ErrorKind::InvalidArgument`](crate::ErrorKind).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DnError {
    /// A required component was empty.
    #[error("Empty {what} in address")]
    Empty {
        /// Which component was empty ("domain" or "name")
        what: &'static str,
    },

    /// A component contains a character that would need escaping.
    #[error("Unsafe character {ch:?} in address component '{value}'")]
    UnsafeCharacter {
        /// The rejected value
        value: String,
        /// The offending character
        ch: char,
    },

    /// The string is not a well-formed address.
    #[error("Invalid address syntax: '{dn}'")]
    InvalidSyntax {
        /// The rejected input
        dn: String,
    },
}

impl From<DnError> for crate::Error {
    fn from(err: DnError) -> Self {
        crate::Error::Dn(err)
    }
}
