use thiserror::Error;

use crate::scope::Scope;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of an [`Error`], unaffected by any context wrapped around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedType,
    ValueTooLarge,
    EncodingError,
    UnsupportedKeyType,
    SyncError,
    PermissionDenied,
}

/// Errors produced while converting values or talking to the preferences store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The value or native object has no conversion rule.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// An integer outside the signed 64-bit range, or a byte buffer longer
    /// than the native 32-bit length field allows.
    #[error("value too large: {0}")]
    ValueTooLarge(String),

    /// A native string or data object could not be constructed or read back.
    #[error("encoding error: {0}")]
    EncodingError(String),

    /// A native dictionary key was not a string.
    #[error("unsupported dictionary key type: {0}")]
    UnsupportedKeyType(String),

    /// The store rejected the synchronize call.
    #[error("failed to synchronize preferences for domain {domain:?} ({scope})")]
    SyncError { domain: String, scope: Scope },

    /// A privilege-scoped write was rejected by the environment.
    #[error("permission denied writing preferences for domain {domain:?} ({scope})")]
    PermissionDenied { domain: String, scope: Scope },

    /// Another error, prefixed with where it happened.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// The kind of the innermost error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedType(_) => ErrorKind::UnsupportedType,
            Error::ValueTooLarge(_) => ErrorKind::ValueTooLarge,
            Error::EncodingError(_) => ErrorKind::EncodingError,
            Error::UnsupportedKeyType(_) => ErrorKind::UnsupportedKeyType,
            Error::SyncError { .. } => ErrorKind::SyncError,
            Error::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Error::Context { source, .. } => source.kind(),
        }
    }

    /// Wrap the error with a location, preserving its kind.
    ///
    /// Produces: `"context: original message"`.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Error::Context {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}
