use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// Use of Internal is never a guarantee that the error is not, for
    /// example, caused by the user - merely that the code cannot tell.
    Internal,

    /// The user provided invalid input (a malformed blob, a wrong password,
    /// a missing file) or asked for something impossible.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The Argon2id derivation could not complete (bad parameters or
    /// failure to allocate its working memory).
    KeyDerivationFailed,
    /// The blob does not consist of four valid base64 fields of the
    /// expected sizes.
    MalformedBlob,
    /// Tag verification failed. Covers an incorrect password as well as
    /// tampered or corrupted data; the two are never distinguished.
    AuthenticationFailed,
    /// The operating system random source failed.
    RandomUnavailable,
    /// The cipher refused to seal the plaintext.
    EncryptionFailed,
    /// Password could not be obtained from the configured reader.
    PassphraseUnavailable,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct VaultarqError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag. Any code consuming errors MUST
    /// handle the absence of a defined kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl VaultarqError {
    /// Creates a new error with a required category and display message.
    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: None,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that also tags the failure with a kind.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that retains the originating source error.
    pub fn with_source(
        category: ErrorCategory,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: None,
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// Creates a new error that carries both a kind tag and the originating source error.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// True if the error is tagged with `kind`.
    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind == Some(kind)
    }

    /// Wraps the current error with a higher-level message while preserving
    /// the original as source. Category and kind carry over.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, VaultarqError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_context_preserves_kind_and_category() {
        let err = VaultarqError::with_kind(
            ErrorCategory::User,
            ErrorKind::MalformedBlob,
            "expected 4 fields",
        )
        .with_context("failed to decrypt");

        assert_eq!(err.message(), "failed to decrypt");
        assert_eq!(err.category, ErrorCategory::User);
        assert!(err.is_kind(ErrorKind::MalformedBlob));
        assert_eq!(err.source_error().unwrap().to_string(), "expected 4 fields");
    }

    #[test]
    fn test_source_is_exposed_through_std_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err = VaultarqError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            "failed to read from vault.enc",
            io_err,
        );

        let source = StdError::source(&err).expect("source should be set");
        assert_eq!(source.to_string(), "gone");
        assert_eq!(err.to_string(), "failed to read from vault.enc");
    }

    #[test]
    fn test_plain_error_has_no_kind() {
        let err = VaultarqError::new(ErrorCategory::Internal, "boom");
        assert_eq!(err.kind, None);
        assert!(err.source_error().is_none());
        assert!(!err.is_kind(ErrorKind::Io));
    }
}
