//! Error types for release versions and digest values.
//!
//! Each variant identifies the rejected input and the constraint it broke.

use thiserror::Error;

/// Errors arising from invalid release-related values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtefactError {
    /// A SHA-1 digest is not a valid 40-character lowercase hex string.
    #[error("invalid SHA-1 digest: {reason}")]
    InvalidSha1Digest {
        /// Description of the validation failure.
        reason: String,
    },

    /// A release version string is not of the form `major.minor.patch`.
    #[error("invalid release version \"{value}\": {reason}")]
    InvalidVersion {
        /// The rejected version string.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },
}

/// Result type alias using [`ArtefactError`].
pub type Result<T> = std::result::Result<T, ArtefactError>;
