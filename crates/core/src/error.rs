//! Error types for office document translation.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a translation run.
///
/// Per-unit translation problems are not represented here; see
/// [`TranslationFailure`], which the engine contains at unit granularity.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or read the input file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The file format is not supported or could not be detected.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// The input bytes do not conform to the declared container format.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A write addressed a location that does not resolve in the document.
    #[error("Write error at {location}: {reason}")]
    WriteError {
        /// Human-readable location that failed to resolve.
        location: String,
        /// Why the write was rejected.
        reason: String,
    },

    /// A language code did not look like a language code.
    #[error("Invalid language code: '{0}'")]
    InvalidLanguage(String),

    /// Failed to serialize the translated package.
    #[error("Package error: {0}")]
    PackageError(String),
}

impl Error {
    /// Build a [`Error::WriteError`] for a location.
    pub fn write(location: impl ToString, reason: impl Into<String>) -> Self {
        Self::WriteError {
            location: location.to_string(),
            reason: reason.into(),
        }
    }
}

/// A single text unit could not be translated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationFailure {
    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(String),

    /// The provider refused because of rate limits or quota.
    #[error("Quota exceeded: {0}")]
    Quota(String),

    /// The provider answered with something we could not use.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The call did not finish within the configured timeout.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The provider rejected the request for any other reason.
    #[error("Rejected by provider: {0}")]
    Rejected(String),
}
