//! Failure kinds that callers may want to match on.

use thiserror::Error;

/// The error kinds carried inside [anyhow::Error].
///
/// Retrieve them with `err.downcast_ref::<GroundingError>()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroundingError {
    #[error("no valid sample found after {attempts} attempts, starting from index {index}")]
    ExhaustedRetries { index: usize, attempts: usize },
    #[error("unsupported language encoder '{0}'")]
    UnsupportedEncoder(String),
    #[error("{what} expects {expect} channels, but get {actual}")]
    ChannelMismatch {
        what: &'static str,
        expect: i64,
        actual: i64,
    },
}
