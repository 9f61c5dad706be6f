//! Validation errors for model types.

/// Errors produced when parsing or validating model values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// An account id was blank or could not be used as a URL path segment.
    #[error("invalid account id \"{value}\": {reason}")]
    InvalidAccountId {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}
