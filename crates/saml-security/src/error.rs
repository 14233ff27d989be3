//! Credential resolution error types.

use thiserror::Error;

/// Result type for resolver operations.
pub type ResolverResult<T> = Result<T, ResolverError>;

/// Errors raised during credential resolution.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// The criteria set lacks a criterion this resolver requires.
    #[error("insufficient criteria: {0}")]
    InsufficientCriteria(String),

    /// Key material in a source could not be interpreted.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// A certificate could not be parsed.
    #[error("certificate parsing failed: {0}")]
    Certificate(String),

    /// The backing source failed (e.g. unreachable metadata).
    #[error("credential source failure: {0}")]
    Source(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_their_context() {
        let err = ResolverError::InsufficientCriteria("entity ID required".to_string());
        assert!(err.to_string().contains("entity ID required"));
    }
}
