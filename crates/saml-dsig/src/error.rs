//! Signature and encryption error types.
//!
//! Structural (profile) failures and cryptographic failures are distinct
//! variants: profile checks fail fast before any cryptography runs, and a
//! [`SignatureError::Verification`] can only follow a clean profile pass.

use thiserror::Error;

/// Result type for signature operations.
pub type SignatureResult<T> = Result<T, SignatureError>;

/// Errors raised by signature processing.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// The signature's structure violates the profile; detected before
    /// cryptographic verification.
    #[error("signature profile violation: {0}")]
    Profile(String),

    /// The algorithm URI has no registered descriptor.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Key material could not be used with the requested algorithm.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Key material is below the strength bound for the algorithm.
    #[error("key of {actual} bits is below the {required}-bit minimum for {uri}")]
    KeyTooWeak {
        /// The algorithm whose bound was violated.
        uri: String,
        /// The required minimum in bits.
        required: u32,
        /// The offered key size in bits.
        actual: u32,
    },

    /// A referenced element could not be located.
    #[error("referenced element not found: {0}")]
    ReferenceNotFound(String),

    /// Cryptographic verification failed (digest or signature value).
    #[error("signature verification failed: {0}")]
    Verification(String),

    /// Signature creation failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Base64 or serialization trouble while processing signature data.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<base64::DecodeError> for SignatureError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Encoding(err.to_string())
    }
}

/// Errors raised by XML Encryption processing.
#[derive(Debug, Error)]
pub enum EncryptionError {
    /// The algorithm URI is not a supported block cipher.
    #[error("unsupported encryption algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// EncryptedData carried neither CipherValue nor a resolvable
    /// CipherReference.
    #[error("no cipher data available: {0}")]
    MissingCipherData(String),

    /// No usable decryption key could be resolved.
    #[error("key resolution failed: {0}")]
    Key(String),

    /// The ciphertext failed to decrypt or authenticate.
    #[error("decryption failed: {0}")]
    Decrypt(String),

    /// The decrypted plaintext is not a well-formed element.
    #[error("plaintext parsing failed: {0}")]
    Plaintext(String),

    /// The EncryptedData element itself is malformed.
    #[error("malformed EncryptedData: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_and_verification_are_distinct() {
        let profile = SignatureError::Profile("empty transform list".into());
        let crypto = SignatureError::Verification("digest mismatch".into());
        assert!(profile.to_string().contains("profile"));
        assert!(crypto.to_string().contains("verification failed"));
    }

    #[test]
    fn key_strength_error_reports_bounds() {
        let err = SignatureError::KeyTooWeak {
            uri: "urn:example:alg".into(),
            required: 128,
            actual: 64,
        };
        assert!(err.to_string().contains("128-bit minimum"));
    }
}
