//! Structural signature prevalidation.
//!
//! Checks a [`Signature`] object against the profile before any
//! cryptography runs: SignedInfo shape, known algorithm URIs in the right
//! categories, non-empty transform lists drawn from the allowed set,
//! same-document references, and key-size bounds. Failures here are
//! [`SignatureError::Profile`], a distinct class from the cryptographic
//! [`SignatureError::Verification`].

use std::sync::Arc;

use crate::algorithms::{
    c14n_uris, transform_uris, AlgorithmCategory, AlgorithmDescriptor, AlgorithmRegistry,
};
use crate::error::SignatureError;
use crate::signature::Signature;

/// Structural validator for signatures.
pub struct SignatureProfileValidator {
    algorithms: Arc<AlgorithmRegistry>,
    allow_deprecated: bool,
}

impl SignatureProfileValidator {
    /// Creates a validator over an algorithm registry. Deprecated
    /// algorithms are rejected by default.
    #[must_use]
    pub fn new(algorithms: Arc<AlgorithmRegistry>) -> Self {
        Self {
            algorithms,
            allow_deprecated: false,
        }
    }

    /// Allows deprecated algorithms (SHA-1 family). Not recommended.
    #[must_use]
    pub const fn allow_deprecated(mut self, allow: bool) -> Self {
        self.allow_deprecated = allow;
        self
    }

    /// Validates the structural profile of a signature.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Profile`] on any structural
    /// non-compliance, or [`SignatureError::UnsupportedAlgorithm`] for a
    /// URI with no registered descriptor.
    pub fn validate(&self, signature: &Signature) -> Result<(), SignatureError> {
        let signed_info = &signature.signed_info;

        if signed_info.references.is_empty() {
            return Err(SignatureError::Profile(
                "SignedInfo must contain at least one Reference".to_string(),
            ));
        }

        let c14n = self.descriptor(&signed_info.canonicalization_method)?;
        if c14n.category != AlgorithmCategory::Canonicalization {
            return Err(SignatureError::Profile(format!(
                "'{}' is not a canonicalization algorithm",
                signed_info.canonicalization_method
            )));
        }

        let method = self.descriptor(&signed_info.signature_method)?;
        if !matches!(
            method.category,
            AlgorithmCategory::Signature | AlgorithmCategory::Mac
        ) {
            return Err(SignatureError::Profile(format!(
                "'{}' is not a signature or MAC algorithm",
                signed_info.signature_method
            )));
        }
        self.check_deprecated(&method)?;

        if signature.signature_value.is_empty() {
            return Err(SignatureError::Profile(
                "SignatureValue must not be empty".to_string(),
            ));
        }

        for reference in &signed_info.references {
            self.validate_reference(reference)?;
        }

        Ok(())
    }

    /// Checks key material strength against an algorithm's bound.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::KeyTooWeak`] if the key is below the
    /// descriptor's minimum.
    pub fn check_key_bits(
        descriptor: &AlgorithmDescriptor,
        key_bits: u32,
    ) -> Result<(), SignatureError> {
        if let Some(required) = descriptor.min_key_bits {
            if key_bits < required {
                return Err(SignatureError::KeyTooWeak {
                    uri: descriptor.uri.to_string(),
                    required,
                    actual: key_bits,
                });
            }
        }
        Ok(())
    }

    fn validate_reference(&self, reference: &crate::signature::Reference) -> Result<(), SignatureError> {
        match reference.uri.as_deref() {
            Some("") => {}
            Some(uri) if uri.starts_with('#') && uri.len() > 1 => {}
            Some(uri) => {
                return Err(SignatureError::Profile(format!(
                    "Reference URI '{uri}' is not a same-document reference"
                )));
            }
            None => {
                return Err(SignatureError::Profile(
                    "Reference must carry a same-document URI".to_string(),
                ));
            }
        }

        if reference.transforms.is_empty() {
            return Err(SignatureError::Profile(
                "Reference transform list must not be empty".to_string(),
            ));
        }
        for transform in &reference.transforms {
            if !is_allowed_transform(transform) {
                return Err(SignatureError::Profile(format!(
                    "transform '{transform}' is not permitted"
                )));
            }
        }

        let digest = self.descriptor(&reference.digest_method)?;
        if digest.category != AlgorithmCategory::Digest {
            return Err(SignatureError::Profile(format!(
                "'{}' is not a digest algorithm",
                reference.digest_method
            )));
        }
        self.check_deprecated(&digest)?;

        if reference.digest_value.is_empty() {
            return Err(SignatureError::Profile(
                "DigestValue must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    fn descriptor(&self, uri: &str) -> Result<Arc<AlgorithmDescriptor>, SignatureError> {
        self.algorithms
            .get(uri)
            .ok_or_else(|| SignatureError::UnsupportedAlgorithm(uri.to_string()))
    }

    fn check_deprecated(&self, descriptor: &AlgorithmDescriptor) -> Result<(), SignatureError> {
        if descriptor.deprecated && !self.allow_deprecated {
            return Err(SignatureError::Profile(format!(
                "deprecated algorithm '{}' is not allowed",
                descriptor.uri
            )));
        }
        Ok(())
    }
}

fn is_allowed_transform(uri: &str) -> bool {
    matches!(
        uri,
        transform_uris::ENVELOPED
            | c14n_uris::EXCLUSIVE
            | c14n_uris::EXCLUSIVE_WITH_COMMENTS
            | c14n_uris::INCLUSIVE
            | c14n_uris::INCLUSIVE_WITH_COMMENTS
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{digest_uris, signature_uris};
    use crate::signature::{Reference, SignedInfo};

    fn valid_signature() -> Signature {
        Signature::new(
            SignedInfo {
                canonicalization_method: c14n_uris::EXCLUSIVE.to_string(),
                signature_method: signature_uris::RSA_SHA256.to_string(),
                references: vec![Reference {
                    uri: Some("#_id1".to_string()),
                    transforms: vec![transform_uris::ENVELOPED.to_string()],
                    digest_method: digest_uris::SHA256.to_string(),
                    digest_value: "q83v".to_string(),
                }],
            },
            "c2ln".to_string(),
            None,
        )
    }

    fn validator() -> SignatureProfileValidator {
        SignatureProfileValidator::new(Arc::new(AlgorithmRegistry::with_defaults()))
    }

    #[test]
    fn valid_signature_passes() {
        assert!(validator().validate(&valid_signature()).is_ok());
    }

    #[test]
    fn empty_reference_list_is_rejected() {
        let mut signature = valid_signature();
        signature.signed_info.references.clear();
        let result = validator().validate(&signature);
        assert!(matches!(result, Err(SignatureError::Profile(_))));
    }

    #[test]
    fn empty_transform_list_is_rejected() {
        let mut signature = valid_signature();
        signature.signed_info.references[0].transforms.clear();
        let result = validator().validate(&signature);
        assert!(matches!(result, Err(SignatureError::Profile(_))));
    }

    #[test]
    fn unknown_signature_algorithm_is_rejected() {
        let mut signature = valid_signature();
        signature.signed_info.signature_method = "urn:example:bogus".to_string();
        let result = validator().validate(&signature);
        assert!(matches!(result, Err(SignatureError::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn digest_uri_in_signature_position_is_rejected() {
        let mut signature = valid_signature();
        signature.signed_info.signature_method = digest_uris::SHA256.to_string();
        let result = validator().validate(&signature);
        assert!(matches!(result, Err(SignatureError::Profile(_))));
    }

    #[test]
    fn external_reference_is_rejected() {
        let mut signature = valid_signature();
        signature.signed_info.references[0].uri =
            Some("https://example.com/doc".to_string());
        let result = validator().validate(&signature);
        assert!(matches!(result, Err(SignatureError::Profile(_))));
    }

    #[test]
    fn deprecated_algorithm_is_gated() {
        let mut signature = valid_signature();
        signature.signed_info.signature_method = signature_uris::RSA_SHA1.to_string();
        assert!(validator().validate(&signature).is_err());

        let permissive = validator().allow_deprecated(true);
        assert!(permissive.validate(&signature).is_ok());
    }

    #[test]
    fn key_bits_bound_is_enforced() {
        let registry = AlgorithmRegistry::with_defaults();
        let hmac = registry.get(signature_uris::HMAC_SHA256).unwrap();
        assert!(SignatureProfileValidator::check_key_bits(&hmac, 256).is_ok());
        assert!(matches!(
            SignatureProfileValidator::check_key_bits(&hmac, 64),
            Err(SignatureError::KeyTooWeak { .. })
        ));
    }
}
