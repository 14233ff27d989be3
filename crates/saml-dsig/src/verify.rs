//! Signature verification against resolved credentials.
//!
//! Verification is two phases with distinct failure classes: the profile
//! validator runs first and fails fast on structural non-compliance, then
//! digests and the signature value are checked cryptographically. The
//! provider implementation is selected purely from the algorithm URI in
//! the document via the algorithm registry.

use std::sync::Arc;

use aws_lc_rs::{digest, hmac, signature as crypto_signature};
use base64::Engine;

use saml_security::credential::{Credential, KeyAlgorithm, KeyMaterial};
use saml_xml::dom::Element;

use crate::algorithms::{AlgorithmCategory, AlgorithmRegistry};
use crate::crypto::{canonical_bytes, digest_algorithm};
use crate::error::{SignatureError, SignatureResult};
use crate::profile::SignatureProfileValidator;
use crate::signature::{signed_info_element, Reference, Signature};

/// Verifies signatures over element trees.
pub struct SignatureVerifier {
    algorithms: Arc<AlgorithmRegistry>,
    profile: SignatureProfileValidator,
}

impl SignatureVerifier {
    /// Creates a verifier; profile checks use the same registry with
    /// deprecated algorithms rejected.
    #[must_use]
    pub fn new(algorithms: Arc<AlgorithmRegistry>) -> Self {
        let profile = SignatureProfileValidator::new(Arc::clone(&algorithms));
        Self {
            algorithms,
            profile,
        }
    }

    /// Replaces the profile validator, e.g. to permit deprecated
    /// algorithms.
    #[must_use]
    pub fn with_profile(mut self, profile: SignatureProfileValidator) -> Self {
        self.profile = profile;
        self
    }

    /// Verifies a signature against the document it is enveloped in and a
    /// resolved credential.
    ///
    /// # Errors
    ///
    /// [`SignatureError::Profile`] for structural violations (checked
    /// first), [`SignatureError::ReferenceNotFound`] when a referenced ID
    /// does not resolve, and [`SignatureError::Verification`] when a
    /// digest or the signature value fails cryptographically.
    pub fn verify(
        &self,
        root: &Element,
        signature: &Signature,
        credential: &Credential,
    ) -> SignatureResult<()> {
        self.profile.validate(signature)?;
        tracing::debug!(
            method = %signature.signed_info.signature_method,
            "signature profile validated, checking references"
        );

        for reference in &signature.signed_info.references {
            self.verify_reference(root, reference)?;
        }

        self.verify_signature_value(signature, credential)
    }

    fn verify_reference(&self, root: &Element, reference: &Reference) -> SignatureResult<()> {
        // The profile validator has already pinned the URI to a
        // same-document shape.
        let target = match reference.uri.as_deref() {
            Some("") => root,
            Some(uri) => {
                let id = &uri[1..];
                root.find_by_id(id)
                    .ok_or_else(|| SignatureError::ReferenceNotFound(id.to_string()))?
            }
            None => root,
        };

        let descriptor = self
            .algorithms
            .get(&reference.digest_method)
            .ok_or_else(|| {
                SignatureError::UnsupportedAlgorithm(reference.digest_method.clone())
            })?;
        let algorithm = digest_algorithm(descriptor.provider_id)?;

        let bytes = canonical_bytes(target)?;
        let computed = digest::digest(algorithm, &bytes);
        let encoded = base64::engine::general_purpose::STANDARD.encode(computed.as_ref());

        if encoded != reference.digest_value {
            return Err(SignatureError::Verification(
                "digest value mismatch".to_string(),
            ));
        }
        Ok(())
    }

    fn verify_signature_value(
        &self,
        signature: &Signature,
        credential: &Credential,
    ) -> SignatureResult<()> {
        let method = &signature.signed_info.signature_method;
        let descriptor = self
            .algorithms
            .get(method)
            .ok_or_else(|| SignatureError::UnsupportedAlgorithm(method.clone()))?;

        let data = signed_info_element(&signature.signed_info)
            .to_xml()
            .map_err(|e| SignatureError::Encoding(e.to_string()))?;
        let compact: String = signature
            .signature_value
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let signature_bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;

        match descriptor.category {
            AlgorithmCategory::Mac => {
                let KeyMaterial::Secret(secret) = credential.key() else {
                    return Err(SignatureError::InvalidKey(
                        "MAC verification requires a secret key".to_string(),
                    ));
                };
                #[allow(clippy::cast_possible_truncation)]
                SignatureProfileValidator::check_key_bits(&descriptor, (secret.len() * 8) as u32)?;

                let key = match descriptor.provider_id {
                    "HMAC_SHA256" => hmac::Key::new(hmac::HMAC_SHA256, secret),
                    other => {
                        return Err(SignatureError::UnsupportedAlgorithm(other.to_string()));
                    }
                };
                hmac::verify(&key, data.as_bytes(), &signature_bytes)
                    .map_err(|_| SignatureError::Verification("MAC mismatch".to_string()))
            }
            AlgorithmCategory::Signature => {
                let KeyMaterial::Public { algorithm, key } = credential.key() else {
                    return Err(SignatureError::InvalidKey(
                        "signature verification requires a public key".to_string(),
                    ));
                };
                let verification = verification_algorithm(descriptor.provider_id, *algorithm)?;
                let public_key = crypto_signature::UnparsedPublicKey::new(verification, key);
                public_key
                    .verify(data.as_bytes(), &signature_bytes)
                    .map_err(|_| {
                        SignatureError::Verification("signature value mismatch".to_string())
                    })
            }
            _ => Err(SignatureError::UnsupportedAlgorithm(method.clone())),
        }
    }
}

fn verification_algorithm(
    provider_id: &str,
    key_algorithm: KeyAlgorithm,
) -> SignatureResult<&'static dyn crypto_signature::VerificationAlgorithm> {
    let algorithm: &'static dyn crypto_signature::VerificationAlgorithm = match provider_id {
        "RSA_PKCS1_SHA1" => &crypto_signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY,
        "RSA_PKCS1_SHA256" => &crypto_signature::RSA_PKCS1_2048_8192_SHA256,
        "RSA_PKCS1_SHA384" => &crypto_signature::RSA_PKCS1_2048_8192_SHA384,
        "RSA_PKCS1_SHA512" => &crypto_signature::RSA_PKCS1_2048_8192_SHA512,
        "ECDSA_P256_SHA256_FIXED" => &crypto_signature::ECDSA_P256_SHA256_FIXED,
        "ECDSA_P384_SHA384_FIXED" => &crypto_signature::ECDSA_P384_SHA384_FIXED,
        other => return Err(SignatureError::UnsupportedAlgorithm(other.to_string())),
    };

    let compatible = match key_algorithm {
        KeyAlgorithm::Rsa => provider_id.starts_with("RSA_"),
        KeyAlgorithm::EcP256 => provider_id == "ECDSA_P256_SHA256_FIXED",
        KeyAlgorithm::EcP384 => provider_id == "ECDSA_P384_SHA384_FIXED",
    };
    if !compatible {
        return Err(SignatureError::InvalidKey(format!(
            "{key_algorithm:?} key cannot verify {provider_id}"
        )));
    }

    Ok(algorithm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::signature_uris;
    use crate::sign::{SignatureSigner, SigningConfig};
    use saml_xml::qname::QName;

    fn hmac_credential(bytes: &[u8]) -> Credential {
        Credential::new(KeyMaterial::Secret(bytes.to_vec())).with_key_name("mac-key")
    }

    fn signed_document(secret: &[u8]) -> (Element, Signature) {
        let mut root = Element::new(QName::new("urn:example", "Envelope").with_prefix("ex"));
        root.declare_namespace(Some("ex"), "urn:example");
        root.set_id_attribute(QName::unqualified("ID"), "_doc1");
        let mut body = Element::new(QName::new("urn:example", "Body").with_prefix("ex"));
        body.append_text("payload");
        root.append_child(body);

        let signer = SignatureSigner::new(
            Arc::new(AlgorithmRegistry::with_defaults()),
            SigningConfig::hmac_sha256(),
        );
        let signature = signer
            .sign(&mut root, "_doc1", &hmac_credential(secret))
            .unwrap();
        (root, signature)
    }

    #[test]
    fn hmac_sign_verify_round_trip() {
        let secret = b"0123456789abcdef0123456789abcdef";
        let (root, signature) = signed_document(secret);

        let verifier = SignatureVerifier::new(Arc::new(AlgorithmRegistry::with_defaults()));
        assert!(verifier
            .verify(&root, &signature, &hmac_credential(secret))
            .is_ok());
    }

    #[test]
    fn wrong_key_fails_verification() {
        let (root, signature) = signed_document(b"0123456789abcdef0123456789abcdef");

        let verifier = SignatureVerifier::new(Arc::new(AlgorithmRegistry::with_defaults()));
        let result = verifier.verify(
            &root,
            &signature,
            &hmac_credential(b"ffffffffffffffffffffffffffffffff"),
        );
        assert!(matches!(result, Err(SignatureError::Verification(_))));
    }

    #[test]
    fn tampered_content_fails_the_digest() {
        let secret = b"0123456789abcdef0123456789abcdef";
        let (mut root, signature) = signed_document(secret);
        root.append_child(Element::new(QName::new("urn:example", "Injected")));

        let verifier = SignatureVerifier::new(Arc::new(AlgorithmRegistry::with_defaults()));
        let result = verifier.verify(&root, &signature, &hmac_credential(secret));
        assert!(matches!(result, Err(SignatureError::Verification(_))));
    }

    #[test]
    fn short_mac_key_is_rejected_by_strength_bound() {
        let (root, signature) = signed_document(b"0123456789abcdef0123456789abcdef");

        let verifier = SignatureVerifier::new(Arc::new(AlgorithmRegistry::with_defaults()));
        let result = verifier.verify(&root, &signature, &hmac_credential(b"short"));
        assert!(matches!(result, Err(SignatureError::KeyTooWeak { .. })));
    }

    #[test]
    fn missing_reference_target_is_reported() {
        let secret = b"0123456789abcdef0123456789abcdef";
        let (_, signature) = signed_document(secret);
        let unrelated = Element::new(QName::new("urn:example", "Other"));

        let verifier = SignatureVerifier::new(Arc::new(AlgorithmRegistry::with_defaults()));
        let result = verifier.verify(&unrelated, &signature, &hmac_credential(secret));
        assert!(matches!(result, Err(SignatureError::ReferenceNotFound(_))));
    }

    #[test]
    fn rsa_provider_rejects_ec_keys() {
        let result = verification_algorithm("RSA_PKCS1_SHA256", KeyAlgorithm::EcP256);
        assert!(matches!(result, Err(SignatureError::InvalidKey(_))));
        assert!(verification_algorithm("RSA_PKCS1_SHA256", KeyAlgorithm::Rsa).is_ok());
        assert!(
            verification_algorithm(signature_uris::RSA_SHA256, KeyAlgorithm::Rsa).is_err(),
            "provider ids, not URIs, select implementations"
        );
    }
}
