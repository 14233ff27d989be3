//! Enveloped signature creation.
//!
//! Computes the digest of the element to sign (with any existing
//! signatures excluded), builds the SignedInfo shape, signs its canonical
//! serialization with the credential's key, and appends the resulting
//! `ds:Signature` element to the document.

use std::sync::Arc;

use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::signature::{
    EcdsaKeyPair, RsaKeyPair, ECDSA_P256_SHA256_FIXED_SIGNING, ECDSA_P384_SHA384_FIXED_SIGNING,
};
use aws_lc_rs::{digest, hmac, signature as crypto_signature};
use base64::Engine;

use saml_security::credential::{Credential, KeyAlgorithm, KeyMaterial};
use saml_xml::dom::Element;

use crate::algorithms::{c14n_uris, digest_uris, signature_uris, transform_uris, AlgorithmRegistry};
use crate::crypto::{canonical_bytes, digest_algorithm};
use crate::error::{SignatureError, SignatureResult};
use crate::profile::SignatureProfileValidator;
use crate::signature::{signed_info_element, KeyInfo, Reference, Signature, SignedInfo};

/// Configuration for signature creation.
#[derive(Debug, Clone)]
pub struct SigningConfig {
    /// The signature algorithm URI.
    pub signature_method: String,
    /// The digest algorithm URI.
    pub digest_method: String,
    /// The canonicalization algorithm URI.
    pub canonicalization_method: String,
    /// Whether to emit a KeyInfo naming the signing credential.
    pub include_key_info: bool,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            signature_method: signature_uris::RSA_SHA256.to_string(),
            digest_method: digest_uris::SHA256.to_string(),
            canonicalization_method: c14n_uris::EXCLUSIVE.to_string(),
            include_key_info: true,
        }
    }
}

impl SigningConfig {
    /// Configuration for HMAC-SHA256 signatures.
    #[must_use]
    pub fn hmac_sha256() -> Self {
        Self {
            signature_method: signature_uris::HMAC_SHA256.to_string(),
            ..Self::default()
        }
    }

    /// Configuration for ECDSA signatures with the given curve's method
    /// URI.
    #[must_use]
    pub fn ecdsa(signature_method: impl Into<String>) -> Self {
        Self {
            signature_method: signature_method.into(),
            ..Self::default()
        }
    }
}

/// Creates enveloped signatures over element trees.
pub struct SignatureSigner {
    algorithms: Arc<AlgorithmRegistry>,
    config: SigningConfig,
}

impl SignatureSigner {
    /// Creates a signer.
    #[must_use]
    pub fn new(algorithms: Arc<AlgorithmRegistry>, config: SigningConfig) -> Self {
        Self { algorithms, config }
    }

    /// Signs `root`, which must carry the XML ID `reference_id`, and
    /// appends the produced `ds:Signature` element to it.
    ///
    /// # Errors
    ///
    /// Returns a [`SignatureError`] when the configured algorithms are
    /// unknown or the credential's key material does not fit the
    /// signature method. `root` is not modified on failure.
    pub fn sign(
        &self,
        root: &mut Element,
        reference_id: &str,
        credential: &Credential,
    ) -> SignatureResult<Signature> {
        let digest_descriptor = self
            .algorithms
            .get(&self.config.digest_method)
            .ok_or_else(|| {
                SignatureError::UnsupportedAlgorithm(self.config.digest_method.clone())
            })?;
        let method_descriptor = self
            .algorithms
            .get(&self.config.signature_method)
            .ok_or_else(|| {
                SignatureError::UnsupportedAlgorithm(self.config.signature_method.clone())
            })?;

        let bytes = canonical_bytes(root)?;
        let algorithm = digest_algorithm(digest_descriptor.provider_id)?;
        let digest_value =
            base64::engine::general_purpose::STANDARD.encode(digest::digest(algorithm, &bytes));

        let signed_info = SignedInfo {
            canonicalization_method: self.config.canonicalization_method.clone(),
            signature_method: self.config.signature_method.clone(),
            references: vec![Reference {
                uri: Some(format!("#{reference_id}")),
                transforms: vec![
                    transform_uris::ENVELOPED.to_string(),
                    self.config.canonicalization_method.clone(),
                ],
                digest_method: self.config.digest_method.clone(),
                digest_value,
            }],
        };

        let data = signed_info_element(&signed_info)
            .to_xml()
            .map_err(|e| SignatureError::Encoding(e.to_string()))?;
        let raw_signature =
            self.compute_signature(method_descriptor.provider_id, &method_descriptor, credential, data.as_bytes())?;
        let signature_value = base64::engine::general_purpose::STANDARD.encode(raw_signature);

        let key_info = self
            .config
            .include_key_info
            .then(|| key_info_for(credential))
            .flatten();

        let signature = Signature::new(signed_info, signature_value, key_info);
        root.append_child(signature.to_element());
        Ok(signature)
    }

    fn compute_signature(
        &self,
        provider_id: &str,
        descriptor: &crate::algorithms::AlgorithmDescriptor,
        credential: &Credential,
        data: &[u8],
    ) -> SignatureResult<Vec<u8>> {
        match credential.key() {
            KeyMaterial::Secret(secret) => {
                #[allow(clippy::cast_possible_truncation)]
                SignatureProfileValidator::check_key_bits(descriptor, (secret.len() * 8) as u32)?;
                let key = match provider_id {
                    "HMAC_SHA256" => hmac::Key::new(hmac::HMAC_SHA256, secret),
                    other => {
                        return Err(SignatureError::UnsupportedAlgorithm(other.to_string()));
                    }
                };
                Ok(hmac::sign(&key, data).as_ref().to_vec())
            }
            KeyMaterial::Private {
                algorithm: KeyAlgorithm::Rsa,
                pkcs8,
            } => {
                let padding: &'static dyn crypto_signature::RsaEncoding = match provider_id {
                    "RSA_PKCS1_SHA256" => &crypto_signature::RSA_PKCS1_SHA256,
                    "RSA_PKCS1_SHA384" => &crypto_signature::RSA_PKCS1_SHA384,
                    "RSA_PKCS1_SHA512" => &crypto_signature::RSA_PKCS1_SHA512,
                    other => {
                        return Err(SignatureError::UnsupportedAlgorithm(other.to_string()));
                    }
                };
                let key_pair = RsaKeyPair::from_pkcs8(pkcs8)
                    .map_err(|e| SignatureError::InvalidKey(format!("invalid RSA key: {e}")))?;

                #[allow(clippy::cast_possible_truncation)]
                SignatureProfileValidator::check_key_bits(
                    descriptor,
                    (key_pair.public_modulus_len() * 8) as u32,
                )?;

                let rng = SystemRandom::new();
                let mut signature = vec![0u8; key_pair.public_modulus_len()];
                key_pair
                    .sign(padding, &rng, data, &mut signature)
                    .map_err(|e| SignatureError::Signing(format!("RSA signing failed: {e}")))?;
                Ok(signature)
            }
            KeyMaterial::Private {
                algorithm: curve @ (KeyAlgorithm::EcP256 | KeyAlgorithm::EcP384),
                pkcs8,
            } => {
                let signing = match (provider_id, curve) {
                    ("ECDSA_P256_SHA256_FIXED", KeyAlgorithm::EcP256) => {
                        &ECDSA_P256_SHA256_FIXED_SIGNING
                    }
                    ("ECDSA_P384_SHA384_FIXED", KeyAlgorithm::EcP384) => {
                        &ECDSA_P384_SHA384_FIXED_SIGNING
                    }
                    _ => {
                        return Err(SignatureError::InvalidKey(format!(
                            "{curve:?} key cannot sign {provider_id}"
                        )));
                    }
                };
                let key_pair = EcdsaKeyPair::from_pkcs8(signing, pkcs8)
                    .map_err(|e| SignatureError::InvalidKey(format!("invalid ECDSA key: {e}")))?;
                let rng = SystemRandom::new();
                let signature = key_pair
                    .sign(&rng, data)
                    .map_err(|e| SignatureError::Signing(format!("ECDSA signing failed: {e}")))?;
                Ok(signature.as_ref().to_vec())
            }
            KeyMaterial::Public { .. } => Err(SignatureError::InvalidKey(
                "cannot sign with a public key".to_string(),
            )),
        }
    }
}

fn key_info_for(credential: &Credential) -> Option<KeyInfo> {
    let key_names = credential.key_names().to_vec();
    let certificates: Vec<String> = credential
        .certificates()
        .iter()
        .map(|der| base64::engine::general_purpose::STANDARD.encode(der))
        .collect();
    if key_names.is_empty() && certificates.is_empty() {
        return None;
    }
    Some(KeyInfo {
        key_names,
        certificates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::signature_qname;
    use saml_xml::qname::QName;

    fn document() -> Element {
        let mut root = Element::new(QName::new("urn:example", "Doc").with_prefix("ex"));
        root.declare_namespace(Some("ex"), "urn:example");
        root.set_id_attribute(QName::unqualified("ID"), "_d1");
        root
    }

    fn mac_credential() -> Credential {
        Credential::new(KeyMaterial::Secret(
            b"0123456789abcdef0123456789abcdef".to_vec(),
        ))
        .with_key_name("mac-key")
    }

    fn signer() -> SignatureSigner {
        SignatureSigner::new(
            Arc::new(AlgorithmRegistry::with_defaults()),
            SigningConfig::hmac_sha256(),
        )
    }

    #[test]
    fn sign_appends_the_signature_element() {
        let mut root = document();
        let signature = signer().sign(&mut root, "_d1", &mac_credential()).unwrap();

        assert_eq!(root.child_elements().count(), 1);
        assert_eq!(root.child_elements().next().unwrap().name(), &signature_qname());
        assert!(!signature.signature_value.is_empty());
        assert_eq!(signature.signed_info.references.len(), 1);
        assert_eq!(
            signature.signed_info.references[0].uri.as_deref(),
            Some("#_d1")
        );
    }

    #[test]
    fn key_info_names_the_signing_key() {
        let mut root = document();
        let signature = signer().sign(&mut root, "_d1", &mac_credential()).unwrap();
        let key_info = signature.key_info.unwrap();
        assert_eq!(key_info.key_names, ["mac-key"]);
    }

    #[test]
    fn unknown_signature_method_fails_before_touching_root() {
        let mut root = document();
        let signer = SignatureSigner::new(
            Arc::new(AlgorithmRegistry::with_defaults()),
            SigningConfig {
                signature_method: "urn:example:bogus".to_string(),
                ..SigningConfig::default()
            },
        );

        let result = signer.sign(&mut root, "_d1", &mac_credential());
        assert!(matches!(
            result,
            Err(SignatureError::UnsupportedAlgorithm(_))
        ));
        assert!(root.children().is_empty());
    }

    #[test]
    fn weak_secret_is_rejected() {
        let mut root = document();
        let weak = Credential::new(KeyMaterial::Secret(b"tiny".to_vec()));
        let result = signer().sign(&mut root, "_d1", &weak);
        assert!(matches!(result, Err(SignatureError::KeyTooWeak { .. })));
        assert!(root.children().is_empty());
    }

    #[test]
    fn public_key_material_cannot_sign() {
        let mut root = document();
        let public = Credential::new(KeyMaterial::Public {
            algorithm: KeyAlgorithm::Rsa,
            key: vec![0u8; 16],
        });
        let result = signer().sign(&mut root, "_d1", &public);
        assert!(matches!(result, Err(SignatureError::InvalidKey(_))));
    }
}
