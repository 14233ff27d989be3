//! Credential resolution from KeyInfo content.
//!
//! Derives credentials from the key values and certificates carried by a
//! KeyInfo element, supplied to [`CredentialResolver::resolve`] as a
//! [`Criterion::KeyInfo`] input. Each derived credential records its
//! KeyInfo provenance for downstream policy decisions.

use std::collections::HashSet;

use x509_parser::prelude::{FromDer, X509Certificate};
use x509_parser::public_key::PublicKey;

use crate::credential::{Credential, CredentialContext, KeyAlgorithm, KeyMaterial};
use crate::criteria::{CriteriaSet, KeyInfoData};
use crate::error::{ResolverError, ResolverResult};
use crate::resolver::{matches_common_criteria, CredentialResolver};

// Uncompressed point lengths for the supported curves.
const P256_POINT_LEN: usize = 65;
const P384_POINT_LEN: usize = 97;

/// Resolves credentials out of KeyInfo content.
#[derive(Debug, Default)]
pub struct KeyInfoCredentialResolver;

impl KeyInfoCredentialResolver {
    /// Creates a KeyInfo resolver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn credential_from_certificate(&self, der: &[u8]) -> ResolverResult<Option<Credential>> {
        let (_, certificate) = X509Certificate::from_der(der)
            .map_err(|e| ResolverError::Certificate(e.to_string()))?;

        let spki = certificate.public_key();
        let raw = spki.subject_public_key.data.to_vec();

        let algorithm = match spki.parsed() {
            Ok(PublicKey::RSA(_)) => KeyAlgorithm::Rsa,
            Ok(PublicKey::EC(point)) => match point.data().len() {
                P256_POINT_LEN => KeyAlgorithm::EcP256,
                P384_POINT_LEN => KeyAlgorithm::EcP384,
                other => {
                    return Err(ResolverError::InvalidKeyMaterial(format!(
                        "unsupported EC point length {other}"
                    )))
                }
            },
            Ok(_) | Err(_) => {
                tracing::debug!("skipping certificate with unsupported key type");
                return Ok(None);
            }
        };

        Ok(Some(
            Credential::new(KeyMaterial::Public {
                algorithm,
                key: raw,
            })
            .with_certificate(der.to_vec()),
        ))
    }

    fn derive(&self, data: &KeyInfoData) -> ResolverResult<Vec<Credential>> {
        let context = CredentialContext::KeyInfo {
            key_names: data.key_names.clone(),
        };

        let mut derived = Vec::new();

        // Key values first, then certificate-carried keys, matching the
        // precedence callers expect when both are present.
        for (algorithm, key) in &data.public_keys {
            derived.push(Credential::new(KeyMaterial::Public {
                algorithm: *algorithm,
                key: key.clone(),
            }));
        }
        for der in &data.certificates {
            if let Some(credential) = self.credential_from_certificate(der)? {
                derived.push(credential);
            }
        }

        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for credential in derived {
            let mut credential = credential.with_context(context.clone());
            for name in &data.key_names {
                credential = credential.with_key_name(name.clone());
            }
            if seen.insert(credential.fingerprint()) {
                unique.push(credential);
            }
        }
        Ok(unique)
    }
}

impl CredentialResolver for KeyInfoCredentialResolver {
    fn resolve(&self, criteria: &CriteriaSet) -> ResolverResult<Vec<Credential>> {
        let data = criteria.key_info().ok_or_else(|| {
            ResolverError::InsufficientCriteria("KeyInfo criterion required".to_string())
        })?;

        let derived = self.derive(data)?;
        Ok(derived
            .into_iter()
            .filter(|c| matches_common_criteria(c, criteria))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::Criterion;

    fn key_info_with_key(name: &str, key: &[u8]) -> KeyInfoData {
        KeyInfoData {
            key_names: vec![name.to_string()],
            public_keys: vec![(KeyAlgorithm::Rsa, key.to_vec())],
            certificates: Vec::new(),
        }
    }

    #[test]
    fn missing_key_info_criterion_is_an_error() {
        let resolver = KeyInfoCredentialResolver::new();
        let result = resolver.resolve(&CriteriaSet::new());
        assert!(matches!(
            result,
            Err(ResolverError::InsufficientCriteria(_))
        ));
    }

    #[test]
    fn key_value_becomes_credential_with_provenance() {
        let resolver = KeyInfoCredentialResolver::new();
        let criteria = CriteriaSet::new().with(Criterion::KeyInfo(key_info_with_key(
            "signing",
            b"raw-rsa-key",
        )));

        let resolved = resolver.resolve(&criteria).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].key_names(), ["signing"]);
        assert!(matches!(
            resolved[0].contexts(),
            [CredentialContext::KeyInfo { key_names }] if key_names == &["signing".to_string()]
        ));
    }

    #[test]
    fn duplicate_key_material_is_collapsed() {
        let resolver = KeyInfoCredentialResolver::new();
        let data = KeyInfoData {
            key_names: Vec::new(),
            public_keys: vec![
                (KeyAlgorithm::Rsa, b"same".to_vec()),
                (KeyAlgorithm::Rsa, b"same".to_vec()),
            ],
            certificates: Vec::new(),
        };
        let criteria = CriteriaSet::new().with(Criterion::KeyInfo(data));

        let resolved = resolver.resolve(&criteria).unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn other_criteria_still_filter_derived_credentials() {
        let resolver = KeyInfoCredentialResolver::new();
        let criteria = CriteriaSet::new()
            .with(Criterion::KeyInfo(key_info_with_key("k1", b"key")))
            .with(Criterion::KeyName("other-name".into()));

        let resolved = resolver.resolve(&criteria).unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn garbage_certificate_is_a_certificate_error() {
        let resolver = KeyInfoCredentialResolver::new();
        let data = KeyInfoData {
            key_names: Vec::new(),
            public_keys: Vec::new(),
            certificates: vec![b"not a certificate".to_vec()],
        };
        let criteria = CriteriaSet::new().with(Criterion::KeyInfo(data));

        let result = resolver.resolve(&criteria);
        assert!(matches!(result, Err(ResolverError::Certificate(_))));
    }
}
