//! Credential model.
//!
//! A [`Credential`] bundles opaque key material with its usage type and
//! identifying metadata. Credentials are constructed by resolvers (or
//! seeded statically) and never mutated afterwards.

use aws_lc_rs::digest;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// How a credential is intended to be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UsageType {
    /// Usable for both signing and encryption.
    #[default]
    #[serde(rename = "unspecified")]
    Unspecified,

    /// Signing / signature verification only.
    #[serde(rename = "signing")]
    Signing,

    /// Encryption / decryption only.
    #[serde(rename = "encryption")]
    Encryption,
}

impl UsageType {
    /// Returns true if a credential with this usage satisfies a request
    /// for `requested`. An unspecified usage on either side matches.
    #[must_use]
    pub const fn satisfies(self, requested: UsageType) -> bool {
        matches!(
            (self, requested),
            (UsageType::Unspecified, _)
                | (_, UsageType::Unspecified)
                | (UsageType::Signing, UsageType::Signing)
                | (UsageType::Encryption, UsageType::Encryption)
        )
    }
}

/// The key algorithm family of asymmetric key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    /// RSA.
    #[serde(rename = "RSA")]
    Rsa,

    /// ECDSA over NIST P-256.
    #[serde(rename = "EC-P256")]
    EcP256,

    /// ECDSA over NIST P-384.
    #[serde(rename = "EC-P384")]
    EcP384,
}

/// Opaque key material carried by a credential.
///
/// Public key bytes are the raw content of the SubjectPublicKeyInfo BIT
/// STRING (`RSAPublicKey` DER for RSA, the uncompressed point for EC);
/// private keys are PKCS#8 DER.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// A public key for verification or key transport.
    Public {
        /// The key algorithm family.
        algorithm: KeyAlgorithm,
        /// Raw public key bytes.
        key: Vec<u8>,
    },

    /// A private key for signing or decryption.
    Private {
        /// The key algorithm family.
        algorithm: KeyAlgorithm,
        /// PKCS#8 DER private key bytes.
        pkcs8: Vec<u8>,
    },

    /// A symmetric secret (HMAC key or content-encryption key).
    Secret(Vec<u8>),
}

/// Provenance of a resolved credential, attached for downstream policy
/// decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialContext {
    /// Derived from a KeyInfo element.
    KeyInfo {
        /// Key names carried by the originating KeyInfo.
        key_names: Vec<String>,
    },

    /// Published in entity metadata.
    Metadata {
        /// The owning entity's ID.
        entity_id: String,
    },

    /// Seeded into a static resolver.
    Static,
}

/// Key material plus usage type and identifying metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    entity_id: Option<String>,
    key_names: Vec<String>,
    usage: UsageType,
    key: KeyMaterial,
    certificates: Vec<Vec<u8>>,
    contexts: Vec<CredentialContext>,
}

impl Credential {
    /// Creates a credential around key material.
    #[must_use]
    pub fn new(key: KeyMaterial) -> Self {
        Self {
            entity_id: None,
            key_names: Vec::new(),
            usage: UsageType::Unspecified,
            key,
            certificates: Vec::new(),
            contexts: Vec::new(),
        }
    }

    /// Sets the owning entity's ID.
    #[must_use]
    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Adds a key name.
    #[must_use]
    pub fn with_key_name(mut self, name: impl Into<String>) -> Self {
        self.key_names.push(name.into());
        self
    }

    /// Sets the usage type.
    #[must_use]
    pub fn with_usage(mut self, usage: UsageType) -> Self {
        self.usage = usage;
        self
    }

    /// Appends a DER certificate to the chain (leaf first).
    #[must_use]
    pub fn with_certificate(mut self, der: Vec<u8>) -> Self {
        self.certificates.push(der);
        self
    }

    /// Attaches a provenance context.
    #[must_use]
    pub fn with_context(mut self, context: CredentialContext) -> Self {
        self.contexts.push(context);
        self
    }

    /// The owning entity's ID, if known.
    #[must_use]
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Names identifying this key.
    #[must_use]
    pub fn key_names(&self) -> &[String] {
        &self.key_names
    }

    /// The usage type.
    #[must_use]
    pub const fn usage(&self) -> UsageType {
        self.usage
    }

    /// The key material.
    #[must_use]
    pub fn key(&self) -> &KeyMaterial {
        &self.key
    }

    /// The DER certificate chain, leaf first.
    #[must_use]
    pub fn certificates(&self) -> &[Vec<u8>] {
        &self.certificates
    }

    /// Provenance contexts recorded by the resolver that produced this
    /// credential.
    #[must_use]
    pub fn contexts(&self) -> &[CredentialContext] {
        &self.contexts
    }

    /// A short, stable fingerprint of the key material, used to
    /// de-duplicate credentials across resolver sources.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let bytes = match &self.key {
            KeyMaterial::Public { key, .. } => key.as_slice(),
            KeyMaterial::Private { pkcs8, .. } => pkcs8.as_slice(),
            KeyMaterial::Secret(secret) => secret.as_slice(),
        };
        let hash = digest::digest(&digest::SHA256, bytes);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&hash.as_ref()[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(bytes: &[u8]) -> Credential {
        Credential::new(KeyMaterial::Secret(bytes.to_vec()))
    }

    #[test]
    fn usage_matching_is_open_for_unspecified() {
        assert!(UsageType::Unspecified.satisfies(UsageType::Signing));
        assert!(UsageType::Signing.satisfies(UsageType::Unspecified));
        assert!(UsageType::Signing.satisfies(UsageType::Signing));
        assert!(!UsageType::Signing.satisfies(UsageType::Encryption));
    }

    #[test]
    fn fingerprint_is_stable_and_distinguishes_keys() {
        let a = secret(b"key-one");
        let b = secret(b"key-two");
        assert_eq!(a.fingerprint(), secret(b"key-one").fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn builder_accumulates_metadata() {
        let cred = secret(b"k")
            .with_entity_id("https://idp.example.com")
            .with_key_name("signing-2026")
            .with_usage(UsageType::Signing)
            .with_context(CredentialContext::Static);

        assert_eq!(cred.entity_id(), Some("https://idp.example.com"));
        assert_eq!(cred.key_names(), ["signing-2026"]);
        assert_eq!(cred.usage(), UsageType::Signing);
        assert_eq!(cred.contexts(), [CredentialContext::Static]);
    }
}
