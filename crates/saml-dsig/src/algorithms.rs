//! Algorithm descriptors and the URI-keyed algorithm registry.
//!
//! Every algorithm the stack can process is described by an
//! [`AlgorithmDescriptor`] keyed by its XML algorithm URI. Verification
//! and decryption select their provider implementation purely from the
//! URI found in the document, so supporting a new algorithm means
//! registering a descriptor, not editing a switch.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// XML Digital Signature namespace URI.
pub const XMLDSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";

/// XML Encryption namespace URI.
pub const XMLENC_NS: &str = "http://www.w3.org/2001/04/xmlenc#";

/// XML Encryption 1.1 namespace URI.
pub const XMLENC11_NS: &str = "http://www.w3.org/2009/xmlenc11#";

/// Signature algorithm URIs.
pub mod signature_uris {
    /// RSA PKCS#1 v1.5 with SHA-1 (deprecated).
    pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
    /// RSA PKCS#1 v1.5 with SHA-256.
    pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
    /// RSA PKCS#1 v1.5 with SHA-384.
    pub const RSA_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384";
    /// RSA PKCS#1 v1.5 with SHA-512.
    pub const RSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512";
    /// ECDSA with SHA-256 (raw r||s signature value).
    pub const ECDSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256";
    /// ECDSA with SHA-384 (raw r||s signature value).
    pub const ECDSA_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha384";
    /// HMAC with SHA-256.
    pub const HMAC_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#hmac-sha256";
}

/// Digest algorithm URIs.
pub mod digest_uris {
    /// SHA-1 (deprecated).
    pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
    /// SHA-256.
    pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
    /// SHA-384.
    pub const SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#sha384";
    /// SHA-512.
    pub const SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";
}

/// Canonicalization algorithm URIs.
pub mod c14n_uris {
    /// Exclusive C14N without comments.
    pub const EXCLUSIVE: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
    /// Exclusive C14N with comments.
    pub const EXCLUSIVE_WITH_COMMENTS: &str = "http://www.w3.org/2001/10/xml-exc-c14n#WithComments";
    /// Inclusive C14N without comments.
    pub const INCLUSIVE: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
    /// Inclusive C14N with comments.
    pub const INCLUSIVE_WITH_COMMENTS: &str =
        "http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments";
}

/// Transform algorithm URIs.
pub mod transform_uris {
    /// Enveloped signature transform.
    pub const ENVELOPED: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
}

/// Block cipher and key transport URIs.
pub mod cipher_uris {
    /// AES-128 in GCM mode.
    pub const AES128_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes128-gcm";
    /// AES-256 in GCM mode.
    pub const AES256_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes256-gcm";
    /// RSA-OAEP key transport.
    pub const RSA_OAEP_MGF1P: &str = "http://www.w3.org/2001/04/xmlenc#rsa-oaep-mgf1p";
}

/// What kind of operation an algorithm performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmCategory {
    /// Message digest.
    #[serde(rename = "digest")]
    Digest,

    /// Public-key signature.
    #[serde(rename = "signature")]
    Signature,

    /// Keyed MAC.
    #[serde(rename = "mac")]
    Mac,

    /// Symmetric block cipher.
    #[serde(rename = "block-cipher")]
    BlockCipher,

    /// Asymmetric key transport.
    #[serde(rename = "key-transport")]
    KeyTransport,

    /// Canonicalization method.
    #[serde(rename = "c14n")]
    Canonicalization,
}

/// The digest family an algorithm is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestFamily {
    /// SHA-1 (deprecated).
    #[serde(rename = "SHA1")]
    Sha1,
    /// SHA-256.
    #[serde(rename = "SHA256")]
    Sha256,
    /// SHA-384.
    #[serde(rename = "SHA384")]
    Sha384,
    /// SHA-512.
    #[serde(rename = "SHA512")]
    Sha512,
}

/// Describes one algorithm: its URI, category, the provider-level
/// identifier implementations dispatch on, and, for digest-bearing
/// algorithms, the digest family.
#[derive(Debug, Clone, Serialize)]
pub struct AlgorithmDescriptor {
    /// The XML algorithm URI.
    pub uri: &'static str,

    /// The operation category.
    pub category: AlgorithmCategory,

    /// Provider-level identifier, e.g. `RSA_PKCS1_SHA256`.
    pub provider_id: &'static str,

    /// The digest family for digest/signature/MAC algorithms.
    pub digest: Option<DigestFamily>,

    /// Minimum key size in bits, where the profile bounds one.
    pub min_key_bits: Option<u32>,

    /// Whether the profile considers this algorithm deprecated.
    pub deprecated: bool,
}

/// URI-keyed registry of algorithm descriptors.
///
/// Constructed explicitly (usually via
/// [`AlgorithmRegistry::with_defaults`]) and shared by reference; safe
/// for concurrent lookup and registration.
#[derive(Default)]
pub struct AlgorithmRegistry {
    by_uri: DashMap<&'static str, Arc<AlgorithmDescriptor>>,
}

impl AlgorithmRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry populated with the algorithms this stack
    /// implements.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for descriptor in default_descriptors() {
            registry.register(descriptor);
        }
        registry
    }

    /// Registers a descriptor, replacing any previous entry for its URI.
    pub fn register(&self, descriptor: AlgorithmDescriptor) {
        self.by_uri.insert(descriptor.uri, Arc::new(descriptor));
    }

    /// Looks up the descriptor for an algorithm URI.
    #[must_use]
    pub fn get(&self, uri: &str) -> Option<Arc<AlgorithmDescriptor>> {
        self.by_uri.get(uri).map(|entry| entry.clone())
    }

    /// Number of registered descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_uri.len()
    }

    /// Returns true if no descriptors are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_uri.is_empty()
    }
}

fn default_descriptors() -> Vec<AlgorithmDescriptor> {
    use AlgorithmCategory::{BlockCipher, Canonicalization, Digest, KeyTransport, Mac, Signature};
    use DigestFamily::{Sha1, Sha256, Sha384, Sha512};

    vec![
        // Digests
        AlgorithmDescriptor {
            uri: digest_uris::SHA1,
            category: Digest,
            provider_id: "SHA1",
            digest: Some(Sha1),
            min_key_bits: None,
            deprecated: true,
        },
        AlgorithmDescriptor {
            uri: digest_uris::SHA256,
            category: Digest,
            provider_id: "SHA256",
            digest: Some(Sha256),
            min_key_bits: None,
            deprecated: false,
        },
        AlgorithmDescriptor {
            uri: digest_uris::SHA384,
            category: Digest,
            provider_id: "SHA384",
            digest: Some(Sha384),
            min_key_bits: None,
            deprecated: false,
        },
        AlgorithmDescriptor {
            uri: digest_uris::SHA512,
            category: Digest,
            provider_id: "SHA512",
            digest: Some(Sha512),
            min_key_bits: None,
            deprecated: false,
        },
        // Signatures
        AlgorithmDescriptor {
            uri: signature_uris::RSA_SHA1,
            category: Signature,
            provider_id: "RSA_PKCS1_SHA1",
            digest: Some(Sha1),
            min_key_bits: Some(2048),
            deprecated: true,
        },
        AlgorithmDescriptor {
            uri: signature_uris::RSA_SHA256,
            category: Signature,
            provider_id: "RSA_PKCS1_SHA256",
            digest: Some(Sha256),
            min_key_bits: Some(2048),
            deprecated: false,
        },
        AlgorithmDescriptor {
            uri: signature_uris::RSA_SHA384,
            category: Signature,
            provider_id: "RSA_PKCS1_SHA384",
            digest: Some(Sha384),
            min_key_bits: Some(2048),
            deprecated: false,
        },
        AlgorithmDescriptor {
            uri: signature_uris::RSA_SHA512,
            category: Signature,
            provider_id: "RSA_PKCS1_SHA512",
            digest: Some(Sha512),
            min_key_bits: Some(2048),
            deprecated: false,
        },
        AlgorithmDescriptor {
            uri: signature_uris::ECDSA_SHA256,
            category: Signature,
            provider_id: "ECDSA_P256_SHA256_FIXED",
            digest: Some(Sha256),
            min_key_bits: Some(256),
            deprecated: false,
        },
        AlgorithmDescriptor {
            uri: signature_uris::ECDSA_SHA384,
            category: Signature,
            provider_id: "ECDSA_P384_SHA384_FIXED",
            digest: Some(Sha384),
            min_key_bits: Some(384),
            deprecated: false,
        },
        // MACs
        AlgorithmDescriptor {
            uri: signature_uris::HMAC_SHA256,
            category: Mac,
            provider_id: "HMAC_SHA256",
            digest: Some(Sha256),
            min_key_bits: Some(128),
            deprecated: false,
        },
        // Block ciphers
        AlgorithmDescriptor {
            uri: cipher_uris::AES128_GCM,
            category: BlockCipher,
            provider_id: "AES_128_GCM",
            digest: None,
            min_key_bits: Some(128),
            deprecated: false,
        },
        AlgorithmDescriptor {
            uri: cipher_uris::AES256_GCM,
            category: BlockCipher,
            provider_id: "AES_256_GCM",
            digest: None,
            min_key_bits: Some(256),
            deprecated: false,
        },
        // Key transport
        AlgorithmDescriptor {
            uri: cipher_uris::RSA_OAEP_MGF1P,
            category: KeyTransport,
            provider_id: "RSA_OAEP_SHA1_MGF1P",
            digest: Some(Sha1),
            min_key_bits: Some(2048),
            deprecated: false,
        },
        // Canonicalization
        AlgorithmDescriptor {
            uri: c14n_uris::EXCLUSIVE,
            category: Canonicalization,
            provider_id: "EXC_C14N",
            digest: None,
            min_key_bits: None,
            deprecated: false,
        },
        AlgorithmDescriptor {
            uri: c14n_uris::EXCLUSIVE_WITH_COMMENTS,
            category: Canonicalization,
            provider_id: "EXC_C14N_WITH_COMMENTS",
            digest: None,
            min_key_bits: None,
            deprecated: false,
        },
        AlgorithmDescriptor {
            uri: c14n_uris::INCLUSIVE,
            category: Canonicalization,
            provider_id: "C14N",
            digest: None,
            min_key_bits: None,
            deprecated: false,
        },
        AlgorithmDescriptor {
            uri: c14n_uris::INCLUSIVE_WITH_COMMENTS,
            category: Canonicalization,
            provider_id: "C14N_WITH_COMMENTS",
            digest: None,
            min_key_bits: None,
            deprecated: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_core_algorithms() {
        let registry = AlgorithmRegistry::with_defaults();
        for uri in [
            signature_uris::RSA_SHA256,
            signature_uris::ECDSA_SHA256,
            signature_uris::HMAC_SHA256,
            digest_uris::SHA256,
            cipher_uris::AES128_GCM,
            c14n_uris::EXCLUSIVE,
        ] {
            assert!(registry.get(uri).is_some(), "missing descriptor for {uri}");
        }
    }

    #[test]
    fn unknown_uri_has_no_descriptor() {
        let registry = AlgorithmRegistry::with_defaults();
        assert!(registry.get("urn:example:not-an-algorithm").is_none());
    }

    #[test]
    fn descriptor_carries_digest_family_and_category() {
        let registry = AlgorithmRegistry::with_defaults();
        let hmac = registry.get(signature_uris::HMAC_SHA256).unwrap();
        assert_eq!(hmac.category, AlgorithmCategory::Mac);
        assert_eq!(hmac.digest, Some(DigestFamily::Sha256));
        assert_eq!(hmac.min_key_bits, Some(128));
    }

    #[test]
    fn sha1_is_marked_deprecated() {
        let registry = AlgorithmRegistry::with_defaults();
        assert!(registry.get(digest_uris::SHA1).unwrap().deprecated);
        assert!(registry.get(signature_uris::RSA_SHA1).unwrap().deprecated);
    }
}
