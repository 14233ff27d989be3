//! XML Encryption support.
//!
//! Models the `xenc:EncryptedData` wire shape, detects encrypted content
//! during unmarshalling, and decrypts it with a credential-resolved
//! content-encryption key. The [`Decrypter`] plugs into the unmarshalling
//! walk as its decryption pre-transform, so callers observe decrypted
//! plaintext elements and never ciphertext structure.
//!
//! Ciphertext layout follows XML Encryption: the CipherValue octets are
//! the GCM IV (12 bytes) followed by the ciphertext and authentication
//! tag.

use std::sync::Arc;

use aws_lc_rs::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_128_GCM, AES_256_GCM, NONCE_LEN};
use aws_lc_rs::rand::{SecureRandom, SystemRandom};
use base64::Engine;

use saml_security::credential::{Credential, KeyMaterial, UsageType};
use saml_security::criteria::{CriteriaSet, Criterion, KeyInfoData};
use saml_security::resolver::CredentialResolver;
use saml_xml::dom::Element;
use saml_xml::error::UnmarshallingError;
use saml_xml::qname::QName;
use saml_xml::unmarshall::DecryptionProvider;

use crate::algorithms::{cipher_uris, XMLDSIG_NS, XMLENC_NS};
use crate::error::EncryptionError;
use crate::signature::KeyInfo;

const XENC_PREFIX: &str = "xenc";

fn xenc_name(local: &str) -> QName {
    QName::new(XMLENC_NS, local).with_prefix(XENC_PREFIX)
}

/// The qualified name of `xenc:EncryptedData`.
#[must_use]
pub fn encrypted_data_qname() -> QName {
    xenc_name("EncryptedData")
}

/// Parsed `xenc:EncryptedData` content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    /// The block cipher algorithm URI from EncryptionMethod.
    pub algorithm: String,
    /// Optional KeyInfo identifying the content-encryption key.
    pub key_info: Option<KeyInfo>,
    /// Inline ciphertext from CipherValue, decoded.
    pub cipher_value: Option<Vec<u8>>,
    /// A CipherReference URI, when the ciphertext lives elsewhere.
    pub cipher_reference: Option<String>,
}

impl EncryptedData {
    /// Returns true if the element is encrypted content this module can
    /// substitute: an `xenc:EncryptedData`, or a wrapper element (such as
    /// `saml:EncryptedAssertion`) whose only element child is one.
    #[must_use]
    pub fn is_encrypted_element(element: &Element) -> bool {
        if element.name() == &encrypted_data_qname() {
            return true;
        }
        let mut children = element.child_elements();
        matches!(
            (children.next(), children.next()),
            (Some(only), None) if only.name() == &encrypted_data_qname()
        )
    }

    /// Parses an `xenc:EncryptedData` element, looking through one
    /// wrapper level if needed.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptionError::Malformed`] when the element is not an
    /// EncryptedData shape or lacks an EncryptionMethod, and
    /// [`EncryptionError::MissingCipherData`] when it carries neither
    /// CipherValue nor CipherReference.
    pub fn from_element(element: &Element) -> Result<Self, EncryptionError> {
        let data_el = if element.name() == &encrypted_data_qname() {
            element
        } else {
            element
                .child_elements()
                .find(|c| c.name() == &encrypted_data_qname())
                .ok_or_else(|| {
                    EncryptionError::Malformed(format!(
                        "{} does not contain EncryptedData",
                        element.name()
                    ))
                })?
        };

        let algorithm = data_el
            .first_child(&xenc_name("EncryptionMethod"))
            .and_then(|el| el.attribute_value(&QName::unqualified("Algorithm")))
            .ok_or_else(|| {
                EncryptionError::Malformed("EncryptionMethod with Algorithm required".to_string())
            })?
            .to_string();

        let key_info = data_el
            .first_child(&QName::new(XMLDSIG_NS, "KeyInfo"))
            .map(|ki| KeyInfo {
                key_names: ki
                    .child_elements()
                    .filter(|el| el.name() == &QName::new(XMLDSIG_NS, "KeyName"))
                    .map(|el| el.text().trim().to_string())
                    .collect(),
                certificates: Vec::new(),
            });

        let cipher_data = data_el.first_child(&xenc_name("CipherData")).ok_or_else(|| {
            EncryptionError::MissingCipherData("CipherData element absent".to_string())
        })?;

        let cipher_value = match cipher_data.first_child(&xenc_name("CipherValue")) {
            Some(el) => {
                let compact: String =
                    el.text().chars().filter(|c| !c.is_whitespace()).collect();
                Some(
                    base64::engine::general_purpose::STANDARD
                        .decode(compact)
                        .map_err(|e| EncryptionError::Malformed(e.to_string()))?,
                )
            }
            None => None,
        };

        let cipher_reference = cipher_data
            .first_child(&xenc_name("CipherReference"))
            .and_then(|el| el.attribute_value(&QName::unqualified("URI")))
            .map(str::to_owned);

        if cipher_value.is_none() && cipher_reference.is_none() {
            return Err(EncryptionError::MissingCipherData(
                "neither CipherValue nor CipherReference present".to_string(),
            ));
        }

        Ok(Self {
            algorithm,
            key_info,
            cipher_value,
            cipher_reference,
        })
    }

    /// Builds the `xenc:EncryptedData` element for this content.
    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut data = Element::new(encrypted_data_qname());
        data.declare_namespace(Some(XENC_PREFIX), XMLENC_NS);

        let mut method = Element::new(xenc_name("EncryptionMethod"));
        method.set_attribute(QName::unqualified("Algorithm"), &self.algorithm);
        data.append_child(method);

        if let Some(key_info) = &self.key_info {
            let mut ki = Element::new(QName::new(XMLDSIG_NS, "KeyInfo").with_prefix("ds"));
            ki.declare_namespace(Some("ds"), XMLDSIG_NS);
            for name in &key_info.key_names {
                let mut key_name =
                    Element::new(QName::new(XMLDSIG_NS, "KeyName").with_prefix("ds"));
                key_name.append_text(name);
                ki.append_child(key_name);
            }
            data.append_child(ki);
        }

        let mut cipher_data = Element::new(xenc_name("CipherData"));
        if let Some(value) = &self.cipher_value {
            let mut cipher_value = Element::new(xenc_name("CipherValue"));
            cipher_value.append_text(base64::engine::general_purpose::STANDARD.encode(value));
            cipher_data.append_child(cipher_value);
        } else if let Some(uri) = &self.cipher_reference {
            let mut reference = Element::new(xenc_name("CipherReference"));
            reference.set_attribute(QName::unqualified("URI"), uri);
            cipher_data.append_child(reference);
        }
        data.append_child(cipher_data);

        data
    }
}

/// Dereferences CipherReference URIs for callers whose ciphertext lives
/// outside the document.
pub trait CipherReferenceResolver: Send + Sync {
    /// Fetches the ciphertext octets a CipherReference points at.
    ///
    /// # Errors
    ///
    /// Returns an [`EncryptionError`] when the reference cannot be
    /// resolved.
    fn dereference(&self, uri: &str) -> Result<Vec<u8>, EncryptionError>;
}

fn cipher_for(algorithm: &str) -> Result<&'static aws_lc_rs::aead::Algorithm, EncryptionError> {
    match algorithm {
        cipher_uris::AES128_GCM => Ok(&AES_128_GCM),
        cipher_uris::AES256_GCM => Ok(&AES_256_GCM),
        other => Err(EncryptionError::UnsupportedAlgorithm(other.to_string())),
    }
}

/// Encrypts elements into `xenc:EncryptedData` shapes.
pub struct Encrypter {
    credential: Credential,
    algorithm: String,
}

impl Encrypter {
    /// Creates an encrypter using the credential's secret key and the
    /// given block cipher URI.
    #[must_use]
    pub fn new(credential: Credential, algorithm: impl Into<String>) -> Self {
        Self {
            credential,
            algorithm: algorithm.into(),
        }
    }

    /// Encrypts an element, producing the EncryptedData that replaces it
    /// on the wire. A KeyInfo naming the key is included when the
    /// credential carries key names.
    ///
    /// # Errors
    ///
    /// Returns an [`EncryptionError`] for unsupported algorithms or
    /// unusable key material.
    pub fn encrypt(&self, element: &Element) -> Result<EncryptedData, EncryptionError> {
        let cipher = cipher_for(&self.algorithm)?;
        let KeyMaterial::Secret(secret) = self.credential.key() else {
            return Err(EncryptionError::Key(
                "content encryption requires a secret key".to_string(),
            ));
        };

        let plaintext = element
            .to_xml()
            .map_err(|e| EncryptionError::Plaintext(e.to_string()))?;

        let unbound = UnboundKey::new(cipher, secret)
            .map_err(|_| EncryptionError::Key("wrong key length for cipher".to_string()))?;
        let key = LessSafeKey::new(unbound);

        let rng = SystemRandom::new();
        let mut iv = [0u8; NONCE_LEN];
        rng.fill(&mut iv)
            .map_err(|_| EncryptionError::Decrypt("random IV generation failed".to_string()))?;

        let mut in_out = plaintext.into_bytes();
        key.seal_in_place_append_tag(
            Nonce::assume_unique_for_key(iv),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| EncryptionError::Decrypt("encryption failed".to_string()))?;

        let mut cipher_value = iv.to_vec();
        cipher_value.extend_from_slice(&in_out);

        let key_names = self.credential.key_names();
        let key_info = (!key_names.is_empty()).then(|| KeyInfo {
            key_names: key_names.to_vec(),
            certificates: Vec::new(),
        });

        Ok(EncryptedData {
            algorithm: self.algorithm.clone(),
            key_info,
            cipher_value: Some(cipher_value),
            cipher_reference: None,
        })
    }
}

/// Decrypts EncryptedData content with resolver-supplied keys; the
/// [`DecryptionProvider`] implementation plugs into unmarshalling.
pub struct Decrypter {
    key_resolver: Arc<dyn CredentialResolver>,
    reference_resolver: Option<Arc<dyn CipherReferenceResolver>>,
}

impl Decrypter {
    /// Creates a decrypter resolving content-encryption keys through the
    /// given resolver.
    #[must_use]
    pub fn new(key_resolver: Arc<dyn CredentialResolver>) -> Self {
        Self {
            key_resolver,
            reference_resolver: None,
        }
    }

    /// Attaches a CipherReference dereferencer.
    #[must_use]
    pub fn with_reference_resolver(mut self, resolver: Arc<dyn CipherReferenceResolver>) -> Self {
        self.reference_resolver = Some(resolver);
        self
    }

    /// Decrypts parsed EncryptedData back into its plaintext element.
    ///
    /// # Errors
    ///
    /// Returns an [`EncryptionError`] when no key resolves, the
    /// ciphertext fails authentication, or the plaintext is not a
    /// well-formed element.
    pub fn decrypt_data(&self, data: &EncryptedData) -> Result<Element, EncryptionError> {
        let cipher = cipher_for(&data.algorithm)?;

        let mut criteria = CriteriaSet::new().with(Criterion::Usage(UsageType::Encryption));
        if let Some(key_info) = &data.key_info {
            if let Some(name) = key_info.key_names.first() {
                criteria.insert(Criterion::KeyName(name.clone()));
            }
            criteria.insert(Criterion::KeyInfo(KeyInfoData {
                key_names: key_info.key_names.clone(),
                public_keys: Vec::new(),
                certificates: Vec::new(),
            }));
        }

        let credential = self
            .key_resolver
            .resolve_single(&criteria)
            .map_err(|e| EncryptionError::Key(e.to_string()))?
            .ok_or_else(|| EncryptionError::Key("no decryption key resolved".to_string()))?;
        let KeyMaterial::Secret(secret) = credential.key() else {
            return Err(EncryptionError::Key(
                "resolved credential is not a secret key".to_string(),
            ));
        };

        let ciphertext = match (&data.cipher_value, &data.cipher_reference) {
            (Some(value), _) => value.clone(),
            (None, Some(uri)) => {
                let resolver = self.reference_resolver.as_ref().ok_or_else(|| {
                    EncryptionError::MissingCipherData(format!(
                        "no resolver for CipherReference '{uri}'"
                    ))
                })?;
                resolver.dereference(uri)?
            }
            (None, None) => {
                return Err(EncryptionError::MissingCipherData(
                    "no ciphertext available".to_string(),
                ));
            }
        };

        if ciphertext.len() <= NONCE_LEN {
            return Err(EncryptionError::Decrypt("ciphertext too short".to_string()));
        }
        let (iv, body) = ciphertext.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(iv)
            .map_err(|_| EncryptionError::Decrypt("bad IV".to_string()))?;

        let unbound = UnboundKey::new(cipher, secret)
            .map_err(|_| EncryptionError::Key("wrong key length for cipher".to_string()))?;
        let key = LessSafeKey::new(unbound);

        let mut in_out = body.to_vec();
        let plaintext = key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| EncryptionError::Decrypt("authentication failed".to_string()))?;

        let text = std::str::from_utf8(plaintext)
            .map_err(|e| EncryptionError::Plaintext(e.to_string()))?;
        tracing::debug!(algorithm = %data.algorithm, "decrypted EncryptedData content");
        Element::parse(text).map_err(|e| EncryptionError::Plaintext(e.to_string()))
    }
}

impl DecryptionProvider for Decrypter {
    fn is_encrypted(&self, element: &Element) -> bool {
        EncryptedData::is_encrypted_element(element)
    }

    fn decrypt(&self, element: &Element) -> Result<Element, UnmarshallingError> {
        let data = EncryptedData::from_element(element)
            .map_err(|e| UnmarshallingError::Decryption(e.to_string()))?;
        self.decrypt_data(&data)
            .map_err(|e| UnmarshallingError::Decryption(e.to_string()))
    }
}
