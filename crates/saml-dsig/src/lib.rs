//! XML Signature and XML Encryption support.
//!
//! Sits between the object model (`saml-xml`) and credential resolution
//! (`saml-security`):
//!
//! - [`algorithms`] - Algorithm descriptors keyed by URI; verification
//!   and decryption select provider implementations from the URI alone
//! - [`signature`] - The `ds:Signature` wire shape and its provider
//!   triple
//! - [`profile`] - Structural prevalidation, run before any cryptography
//! - [`sign`] / [`verify`] - Enveloped signature creation and two-phase
//!   verification against resolved credentials
//! - [`encryption`] - `xenc:EncryptedData` handling and the decryption
//!   pre-transform for unmarshalling

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod algorithms;
mod crypto;
pub mod encryption;
pub mod error;
pub mod profile;
pub mod sign;
pub mod signature;
pub mod verify;

pub use algorithms::{
    AlgorithmCategory, AlgorithmDescriptor, AlgorithmRegistry, DigestFamily, XMLDSIG_NS, XMLENC_NS,
};
pub use encryption::{
    encrypted_data_qname, CipherReferenceResolver, Decrypter, EncryptedData, Encrypter,
};
pub use error::{EncryptionError, SignatureError, SignatureResult};
pub use profile::SignatureProfileValidator;
pub use sign::{SignatureSigner, SigningConfig};
pub use signature::{
    register_dsig_providers, signature_qname, KeyInfo, Reference, Signature, SignedInfo,
};
pub use verify::SignatureVerifier;
