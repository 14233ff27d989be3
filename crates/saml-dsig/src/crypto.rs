//! Provider-level crypto helpers shared by signing and verification.

use aws_lc_rs::digest;

use saml_xml::dom::Element;

use crate::error::SignatureError;
use crate::signature::signature_qname;

/// Maps a digest provider identifier to its implementation.
pub(crate) fn digest_algorithm(
    provider_id: &str,
) -> Result<&'static digest::Algorithm, SignatureError> {
    match provider_id {
        "SHA1" => Ok(&digest::SHA1_FOR_LEGACY_USE_ONLY),
        "SHA256" => Ok(&digest::SHA256),
        "SHA384" => Ok(&digest::SHA384),
        "SHA512" => Ok(&digest::SHA512),
        other => Err(SignatureError::UnsupportedAlgorithm(other.to_string())),
    }
}

/// Serializes an element for digesting, with any enveloped `ds:Signature`
/// children removed.
///
/// Both the signer and the verifier run this exact serialization, which
/// is what makes the digest reproducible; it is an exclusive-C14N subset
/// sufficient for documents this stack itself produces.
pub(crate) fn canonical_bytes(element: &Element) -> Result<Vec<u8>, SignatureError> {
    let mut detached = element.clone();
    detached.remove_children(&signature_qname());
    detached
        .to_xml()
        .map(String::into_bytes)
        .map_err(|e| SignatureError::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use saml_xml::qname::QName;

    #[test]
    fn unknown_digest_provider_is_rejected() {
        assert!(digest_algorithm("SHA256").is_ok());
        assert!(digest_algorithm("MD5").is_err());
    }

    #[test]
    fn canonical_bytes_exclude_the_signature() {
        let mut element = Element::new(QName::new("urn:example", "Doc"));
        element.append_child(Element::new(signature_qname()));
        element.append_child(Element::new(QName::new("urn:example", "Body")));

        let bytes = canonical_bytes(&element).unwrap();
        let serialized = String::from_utf8(bytes).unwrap();
        assert!(!serialized.contains("Signature"));
        assert!(serialized.contains("Body"));
    }
}
