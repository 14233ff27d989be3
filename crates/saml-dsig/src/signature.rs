//! The XML Signature element model.
//!
//! `ds:Signature` and its children (SignedInfo, SignatureValue, KeyInfo)
//! are fixed external wire shapes; the element tree they serialize to
//! must be byte-order stable because the SignedInfo octets feed signature
//! computation. The model therefore owns its whole subtree: its
//! marshaller and unmarshaller override the generic drivers and write or
//! read the fixed shape directly.

use std::any::Any;

use base64::Engine;

use saml_xml::dom::Element;
use saml_xml::error::UnmarshallingError;
use saml_xml::object::{XmlObject, XmlObjectBase};
use saml_xml::qname::QName;
use saml_xml::registry::{ProviderTriple, XmlObjectBuilder, XmlObjectRegistry};
use saml_xml::unmarshall::{NamespaceScope, UnmarshallContext, Unmarshaller};

use saml_security::criteria::KeyInfoData;

use crate::algorithms::XMLDSIG_NS;
use crate::error::SignatureError;

const DS_PREFIX: &str = "ds";

fn ds_name(local: &str) -> QName {
    QName::new(XMLDSIG_NS, local).with_prefix(DS_PREFIX)
}

/// The qualified name of `ds:Signature`.
#[must_use]
pub fn signature_qname() -> QName {
    ds_name("Signature")
}

/// One `ds:Reference` inside SignedInfo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reference {
    /// The reference URI, normally `""` or `#id` (same-document).
    pub uri: Option<String>,
    /// Transform algorithm URIs, in application order.
    pub transforms: Vec<String>,
    /// The digest algorithm URI.
    pub digest_method: String,
    /// The base64 digest value.
    pub digest_value: String,
}

/// The `ds:SignedInfo` content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedInfo {
    /// The canonicalization algorithm URI.
    pub canonicalization_method: String,
    /// The signature algorithm URI.
    pub signature_method: String,
    /// The references covered by this signature.
    pub references: Vec<Reference>,
}

/// The `ds:KeyInfo` content this stack models: key names and X.509
/// certificates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInfo {
    /// KeyName values.
    pub key_names: Vec<String>,
    /// Base64 DER certificates from X509Data.
    pub certificates: Vec<String>,
}

impl KeyInfo {
    /// Converts to the resolver-facing KeyInfo data, decoding the
    /// certificates.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Encoding`] if a certificate is not valid
    /// base64.
    pub fn to_key_info_data(&self) -> Result<KeyInfoData, SignatureError> {
        let mut certificates = Vec::with_capacity(self.certificates.len());
        for cert in &self.certificates {
            let compact: String = cert.chars().filter(|c| !c.is_whitespace()).collect();
            certificates.push(base64::engine::general_purpose::STANDARD.decode(compact)?);
        }
        Ok(KeyInfoData {
            key_names: self.key_names.clone(),
            public_keys: Vec::new(),
            certificates,
        })
    }
}

/// A `ds:Signature` object.
#[derive(Debug)]
pub struct Signature {
    base: XmlObjectBase,
    /// The SignedInfo content.
    pub signed_info: SignedInfo,
    /// The base64 signature value.
    pub signature_value: String,
    /// Optional KeyInfo identifying the verification key.
    pub key_info: Option<KeyInfo>,
}

impl Signature {
    /// Creates a signature object.
    #[must_use]
    pub fn new(signed_info: SignedInfo, signature_value: String, key_info: Option<KeyInfo>) -> Self {
        Self {
            base: XmlObjectBase::new(signature_qname()),
            signed_info,
            signature_value,
            key_info,
        }
    }

    /// Creates an empty signature, as built during unmarshalling.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(SignedInfo::default(), String::new(), None)
    }

    /// Builds the `ds:Signature` element for this object.
    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut signature = Element::new(signature_qname());
        signature.declare_namespace(Some(DS_PREFIX), XMLDSIG_NS);

        signature.append_child(signed_info_element(&self.signed_info));

        let mut value = Element::new(ds_name("SignatureValue"));
        value.append_text(&self.signature_value);
        signature.append_child(value);

        if let Some(key_info) = &self.key_info {
            signature.append_child(key_info_element(key_info));
        }

        signature
    }

    /// Parses a `ds:Signature` element.
    ///
    /// # Errors
    ///
    /// Returns [`UnmarshallingError`] when required children are absent.
    pub fn from_element(element: &Element) -> Result<Self, UnmarshallingError> {
        let signed_info_el = element.first_child(&ds_name("SignedInfo")).ok_or_else(|| {
            UnmarshallingError::MissingChild {
                element: element.name().clone(),
                child: "ds:SignedInfo".to_string(),
            }
        })?;
        let signed_info = parse_signed_info(signed_info_el)?;

        let signature_value = element
            .first_child(&ds_name("SignatureValue"))
            .map(|el| compact(&el.text()))
            .ok_or_else(|| UnmarshallingError::MissingChild {
                element: element.name().clone(),
                child: "ds:SignatureValue".to_string(),
            })?;

        let key_info = element
            .first_child(&ds_name("KeyInfo"))
            .map(parse_key_info);

        Ok(Self::new(signed_info, signature_value, key_info))
    }
}

impl XmlObject for Signature {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        // The fixed subtree is owned by the marshaller override.
        Vec::new()
    }

    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Builds the standalone `ds:SignedInfo` element.
///
/// Signing and verification both serialize this exact shape, so the
/// octets a verifier reconstructs from parsed values equal the octets
/// the signer produced.
#[must_use]
pub fn signed_info_element(signed_info: &SignedInfo) -> Element {
    let mut si = Element::new(ds_name("SignedInfo"));
    si.declare_namespace(Some(DS_PREFIX), XMLDSIG_NS);

    let mut c14n = Element::new(ds_name("CanonicalizationMethod"));
    c14n.set_attribute(
        QName::unqualified("Algorithm"),
        &signed_info.canonicalization_method,
    );
    si.append_child(c14n);

    let mut method = Element::new(ds_name("SignatureMethod"));
    method.set_attribute(QName::unqualified("Algorithm"), &signed_info.signature_method);
    si.append_child(method);

    for reference in &signed_info.references {
        let mut ref_el = Element::new(ds_name("Reference"));
        if let Some(uri) = &reference.uri {
            ref_el.set_attribute(QName::unqualified("URI"), uri);
        }

        if !reference.transforms.is_empty() {
            let mut transforms = Element::new(ds_name("Transforms"));
            for transform in &reference.transforms {
                let mut t = Element::new(ds_name("Transform"));
                t.set_attribute(QName::unqualified("Algorithm"), transform);
                transforms.append_child(t);
            }
            ref_el.append_child(transforms);
        }

        let mut digest_method = Element::new(ds_name("DigestMethod"));
        digest_method.set_attribute(QName::unqualified("Algorithm"), &reference.digest_method);
        ref_el.append_child(digest_method);

        let mut digest_value = Element::new(ds_name("DigestValue"));
        digest_value.append_text(&reference.digest_value);
        ref_el.append_child(digest_value);

        si.append_child(ref_el);
    }

    si
}

fn key_info_element(key_info: &KeyInfo) -> Element {
    let mut ki = Element::new(ds_name("KeyInfo"));
    for name in &key_info.key_names {
        let mut key_name = Element::new(ds_name("KeyName"));
        key_name.append_text(name);
        ki.append_child(key_name);
    }
    if !key_info.certificates.is_empty() {
        let mut x509_data = Element::new(ds_name("X509Data"));
        for cert in &key_info.certificates {
            let mut cert_el = Element::new(ds_name("X509Certificate"));
            cert_el.append_text(cert);
            x509_data.append_child(cert_el);
        }
        ki.append_child(x509_data);
    }
    ki
}

fn parse_signed_info(element: &Element) -> Result<SignedInfo, UnmarshallingError> {
    let algorithm = QName::unqualified("Algorithm");

    let canonicalization_method = element
        .first_child(&ds_name("CanonicalizationMethod"))
        .and_then(|el| el.attribute_value(&algorithm))
        .ok_or_else(|| UnmarshallingError::MissingChild {
            element: element.name().clone(),
            child: "ds:CanonicalizationMethod".to_string(),
        })?
        .to_string();

    let signature_method = element
        .first_child(&ds_name("SignatureMethod"))
        .and_then(|el| el.attribute_value(&algorithm))
        .ok_or_else(|| UnmarshallingError::MissingChild {
            element: element.name().clone(),
            child: "ds:SignatureMethod".to_string(),
        })?
        .to_string();

    let mut references = Vec::new();
    for ref_el in element
        .child_elements()
        .filter(|el| el.name() == &ds_name("Reference"))
    {
        let uri = ref_el
            .attribute_value(&QName::unqualified("URI"))
            .map(str::to_owned);

        let transforms = ref_el
            .first_child(&ds_name("Transforms"))
            .map(|transforms_el| {
                transforms_el
                    .child_elements()
                    .filter_map(|t| t.attribute_value(&algorithm))
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        let digest_method = ref_el
            .first_child(&ds_name("DigestMethod"))
            .and_then(|el| el.attribute_value(&algorithm))
            .ok_or_else(|| UnmarshallingError::MissingChild {
                element: ref_el.name().clone(),
                child: "ds:DigestMethod".to_string(),
            })?
            .to_string();

        let digest_value = ref_el
            .first_child(&ds_name("DigestValue"))
            .map(|el| compact(&el.text()))
            .ok_or_else(|| UnmarshallingError::MissingChild {
                element: ref_el.name().clone(),
                child: "ds:DigestValue".to_string(),
            })?;

        references.push(Reference {
            uri,
            transforms,
            digest_method,
            digest_value,
        });
    }

    Ok(SignedInfo {
        canonicalization_method,
        signature_method,
        references,
    })
}

fn parse_key_info(element: &Element) -> KeyInfo {
    let key_names = element
        .child_elements()
        .filter(|el| el.name() == &ds_name("KeyName"))
        .map(|el| el.text().trim().to_string())
        .collect();

    let certificates = element
        .child_elements()
        .filter(|el| el.name() == &ds_name("X509Data"))
        .flat_map(Element::child_elements)
        .filter(|el| el.name() == &ds_name("X509Certificate"))
        .map(|el| compact(&el.text()))
        .collect();

    KeyInfo {
        key_names,
        certificates,
    }
}

fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Builds empty [`Signature`] objects.
#[derive(Debug, Default)]
pub struct SignatureBuilder;

impl XmlObjectBuilder for SignatureBuilder {
    fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
        Box::new(Signature::empty())
    }
}

/// Marshals [`Signature`] objects by emitting their fixed subtree.
#[derive(Debug, Default)]
pub struct SignatureMarshaller;

impl saml_xml::marshall::Marshaller for SignatureMarshaller {
    fn marshall(
        &self,
        object: &mut dyn XmlObject,
        _registry: &XmlObjectRegistry,
    ) -> Result<Element, saml_xml::error::MarshallingError> {
        if let Some(cached) = object.base().cached_dom() {
            return Ok(cached.clone());
        }
        let signature = object
            .as_any()
            .downcast_ref::<Signature>()
            .ok_or_else(|| saml_xml::error::MarshallingError::Content(
                object.element_name().clone(),
                "expected a Signature object".to_string(),
            ))?;
        let element = signature.to_element();
        object.base_mut().set_cached_dom(element.clone());
        Ok(element)
    }
}

/// Unmarshals `ds:Signature` elements by parsing their fixed subtree.
#[derive(Debug, Default)]
pub struct SignatureUnmarshaller;

impl Unmarshaller for SignatureUnmarshaller {
    fn unmarshall(
        &self,
        element: &Element,
        _ctx: &UnmarshallContext<'_>,
        _scope: &mut NamespaceScope,
    ) -> Result<Box<dyn XmlObject>, UnmarshallingError> {
        let mut signature = Signature::from_element(element)?;
        signature.base_mut().set_cached_dom(element.clone());
        Ok(Box::new(signature))
    }
}

/// Registers the `ds:Signature` provider triple.
pub fn register_dsig_providers(registry: &XmlObjectRegistry) {
    registry.register(
        signature_qname(),
        ProviderTriple::new(SignatureBuilder, SignatureMarshaller, SignatureUnmarshaller),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{c14n_uris, digest_uris, signature_uris, transform_uris};

    fn sample_signature() -> Signature {
        Signature::new(
            SignedInfo {
                canonicalization_method: c14n_uris::EXCLUSIVE.to_string(),
                signature_method: signature_uris::RSA_SHA256.to_string(),
                references: vec![Reference {
                    uri: Some("#_id123".to_string()),
                    transforms: vec![
                        transform_uris::ENVELOPED.to_string(),
                        c14n_uris::EXCLUSIVE.to_string(),
                    ],
                    digest_method: digest_uris::SHA256.to_string(),
                    digest_value: "q83vEQ==".to_string(),
                }],
            },
            "c2lnbmF0dXJl".to_string(),
            Some(KeyInfo {
                key_names: vec!["signing-2026".to_string()],
                certificates: Vec::new(),
            }),
        )
    }

    #[test]
    fn element_round_trip_preserves_structure() {
        let signature = sample_signature();
        let element = signature.to_element();
        let reparsed = Signature::from_element(&element).unwrap();

        assert_eq!(reparsed.signed_info, signature.signed_info);
        assert_eq!(reparsed.signature_value, signature.signature_value);
        assert_eq!(reparsed.key_info, signature.key_info);
    }

    #[test]
    fn serialized_signed_info_is_stable() {
        let signature = sample_signature();
        let first = signed_info_element(&signature.signed_info).to_xml().unwrap();
        let second = signed_info_element(&signature.signed_info).to_xml().unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("<ds:SignedInfo"));
    }

    #[test]
    fn missing_signed_info_is_rejected() {
        let mut element = Element::new(signature_qname());
        element.declare_namespace(Some("ds"), XMLDSIG_NS);
        let result = Signature::from_element(&element);
        assert!(matches!(
            result,
            Err(UnmarshallingError::MissingChild { .. })
        ));
    }

    #[test]
    fn whitespace_in_values_is_compacted() {
        let mut signature = sample_signature();
        signature.signature_value = "c2ln\n  bmF0dXJl".to_string();
        let element = signature.to_element();
        let reparsed = Signature::from_element(&element).unwrap();
        assert_eq!(reparsed.signature_value, "c2lnbmF0dXJl");
    }

    #[test]
    fn key_info_decodes_certificates() {
        let der = b"fake-der-bytes";
        let key_info = KeyInfo {
            key_names: vec!["k".to_string()],
            certificates: vec![base64::engine::general_purpose::STANDARD.encode(der)],
        };
        let data = key_info.to_key_info_data().unwrap();
        assert_eq!(data.certificates, vec![der.to_vec()]);
        assert_eq!(data.key_names, ["k"]);
    }
}
