//! End-to-end tests over the full stack: object trees, marshalling,
//! unmarshalling, signing, verification, and decryption-transparent
//! substitution.

use std::sync::Arc;

use saml_dsig::algorithms::{cipher_uris, AlgorithmRegistry};
use saml_dsig::encryption::{Decrypter, Encrypter};
use saml_dsig::sign::{SignatureSigner, SigningConfig};
use saml_dsig::verify::SignatureVerifier;
use saml_protocol::constants::{saml_name, NameIdFormat};
use saml_protocol::providers::register_saml_providers;
use saml_protocol::types::{
    Assertion, Attribute, AttributeStatement, AttributeValue, AuthnStatement, Conditions, NameId,
    Response, Subject, SubjectConfirmation, SubjectConfirmationData,
};
use saml_security::credential::{Credential, KeyMaterial, UsageType};
use saml_security::criteria::{CriteriaSet, Criterion};
use saml_security::resolver::{CredentialResolver, StaticCredentialResolver};
use saml_xml::dom::Element;
use saml_xml::error::UnmarshallingError;
use saml_xml::marshall::marshall_object;
use saml_xml::object::XmlObject;
use saml_xml::qname::QName;
use saml_xml::registry::{ProviderTriple, XmlObjectRegistry};
use saml_xml::unmarshall::{unmarshall_element, UnmarshallContext};

const IDP: &str = "https://idp.example.com";
const SP: &str = "https://sp.example.com";

fn saml_registry() -> XmlObjectRegistry {
    let registry = XmlObjectRegistry::new();
    register_saml_providers(&registry);
    registry
}

fn full_response() -> Response {
    let assertion = Assertion::new(IDP)
        .with_subject(
            Subject::new(NameId::email("user@example.com")).with_confirmation(
                SubjectConfirmation::bearer().with_data(SubjectConfirmationData::for_request(
                    "_req1",
                    format!("{SP}/acs"),
                )),
            ),
        )
        .with_conditions(Conditions::with_validity(5).with_audience(SP))
        .with_authn_statement(AuthnStatement::password_protected_transport())
        .with_attribute_statement(
            AttributeStatement::new()
                .with_attribute(
                    Attribute::single("email", "user@example.com").with_friendly_name("Email"),
                )
                .with_attribute(Attribute::new("roles").with_value("admin").with_value("user")),
        );

    Response::success(IDP)
        .in_response_to_request("_req1")
        .with_destination(format!("{SP}/acs"))
        .with_assertion(assertion)
}

#[test]
fn response_round_trips_through_xml() {
    let registry = saml_registry();
    let mut response = full_response();

    let element = marshall_object(&mut response, &registry).unwrap();
    let xml = element.to_xml().unwrap();

    let reparsed = Element::parse(&xml).unwrap();
    let ctx = UnmarshallContext::new(&registry);
    let object = unmarshall_element(&reparsed, &ctx).unwrap();
    let recovered = object
        .into_any()
        .downcast::<Response>()
        .expect("a samlp:Response unmarshals to the Response type");

    assert_eq!(recovered.id(), response.id());
    assert_eq!(recovered.version(), "2.0");
    assert_eq!(recovered.in_response_to(), Some("_req1"));
    assert!(recovered.is_success());
    assert_eq!(recovered.issuer().unwrap().value(), IDP);

    let assertion = recovered.first_assertion().unwrap();
    assert_eq!(assertion.issuer().unwrap().value(), IDP);
    let subject = assertion.subject().unwrap();
    assert_eq!(subject.name_id().unwrap().value(), "user@example.com");
    assert_eq!(
        subject.name_id().unwrap().format(),
        Some(NameIdFormat::Email.uri())
    );
    assert_eq!(subject.confirmations().len(), 1);
    assert!(assertion.conditions().unwrap().permits(
        SP,
        assertion.conditions().unwrap().not_before.unwrap()
    ));
    assert_eq!(assertion.authn_statements().len(), 1);

    let statement = &assertion.attribute_statements()[0];
    assert_eq!(statement.attributes().len(), 2);
    let roles: Vec<_> = statement.attributes()[1]
        .values()
        .iter()
        .map(AttributeValue::value)
        .collect();
    assert_eq!(roles, ["admin", "user"]);
}

#[test]
fn marshalling_unmutated_tree_is_idempotent() {
    let registry = saml_registry();
    let mut response = full_response();

    let first = marshall_object(&mut response, &registry).unwrap();
    let second = marshall_object(&mut response, &registry).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_xml().unwrap(), second.to_xml().unwrap());
}

#[test]
fn child_order_is_preserved_across_a_round_trip() {
    let registry = saml_registry();
    let mut statement = AttributeStatement::new()
        .with_attribute(Attribute::single("a", "1"))
        .with_attribute(Attribute::single("b", "2"))
        .with_attribute(Attribute::single("c", "3"));

    let element = marshall_object(&mut statement, &registry).unwrap();
    let marshalled_names: Vec<_> = element
        .child_elements()
        .map(|c| {
            c.attribute_value(&QName::unqualified("Name"))
                .unwrap()
                .to_string()
        })
        .collect();
    assert_eq!(marshalled_names, ["a", "b", "c"]);

    let ctx = UnmarshallContext::new(&registry);
    let object = unmarshall_element(&element, &ctx).unwrap();
    let recovered = object.into_any().downcast::<AttributeStatement>().unwrap();
    let recovered_names: Vec<_> = recovered
        .attributes()
        .iter()
        .map(|a| a.name().unwrap().to_string())
        .collect();
    assert_eq!(recovered_names, ["a", "b", "c"]);
}

#[test]
fn unknown_attributes_and_children_survive_a_round_trip() {
    let registry = saml_registry();

    let xml = format!(
        r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" xmlns:ext="urn:example:ext" ID="_a1" Version="2.0" IssueInstant="2026-08-05T12:00:00.000Z" ext:vendor="acme"><saml:Issuer>{IDP}</saml:Issuer><ext:Telemetry region="eu"><ext:Probe/></ext:Telemetry></saml:Assertion>"#
    );
    let element = Element::parse(&xml).unwrap();

    let ctx = UnmarshallContext::new(&registry);
    let mut object = unmarshall_element(&element, &ctx).unwrap();

    {
        let assertion = object.as_any().downcast_ref::<Assertion>().unwrap();
        let unknown = assertion.base().unknown_attributes();
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].value, "acme");
    }

    let remarshalled = marshall_object(object.as_mut(), &registry).unwrap();
    let serialized = remarshalled.to_xml().unwrap();
    assert!(serialized.contains("ext:vendor=\"acme\""));
    assert!(serialized.contains("<ext:Telemetry region=\"eu\">"));
    assert!(serialized.contains("<ext:Probe/>"));
}

#[test]
fn xsi_type_registration_takes_precedence() {
    let registry = saml_registry();
    // A schema type mapped to a different concrete type than the
    // element-name registration.
    registry.register_type(
        QName::new("urn:example:ext", "ScreenName"),
        ProviderTriple::new(
            saml_protocol::types::NameIdBuilder,
            saml_protocol::types::NameIdMarshaller,
            saml_protocol::types::NameIdUnmarshaller,
        ),
    );

    let xml = r#"<saml:AttributeValue xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:ext="urn:example:ext" xsi:type="ext:ScreenName">someone</saml:AttributeValue>"#;
    let element = Element::parse(xml).unwrap();

    let ctx = UnmarshallContext::new(&registry);
    let object = unmarshall_element(&element, &ctx).unwrap();

    // The xsi:type provider built a NameId even though the element name
    // is registered to AttributeValue.
    assert!(object.as_any().downcast_ref::<NameId>().is_some());
    assert_eq!(
        object.schema_type(),
        Some(&QName::new("urn:example:ext", "ScreenName"))
    );
}

#[test]
fn unregistered_element_without_default_is_terminal() {
    let registry = XmlObjectRegistry::new();
    let ctx = UnmarshallContext::new(&registry);
    let element = Element::parse(r#"<ext:Widget xmlns:ext="urn:example:ext"/>"#).unwrap();

    let result = unmarshall_element(&element, &ctx);
    assert!(matches!(
        result,
        Err(UnmarshallingError::ProviderNotFound(_))
    ));
}

fn signing_credential() -> Credential {
    Credential::new(KeyMaterial::Secret(
        b"0123456789abcdef0123456789abcdef".to_vec(),
    ))
    .with_key_name("idp-signing")
    .with_usage(UsageType::Signing)
}

#[test]
fn signed_response_round_trips_and_verifies() {
    let registry = saml_registry();
    let algorithms = Arc::new(AlgorithmRegistry::with_defaults());
    let credential = signing_credential();

    let mut response = full_response();
    let response_id = response.id().to_string();
    let mut element = marshall_object(&mut response, &registry).unwrap();

    let signer = SignatureSigner::new(Arc::clone(&algorithms), SigningConfig::hmac_sha256());
    signer.sign(&mut element, &response_id, &credential).unwrap();

    // Over the wire and back.
    let xml = element.to_xml().unwrap();
    let reparsed = Element::parse(&xml).unwrap();
    let ctx = UnmarshallContext::new(&registry);
    let object = unmarshall_element(&reparsed, &ctx).unwrap();
    let recovered = object.into_any().downcast::<Response>().unwrap();

    let signature = recovered
        .signature()
        .expect("the enveloped signature lands in the typed slot");

    // Resolve the verification key the way policy code does: by the
    // KeyName the signature advertises.
    let resolver = StaticCredentialResolver::new(vec![signing_credential()]);
    let key_name = signature.key_info.as_ref().unwrap().key_names[0].clone();
    let criteria = CriteriaSet::new()
        .with(Criterion::KeyName(key_name))
        .with(Criterion::Usage(UsageType::Signing));
    let resolved = resolver.resolve_single(&criteria).unwrap().unwrap();

    let verifier = SignatureVerifier::new(algorithms);
    verifier.verify(&reparsed, signature, &resolved).unwrap();
}

#[test]
fn mutated_signed_document_fails_verification() {
    let registry = saml_registry();
    let algorithms = Arc::new(AlgorithmRegistry::with_defaults());
    let credential = signing_credential();

    let mut response = full_response();
    let response_id = response.id().to_string();
    let mut element = marshall_object(&mut response, &registry).unwrap();
    let signer = SignatureSigner::new(Arc::clone(&algorithms), SigningConfig::hmac_sha256());
    let signature = signer.sign(&mut element, &response_id, &credential).unwrap();

    // Post-signing mutation invalidates the digest.
    element.append_child(Element::new(saml_name("Advice")));

    let verifier = SignatureVerifier::new(algorithms);
    assert!(verifier.verify(&element, &signature, &credential).is_err());
}

#[test]
fn encrypted_assertion_is_substituted_transparently() {
    let registry = saml_registry();

    let content_key = Credential::new(KeyMaterial::Secret(vec![42u8; 32]))
        .with_key_name("cek-2026")
        .with_usage(UsageType::Encryption);

    // Marshal an assertion and encrypt it.
    let mut assertion = Assertion::new(IDP)
        .with_subject(Subject::new(NameId::email("user@example.com")));
    let assertion_id = assertion.id().to_string();
    let assertion_element = marshall_object(&mut assertion, &registry).unwrap();

    let encrypter = Encrypter::new(content_key.clone(), cipher_uris::AES256_GCM);
    let encrypted = encrypter.encrypt(&assertion_element).unwrap();

    // Place it inside a response as saml:EncryptedAssertion.
    let mut response = Response::success(IDP);
    let mut response_element = marshall_object(&mut response, &registry).unwrap();
    let mut wrapper = Element::new(saml_name("EncryptedAssertion"));
    wrapper.append_child(encrypted.to_element());
    response_element.append_child(wrapper);

    // Without a decrypter the ciphertext is preserved, not interpreted.
    let plain_ctx = UnmarshallContext::new(&registry);
    let opaque = unmarshall_element(&response_element, &plain_ctx).unwrap();
    let opaque = opaque.into_any().downcast::<Response>().unwrap();
    assert!(opaque.assertions().is_empty());

    // With a decrypter the plaintext assertion appears in the typed
    // slot and no ciphertext structure is observable.
    let decrypter = Decrypter::new(Arc::new(StaticCredentialResolver::new(vec![content_key])));
    let ctx = UnmarshallContext::new(&registry).with_decrypter(&decrypter);
    let object = unmarshall_element(&response_element, &ctx).unwrap();
    let recovered = object.into_any().downcast::<Response>().unwrap();

    assert_eq!(recovered.assertions().len(), 1);
    let recovered_assertion = &recovered.assertions()[0];
    assert_eq!(recovered_assertion.id(), assertion_id);
    assert_eq!(
        recovered_assertion.subject().unwrap().name_id().unwrap().value(),
        "user@example.com"
    );
}

#[test]
fn decryption_failure_aborts_the_enclosing_unmarshal() {
    let registry = saml_registry();

    let content_key = Credential::new(KeyMaterial::Secret(vec![42u8; 32]))
        .with_key_name("cek-2026")
        .with_usage(UsageType::Encryption);
    let wrong_key = Credential::new(KeyMaterial::Secret(vec![7u8; 32]))
        .with_key_name("cek-2026")
        .with_usage(UsageType::Encryption);

    let mut assertion = Assertion::new(IDP);
    let assertion_element = marshall_object(&mut assertion, &registry).unwrap();
    let encrypted = Encrypter::new(content_key, cipher_uris::AES256_GCM)
        .encrypt(&assertion_element)
        .unwrap();

    let mut response = Response::success(IDP);
    let mut response_element = marshall_object(&mut response, &registry).unwrap();
    let mut wrapper = Element::new(saml_name("EncryptedAssertion"));
    wrapper.append_child(encrypted.to_element());
    response_element.append_child(wrapper);

    let decrypter = Decrypter::new(Arc::new(StaticCredentialResolver::new(vec![wrong_key])));
    let ctx = UnmarshallContext::new(&registry).with_decrypter(&decrypter);

    let result = unmarshall_element(&response_element, &ctx);
    assert!(matches!(result, Err(UnmarshallingError::Decryption(_))));
}
