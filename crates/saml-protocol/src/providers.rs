//! Provider registration for the SAML 2.0 vocabulary.

use saml_dsig::signature::register_dsig_providers;
use saml_xml::registry::{ProviderTriple, XmlObjectRegistry};
use saml_xml::unknown::unknown_provider_triple;

use crate::types::{
    AssertionBuilder, AssertionMarshaller, AssertionUnmarshaller, Attribute, AttributeBuilder,
    AttributeMarshaller, AttributeStatement, AttributeStatementBuilder,
    AttributeStatementMarshaller, AttributeStatementUnmarshaller, AttributeUnmarshaller,
    AttributeValue, AttributeValueBuilder, AttributeValueMarshaller, AttributeValueUnmarshaller,
    Audience, AudienceBuilder, AudienceMarshaller, AudienceRestriction,
    AudienceRestrictionBuilder, AudienceRestrictionMarshaller, AudienceRestrictionUnmarshaller,
    AudienceUnmarshaller, AuthnContext, AuthnContextBuilder, AuthnContextClassRef,
    AuthnContextClassRefBuilder, AuthnContextClassRefMarshaller, AuthnContextClassRefUnmarshaller,
    AuthnContextMarshaller, AuthnContextUnmarshaller, AuthnStatement, AuthnStatementBuilder,
    AuthnStatementMarshaller, AuthnStatementUnmarshaller, Conditions, ConditionsBuilder,
    ConditionsMarshaller, ConditionsUnmarshaller, Issuer, IssuerBuilder, IssuerMarshaller,
    IssuerUnmarshaller, NameId, NameIdBuilder, NameIdMarshaller, NameIdUnmarshaller, OneTimeUse,
    OneTimeUseBuilder, OneTimeUseMarshaller, OneTimeUseUnmarshaller, Response, ResponseBuilder,
    ResponseMarshaller, ResponseUnmarshaller, Status, StatusBuilder, StatusCode,
    StatusCodeBuilder, StatusCodeMarshaller, StatusCodeUnmarshaller, StatusMarshaller,
    StatusMessage, StatusMessageBuilder, StatusMessageMarshaller, StatusMessageUnmarshaller,
    StatusUnmarshaller, Subject, SubjectBuilder, SubjectConfirmation, SubjectConfirmationBuilder,
    SubjectConfirmationData, SubjectConfirmationDataBuilder, SubjectConfirmationDataMarshaller,
    SubjectConfirmationDataUnmarshaller, SubjectConfirmationMarshaller,
    SubjectConfirmationUnmarshaller, SubjectMarshaller, SubjectUnmarshaller,
};
use crate::types::Assertion;

/// Registers the full SAML 2.0 provider set into a registry: every
/// element type in this crate, the `ds:Signature` providers, and the
/// unknown-element default provider that preserves extension content.
pub fn register_saml_providers(registry: &XmlObjectRegistry) {
    registry.register(
        Assertion::element_qname(),
        ProviderTriple::new(AssertionBuilder, AssertionMarshaller, AssertionUnmarshaller),
    );
    registry.register(
        Response::element_qname(),
        ProviderTriple::new(ResponseBuilder, ResponseMarshaller, ResponseUnmarshaller),
    );
    registry.register(
        Issuer::element_qname(),
        ProviderTriple::new(IssuerBuilder, IssuerMarshaller, IssuerUnmarshaller),
    );
    registry.register(
        NameId::element_qname(),
        ProviderTriple::new(NameIdBuilder, NameIdMarshaller, NameIdUnmarshaller),
    );
    registry.register(
        Subject::element_qname(),
        ProviderTriple::new(SubjectBuilder, SubjectMarshaller, SubjectUnmarshaller),
    );
    registry.register(
        SubjectConfirmation::element_qname(),
        ProviderTriple::new(
            SubjectConfirmationBuilder,
            SubjectConfirmationMarshaller,
            SubjectConfirmationUnmarshaller,
        ),
    );
    registry.register(
        SubjectConfirmationData::element_qname(),
        ProviderTriple::new(
            SubjectConfirmationDataBuilder,
            SubjectConfirmationDataMarshaller,
            SubjectConfirmationDataUnmarshaller,
        ),
    );
    registry.register(
        Conditions::element_qname(),
        ProviderTriple::new(ConditionsBuilder, ConditionsMarshaller, ConditionsUnmarshaller),
    );
    registry.register(
        AudienceRestriction::element_qname(),
        ProviderTriple::new(
            AudienceRestrictionBuilder,
            AudienceRestrictionMarshaller,
            AudienceRestrictionUnmarshaller,
        ),
    );
    registry.register(
        Audience::element_qname(),
        ProviderTriple::new(AudienceBuilder, AudienceMarshaller, AudienceUnmarshaller),
    );
    registry.register(
        OneTimeUse::element_qname(),
        ProviderTriple::new(OneTimeUseBuilder, OneTimeUseMarshaller, OneTimeUseUnmarshaller),
    );
    registry.register(
        AuthnStatement::element_qname(),
        ProviderTriple::new(
            AuthnStatementBuilder,
            AuthnStatementMarshaller,
            AuthnStatementUnmarshaller,
        ),
    );
    registry.register(
        AuthnContext::element_qname(),
        ProviderTriple::new(
            AuthnContextBuilder,
            AuthnContextMarshaller,
            AuthnContextUnmarshaller,
        ),
    );
    registry.register(
        AuthnContextClassRef::element_qname(),
        ProviderTriple::new(
            AuthnContextClassRefBuilder,
            AuthnContextClassRefMarshaller,
            AuthnContextClassRefUnmarshaller,
        ),
    );
    registry.register(
        AttributeStatement::element_qname(),
        ProviderTriple::new(
            AttributeStatementBuilder,
            AttributeStatementMarshaller,
            AttributeStatementUnmarshaller,
        ),
    );
    registry.register(
        Attribute::element_qname(),
        ProviderTriple::new(AttributeBuilder, AttributeMarshaller, AttributeUnmarshaller),
    );
    registry.register(
        AttributeValue::element_qname(),
        ProviderTriple::new(
            AttributeValueBuilder,
            AttributeValueMarshaller,
            AttributeValueUnmarshaller,
        ),
    );
    registry.register(
        Status::element_qname(),
        ProviderTriple::new(StatusBuilder, StatusMarshaller, StatusUnmarshaller),
    );
    registry.register(
        StatusCode::element_qname(),
        ProviderTriple::new(StatusCodeBuilder, StatusCodeMarshaller, StatusCodeUnmarshaller),
    );
    registry.register(
        StatusMessage::element_qname(),
        ProviderTriple::new(
            StatusMessageBuilder,
            StatusMessageMarshaller,
            StatusMessageUnmarshaller,
        ),
    );

    register_dsig_providers(registry);
    registry.set_default_provider(unknown_provider_triple());
}
