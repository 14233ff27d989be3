//! Assertion types.
//!
//! `saml:Assertion` is the package of statements an issuer makes about a
//! subject. Its child order follows the schema sequence: Issuer,
//! Signature, Subject, Conditions, then statements; signature digest
//! computation depends on that order being reproduced exactly.

use chrono::{DateTime, Utc};

use saml_dsig::signature::Signature;
use saml_xml::dom::{Attribute, Element};
use saml_xml::error::{MarshallingError, UnmarshallingError, ValidationError};
use saml_xml::marshall::Marshaller;
use saml_xml::object::{downcast_child, XmlObject, XmlObjectBase};
use saml_xml::qname::QName;
use saml_xml::registry::XmlObjectBuilder;
use saml_xml::unmarshall::Unmarshaller;

use crate::constants::{authn_contexts, format_instant, generate_id, saml_name, SAML_VERSION};

use super::{
    downcast_ref, downcast_self, impl_xml_object_common, parse_instant_attr, push_attr,
    AttributeStatement, Conditions, Issuer, Subject,
};

/// A `saml:AuthnContextClassRef` element.
#[derive(Debug)]
pub struct AuthnContextClassRef {
    base: XmlObjectBase,
}

impl AuthnContextClassRef {
    /// The element's qualified name.
    #[must_use]
    pub fn element_qname() -> QName {
        saml_name("AuthnContextClassRef")
    }

    /// Creates a class reference.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        let mut base = XmlObjectBase::new(Self::element_qname());
        base.set_text_content(Some(uri.into()));
        Self { base }
    }

    /// The class reference URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        self.base.text_content().unwrap_or_default()
    }
}

impl XmlObject for AuthnContextClassRef {
    impl_xml_object_common!();

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        Vec::new()
    }

    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
        Vec::new()
    }
}

/// Builds empty [`AuthnContextClassRef`] objects.
#[derive(Debug, Default)]
pub struct AuthnContextClassRefBuilder;

impl XmlObjectBuilder for AuthnContextClassRefBuilder {
    fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
        Box::new(AuthnContextClassRef::new(""))
    }
}

/// Marshals [`AuthnContextClassRef`] objects.
#[derive(Debug, Default)]
pub struct AuthnContextClassRefMarshaller;

impl Marshaller for AuthnContextClassRefMarshaller {}

/// Unmarshals [`AuthnContextClassRef`] objects.
#[derive(Debug, Default)]
pub struct AuthnContextClassRefUnmarshaller;

impl Unmarshaller for AuthnContextClassRefUnmarshaller {}

/// A `saml:AuthnContext` element.
#[derive(Debug)]
pub struct AuthnContext {
    base: XmlObjectBase,
    class_ref: Option<AuthnContextClassRef>,
}

impl AuthnContext {
    /// The element's qualified name.
    #[must_use]
    pub fn element_qname() -> QName {
        saml_name("AuthnContext")
    }

    /// Creates a context with a class reference URI.
    #[must_use]
    pub fn class_ref(uri: impl Into<String>) -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            class_ref: Some(AuthnContextClassRef::new(uri)),
        }
    }

    fn empty() -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            class_ref: None,
        }
    }

    /// The class reference URI, if present.
    #[must_use]
    pub fn class_ref_uri(&self) -> Option<&str> {
        self.class_ref.as_ref().map(AuthnContextClassRef::uri)
    }
}

impl XmlObject for AuthnContext {
    impl_xml_object_common!();

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        self.class_ref
            .iter()
            .map(|c| c as &dyn XmlObject)
            .collect()
    }

    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
        self.class_ref
            .iter_mut()
            .map(|c| c as &mut dyn XmlObject)
            .collect()
    }
}

/// Builds empty [`AuthnContext`] objects.
#[derive(Debug, Default)]
pub struct AuthnContextBuilder;

impl XmlObjectBuilder for AuthnContextBuilder {
    fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
        Box::new(AuthnContext::empty())
    }
}

/// Marshals [`AuthnContext`] objects.
#[derive(Debug, Default)]
pub struct AuthnContextMarshaller;

impl Marshaller for AuthnContextMarshaller {}

/// Unmarshals [`AuthnContext`] objects.
#[derive(Debug, Default)]
pub struct AuthnContextUnmarshaller;

impl Unmarshaller for AuthnContextUnmarshaller {
    fn process_child(
        &self,
        object: &mut dyn XmlObject,
        child: Box<dyn XmlObject>,
    ) -> Result<(), UnmarshallingError> {
        let child = match downcast_child::<AuthnContextClassRef>(child) {
            Ok(class_ref) => {
                downcast_self::<AuthnContext>(object)?.class_ref = Some(*class_ref);
                return Ok(());
            }
            Err(child) => child,
        };
        Err(UnmarshallingError::UnexpectedElement {
            child: child.element_name().clone(),
            parent: object.element_name().clone(),
        })
    }
}

/// A `saml:AuthnStatement` element.
#[derive(Debug)]
pub struct AuthnStatement {
    base: XmlObjectBase,
    /// When the authentication act took place.
    pub authn_instant: Option<DateTime<Utc>>,
    /// Session identifier shared with the service provider.
    pub session_index: Option<String>,
    /// When the session at the identity provider ends.
    pub session_not_on_or_after: Option<DateTime<Utc>>,
    authn_context: Option<AuthnContext>,
}

impl AuthnStatement {
    /// The element's qualified name.
    #[must_use]
    pub fn element_qname() -> QName {
        saml_name("AuthnStatement")
    }

    /// Creates a statement for an authentication that just happened.
    #[must_use]
    pub fn new(context_class: &str) -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            authn_instant: Some(Utc::now()),
            session_index: Some(format!("_session{}", uuid::Uuid::new_v4())),
            session_not_on_or_after: None,
            authn_context: Some(AuthnContext::class_ref(context_class)),
        }
    }

    /// Creates a statement for a password-over-TLS authentication.
    #[must_use]
    pub fn password_protected_transport() -> Self {
        Self::new(authn_contexts::PASSWORD_PROTECTED_TRANSPORT)
    }

    fn empty() -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            authn_instant: None,
            session_index: None,
            session_not_on_or_after: None,
            authn_context: None,
        }
    }

    /// The authentication context, if present.
    #[must_use]
    pub fn authn_context(&self) -> Option<&AuthnContext> {
        self.authn_context.as_ref()
    }
}

impl XmlObject for AuthnStatement {
    impl_xml_object_common!();

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        self.authn_context
            .iter()
            .map(|c| c as &dyn XmlObject)
            .collect()
    }

    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
        self.authn_context
            .iter_mut()
            .map(|c| c as &mut dyn XmlObject)
            .collect()
    }
}

/// Builds empty [`AuthnStatement`] objects.
#[derive(Debug, Default)]
pub struct AuthnStatementBuilder;

impl XmlObjectBuilder for AuthnStatementBuilder {
    fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
        Box::new(AuthnStatement::empty())
    }
}

/// Marshals [`AuthnStatement`] objects.
#[derive(Debug, Default)]
pub struct AuthnStatementMarshaller;

impl Marshaller for AuthnStatementMarshaller {
    fn marshall_attributes(
        &self,
        object: &dyn XmlObject,
        element: &mut Element,
    ) -> Result<(), MarshallingError> {
        let this = downcast_ref::<AuthnStatement>(object)?;
        push_attr(
            element,
            "AuthnInstant",
            this.authn_instant.map(format_instant).as_deref(),
        );
        push_attr(element, "SessionIndex", this.session_index.as_deref());
        push_attr(
            element,
            "SessionNotOnOrAfter",
            this.session_not_on_or_after.map(format_instant).as_deref(),
        );
        Ok(())
    }
}

/// Unmarshals [`AuthnStatement`] objects.
#[derive(Debug, Default)]
pub struct AuthnStatementUnmarshaller;

impl Unmarshaller for AuthnStatementUnmarshaller {
    fn process_attribute(
        &self,
        object: &mut dyn XmlObject,
        attribute: &Attribute,
    ) -> Result<(), UnmarshallingError> {
        let element = AuthnStatement::element_qname();
        let this = downcast_self::<AuthnStatement>(object)?;
        match (attribute.name.namespace_uri(), attribute.name.local_name()) {
            (None, "AuthnInstant") => {
                this.authn_instant =
                    Some(parse_instant_attr(&element, "AuthnInstant", &attribute.value)?);
            }
            (None, "SessionIndex") => this.session_index = Some(attribute.value.clone()),
            (None, "SessionNotOnOrAfter") => {
                this.session_not_on_or_after = Some(parse_instant_attr(
                    &element,
                    "SessionNotOnOrAfter",
                    &attribute.value,
                )?);
            }
            _ => object.base_mut().add_unknown_attribute(attribute.clone()),
        }
        Ok(())
    }

    fn process_child(
        &self,
        object: &mut dyn XmlObject,
        child: Box<dyn XmlObject>,
    ) -> Result<(), UnmarshallingError> {
        let child = match downcast_child::<AuthnContext>(child) {
            Ok(context) => {
                downcast_self::<AuthnStatement>(object)?.authn_context = Some(*context);
                return Ok(());
            }
            Err(child) => child,
        };
        Err(UnmarshallingError::UnexpectedElement {
            child: child.element_name().clone(),
            parent: object.element_name().clone(),
        })
    }
}

/// A `saml:Assertion` element.
#[derive(Debug)]
pub struct Assertion {
    base: XmlObjectBase,
    id: String,
    version: String,
    issue_instant: Option<DateTime<Utc>>,
    issuer: Option<Issuer>,
    signature: Option<Signature>,
    subject: Option<Subject>,
    conditions: Option<Conditions>,
    authn_statements: Vec<AuthnStatement>,
    attribute_statements: Vec<AttributeStatement>,
    unknown_children: Vec<Box<dyn XmlObject>>,
}

impl Assertion {
    /// The element's qualified name.
    #[must_use]
    pub fn element_qname() -> QName {
        saml_name("Assertion")
    }

    /// Creates an assertion issued now by the given entity.
    ///
    /// The assertion namespace is declared on the element so the
    /// assertion serializes standalone.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        let mut base = XmlObjectBase::new(Self::element_qname());
        base.declare_namespace(Some(crate::constants::SAML_PREFIX), crate::constants::SAML_NS);
        Self {
            base,
            id: generate_id(),
            version: SAML_VERSION.to_string(),
            issue_instant: Some(Utc::now()),
            issuer: Some(Issuer::entity(issuer)),
            signature: None,
            subject: None,
            conditions: None,
            authn_statements: Vec::new(),
            attribute_statements: Vec::new(),
            unknown_children: Vec::new(),
        }
    }

    fn empty() -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            id: String::new(),
            version: String::new(),
            issue_instant: None,
            issuer: None,
            signature: None,
            subject: None,
            conditions: None,
            authn_statements: Vec::new(),
            attribute_statements: Vec::new(),
            unknown_children: Vec::new(),
        }
    }

    /// The assertion's XML ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Replaces the generated ID.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
        self.base.invalidate_dom();
    }

    /// The SAML version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The issue timestamp.
    #[must_use]
    pub fn issue_instant(&self) -> Option<DateTime<Utc>> {
        self.issue_instant
    }

    /// The issuer, if present.
    #[must_use]
    pub fn issuer(&self) -> Option<&Issuer> {
        self.issuer.as_ref()
    }

    /// The enveloped signature, if the assertion was signed.
    #[must_use]
    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// The subject, if present.
    #[must_use]
    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    /// The conditions, if present.
    #[must_use]
    pub fn conditions(&self) -> Option<&Conditions> {
        self.conditions.as_ref()
    }

    /// The authentication statements.
    #[must_use]
    pub fn authn_statements(&self) -> &[AuthnStatement] {
        &self.authn_statements
    }

    /// The attribute statements.
    #[must_use]
    pub fn attribute_statements(&self) -> &[AttributeStatement] {
        &self.attribute_statements
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self.base.invalidate_dom();
        self
    }

    /// Sets the conditions.
    #[must_use]
    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = Some(conditions);
        self.base.invalidate_dom();
        self
    }

    /// Appends an authentication statement.
    #[must_use]
    pub fn with_authn_statement(mut self, statement: AuthnStatement) -> Self {
        self.authn_statements.push(statement);
        self.base.invalidate_dom();
        self
    }

    /// Appends an attribute statement.
    #[must_use]
    pub fn with_attribute_statement(mut self, statement: AttributeStatement) -> Self {
        self.attribute_statements.push(statement);
        self.base.invalidate_dom();
        self
    }

    /// Validates the required shape: ID, supported version, and an
    /// issuer.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming what is missing or invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::Missing {
                element: Self::element_qname(),
                what: "ID attribute".to_string(),
            });
        }
        if self.version != SAML_VERSION {
            return Err(ValidationError::Invalid {
                element: Self::element_qname(),
                reason: format!("unsupported version '{}'", self.version),
            });
        }
        if self.issuer.is_none() {
            return Err(ValidationError::Missing {
                element: Self::element_qname(),
                what: "Issuer child".to_string(),
            });
        }
        Ok(())
    }
}

impl XmlObject for Assertion {
    impl_xml_object_common!();

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        let mut children: Vec<&dyn XmlObject> = Vec::new();
        if let Some(issuer) = &self.issuer {
            children.push(issuer);
        }
        if let Some(signature) = &self.signature {
            children.push(signature);
        }
        if let Some(subject) = &self.subject {
            children.push(subject);
        }
        if let Some(conditions) = &self.conditions {
            children.push(conditions);
        }
        children.extend(self.authn_statements.iter().map(|s| s as &dyn XmlObject));
        children.extend(
            self.attribute_statements
                .iter()
                .map(|s| s as &dyn XmlObject),
        );
        children.extend(self.unknown_children.iter().map(AsRef::as_ref));
        children
    }

    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
        let mut children: Vec<&mut dyn XmlObject> = Vec::new();
        if let Some(issuer) = &mut self.issuer {
            children.push(issuer);
        }
        if let Some(signature) = &mut self.signature {
            children.push(signature);
        }
        if let Some(subject) = &mut self.subject {
            children.push(subject);
        }
        if let Some(conditions) = &mut self.conditions {
            children.push(conditions);
        }
        children.extend(
            self.authn_statements
                .iter_mut()
                .map(|s| s as &mut dyn XmlObject),
        );
        children.extend(
            self.attribute_statements
                .iter_mut()
                .map(|s| s as &mut dyn XmlObject),
        );
        children.extend(self.unknown_children.iter_mut().map(AsMut::as_mut));
        children
    }
}

/// Builds empty [`Assertion`] objects.
#[derive(Debug, Default)]
pub struct AssertionBuilder;

impl XmlObjectBuilder for AssertionBuilder {
    fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
        Box::new(Assertion::empty())
    }
}

/// Marshals [`Assertion`] objects.
#[derive(Debug, Default)]
pub struct AssertionMarshaller;

impl Marshaller for AssertionMarshaller {
    fn marshall_attributes(
        &self,
        object: &dyn XmlObject,
        element: &mut Element,
    ) -> Result<(), MarshallingError> {
        let this = downcast_ref::<Assertion>(object)?;
        // ID is registered so signature references can resolve it.
        element.set_id_attribute(QName::unqualified("ID"), &this.id);
        push_attr(element, "Version", Some(this.version()));
        push_attr(
            element,
            "IssueInstant",
            this.issue_instant.map(format_instant).as_deref(),
        );
        Ok(())
    }
}

/// Unmarshals [`Assertion`] objects.
#[derive(Debug, Default)]
pub struct AssertionUnmarshaller;

impl Unmarshaller for AssertionUnmarshaller {
    fn process_attribute(
        &self,
        object: &mut dyn XmlObject,
        attribute: &Attribute,
    ) -> Result<(), UnmarshallingError> {
        let element = Assertion::element_qname();
        let this = downcast_self::<Assertion>(object)?;
        match (attribute.name.namespace_uri(), attribute.name.local_name()) {
            (None, "ID") => this.id = attribute.value.clone(),
            (None, "Version") => this.version = attribute.value.clone(),
            (None, "IssueInstant") => {
                this.issue_instant =
                    Some(parse_instant_attr(&element, "IssueInstant", &attribute.value)?);
            }
            _ => object.base_mut().add_unknown_attribute(attribute.clone()),
        }
        Ok(())
    }

    fn process_child(
        &self,
        object: &mut dyn XmlObject,
        child: Box<dyn XmlObject>,
    ) -> Result<(), UnmarshallingError> {
        let this = downcast_self::<Assertion>(object)?;
        let child = match downcast_child::<Issuer>(child) {
            Ok(issuer) => {
                this.issuer = Some(*issuer);
                return Ok(());
            }
            Err(child) => child,
        };
        let child = match downcast_child::<Signature>(child) {
            Ok(signature) => {
                this.signature = Some(*signature);
                return Ok(());
            }
            Err(child) => child,
        };
        let child = match downcast_child::<Subject>(child) {
            Ok(subject) => {
                this.subject = Some(*subject);
                return Ok(());
            }
            Err(child) => child,
        };
        let child = match downcast_child::<Conditions>(child) {
            Ok(conditions) => {
                this.conditions = Some(*conditions);
                return Ok(());
            }
            Err(child) => child,
        };
        let child = match downcast_child::<AuthnStatement>(child) {
            Ok(statement) => {
                this.authn_statements.push(*statement);
                return Ok(());
            }
            Err(child) => child,
        };
        let child = match downcast_child::<AttributeStatement>(child) {
            Ok(statement) => {
                this.attribute_statements.push(*statement);
                return Ok(());
            }
            Err(child) => child,
        };
        // Advice, Statement extensions, and anything unmodeled are
        // preserved for round-trip fidelity.
        this.unknown_children.push(child);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_assertion_has_id_version_and_issuer() {
        let assertion = Assertion::new("https://idp.example.com");
        assert!(assertion.id().starts_with("_id"));
        assert_eq!(assertion.version(), SAML_VERSION);
        assert_eq!(
            assertion.issuer().unwrap().value(),
            "https://idp.example.com"
        );
        assert!(assertion.validate().is_ok());
    }

    #[test]
    fn empty_assertion_fails_validation() {
        assert!(Assertion::empty().validate().is_err());
    }

    #[test]
    fn children_follow_the_schema_sequence() {
        let assertion = Assertion::new("https://idp.example.com")
            .with_subject(Subject::new(crate::types::NameId::email("u@example.com")))
            .with_conditions(Conditions::with_validity(5))
            .with_authn_statement(AuthnStatement::password_protected_transport())
            .with_attribute_statement(
                AttributeStatement::new()
                    .with_attribute(crate::types::Attribute::single("email", "u@example.com")),
            );

        let locals: Vec<_> = assertion
            .ordered_children()
            .iter()
            .map(|c| c.element_name().local_name().to_string())
            .collect();
        assert_eq!(
            locals,
            [
                "Issuer",
                "Subject",
                "Conditions",
                "AuthnStatement",
                "AttributeStatement"
            ]
        );
    }

    #[test]
    fn unsupported_version_is_invalid() {
        let mut assertion = Assertion::new("https://idp.example.com");
        assertion.version = "1.1".to_string();
        assert!(assertion.validate().is_err());
    }
}
