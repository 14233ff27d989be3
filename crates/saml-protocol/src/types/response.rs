//! Response types.
//!
//! `samlp:Response` carries the status and assertions an identity
//! provider returns. Encrypted assertions are not modeled as a typed
//! slot: with a decrypter installed they are substituted with plaintext
//! assertions before the structural walk; without one they are preserved
//! in the unknown-children list.

use chrono::{DateTime, Utc};

use saml_dsig::signature::Signature;
use saml_xml::dom::{Attribute, Element};
use saml_xml::error::{MarshallingError, UnmarshallingError, ValidationError};
use saml_xml::marshall::Marshaller;
use saml_xml::object::{downcast_child, XmlObject, XmlObjectBase};
use saml_xml::qname::QName;
use saml_xml::registry::XmlObjectBuilder;
use saml_xml::unmarshall::Unmarshaller;

use crate::constants::{format_instant, generate_id, samlp_name, SAML_VERSION};

use super::{
    downcast_ref, downcast_self, impl_xml_object_common, parse_instant_attr, push_attr, Assertion,
    Issuer, Status,
};

/// A `samlp:Response` element.
#[derive(Debug)]
pub struct Response {
    base: XmlObjectBase,
    id: String,
    version: String,
    issue_instant: Option<DateTime<Utc>>,
    in_response_to: Option<String>,
    destination: Option<String>,
    consent: Option<String>,
    issuer: Option<Issuer>,
    signature: Option<Signature>,
    status: Option<Status>,
    assertions: Vec<Assertion>,
    unknown_children: Vec<Box<dyn XmlObject>>,
}

impl Response {
    /// The element's qualified name.
    #[must_use]
    pub fn element_qname() -> QName {
        samlp_name("Response")
    }

    /// Creates a success response issued now by the given entity.
    #[must_use]
    pub fn success(issuer: impl Into<String>) -> Self {
        Self::with_status(issuer, Status::success())
    }

    /// Creates a response with an explicit status.
    ///
    /// The protocol and assertion namespaces are declared on the
    /// response element so the whole message serializes standalone.
    #[must_use]
    pub fn with_status(issuer: impl Into<String>, status: Status) -> Self {
        let mut base = XmlObjectBase::new(Self::element_qname());
        base.declare_namespace(Some(crate::constants::SAMLP_PREFIX), crate::constants::SAMLP_NS);
        base.declare_namespace(Some(crate::constants::SAML_PREFIX), crate::constants::SAML_NS);
        Self {
            base,
            id: generate_id(),
            version: SAML_VERSION.to_string(),
            issue_instant: Some(Utc::now()),
            in_response_to: None,
            destination: None,
            consent: None,
            issuer: Some(Issuer::entity(issuer)),
            signature: None,
            status: Some(status),
            assertions: Vec::new(),
            unknown_children: Vec::new(),
        }
    }

    fn empty() -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            id: String::new(),
            version: String::new(),
            issue_instant: None,
            in_response_to: None,
            destination: None,
            consent: None,
            issuer: None,
            signature: None,
            status: None,
            assertions: Vec::new(),
            unknown_children: Vec::new(),
        }
    }

    /// The response's XML ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
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

    /// The request this response answers, if any.
    #[must_use]
    pub fn in_response_to(&self) -> Option<&str> {
        self.in_response_to.as_deref()
    }

    /// The destination endpoint URL, if set.
    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// The consent URI, if set.
    #[must_use]
    pub fn consent(&self) -> Option<&str> {
        self.consent.as_deref()
    }

    /// The issuer, if present.
    #[must_use]
    pub fn issuer(&self) -> Option<&Issuer> {
        self.issuer.as_ref()
    }

    /// The enveloped signature, if the response was signed.
    #[must_use]
    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// The status, if present.
    #[must_use]
    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    /// The assertions, in document order.
    #[must_use]
    pub fn assertions(&self) -> &[Assertion] {
        &self.assertions
    }

    /// The first assertion, if any.
    #[must_use]
    pub fn first_assertion(&self) -> Option<&Assertion> {
        self.assertions.first()
    }

    /// Returns true if the status is Success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.as_ref().is_some_and(Status::is_success)
    }

    /// Sets the InResponseTo attribute.
    #[must_use]
    pub fn in_response_to_request(mut self, request_id: impl Into<String>) -> Self {
        self.in_response_to = Some(request_id.into());
        self.base.invalidate_dom();
        self
    }

    /// Sets the Destination attribute.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self.base.invalidate_dom();
        self
    }

    /// Appends an assertion.
    #[must_use]
    pub fn with_assertion(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self.base.invalidate_dom();
        self
    }

    /// Validates the required shape: ID, supported version, and a status.
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
        match &self.status {
            Some(status) => status.validate(),
            None => Err(ValidationError::Missing {
                element: Self::element_qname(),
                what: "Status child".to_string(),
            }),
        }
    }
}

impl XmlObject for Response {
    impl_xml_object_common!();

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        let mut children: Vec<&dyn XmlObject> = Vec::new();
        if let Some(issuer) = &self.issuer {
            children.push(issuer);
        }
        if let Some(signature) = &self.signature {
            children.push(signature);
        }
        if let Some(status) = &self.status {
            children.push(status);
        }
        children.extend(self.assertions.iter().map(|a| a as &dyn XmlObject));
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
        if let Some(status) = &mut self.status {
            children.push(status);
        }
        children.extend(self.assertions.iter_mut().map(|a| a as &mut dyn XmlObject));
        children.extend(self.unknown_children.iter_mut().map(AsMut::as_mut));
        children
    }
}

/// Builds empty [`Response`] objects.
#[derive(Debug, Default)]
pub struct ResponseBuilder;

impl XmlObjectBuilder for ResponseBuilder {
    fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
        Box::new(Response::empty())
    }
}

/// Marshals [`Response`] objects.
#[derive(Debug, Default)]
pub struct ResponseMarshaller;

impl Marshaller for ResponseMarshaller {
    fn marshall_attributes(
        &self,
        object: &dyn XmlObject,
        element: &mut Element,
    ) -> Result<(), MarshallingError> {
        let this = downcast_ref::<Response>(object)?;
        // ID is registered so signature references can resolve it.
        element.set_id_attribute(QName::unqualified("ID"), &this.id);
        push_attr(element, "Version", Some(this.version()));
        push_attr(
            element,
            "IssueInstant",
            this.issue_instant.map(format_instant).as_deref(),
        );
        push_attr(element, "InResponseTo", this.in_response_to());
        push_attr(element, "Destination", this.destination());
        push_attr(element, "Consent", this.consent.as_deref());
        Ok(())
    }
}

/// Unmarshals [`Response`] objects.
#[derive(Debug, Default)]
pub struct ResponseUnmarshaller;

impl Unmarshaller for ResponseUnmarshaller {
    fn process_attribute(
        &self,
        object: &mut dyn XmlObject,
        attribute: &Attribute,
    ) -> Result<(), UnmarshallingError> {
        let element = Response::element_qname();
        let this = downcast_self::<Response>(object)?;
        match (attribute.name.namespace_uri(), attribute.name.local_name()) {
            (None, "ID") => this.id = attribute.value.clone(),
            (None, "Version") => this.version = attribute.value.clone(),
            (None, "IssueInstant") => {
                this.issue_instant =
                    Some(parse_instant_attr(&element, "IssueInstant", &attribute.value)?);
            }
            (None, "InResponseTo") => this.in_response_to = Some(attribute.value.clone()),
            (None, "Destination") => this.destination = Some(attribute.value.clone()),
            (None, "Consent") => this.consent = Some(attribute.value.clone()),
            _ => object.base_mut().add_unknown_attribute(attribute.clone()),
        }
        Ok(())
    }

    fn process_child(
        &self,
        object: &mut dyn XmlObject,
        child: Box<dyn XmlObject>,
    ) -> Result<(), UnmarshallingError> {
        let this = downcast_self::<Response>(object)?;
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
        let child = match downcast_child::<Status>(child) {
            Ok(status) => {
                this.status = Some(*status);
                return Ok(());
            }
            Err(child) => child,
        };
        let child = match downcast_child::<Assertion>(child) {
            Ok(assertion) => {
                this.assertions.push(*assertion);
                return Ok(());
            }
            Err(child) => child,
        };
        // EncryptedAssertion (when no decrypter is installed) and
        // extensions are preserved, not modeled.
        this.unknown_children.push(child);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::status_codes;
    use crate::types::StatusCode;

    #[test]
    fn success_response_validates() {
        let response = Response::success("https://idp.example.com")
            .in_response_to_request("_req1")
            .with_destination("https://sp.example.com/acs");

        assert!(response.is_success());
        assert!(response.validate().is_ok());
        assert_eq!(response.in_response_to(), Some("_req1"));
    }

    #[test]
    fn error_response_is_not_success() {
        let response = Response::with_status(
            "https://idp.example.com",
            Status::new(StatusCode::new(status_codes::REQUESTER)),
        );
        assert!(!response.is_success());
        assert!(response.validate().is_ok());
    }

    #[test]
    fn response_without_status_is_invalid() {
        assert!(Response::empty().validate().is_err());
    }

    #[test]
    fn children_follow_the_schema_sequence() {
        let response = Response::success("https://idp.example.com")
            .with_assertion(Assertion::new("https://idp.example.com"));

        let locals: Vec<_> = response
            .ordered_children()
            .iter()
            .map(|c| c.element_name().local_name().to_string())
            .collect();
        assert_eq!(locals, ["Issuer", "Status", "Assertion"]);
    }
}
