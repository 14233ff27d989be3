//! Status types.
//!
//! `samlp:Status` reports the disposition of a request: a required
//! StatusCode (possibly nested) and an optional StatusMessage.

use saml_xml::dom::{Attribute, Element};
use saml_xml::error::{MarshallingError, UnmarshallingError, ValidationError};
use saml_xml::marshall::Marshaller;
use saml_xml::object::{downcast_child, XmlObject, XmlObjectBase};
use saml_xml::qname::QName;
use saml_xml::registry::XmlObjectBuilder;
use saml_xml::unmarshall::Unmarshaller;

use crate::constants::{samlp_name, status_codes};

use super::{downcast_ref, downcast_self, impl_xml_object_common, push_attr};

/// A `samlp:StatusCode` element: a Value attribute and an optional
/// nested code.
#[derive(Debug)]
pub struct StatusCode {
    base: XmlObjectBase,
    value: Option<String>,
    sub_code: Option<Box<StatusCode>>,
}

impl StatusCode {
    /// The element's qualified name.
    #[must_use]
    pub fn element_qname() -> QName {
        samlp_name("StatusCode")
    }

    /// Creates a status code with the given value URI.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            value: Some(value.into()),
            sub_code: None,
        }
    }

    fn empty() -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            value: None,
            sub_code: None,
        }
    }

    /// The status code value URI.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Nests a subordinate status code.
    #[must_use]
    pub fn with_sub_code(mut self, sub_code: StatusCode) -> Self {
        self.sub_code = Some(Box::new(sub_code));
        self.base.invalidate_dom();
        self
    }

    /// The subordinate status code, if any.
    #[must_use]
    pub fn sub_code(&self) -> Option<&StatusCode> {
        self.sub_code.as_deref()
    }
}

impl XmlObject for StatusCode {
    impl_xml_object_common!();

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        self.sub_code
            .iter()
            .map(|c| c.as_ref() as &dyn XmlObject)
            .collect()
    }

    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
        self.sub_code
            .iter_mut()
            .map(|c| c.as_mut() as &mut dyn XmlObject)
            .collect()
    }
}

/// Builds empty [`StatusCode`] objects.
#[derive(Debug, Default)]
pub struct StatusCodeBuilder;

impl XmlObjectBuilder for StatusCodeBuilder {
    fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
        Box::new(StatusCode::empty())
    }
}

/// Marshals [`StatusCode`] objects.
#[derive(Debug, Default)]
pub struct StatusCodeMarshaller;

impl Marshaller for StatusCodeMarshaller {
    fn marshall_attributes(
        &self,
        object: &dyn XmlObject,
        element: &mut Element,
    ) -> Result<(), MarshallingError> {
        let this = downcast_ref::<StatusCode>(object)?;
        push_attr(element, "Value", this.value());
        Ok(())
    }
}

/// Unmarshals [`StatusCode`] objects.
#[derive(Debug, Default)]
pub struct StatusCodeUnmarshaller;

impl Unmarshaller for StatusCodeUnmarshaller {
    fn process_attribute(
        &self,
        object: &mut dyn XmlObject,
        attribute: &Attribute,
    ) -> Result<(), UnmarshallingError> {
        let this = downcast_self::<StatusCode>(object)?;
        match (attribute.name.namespace_uri(), attribute.name.local_name()) {
            (None, "Value") => this.value = Some(attribute.value.clone()),
            _ => object.base_mut().add_unknown_attribute(attribute.clone()),
        }
        Ok(())
    }

    fn process_child(
        &self,
        object: &mut dyn XmlObject,
        child: Box<dyn XmlObject>,
    ) -> Result<(), UnmarshallingError> {
        let child = match downcast_child::<StatusCode>(child) {
            Ok(sub_code) => {
                let this = downcast_self::<StatusCode>(object)?;
                this.sub_code = Some(sub_code);
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

/// A `samlp:StatusMessage` element carrying human-readable text.
#[derive(Debug)]
pub struct StatusMessage {
    base: XmlObjectBase,
}

impl StatusMessage {
    /// The element's qualified name.
    #[must_use]
    pub fn element_qname() -> QName {
        samlp_name("StatusMessage")
    }

    /// Creates a status message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        let mut base = XmlObjectBase::new(Self::element_qname());
        base.set_text_content(Some(message.into()));
        Self { base }
    }

    /// The message text.
    #[must_use]
    pub fn message(&self) -> &str {
        self.base.text_content().unwrap_or_default()
    }
}

impl XmlObject for StatusMessage {
    impl_xml_object_common!();

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        Vec::new()
    }

    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
        Vec::new()
    }
}

/// Builds empty [`StatusMessage`] objects.
#[derive(Debug, Default)]
pub struct StatusMessageBuilder;

impl XmlObjectBuilder for StatusMessageBuilder {
    fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
        Box::new(StatusMessage::new(""))
    }
}

/// Marshals [`StatusMessage`] objects; the default hooks emit the text.
#[derive(Debug, Default)]
pub struct StatusMessageMarshaller;

impl Marshaller for StatusMessageMarshaller {}

/// Unmarshals [`StatusMessage`] objects; the default hooks collect the
/// text.
#[derive(Debug, Default)]
pub struct StatusMessageUnmarshaller;

impl Unmarshaller for StatusMessageUnmarshaller {}

/// A `samlp:Status` element.
#[derive(Debug)]
pub struct Status {
    base: XmlObjectBase,
    status_code: Option<StatusCode>,
    status_message: Option<StatusMessage>,
}

impl Status {
    /// The element's qualified name.
    #[must_use]
    pub fn element_qname() -> QName {
        samlp_name("Status")
    }

    /// Creates a status with the given top-level code.
    #[must_use]
    pub fn new(status_code: StatusCode) -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            status_code: Some(status_code),
            status_message: None,
        }
    }

    fn empty() -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            status_code: None,
            status_message: None,
        }
    }

    /// A success status.
    #[must_use]
    pub fn success() -> Self {
        Self::new(StatusCode::new(status_codes::SUCCESS))
    }

    /// Adds a status message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.status_message = Some(StatusMessage::new(message));
        self.base.invalidate_dom();
        self
    }

    /// The top-level status code.
    #[must_use]
    pub fn status_code(&self) -> Option<&StatusCode> {
        self.status_code.as_ref()
    }

    /// The status message, if any.
    #[must_use]
    pub fn status_message(&self) -> Option<&StatusMessage> {
        self.status_message.as_ref()
    }

    /// Returns true if the top-level code is Success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code
            .as_ref()
            .and_then(StatusCode::value)
            .is_some_and(|v| v == status_codes::SUCCESS)
    }

    /// Validates the required shape: a StatusCode with a value.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the status code or its value is
    /// missing.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let code = self.status_code.as_ref().ok_or_else(|| ValidationError::Missing {
            element: Self::element_qname(),
            what: "StatusCode child".to_string(),
        })?;
        if code.value().is_none() {
            return Err(ValidationError::Missing {
                element: StatusCode::element_qname(),
                what: "Value attribute".to_string(),
            });
        }
        Ok(())
    }
}

impl XmlObject for Status {
    impl_xml_object_common!();

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        let mut children: Vec<&dyn XmlObject> = Vec::new();
        if let Some(code) = &self.status_code {
            children.push(code);
        }
        if let Some(message) = &self.status_message {
            children.push(message);
        }
        children
    }

    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
        let mut children: Vec<&mut dyn XmlObject> = Vec::new();
        if let Some(code) = &mut self.status_code {
            children.push(code);
        }
        if let Some(message) = &mut self.status_message {
            children.push(message);
        }
        children
    }
}

/// Builds empty [`Status`] objects.
#[derive(Debug, Default)]
pub struct StatusBuilder;

impl XmlObjectBuilder for StatusBuilder {
    fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
        Box::new(Status::empty())
    }
}

/// Marshals [`Status`] objects; children carry all the state.
#[derive(Debug, Default)]
pub struct StatusMarshaller;

impl Marshaller for StatusMarshaller {}

/// Unmarshals [`Status`] objects.
#[derive(Debug, Default)]
pub struct StatusUnmarshaller;

impl Unmarshaller for StatusUnmarshaller {
    fn process_child(
        &self,
        object: &mut dyn XmlObject,
        child: Box<dyn XmlObject>,
    ) -> Result<(), UnmarshallingError> {
        let child = match downcast_child::<StatusCode>(child) {
            Ok(code) => {
                downcast_self::<Status>(object)?.status_code = Some(*code);
                return Ok(());
            }
            Err(child) => child,
        };
        let child = match downcast_child::<StatusMessage>(child) {
            Ok(message) => {
                downcast_self::<Status>(object)?.status_message = Some(*message);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_status_validates() {
        let status = Status::success();
        assert!(status.is_success());
        assert!(status.validate().is_ok());
    }

    #[test]
    fn missing_code_fails_validation() {
        let status = Status::empty();
        assert!(status.validate().is_err());
        assert!(!status.is_success());
    }

    #[test]
    fn nested_codes_are_children_in_order() {
        let status = Status::new(
            StatusCode::new(status_codes::REQUESTER)
                .with_sub_code(StatusCode::new(status_codes::AUTHN_FAILED)),
        )
        .with_message("authentication failed");

        let children = status.ordered_children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].element_name(), &StatusCode::element_qname());
        assert_eq!(children[1].element_name(), &StatusMessage::element_qname());

        let code = status.status_code().unwrap();
        assert_eq!(
            code.sub_code().and_then(StatusCode::value),
            Some(status_codes::AUTHN_FAILED)
        );
    }
}
