//! Subject types.
//!
//! The subject identifies the principal an assertion speaks about: an
//! optional NameID plus any number of subject confirmations.

use chrono::{DateTime, Utc};

use saml_xml::dom::{Attribute, Element};
use saml_xml::error::{MarshallingError, UnmarshallingError};
use saml_xml::marshall::Marshaller;
use saml_xml::object::{downcast_child, XmlObject, XmlObjectBase};
use saml_xml::qname::QName;
use saml_xml::registry::XmlObjectBuilder;
use saml_xml::unmarshall::Unmarshaller;

use crate::constants::{confirmation_methods, format_instant, saml_name};

use super::{downcast_ref, downcast_self, impl_xml_object_common, parse_instant_attr, push_attr, NameId};

/// A `saml:SubjectConfirmationData` element (attributes only).
#[derive(Debug)]
pub struct SubjectConfirmationData {
    base: XmlObjectBase,
    /// Time before which the subject cannot be confirmed.
    pub not_before: Option<DateTime<Utc>>,
    /// Time at or after which the subject can no longer be confirmed.
    pub not_on_or_after: Option<DateTime<Utc>>,
    /// The endpoint the enclosing message must have been delivered to.
    pub recipient: Option<String>,
    /// The request this confirmation responds to.
    pub in_response_to: Option<String>,
    /// The network address of the presenter.
    pub address: Option<String>,
}

impl SubjectConfirmationData {
    /// The element's qualified name.
    #[must_use]
    pub fn element_qname() -> QName {
        saml_name("SubjectConfirmationData")
    }

    /// Creates empty confirmation data.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            not_before: None,
            not_on_or_after: None,
            recipient: None,
            in_response_to: None,
            address: None,
        }
    }

    /// Creates bearer confirmation data for a request/recipient pair.
    #[must_use]
    pub fn for_request(request_id: impl Into<String>, recipient: impl Into<String>) -> Self {
        let mut data = Self::new();
        data.in_response_to = Some(request_id.into());
        data.recipient = Some(recipient.into());
        data
    }
}

impl Default for SubjectConfirmationData {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlObject for SubjectConfirmationData {
    impl_xml_object_common!();

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        Vec::new()
    }

    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
        Vec::new()
    }
}

/// Builds empty [`SubjectConfirmationData`] objects.
#[derive(Debug, Default)]
pub struct SubjectConfirmationDataBuilder;

impl XmlObjectBuilder for SubjectConfirmationDataBuilder {
    fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
        Box::new(SubjectConfirmationData::new())
    }
}

/// Marshals [`SubjectConfirmationData`] objects.
#[derive(Debug, Default)]
pub struct SubjectConfirmationDataMarshaller;

impl Marshaller for SubjectConfirmationDataMarshaller {
    fn marshall_attributes(
        &self,
        object: &dyn XmlObject,
        element: &mut Element,
    ) -> Result<(), MarshallingError> {
        let this = downcast_ref::<SubjectConfirmationData>(object)?;
        push_attr(
            element,
            "NotBefore",
            this.not_before.map(format_instant).as_deref(),
        );
        push_attr(
            element,
            "NotOnOrAfter",
            this.not_on_or_after.map(format_instant).as_deref(),
        );
        push_attr(element, "Recipient", this.recipient.as_deref());
        push_attr(element, "InResponseTo", this.in_response_to.as_deref());
        push_attr(element, "Address", this.address.as_deref());
        Ok(())
    }
}

/// Unmarshals [`SubjectConfirmationData`] objects.
#[derive(Debug, Default)]
pub struct SubjectConfirmationDataUnmarshaller;

impl Unmarshaller for SubjectConfirmationDataUnmarshaller {
    fn process_attribute(
        &self,
        object: &mut dyn XmlObject,
        attribute: &Attribute,
    ) -> Result<(), UnmarshallingError> {
        let element = SubjectConfirmationData::element_qname();
        let this = downcast_self::<SubjectConfirmationData>(object)?;
        match (attribute.name.namespace_uri(), attribute.name.local_name()) {
            (None, "NotBefore") => {
                this.not_before =
                    Some(parse_instant_attr(&element, "NotBefore", &attribute.value)?);
            }
            (None, "NotOnOrAfter") => {
                this.not_on_or_after =
                    Some(parse_instant_attr(&element, "NotOnOrAfter", &attribute.value)?);
            }
            (None, "Recipient") => this.recipient = Some(attribute.value.clone()),
            (None, "InResponseTo") => this.in_response_to = Some(attribute.value.clone()),
            (None, "Address") => this.address = Some(attribute.value.clone()),
            _ => object.base_mut().add_unknown_attribute(attribute.clone()),
        }
        Ok(())
    }
}

/// A `saml:SubjectConfirmation` element.
#[derive(Debug)]
pub struct SubjectConfirmation {
    base: XmlObjectBase,
    method: Option<String>,
    name_id: Option<NameId>,
    data: Option<SubjectConfirmationData>,
}

impl SubjectConfirmation {
    /// The element's qualified name.
    #[must_use]
    pub fn element_qname() -> QName {
        saml_name("SubjectConfirmation")
    }

    /// Creates a confirmation with the given method URI.
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            method: Some(method.into()),
            name_id: None,
            data: None,
        }
    }

    fn empty() -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            method: None,
            name_id: None,
            data: None,
        }
    }

    /// Creates a bearer confirmation.
    #[must_use]
    pub fn bearer() -> Self {
        Self::new(confirmation_methods::BEARER)
    }

    /// Attaches confirmation data.
    #[must_use]
    pub fn with_data(mut self, data: SubjectConfirmationData) -> Self {
        self.data = Some(data);
        self.base.invalidate_dom();
        self
    }

    /// The Method attribute URI.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// The confirmation data, if any.
    #[must_use]
    pub fn data(&self) -> Option<&SubjectConfirmationData> {
        self.data.as_ref()
    }
}

impl XmlObject for SubjectConfirmation {
    impl_xml_object_common!();

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        let mut children: Vec<&dyn XmlObject> = Vec::new();
        if let Some(name_id) = &self.name_id {
            children.push(name_id);
        }
        if let Some(data) = &self.data {
            children.push(data);
        }
        children
    }

    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
        let mut children: Vec<&mut dyn XmlObject> = Vec::new();
        if let Some(name_id) = &mut self.name_id {
            children.push(name_id);
        }
        if let Some(data) = &mut self.data {
            children.push(data);
        }
        children
    }
}

/// Builds empty [`SubjectConfirmation`] objects.
#[derive(Debug, Default)]
pub struct SubjectConfirmationBuilder;

impl XmlObjectBuilder for SubjectConfirmationBuilder {
    fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
        Box::new(SubjectConfirmation::empty())
    }
}

/// Marshals [`SubjectConfirmation`] objects.
#[derive(Debug, Default)]
pub struct SubjectConfirmationMarshaller;

impl Marshaller for SubjectConfirmationMarshaller {
    fn marshall_attributes(
        &self,
        object: &dyn XmlObject,
        element: &mut Element,
    ) -> Result<(), MarshallingError> {
        let this = downcast_ref::<SubjectConfirmation>(object)?;
        push_attr(element, "Method", this.method());
        Ok(())
    }
}

/// Unmarshals [`SubjectConfirmation`] objects.
#[derive(Debug, Default)]
pub struct SubjectConfirmationUnmarshaller;

impl Unmarshaller for SubjectConfirmationUnmarshaller {
    fn process_attribute(
        &self,
        object: &mut dyn XmlObject,
        attribute: &Attribute,
    ) -> Result<(), UnmarshallingError> {
        let this = downcast_self::<SubjectConfirmation>(object)?;
        match (attribute.name.namespace_uri(), attribute.name.local_name()) {
            (None, "Method") => this.method = Some(attribute.value.clone()),
            _ => object.base_mut().add_unknown_attribute(attribute.clone()),
        }
        Ok(())
    }

    fn process_child(
        &self,
        object: &mut dyn XmlObject,
        child: Box<dyn XmlObject>,
    ) -> Result<(), UnmarshallingError> {
        let child = match downcast_child::<NameId>(child) {
            Ok(name_id) => {
                downcast_self::<SubjectConfirmation>(object)?.name_id = Some(*name_id);
                return Ok(());
            }
            Err(child) => child,
        };
        let child = match downcast_child::<SubjectConfirmationData>(child) {
            Ok(data) => {
                downcast_self::<SubjectConfirmation>(object)?.data = Some(*data);
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

/// A `saml:Subject` element.
#[derive(Debug)]
pub struct Subject {
    base: XmlObjectBase,
    name_id: Option<NameId>,
    confirmations: Vec<SubjectConfirmation>,
}

impl Subject {
    /// The element's qualified name.
    #[must_use]
    pub fn element_qname() -> QName {
        saml_name("Subject")
    }

    /// Creates a subject around a name identifier.
    #[must_use]
    pub fn new(name_id: NameId) -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            name_id: Some(name_id),
            confirmations: Vec::new(),
        }
    }

    fn empty() -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            name_id: None,
            confirmations: Vec::new(),
        }
    }

    /// Appends a subject confirmation.
    #[must_use]
    pub fn with_confirmation(mut self, confirmation: SubjectConfirmation) -> Self {
        self.confirmations.push(confirmation);
        self.base.invalidate_dom();
        self
    }

    /// The subject's name identifier, if any.
    #[must_use]
    pub fn name_id(&self) -> Option<&NameId> {
        self.name_id.as_ref()
    }

    /// The subject confirmations, in document order.
    #[must_use]
    pub fn confirmations(&self) -> &[SubjectConfirmation] {
        &self.confirmations
    }
}

impl XmlObject for Subject {
    impl_xml_object_common!();

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        let mut children: Vec<&dyn XmlObject> = Vec::new();
        if let Some(name_id) = &self.name_id {
            children.push(name_id);
        }
        children.extend(self.confirmations.iter().map(|c| c as &dyn XmlObject));
        children
    }

    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
        let mut children: Vec<&mut dyn XmlObject> = Vec::new();
        if let Some(name_id) = &mut self.name_id {
            children.push(name_id);
        }
        children.extend(
            self.confirmations
                .iter_mut()
                .map(|c| c as &mut dyn XmlObject),
        );
        children
    }
}

/// Builds empty [`Subject`] objects.
#[derive(Debug, Default)]
pub struct SubjectBuilder;

impl XmlObjectBuilder for SubjectBuilder {
    fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
        Box::new(Subject::empty())
    }
}

/// Marshals [`Subject`] objects; children carry all the state.
#[derive(Debug, Default)]
pub struct SubjectMarshaller;

impl Marshaller for SubjectMarshaller {}

/// Unmarshals [`Subject`] objects.
#[derive(Debug, Default)]
pub struct SubjectUnmarshaller;

impl Unmarshaller for SubjectUnmarshaller {
    fn process_child(
        &self,
        object: &mut dyn XmlObject,
        child: Box<dyn XmlObject>,
    ) -> Result<(), UnmarshallingError> {
        let child = match downcast_child::<NameId>(child) {
            Ok(name_id) => {
                downcast_self::<Subject>(object)?.name_id = Some(*name_id);
                return Ok(());
            }
            Err(child) => child,
        };
        let child = match downcast_child::<SubjectConfirmation>(child) {
            Ok(confirmation) => {
                downcast_self::<Subject>(object)?
                    .confirmations
                    .push(*confirmation);
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
    fn subject_orders_name_id_before_confirmations() {
        let subject = Subject::new(NameId::email("user@example.com"))
            .with_confirmation(SubjectConfirmation::bearer().with_data(
                SubjectConfirmationData::for_request("_req1", "https://sp.example.com/acs"),
            ));

        let children = subject.ordered_children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].element_name().local_name(), "NameID");
        assert_eq!(
            children[1].element_name().local_name(),
            "SubjectConfirmation"
        );
    }

    #[test]
    fn bearer_confirmation_carries_method_uri() {
        let confirmation = SubjectConfirmation::bearer();
        assert_eq!(confirmation.method(), Some(confirmation_methods::BEARER));
    }
}
