//! Attribute types.
//!
//! `saml:Attribute` carries named values about a subject;
//! `saml:AttributeStatement` groups them inside an assertion. Attribute
//! values preserve any `xsi:type` they arrive with, and statements keep
//! children they do not model (such as EncryptedAttribute) in an
//! unknown-children list so they survive a round trip.

use saml_xml::dom::{Attribute as DomAttribute, Element};
use saml_xml::error::{MarshallingError, UnmarshallingError};
use saml_xml::marshall::Marshaller;
use saml_xml::object::{downcast_child, XmlObject, XmlObjectBase};
use saml_xml::qname::QName;
use saml_xml::registry::XmlObjectBuilder;
use saml_xml::unmarshall::Unmarshaller;

use crate::constants::saml_name;

use super::{downcast_ref, downcast_self, impl_xml_object_common, push_attr};

/// A `saml:AttributeValue` element.
#[derive(Debug)]
pub struct AttributeValue {
    base: XmlObjectBase,
}

impl AttributeValue {
    /// The element's qualified name.
    #[must_use]
    pub fn element_qname() -> QName {
        saml_name("AttributeValue")
    }

    /// Creates a string-valued attribute value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        let mut base = XmlObjectBase::new(Self::element_qname());
        base.set_text_content(Some(value.into()));
        Self { base }
    }

    /// The value text.
    #[must_use]
    pub fn value(&self) -> &str {
        self.base.text_content().unwrap_or_default()
    }
}

impl XmlObject for AttributeValue {
    impl_xml_object_common!();

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        Vec::new()
    }

    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
        Vec::new()
    }
}

/// Builds empty [`AttributeValue`] objects.
#[derive(Debug, Default)]
pub struct AttributeValueBuilder;

impl XmlObjectBuilder for AttributeValueBuilder {
    fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
        Box::new(AttributeValue::new(""))
    }
}

/// Marshals [`AttributeValue`] objects; text and any xsi:type live on
/// the base.
#[derive(Debug, Default)]
pub struct AttributeValueMarshaller;

impl Marshaller for AttributeValueMarshaller {}

/// Unmarshals [`AttributeValue`] objects.
#[derive(Debug, Default)]
pub struct AttributeValueUnmarshaller;

impl Unmarshaller for AttributeValueUnmarshaller {}

/// A `saml:Attribute` element.
#[derive(Debug)]
pub struct Attribute {
    base: XmlObjectBase,
    name: Option<String>,
    name_format: Option<String>,
    friendly_name: Option<String>,
    values: Vec<AttributeValue>,
    unknown_children: Vec<Box<dyn XmlObject>>,
}

impl Attribute {
    /// The element's qualified name.
    #[must_use]
    pub fn element_qname() -> QName {
        saml_name("Attribute")
    }

    /// Creates an attribute with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            name: Some(name.into()),
            name_format: None,
            friendly_name: None,
            values: Vec::new(),
            unknown_children: Vec::new(),
        }
    }

    fn empty() -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            name: None,
            name_format: None,
            friendly_name: None,
            values: Vec::new(),
            unknown_children: Vec::new(),
        }
    }

    /// Creates a single-valued attribute.
    #[must_use]
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name).with_value(value)
    }

    /// Appends a string value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.values.push(AttributeValue::new(value));
        self.base.invalidate_dom();
        self
    }

    /// Sets the FriendlyName attribute.
    #[must_use]
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self.base.invalidate_dom();
        self
    }

    /// Sets the NameFormat attribute.
    #[must_use]
    pub fn with_name_format(mut self, format: impl Into<String>) -> Self {
        self.name_format = Some(format.into());
        self.base.invalidate_dom();
        self
    }

    /// The Name attribute.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The NameFormat attribute.
    #[must_use]
    pub fn name_format(&self) -> Option<&str> {
        self.name_format.as_deref()
    }

    /// The FriendlyName attribute.
    #[must_use]
    pub fn friendly_name(&self) -> Option<&str> {
        self.friendly_name.as_deref()
    }

    /// The attribute values, in document order.
    #[must_use]
    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }
}

impl XmlObject for Attribute {
    impl_xml_object_common!();

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        self.values
            .iter()
            .map(|v| v as &dyn XmlObject)
            .chain(self.unknown_children.iter().map(AsRef::as_ref))
            .collect()
    }

    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
        self.values
            .iter_mut()
            .map(|v| v as &mut dyn XmlObject)
            .chain(self.unknown_children.iter_mut().map(AsMut::as_mut))
            .collect()
    }
}

/// Builds empty [`Attribute`] objects.
#[derive(Debug, Default)]
pub struct AttributeBuilder;

impl XmlObjectBuilder for AttributeBuilder {
    fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
        Box::new(Attribute::empty())
    }
}

/// Marshals [`Attribute`] objects.
#[derive(Debug, Default)]
pub struct AttributeMarshaller;

impl Marshaller for AttributeMarshaller {
    fn marshall_attributes(
        &self,
        object: &dyn XmlObject,
        element: &mut Element,
    ) -> Result<(), MarshallingError> {
        let this = downcast_ref::<Attribute>(object)?;
        push_attr(element, "Name", this.name());
        push_attr(element, "NameFormat", this.name_format());
        push_attr(element, "FriendlyName", this.friendly_name());
        Ok(())
    }
}

/// Unmarshals [`Attribute`] objects.
#[derive(Debug, Default)]
pub struct AttributeUnmarshaller;

impl Unmarshaller for AttributeUnmarshaller {
    fn process_attribute(
        &self,
        object: &mut dyn XmlObject,
        attribute: &DomAttribute,
    ) -> Result<(), UnmarshallingError> {
        let this = downcast_self::<Attribute>(object)?;
        match (attribute.name.namespace_uri(), attribute.name.local_name()) {
            (None, "Name") => this.name = Some(attribute.value.clone()),
            (None, "NameFormat") => this.name_format = Some(attribute.value.clone()),
            (None, "FriendlyName") => this.friendly_name = Some(attribute.value.clone()),
            _ => object.base_mut().add_unknown_attribute(attribute.clone()),
        }
        Ok(())
    }

    fn process_child(
        &self,
        object: &mut dyn XmlObject,
        child: Box<dyn XmlObject>,
    ) -> Result<(), UnmarshallingError> {
        let this = downcast_self::<Attribute>(object)?;
        match downcast_child::<AttributeValue>(child) {
            Ok(value) => this.values.push(*value),
            Err(other) => this.unknown_children.push(other),
        }
        Ok(())
    }
}

/// A `saml:AttributeStatement` element.
#[derive(Debug)]
pub struct AttributeStatement {
    base: XmlObjectBase,
    attributes: Vec<Attribute>,
    unknown_children: Vec<Box<dyn XmlObject>>,
}

impl AttributeStatement {
    /// The element's qualified name.
    #[must_use]
    pub fn element_qname() -> QName {
        saml_name("AttributeStatement")
    }

    /// Creates an empty statement.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            attributes: Vec::new(),
            unknown_children: Vec::new(),
        }
    }

    /// Appends an attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self.base.invalidate_dom();
        self
    }

    /// The attributes, in document order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }
}

impl Default for AttributeStatement {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlObject for AttributeStatement {
    impl_xml_object_common!();

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        self.attributes
            .iter()
            .map(|a| a as &dyn XmlObject)
            .chain(self.unknown_children.iter().map(AsRef::as_ref))
            .collect()
    }

    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
        self.attributes
            .iter_mut()
            .map(|a| a as &mut dyn XmlObject)
            .chain(self.unknown_children.iter_mut().map(AsMut::as_mut))
            .collect()
    }
}

/// Builds empty [`AttributeStatement`] objects.
#[derive(Debug, Default)]
pub struct AttributeStatementBuilder;

impl XmlObjectBuilder for AttributeStatementBuilder {
    fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
        Box::new(AttributeStatement::new())
    }
}

/// Marshals [`AttributeStatement`] objects.
#[derive(Debug, Default)]
pub struct AttributeStatementMarshaller;

impl Marshaller for AttributeStatementMarshaller {}

/// Unmarshals [`AttributeStatement`] objects.
#[derive(Debug, Default)]
pub struct AttributeStatementUnmarshaller;

impl Unmarshaller for AttributeStatementUnmarshaller {
    fn process_child(
        &self,
        object: &mut dyn XmlObject,
        child: Box<dyn XmlObject>,
    ) -> Result<(), UnmarshallingError> {
        let this = downcast_self::<AttributeStatement>(object)?;
        match downcast_child::<Attribute>(child) {
            Ok(attribute) => this.attributes.push(*attribute),
            // EncryptedAttribute and extensions are preserved, not
            // modeled.
            Err(other) => this.unknown_children.push(other),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_builder_accumulates_values_in_order() {
        let attribute = Attribute::new("roles")
            .with_value("admin")
            .with_value("user")
            .with_friendly_name("Roles");

        assert_eq!(attribute.name(), Some("roles"));
        assert_eq!(attribute.friendly_name(), Some("Roles"));
        let values: Vec<_> = attribute.values().iter().map(AttributeValue::value).collect();
        assert_eq!(values, ["admin", "user"]);
    }

    #[test]
    fn statement_children_are_attributes_in_order() {
        let statement = AttributeStatement::new()
            .with_attribute(Attribute::single("email", "user@example.com"))
            .with_attribute(Attribute::single("dept", "engineering"));

        assert_eq!(statement.attributes().len(), 2);
        assert_eq!(statement.ordered_children().len(), 2);
    }
}
