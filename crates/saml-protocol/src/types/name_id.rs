//! Name identifier types.
//!
//! `saml:NameID` and `saml:Issuer` both carry the NameIDType shape: a
//! string value with optional Format and qualifier attributes.

use saml_xml::dom::{Attribute, Element};
use saml_xml::error::{MarshallingError, UnmarshallingError};
use saml_xml::marshall::Marshaller;
use saml_xml::object::{XmlObject, XmlObjectBase};
use saml_xml::qname::QName;
use saml_xml::registry::XmlObjectBuilder;
use saml_xml::unmarshall::Unmarshaller;

use crate::constants::{saml_name, NameIdFormat};

use super::{downcast_ref, downcast_self, impl_xml_object_common, push_attr};

macro_rules! name_id_type {
    ($ty:ident, $builder:ident, $marshaller:ident, $unmarshaller:ident, $local:literal) => {
        impl $ty {
            /// The element's local name.
            pub const ELEMENT_LOCAL: &'static str = $local;

            /// The element's qualified name.
            #[must_use]
            pub fn element_qname() -> QName {
                saml_name($local)
            }

            /// Creates an instance with the given value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                let mut base = XmlObjectBase::new(Self::element_qname());
                base.set_text_content(Some(value.into()));
                Self {
                    base,
                    format: None,
                    name_qualifier: None,
                    sp_name_qualifier: None,
                }
            }

            /// The identifier value.
            #[must_use]
            pub fn value(&self) -> &str {
                self.base.text_content().unwrap_or_default()
            }

            /// Sets the identifier value.
            pub fn set_value(&mut self, value: impl Into<String>) {
                self.base.set_text_content(Some(value.into()));
            }

            /// The Format attribute URI, if set.
            #[must_use]
            pub fn format(&self) -> Option<&str> {
                self.format.as_deref()
            }

            /// Sets the Format attribute from a known format.
            #[must_use]
            pub fn with_format(mut self, format: NameIdFormat) -> Self {
                self.format = Some(format.uri().to_string());
                self.base.invalidate_dom();
                self
            }

            /// Sets the Format attribute URI verbatim.
            pub fn set_format_uri(&mut self, uri: Option<String>) {
                self.format = uri;
                self.base.invalidate_dom();
            }

            /// The NameQualifier attribute.
            #[must_use]
            pub fn name_qualifier(&self) -> Option<&str> {
                self.name_qualifier.as_deref()
            }

            /// Sets the NameQualifier attribute.
            pub fn set_name_qualifier(&mut self, qualifier: Option<String>) {
                self.name_qualifier = qualifier;
                self.base.invalidate_dom();
            }

            /// The SPNameQualifier attribute.
            #[must_use]
            pub fn sp_name_qualifier(&self) -> Option<&str> {
                self.sp_name_qualifier.as_deref()
            }

            /// Sets the SPNameQualifier attribute.
            pub fn set_sp_name_qualifier(&mut self, qualifier: Option<String>) {
                self.sp_name_qualifier = qualifier;
                self.base.invalidate_dom();
            }
        }

        impl XmlObject for $ty {
            impl_xml_object_common!();

            fn ordered_children(&self) -> Vec<&dyn XmlObject> {
                Vec::new()
            }

            fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
                Vec::new()
            }
        }

        impl XmlObjectBuilder for $builder {
            fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
                Box::new($ty::new(""))
            }
        }

        impl Marshaller for $marshaller {
            fn marshall_attributes(
                &self,
                object: &dyn XmlObject,
                element: &mut Element,
            ) -> Result<(), MarshallingError> {
                let this = downcast_ref::<$ty>(object)?;
                push_attr(element, "Format", this.format());
                push_attr(element, "NameQualifier", this.name_qualifier());
                push_attr(element, "SPNameQualifier", this.sp_name_qualifier());
                Ok(())
            }
        }

        impl Unmarshaller for $unmarshaller {
            fn process_attribute(
                &self,
                object: &mut dyn XmlObject,
                attribute: &Attribute,
            ) -> Result<(), UnmarshallingError> {
                let this = downcast_self::<$ty>(object)?;
                match (
                    attribute.name.namespace_uri(),
                    attribute.name.local_name(),
                ) {
                    (None, "Format") => this.format = Some(attribute.value.clone()),
                    (None, "NameQualifier") => {
                        this.name_qualifier = Some(attribute.value.clone());
                    }
                    (None, "SPNameQualifier") => {
                        this.sp_name_qualifier = Some(attribute.value.clone());
                    }
                    _ => object.base_mut().add_unknown_attribute(attribute.clone()),
                }
                Ok(())
            }
        }
    };
}

/// A `saml:NameID` element.
#[derive(Debug)]
pub struct NameId {
    base: XmlObjectBase,
    format: Option<String>,
    name_qualifier: Option<String>,
    sp_name_qualifier: Option<String>,
}

impl NameId {
    /// Creates an email-format name identifier.
    #[must_use]
    pub fn email(address: impl Into<String>) -> Self {
        Self::new(address).with_format(NameIdFormat::Email)
    }
}

/// Builds empty [`NameId`] objects.
#[derive(Debug, Default)]
pub struct NameIdBuilder;

/// Marshals [`NameId`] objects.
#[derive(Debug, Default)]
pub struct NameIdMarshaller;

/// Unmarshals [`NameId`] objects.
#[derive(Debug, Default)]
pub struct NameIdUnmarshaller;

name_id_type!(NameId, NameIdBuilder, NameIdMarshaller, NameIdUnmarshaller, "NameID");

/// A `saml:Issuer` element.
#[derive(Debug)]
pub struct Issuer {
    base: XmlObjectBase,
    format: Option<String>,
    name_qualifier: Option<String>,
    sp_name_qualifier: Option<String>,
}

impl Issuer {
    /// Creates an entity-format issuer, the usual shape for identity
    /// providers.
    #[must_use]
    pub fn entity(entity_id: impl Into<String>) -> Self {
        Self::new(entity_id).with_format(NameIdFormat::Entity)
    }
}

/// Builds empty [`Issuer`] objects.
#[derive(Debug, Default)]
pub struct IssuerBuilder;

/// Marshals [`Issuer`] objects.
#[derive(Debug, Default)]
pub struct IssuerMarshaller;

/// Unmarshals [`Issuer`] objects.
#[derive(Debug, Default)]
pub struct IssuerUnmarshaller;

name_id_type!(Issuer, IssuerBuilder, IssuerMarshaller, IssuerUnmarshaller, "Issuer");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_id_carries_value_and_format() {
        let name_id = NameId::email("user@example.com");
        assert_eq!(name_id.value(), "user@example.com");
        assert_eq!(name_id.format(), Some(NameIdFormat::Email.uri()));
        assert_eq!(name_id.element_name(), &saml_name("NameID"));
    }

    #[test]
    fn issuer_is_a_distinct_type_with_its_own_element() {
        let issuer = Issuer::entity("https://idp.example.com");
        assert_eq!(issuer.element_name(), &saml_name("Issuer"));
        assert_eq!(issuer.format(), Some(NameIdFormat::Entity.uri()));
    }

    #[test]
    fn setters_invalidate_the_cached_dom() {
        let mut name_id = NameId::new("before");
        name_id
            .base_mut()
            .set_cached_dom(Element::new(NameId::element_qname()));
        name_id.set_value("after");
        assert!(name_id.base().cached_dom().is_none());
    }
}
