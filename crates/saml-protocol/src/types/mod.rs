//! SAML 2.0 element types.
//!
//! Each type embeds an `XmlObjectBase`, exposes typed accessors, and
//! ships its builder/marshaller/unmarshaller alongside. Registration of
//! all provider triples lives in [`crate::providers`].

mod assertion;
mod attribute;
mod conditions;
mod name_id;
mod response;
mod status;
mod subject;

pub use assertion::*;
pub use attribute::*;
pub use conditions::*;
pub use name_id::*;
pub use response::*;
pub use status::*;
pub use subject::*;

use chrono::{DateTime, Utc};

use saml_xml::dom::Element;
use saml_xml::error::UnmarshallingError;
use saml_xml::object::XmlObject;
use saml_xml::qname::QName;

/// Generates the `XmlObject` methods every concrete type implements the
/// same way; `ordered_children`/`ordered_children_mut` stay per-type.
macro_rules! impl_xml_object_common {
    () => {
        fn base(&self) -> &saml_xml::object::XmlObjectBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut saml_xml::object::XmlObjectBase {
            &mut self.base
        }
        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }
        fn into_any(self: Box<Self>) -> Box<dyn ::std::any::Any> {
            self
        }
    };
}
pub(crate) use impl_xml_object_common;

/// Sets an optional unprefixed attribute.
pub(crate) fn push_attr(element: &mut Element, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        element.set_attribute(QName::unqualified(name), value);
    }
}

/// Downcasts an object to its concrete type inside a marshalling hook.
pub(crate) fn downcast_ref<T: XmlObject>(
    object: &dyn XmlObject,
) -> Result<&T, saml_xml::error::MarshallingError> {
    object.as_any().downcast_ref::<T>().ok_or_else(|| {
        saml_xml::error::MarshallingError::Content(
            object.element_name().clone(),
            "unexpected object type".to_string(),
        )
    })
}

/// Downcasts the object under construction to its concrete type inside a
/// provider hook.
pub(crate) fn downcast_self<T: XmlObject>(
    object: &mut dyn XmlObject,
) -> Result<&mut T, UnmarshallingError> {
    let name = object.element_name().clone();
    object
        .as_any_mut()
        .downcast_mut::<T>()
        .ok_or_else(|| UnmarshallingError::Malformed(format!("unexpected object type for {name}")))
}

/// Parses a SAML timestamp attribute.
pub(crate) fn parse_instant_attr(
    element: &QName,
    attribute: &str,
    value: &str,
) -> Result<DateTime<Utc>, UnmarshallingError> {
    crate::constants::parse_instant(value).map_err(|e| {
        UnmarshallingError::InvalidAttributeValue {
            element: element.clone(),
            attribute: attribute.to_string(),
            reason: e.to_string(),
        }
    })
}
