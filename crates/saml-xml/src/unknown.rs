//! Generic object type for elements with no specific registration.
//!
//! An [`UnknownElement`] preserves attributes, text, and the full ordered
//! child list of an element the registry has no typed provider for. When
//! installed as the registry's default provider it makes extension
//! content survive an unmarshal/marshal round trip untouched.

use std::any::Any;

use crate::dom::Element;
use crate::error::UnmarshallingError;
use crate::object::{XmlObject, XmlObjectBase};
use crate::qname::QName;
use crate::registry::{ProviderTriple, XmlObjectBuilder};
use crate::unmarshall::Unmarshaller;

/// An element not modeled by any typed getter.
#[derive(Debug)]
pub struct UnknownElement {
    base: XmlObjectBase,
    children: Vec<Box<dyn XmlObject>>,
}

impl UnknownElement {
    /// Creates an empty unknown element with the given name.
    #[must_use]
    pub fn new(name: QName) -> Self {
        Self {
            base: XmlObjectBase::new(name),
            children: Vec::new(),
        }
    }

    /// Appends a child, taking ownership.
    pub fn push_child(&mut self, child: Box<dyn XmlObject>) {
        self.children.push(child);
        self.base.invalidate_dom();
    }

    /// The preserved children in document order.
    #[must_use]
    pub fn children(&self) -> &[Box<dyn XmlObject>] {
        &self.children
    }
}

impl XmlObject for UnknownElement {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        self.children.iter().map(AsRef::as_ref).collect()
    }

    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
        self.children.iter_mut().map(AsMut::as_mut).collect()
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

/// Builds [`UnknownElement`] instances for arbitrary names.
#[derive(Debug, Default)]
pub struct UnknownElementBuilder;

impl XmlObjectBuilder for UnknownElementBuilder {
    fn build(&self, name: &QName) -> Box<dyn XmlObject> {
        Box::new(UnknownElement::new(name.clone()))
    }
}

/// Marshals [`UnknownElement`]s. The generic driver already replays base
/// state and children, so every hook default applies.
#[derive(Debug, Default)]
pub struct UnknownElementMarshaller;

impl crate::marshall::Marshaller for UnknownElementMarshaller {}

/// Unmarshals [`UnknownElement`]s, accepting any child.
#[derive(Debug, Default)]
pub struct UnknownElementUnmarshaller;

impl Unmarshaller for UnknownElementUnmarshaller {
    fn process_child(
        &self,
        object: &mut dyn XmlObject,
        child: Box<dyn XmlObject>,
    ) -> Result<(), UnmarshallingError> {
        let unknown = object
            .as_any_mut()
            .downcast_mut::<UnknownElement>()
            .ok_or_else(|| UnmarshallingError::Malformed("expected UnknownElement".to_string()))?;
        unknown.push_child(child);
        Ok(())
    }
}

/// The provider triple for unknown elements, suitable for
/// [`crate::registry::XmlObjectRegistry::set_default_provider`].
#[must_use]
pub fn unknown_provider_triple() -> ProviderTriple {
    ProviderTriple::new(
        UnknownElementBuilder,
        UnknownElementMarshaller,
        UnknownElementUnmarshaller,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshall::marshall_object;
    use crate::registry::XmlObjectRegistry;
    use crate::unmarshall::{unmarshall_element, UnmarshallContext};

    #[test]
    fn unknown_subtree_round_trips() {
        let registry = XmlObjectRegistry::new();
        registry.set_default_provider(unknown_provider_triple());
        let ctx = UnmarshallContext::new(&registry);

        let xml = r#"<ex:Extension xmlns:ex="urn:example" keep="me"><ex:Inner a="1"/><ex:Inner a="2"/></ex:Extension>"#;
        let element = Element::parse(xml).unwrap();

        let mut object = unmarshall_element(&element, &ctx).unwrap();
        let remarshalled = marshall_object(object.as_mut(), &registry).unwrap();

        assert_eq!(element, remarshalled);
    }

    #[test]
    fn children_keep_document_order() {
        let registry = XmlObjectRegistry::new();
        registry.set_default_provider(unknown_provider_triple());
        let ctx = UnmarshallContext::new(&registry);

        let xml = r#"<Root><A/><B/><C/></Root>"#;
        let element = Element::parse(xml).unwrap();
        let object = unmarshall_element(&element, &ctx).unwrap();

        let names: Vec<_> = object
            .ordered_children()
            .iter()
            .map(|c| c.element_name().local_name().to_string())
            .collect();
        assert_eq!(names, ["A", "B", "C"]);
    }
}
