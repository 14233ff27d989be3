//! Marshalling: typed object tree to DOM tree.
//!
//! The [`Marshaller`] trait supplies a generic driver that walks an object
//! in a fixed order (element creation, namespace declarations, attributes,
//! text content, then children in list order) and delegates the
//! type-specific parts to overridable hooks. Child order in the produced
//! DOM equals [`crate::object::XmlObject::ordered_children`] order, which
//! signature digest computation depends on.

use crate::dom::Element;
use crate::error::MarshallingError;
use crate::object::XmlObject;
use crate::qname::{QName, XSI_NS, XSI_PREFIX, XSI_TYPE_LOCAL};
use crate::registry::XmlObjectRegistry;

/// Converts typed objects into DOM elements.
///
/// Implementations are stateless and thread-safe; one instance serves all
/// objects of its element type concurrently.
pub trait Marshaller: Send + Sync {
    /// Marshals an object into a DOM element.
    ///
    /// An object that has been marshalled or unmarshalled and not mutated
    /// since returns a clone of its cached DOM, so repeated marshalling of
    /// an unmutated object is idempotent. The produced element is bound to
    /// the object as its cached representation.
    ///
    /// # Errors
    ///
    /// Returns a [`MarshallingError`] if any attribute, content, or child
    /// fails to marshal. No partial output escapes: the element is built
    /// completely before it is cached or handed to a parent.
    fn marshall(
        &self,
        object: &mut dyn XmlObject,
        registry: &XmlObjectRegistry,
    ) -> Result<Element, MarshallingError> {
        if let Some(cached) = object.base().cached_dom() {
            return Ok(cached.clone());
        }

        let mut element = Element::new(object.element_name().clone());

        if let Some(type_name) = object.schema_type().cloned() {
            element.declare_namespace(Some(XSI_PREFIX), XSI_NS);
            if let (Some(uri), Some(prefix)) = (type_name.namespace_uri(), type_name.prefix()) {
                element.declare_namespace(Some(prefix), uri);
            }
            element.set_attribute(
                QName::new(XSI_NS, XSI_TYPE_LOCAL).with_prefix(XSI_PREFIX),
                type_name.lexical(),
            );
        }

        for decl in object.base().namespaces() {
            element.declare_namespace(decl.prefix.as_deref(), decl.uri.clone());
        }

        self.marshall_attributes(&*object, &mut element)?;
        for attr in object.base().unknown_attributes() {
            element.push_attribute(attr.clone());
        }

        self.marshall_content(&*object, &mut element)?;

        for child in object.ordered_children_mut() {
            let child_name = child.element_name().clone();
            let marshaller = registry
                .marshaller_for(&*child)
                .map_err(|_| MarshallingError::ProviderNotFound(child_name.clone()))?;
            let child_element =
                marshaller
                    .marshall(child, registry)
                    .map_err(|e| MarshallingError::Child {
                        name: child_name,
                        source: Box::new(e),
                    })?;
            element.append_child(child_element);
        }

        object.base_mut().set_cached_dom(element.clone());
        Ok(element)
    }

    /// Marshals an object and appends the produced element to a parent.
    ///
    /// The element is built completely before the append, so a failure
    /// never leaves the parent partially mutated.
    ///
    /// # Errors
    ///
    /// Returns a [`MarshallingError`] if marshalling fails; the parent is
    /// untouched in that case.
    fn marshall_into(
        &self,
        object: &mut dyn XmlObject,
        parent: &mut Element,
        registry: &XmlObjectRegistry,
    ) -> Result<(), MarshallingError> {
        let element = self.marshall(object, registry)?;
        parent.append_child(element);
        Ok(())
    }

    /// Type-specific hook: writes the object's typed attributes onto the
    /// element in a stable order. Attributes that serve as XML IDs must be
    /// registered via [`Element::set_id_attribute`] so later ID-reference
    /// resolution can find them.
    ///
    /// # Errors
    ///
    /// Returns a [`MarshallingError`] if an attribute value cannot be
    /// produced.
    fn marshall_attributes(
        &self,
        _object: &dyn XmlObject,
        _element: &mut Element,
    ) -> Result<(), MarshallingError> {
        Ok(())
    }

    /// Type-specific hook: writes the object's text content. The default
    /// emits the base text content, which suits simple string elements.
    ///
    /// # Errors
    ///
    /// Returns a [`MarshallingError`] if the content cannot be produced.
    fn marshall_content(
        &self,
        object: &dyn XmlObject,
        element: &mut Element,
    ) -> Result<(), MarshallingError> {
        if let Some(text) = object.base().text_content() {
            element.append_text(text);
        }
        Ok(())
    }
}

/// Marshals an object using the marshaller registered for it.
///
/// # Errors
///
/// Returns [`MarshallingError::ProviderNotFound`] if no marshaller is
/// registered, or any error the marshaller itself raises.
pub fn marshall_object(
    object: &mut dyn XmlObject,
    registry: &XmlObjectRegistry,
) -> Result<Element, MarshallingError> {
    let marshaller = registry
        .marshaller_for(&*object)
        .map_err(|_| MarshallingError::ProviderNotFound(object.element_name().clone()))?;
    marshaller.marshall(object, registry)
}
