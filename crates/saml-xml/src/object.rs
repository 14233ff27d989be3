//! The typed XML object model.
//!
//! An [`XmlObject`] is the typed counterpart of a DOM element. Concrete
//! element types embed an [`XmlObjectBase`] for the state every object
//! carries (name, xsi:type, namespace declarations, unknown attributes,
//! text content, cached DOM) and expose their typed children through
//! [`XmlObject::ordered_children`] in schema order.
//!
//! Objects are single-owner: children are held by value, so attaching a
//! child to a new parent is a move and the compiler enforces the
//! one-parent invariant. Objects are not thread-safe; callers keep a
//! single-writer discipline per tree.

use std::any::Any;
use std::fmt::Debug;

use crate::dom::{Attribute, Element, NamespaceDecl};
use crate::qname::QName;

/// Common state embedded in every concrete XML object type.
#[derive(Debug, Clone)]
pub struct XmlObjectBase {
    element_name: QName,
    schema_type: Option<QName>,
    namespaces: Vec<NamespaceDecl>,
    unknown_attributes: Vec<Attribute>,
    text_content: Option<String>,
    cached_dom: Option<Element>,
}

impl XmlObjectBase {
    /// Creates base state for an object with the given element name.
    #[must_use]
    pub fn new(element_name: QName) -> Self {
        Self {
            element_name,
            schema_type: None,
            namespaces: Vec::new(),
            unknown_attributes: Vec::new(),
            text_content: None,
            cached_dom: None,
        }
    }

    /// Returns the element's qualified name.
    #[must_use]
    pub fn element_name(&self) -> &QName {
        &self.element_name
    }

    /// Returns the schema type (xsi:type), if one is set.
    #[must_use]
    pub fn schema_type(&self) -> Option<&QName> {
        self.schema_type.as_ref()
    }

    /// Sets the schema type. Invalidates any cached DOM.
    pub fn set_schema_type(&mut self, schema_type: Option<QName>) {
        self.schema_type = schema_type;
        self.invalidate_dom();
    }

    /// Declares a namespace to emit on this object's element.
    pub fn declare_namespace(&mut self, prefix: Option<&str>, uri: impl Into<String>) {
        let prefix = prefix.map(str::to_owned);
        let uri = uri.into();
        if !self
            .namespaces
            .iter()
            .any(|d| d.prefix == prefix && d.uri == uri)
        {
            self.namespaces.push(NamespaceDecl { prefix, uri });
            self.invalidate_dom();
        }
    }

    /// Returns the namespace declarations for this object.
    #[must_use]
    pub fn namespaces(&self) -> &[NamespaceDecl] {
        &self.namespaces
    }

    /// Returns attributes not mapped to any typed accessor, in document
    /// order.
    #[must_use]
    pub fn unknown_attributes(&self) -> &[Attribute] {
        &self.unknown_attributes
    }

    /// Stores an attribute that no typed accessor claims, preserving it
    /// for round-trip marshalling.
    pub fn add_unknown_attribute(&mut self, attr: Attribute) {
        self.unknown_attributes.push(attr);
        self.invalidate_dom();
    }

    /// Returns the element text content, if any.
    #[must_use]
    pub fn text_content(&self) -> Option<&str> {
        self.text_content.as_deref()
    }

    /// Sets the element text content. Invalidates any cached DOM.
    pub fn set_text_content(&mut self, text: Option<String>) {
        self.text_content = text;
        self.invalidate_dom();
    }

    /// Returns the cached DOM representation, if the object has been
    /// marshalled or unmarshalled and not mutated since.
    #[must_use]
    pub fn cached_dom(&self) -> Option<&Element> {
        self.cached_dom.as_ref()
    }

    /// Binds a DOM representation to this object.
    pub fn set_cached_dom(&mut self, element: Element) {
        self.cached_dom = Some(element);
    }

    /// Drops the cached DOM. Every mutating accessor on a concrete type
    /// must call this (directly or through a base setter) so that a
    /// subsequent marshal reflects the mutation.
    pub fn invalidate_dom(&mut self) {
        self.cached_dom = None;
    }
}

/// A typed XML object.
///
/// Implementations are plain data types; the associated
/// builder/marshaller/unmarshaller triple registered in the
/// [`crate::registry::XmlObjectRegistry`] carries all behavior.
pub trait XmlObject: Any + Debug {
    /// The object's element name.
    fn element_name(&self) -> &QName {
        self.base().element_name()
    }

    /// The object's schema type (xsi:type), if any.
    fn schema_type(&self) -> Option<&QName> {
        self.base().schema_type()
    }

    /// Shared base state.
    fn base(&self) -> &XmlObjectBase;

    /// Shared base state, mutably.
    fn base_mut(&mut self) -> &mut XmlObjectBase;

    /// The object's children in marshalling order. The returned order is
    /// the schema-mandated sequence; marshalling emits children exactly in
    /// this order.
    fn ordered_children(&self) -> Vec<&dyn XmlObject>;

    /// Mutable view of the same children, in the same order. The
    /// marshalling driver uses this to bind each child's produced DOM onto
    /// the child as its cached representation.
    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject>;

    /// Upcast for downcasting by `process_child` hooks.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting by `process_child` hooks.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Consuming upcast, used to move an unmarshalled child into a typed
    /// slot of its parent.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Downcasts a boxed object to a concrete type, returning the box
/// unchanged on mismatch so the caller can try the next variant.
///
/// This is the matching arm of the child-dispatch pattern: a
/// `process_child` hook tries each known child type in turn and falls back
/// to the unknown-children list.
pub fn downcast_child<T: XmlObject>(
    child: Box<dyn XmlObject>,
) -> Result<Box<T>, Box<dyn XmlObject>> {
    if child.as_any().is::<T>() {
        // is::<T> above guarantees the concrete type.
        Ok(child
            .into_any()
            .downcast::<T>()
            .expect("downcast after type check"))
    } else {
        Err(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qname::QName;

    #[derive(Debug)]
    struct Widget {
        base: XmlObjectBase,
    }

    impl Widget {
        fn new() -> Self {
            Self {
                base: XmlObjectBase::new(QName::new("urn:example", "Widget")),
            }
        }
    }

    impl XmlObject for Widget {
        fn base(&self) -> &XmlObjectBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut XmlObjectBase {
            &mut self.base
        }
        fn ordered_children(&self) -> Vec<&dyn XmlObject> {
            Vec::new()
        }
        fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
            Vec::new()
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

    #[derive(Debug)]
    struct Other {
        base: XmlObjectBase,
    }

    impl XmlObject for Other {
        fn base(&self) -> &XmlObjectBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut XmlObjectBase {
            &mut self.base
        }
        fn ordered_children(&self) -> Vec<&dyn XmlObject> {
            Vec::new()
        }
        fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
            Vec::new()
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

    #[test]
    fn mutation_invalidates_cached_dom() {
        let mut widget = Widget::new();
        widget
            .base_mut()
            .set_cached_dom(crate::dom::Element::new(QName::new(
                "urn:example",
                "Widget",
            )));
        assert!(widget.base().cached_dom().is_some());

        widget.base_mut().set_text_content(Some("mutated".into()));
        assert!(widget.base().cached_dom().is_none());
    }

    #[test]
    fn downcast_child_matches_concrete_type() {
        let child: Box<dyn XmlObject> = Box::new(Widget::new());
        let widget = downcast_child::<Widget>(child);
        assert!(widget.is_ok());
    }

    #[test]
    fn downcast_child_returns_box_on_mismatch() {
        let child: Box<dyn XmlObject> = Box::new(Widget::new());
        let not_other = downcast_child::<Other>(child);
        let recovered = not_other.expect_err("Widget is not Other");
        assert_eq!(
            recovered.element_name(),
            &QName::new("urn:example", "Widget")
        );
    }
}
