//! Unmarshalling: DOM tree to typed object tree.
//!
//! The driver resolves each element's provider through the registry
//! (schema type first, then element name), builds an empty instance, and
//! feeds attributes, children, and text content through the type-specific
//! hooks of its [`Unmarshaller`]. Before an element is processed
//! structurally, an optional [`DecryptionProvider`] may substitute
//! encrypted content with its decrypted plaintext, so callers never
//! observe ciphertext structure.

use crate::dom::{Attribute, Element, NamespaceDecl, XmlNode};
use crate::error::UnmarshallingError;
use crate::object::XmlObject;
use crate::qname::{resolve_type_value, QName, XSI_NS, XSI_TYPE_LOCAL};
use crate::registry::XmlObjectRegistry;

/// Detects and transparently decrypts encrypted elements during
/// unmarshalling.
pub trait DecryptionProvider: Send + Sync {
    /// Returns true if the element carries encrypted content this
    /// provider can substitute.
    fn is_encrypted(&self, element: &Element) -> bool;

    /// Decrypts the element, returning the plaintext element that takes
    /// its place in the walk.
    ///
    /// # Errors
    ///
    /// Returns [`UnmarshallingError::Decryption`] when key resolution or
    /// decryption fails; this aborts the unmarshal of the enclosing
    /// element.
    fn decrypt(&self, element: &Element) -> Result<Element, UnmarshallingError>;
}

/// Per-call unmarshalling context.
pub struct UnmarshallContext<'a> {
    registry: &'a XmlObjectRegistry,
    decrypter: Option<&'a dyn DecryptionProvider>,
}

impl<'a> UnmarshallContext<'a> {
    /// Creates a context over a registry, with no decryption support.
    #[must_use]
    pub fn new(registry: &'a XmlObjectRegistry) -> Self {
        Self {
            registry,
            decrypter: None,
        }
    }

    /// Attaches a decryption provider applied as a pre-transform at every
    /// element boundary.
    #[must_use]
    pub fn with_decrypter(mut self, decrypter: &'a dyn DecryptionProvider) -> Self {
        self.decrypter = Some(decrypter);
        self
    }

    /// The registry providers are resolved against.
    #[must_use]
    pub fn registry(&self) -> &XmlObjectRegistry {
        self.registry
    }
}

/// Namespace declarations in scope during a walk, outermost first.
#[derive(Debug, Default)]
pub struct NamespaceScope {
    decls: Vec<NamespaceDecl>,
}

impl NamespaceScope {
    /// Creates an empty root scope.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Resolves a prefix to a namespace URI, innermost declaration wins.
    #[must_use]
    pub fn resolve_prefix(&self, prefix: Option<&str>) -> Option<String> {
        self.decls
            .iter()
            .rev()
            .find(|d| d.prefix.as_deref() == prefix)
            .map(|d| d.uri.clone())
    }

    fn push_frame(&mut self, decls: &[NamespaceDecl]) -> usize {
        let mark = self.decls.len();
        self.decls.extend_from_slice(decls);
        mark
    }

    fn pop_frame(&mut self, mark: usize) {
        self.decls.truncate(mark);
    }
}

/// Converts DOM elements into typed objects.
///
/// Implementations are stateless and thread-safe. The default
/// [`Unmarshaller::unmarshall`] drives the generic walk; types whose wire
/// shape is fixed may override it and parse their subtree directly.
pub trait Unmarshaller: Send + Sync {
    /// Unmarshals an element into a typed object.
    ///
    /// # Errors
    ///
    /// Returns an [`UnmarshallingError`] on any structural mismatch. The
    /// partially built object is dropped; callers never see it.
    fn unmarshall(
        &self,
        element: &Element,
        ctx: &UnmarshallContext<'_>,
        scope: &mut NamespaceScope,
    ) -> Result<Box<dyn XmlObject>, UnmarshallingError> {
        drive_unmarshall(self, element, ctx, scope)
    }

    /// Type-specific hook: processes one attribute. The `xsi:type`
    /// attribute never reaches this hook. The default preserves the
    /// attribute in the object's unknown-attribute map, which keeps
    /// extension attributes intact across a round trip.
    ///
    /// # Errors
    ///
    /// Returns an [`UnmarshallingError`] if the attribute value is
    /// invalid for this type.
    fn process_attribute(
        &self,
        object: &mut dyn XmlObject,
        attribute: &Attribute,
    ) -> Result<(), UnmarshallingError> {
        object.base_mut().add_unknown_attribute(attribute.clone());
        Ok(())
    }

    /// Type-specific hook: places an unmarshalled child into the typed
    /// slot it belongs to, or an unknown-children list for
    /// element-extensible types. The default rejects all children, which
    /// suits leaf element types.
    ///
    /// # Errors
    ///
    /// Returns [`UnmarshallingError::UnexpectedElement`] by default.
    fn process_child(
        &self,
        object: &mut dyn XmlObject,
        child: Box<dyn XmlObject>,
    ) -> Result<(), UnmarshallingError> {
        Err(UnmarshallingError::UnexpectedElement {
            child: child.element_name().clone(),
            parent: object.element_name().clone(),
        })
    }

    /// Type-specific hook: receives the element's accumulated text
    /// content once, after all children have been processed. The default
    /// stores non-whitespace content on the base, which suits simple
    /// string elements; whitespace-only runs (pretty-printing) are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns an [`UnmarshallingError`] if the content is invalid for
    /// this type.
    fn process_content(
        &self,
        object: &mut dyn XmlObject,
        text: &str,
    ) -> Result<(), UnmarshallingError> {
        if !text.trim().is_empty() {
            object.base_mut().set_text_content(Some(text.to_string()));
        }
        Ok(())
    }
}

/// Unmarshals a root element with a fresh namespace scope.
///
/// # Errors
///
/// Returns an [`UnmarshallingError`] if no provider resolves for the
/// element (neither registered name, `xsi:type`, nor default provider) or
/// if any hook rejects the DOM shape.
pub fn unmarshall_element(
    element: &Element,
    ctx: &UnmarshallContext<'_>,
) -> Result<Box<dyn XmlObject>, UnmarshallingError> {
    let mut scope = NamespaceScope::root();
    unmarshall_node(element, ctx, &mut scope)
}

/// Unmarshals an element within an existing namespace scope. Applies the
/// decryption pre-transform, resolves the provider, and dispatches to its
/// unmarshaller.
///
/// # Errors
///
/// See [`unmarshall_element`].
pub fn unmarshall_node(
    element: &Element,
    ctx: &UnmarshallContext<'_>,
    scope: &mut NamespaceScope,
) -> Result<Box<dyn XmlObject>, UnmarshallingError> {
    if let Some(decrypter) = ctx.decrypter {
        if decrypter.is_encrypted(element) {
            tracing::debug!(element = %element.name(), "substituting decrypted content");
            let plaintext = decrypter.decrypt(element)?;
            return unmarshall_node(&plaintext, ctx, scope);
        }
    }

    let mark = scope.push_frame(element.namespaces());
    let result = dispatch(element, ctx, scope);
    scope.pop_frame(mark);
    result
}

fn dispatch(
    element: &Element,
    ctx: &UnmarshallContext<'_>,
    scope: &mut NamespaceScope,
) -> Result<Box<dyn XmlObject>, UnmarshallingError> {
    let schema_type = resolve_xsi_type(element, scope)?;

    let triple = ctx
        .registry
        .resolve(element.name(), schema_type.as_ref())
        .map_err(|_| UnmarshallingError::ProviderNotFound(element.name().clone()))?;

    let unmarshaller = triple.unmarshaller.clone();
    unmarshaller.unmarshall(element, ctx, scope)
}

/// Drives the generic unmarshalling walk for one element. Default body of
/// [`Unmarshaller::unmarshall`]; exposed so overriding types can fall back
/// to it.
///
/// # Errors
///
/// See [`unmarshall_element`].
pub fn drive_unmarshall<U: Unmarshaller + ?Sized>(
    unmarshaller: &U,
    element: &Element,
    ctx: &UnmarshallContext<'_>,
    scope: &mut NamespaceScope,
) -> Result<Box<dyn XmlObject>, UnmarshallingError> {
    let schema_type = resolve_xsi_type(element, scope)?;

    let triple = ctx
        .registry
        .resolve(element.name(), schema_type.as_ref())
        .map_err(|_| UnmarshallingError::ProviderNotFound(element.name().clone()))?;

    let mut object = triple.builder.build(element.name());
    if schema_type.is_some() {
        object.base_mut().set_schema_type(schema_type);
    }
    for decl in element.namespaces() {
        object
            .base_mut()
            .declare_namespace(decl.prefix.as_deref(), decl.uri.clone());
    }

    for attribute in element.attributes() {
        if attribute.name.is_xsi_type() {
            continue;
        }
        unmarshaller.process_attribute(object.as_mut(), attribute)?;
    }

    let mut text = String::new();
    for node in element.children() {
        match node {
            XmlNode::Element(child_element) => {
                let child = unmarshall_node(child_element, ctx, scope)?;
                unmarshaller.process_child(object.as_mut(), child)?;
            }
            XmlNode::Text(run) => text.push_str(run),
        }
    }

    if !text.is_empty() {
        unmarshaller.process_content(object.as_mut(), &text)?;
    }

    object.base_mut().set_cached_dom(element.clone());
    Ok(object)
}

fn resolve_xsi_type(
    element: &Element,
    scope: &NamespaceScope,
) -> Result<Option<QName>, UnmarshallingError> {
    let xsi_type = QName::new(XSI_NS, XSI_TYPE_LOCAL);
    let Some(value) = element.attribute_value(&xsi_type) else {
        return Ok(None);
    };

    resolve_type_value(value, |prefix| {
        element
            .declared_uri_for(prefix)
            .map(str::to_owned)
            .or_else(|| scope.resolve_prefix(prefix))
    })
    .map(Some)
    .ok_or_else(|| UnmarshallingError::InvalidAttributeValue {
        element: element.name().clone(),
        attribute: "xsi:type".to_string(),
        reason: format!("unresolvable type prefix in '{value}'"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unknown::{unknown_provider_triple, UnknownElement};

    fn registry_with_default() -> XmlObjectRegistry {
        let registry = XmlObjectRegistry::new();
        registry.set_default_provider(unknown_provider_triple());
        registry
    }

    #[test]
    fn unregistered_element_without_default_fails() {
        let registry = XmlObjectRegistry::new();
        let ctx = UnmarshallContext::new(&registry);
        let element = Element::parse(r#"<ex:Widget xmlns:ex="urn:example"/>"#).unwrap();

        let result = unmarshall_element(&element, &ctx);
        assert!(matches!(
            result,
            Err(UnmarshallingError::ProviderNotFound(_))
        ));
    }

    #[test]
    fn unknown_attributes_are_preserved() {
        let registry = registry_with_default();
        let ctx = UnmarshallContext::new(&registry);
        let element =
            Element::parse(r#"<ex:Widget xmlns:ex="urn:example" extension="kept"/>"#).unwrap();

        let object = unmarshall_element(&element, &ctx).unwrap();
        let attrs = object.base().unknown_attributes();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].value, "kept");
    }

    #[test]
    fn xsi_type_resolves_against_scope() {
        let registry = registry_with_default();
        let ctx = UnmarshallContext::new(&registry);
        let element = Element::parse(
            r#"<ex:Widget xmlns:ex="urn:example" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="ex:WidgetType"/>"#,
        )
        .unwrap();

        let object = unmarshall_element(&element, &ctx).unwrap();
        assert_eq!(
            object.schema_type(),
            Some(&QName::new("urn:example", "WidgetType"))
        );
    }

    #[test]
    fn unresolvable_xsi_type_prefix_is_rejected() {
        let registry = registry_with_default();
        let ctx = UnmarshallContext::new(&registry);
        let element = Element::parse(
            r#"<ex:Widget xmlns:ex="urn:example" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="missing:WidgetType"/>"#,
        )
        .unwrap();

        let result = unmarshall_element(&element, &ctx);
        assert!(matches!(
            result,
            Err(UnmarshallingError::InvalidAttributeValue { .. })
        ));
    }

    #[test]
    fn whitespace_only_content_is_dropped() {
        let registry = registry_with_default();
        let ctx = UnmarshallContext::new(&registry);
        let element = Element::parse(
            "<ex:Widget xmlns:ex=\"urn:example\">\n  <ex:Part/>\n</ex:Widget>",
        )
        .unwrap();

        let object = unmarshall_element(&element, &ctx).unwrap();
        assert!(object.base().text_content().is_none());
    }

    struct StubDecrypter;

    impl DecryptionProvider for StubDecrypter {
        fn is_encrypted(&self, element: &Element) -> bool {
            element.name().local_name() == "EncryptedWidget"
        }

        fn decrypt(&self, _element: &Element) -> Result<Element, UnmarshallingError> {
            Element::parse(r#"<ex:Widget xmlns:ex="urn:example">plain</ex:Widget>"#)
                .map_err(|e| UnmarshallingError::Decryption(e.to_string()))
        }
    }

    #[test]
    fn decryption_substitutes_before_structural_walk() {
        let registry = registry_with_default();
        let decrypter = StubDecrypter;
        let ctx = UnmarshallContext::new(&registry).with_decrypter(&decrypter);
        let element =
            Element::parse(r#"<ex:EncryptedWidget xmlns:ex="urn:example">zzz</ex:EncryptedWidget>"#)
                .unwrap();

        let object = unmarshall_element(&element, &ctx).unwrap();
        assert_eq!(object.element_name().local_name(), "Widget");
        assert_eq!(object.base().text_content(), Some("plain"));
    }

    struct FailingDecrypter;

    impl DecryptionProvider for FailingDecrypter {
        fn is_encrypted(&self, element: &Element) -> bool {
            element.name().local_name() == "EncryptedWidget"
        }

        fn decrypt(&self, _element: &Element) -> Result<Element, UnmarshallingError> {
            Err(UnmarshallingError::Decryption("no key".to_string()))
        }
    }

    #[test]
    fn decryption_failure_aborts_enclosing_unmarshal() {
        let registry = registry_with_default();
        let decrypter = FailingDecrypter;
        let ctx = UnmarshallContext::new(&registry).with_decrypter(&decrypter);
        let element = Element::parse(
            r#"<ex:Outer xmlns:ex="urn:example"><ex:EncryptedWidget/></ex:Outer>"#,
        )
        .unwrap();

        let result = unmarshall_element(&element, &ctx);
        assert!(matches!(result, Err(UnmarshallingError::Decryption(_))));
    }
}
