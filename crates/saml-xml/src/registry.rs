//! Provider registry for the marshalling framework.
//!
//! Maps qualified element names and schema type names to the
//! builder/marshaller/unmarshaller triple responsible for a concrete
//! object type. The registry is read-mostly and safe for concurrent
//! lookup and registration; it is constructed explicitly and passed by
//! reference rather than held in global state.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::error::{XmlError, XmlResult};
use crate::marshall::Marshaller;
use crate::object::XmlObject;
use crate::qname::QName;
use crate::unmarshall::Unmarshaller;

/// Creates empty object instances for a registered element type.
pub trait XmlObjectBuilder: Send + Sync {
    /// Builds an empty object for the given element name.
    ///
    /// Typed builders ignore the name; generic builders (the default
    /// provider) use it to label the object they produce.
    fn build(&self, name: &QName) -> Box<dyn XmlObject>;
}

/// The three stateless collaborators registered per concrete element type.
#[derive(Clone)]
pub struct ProviderTriple {
    /// Builds empty instances.
    pub builder: Arc<dyn XmlObjectBuilder>,
    /// Converts objects to DOM elements.
    pub marshaller: Arc<dyn Marshaller>,
    /// Converts DOM elements to objects.
    pub unmarshaller: Arc<dyn Unmarshaller>,
}

impl ProviderTriple {
    /// Bundles a builder, marshaller, and unmarshaller.
    pub fn new(
        builder: impl XmlObjectBuilder + 'static,
        marshaller: impl Marshaller + 'static,
        unmarshaller: impl Unmarshaller + 'static,
    ) -> Self {
        Self {
            builder: Arc::new(builder),
            marshaller: Arc::new(marshaller),
            unmarshaller: Arc::new(unmarshaller),
        }
    }
}

/// Registry of provider triples keyed by element and schema type names.
#[derive(Default)]
pub struct XmlObjectRegistry {
    by_element: DashMap<QName, ProviderTriple>,
    by_type: DashMap<QName, ProviderTriple>,
    default_provider: RwLock<Option<ProviderTriple>>,
}

impl XmlObjectRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider triple under an element's qualified name.
    pub fn register(&self, element_name: QName, triple: ProviderTriple) {
        self.by_element.insert(element_name, triple);
    }

    /// Registers a provider triple under a schema type name, used when an
    /// element carries a matching `xsi:type`.
    pub fn register_type(&self, type_name: QName, triple: ProviderTriple) {
        self.by_type.insert(type_name, triple);
    }

    /// Sets the provider used for elements with no specific registration.
    ///
    /// Without a default provider, unregistered elements fail with
    /// [`XmlError::ProviderNotFound`].
    pub fn set_default_provider(&self, triple: ProviderTriple) {
        *self.default_provider.write() = Some(triple);
    }

    /// Returns true if a provider is registered under the element name.
    #[must_use]
    pub fn has_provider(&self, element_name: &QName) -> bool {
        self.by_element.contains_key(element_name)
    }

    /// Returns the number of element-name registrations.
    #[must_use]
    pub fn provider_count(&self) -> usize {
        self.by_element.len()
    }

    /// Resolves the provider triple for an element.
    ///
    /// A registration under the schema type name takes priority over the
    /// element-name registration, mirroring `xsi:type` polymorphism. When
    /// neither is registered the default provider applies, and without one
    /// the lookup fails terminally for the subtree.
    pub fn resolve(
        &self,
        element_name: &QName,
        schema_type: Option<&QName>,
    ) -> XmlResult<ProviderTriple> {
        if let Some(type_name) = schema_type {
            if let Some(triple) = self.by_type.get(type_name) {
                return Ok(triple.clone());
            }
        }
        if let Some(triple) = self.by_element.get(element_name) {
            return Ok(triple.clone());
        }
        if let Some(triple) = self.default_provider.read().as_ref() {
            return Ok(triple.clone());
        }
        Err(XmlError::ProviderNotFound(element_name.clone()))
    }

    /// Resolves the marshaller for an object, preferring its schema type
    /// registration.
    pub fn marshaller_for(&self, object: &dyn XmlObject) -> XmlResult<Arc<dyn Marshaller>> {
        self.resolve(object.element_name(), object.schema_type())
            .map(|triple| triple.marshaller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unknown::unknown_provider_triple;

    fn name(local: &str) -> QName {
        QName::new("urn:example", local)
    }

    #[test]
    fn registry_starts_empty() {
        let registry = XmlObjectRegistry::new();
        assert_eq!(registry.provider_count(), 0);
        assert!(!registry.has_provider(&name("Widget")));
    }

    #[test]
    fn unregistered_lookup_fails() {
        let registry = XmlObjectRegistry::new();
        let result = registry.resolve(&name("Widget"), None);
        assert!(matches!(result, Err(XmlError::ProviderNotFound(_))));
    }

    #[test]
    fn type_registration_takes_priority() {
        let registry = XmlObjectRegistry::new();
        registry.register(name("Widget"), unknown_provider_triple());
        registry.register_type(name("WidgetType"), unknown_provider_triple());

        // Both resolve; the type-name lookup is consulted first.
        assert!(registry.resolve(&name("Widget"), None).is_ok());
        assert!(registry
            .resolve(&name("Widget"), Some(&name("WidgetType")))
            .is_ok());
        // An unknown type name falls back to the element registration.
        assert!(registry
            .resolve(&name("Widget"), Some(&name("OtherType")))
            .is_ok());
    }

    #[test]
    fn default_provider_catches_unregistered_names() {
        let registry = XmlObjectRegistry::new();
        assert!(registry.resolve(&name("Anything"), None).is_err());

        registry.set_default_provider(unknown_provider_triple());
        assert!(registry.resolve(&name("Anything"), None).is_ok());
    }
}
