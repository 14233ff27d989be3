//! XML object model and marshalling framework for SAML processing.
//!
//! This crate provides the bidirectional binding between typed object
//! trees and XML element trees that the rest of the stack is built on:
//!
//! - [`dom`] - An owned, namespace-aware element tree parsed and
//!   serialized with quick-xml
//! - [`object`] - The [`object::XmlObject`] trait and shared base state
//! - [`registry`] - Qualified-name lookup of builder/marshaller/
//!   unmarshaller provider triples, with `xsi:type` precedence
//! - [`marshall`] - Object tree to DOM tree, with cached-DOM idempotence
//! - [`unmarshall`] - DOM tree to object tree, with unknown-content
//!   preservation and decryption-transparent substitution
//! - [`unknown`] - The generic element type backing the registry's
//!   default provider
//!
//! # Example
//!
//! ```rust,ignore
//! use saml_xml::{Element, UnmarshallContext, XmlObjectRegistry};
//! use saml_xml::{unknown_provider_triple, unmarshall_element};
//!
//! let registry = XmlObjectRegistry::new();
//! registry.set_default_provider(unknown_provider_triple());
//!
//! let element = Element::parse(xml)?;
//! let ctx = UnmarshallContext::new(&registry);
//! let object = unmarshall_element(&element, &ctx)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dom;
pub mod error;
pub mod marshall;
pub mod object;
pub mod qname;
pub mod registry;
pub mod unknown;
pub mod unmarshall;

pub use dom::{Attribute, Element, NamespaceDecl, XmlNode};
pub use error::{MarshallingError, UnmarshallingError, ValidationError, XmlError, XmlResult};
pub use marshall::{marshall_object, Marshaller};
pub use object::{downcast_child, XmlObject, XmlObjectBase};
pub use qname::QName;
pub use registry::{ProviderTriple, XmlObjectBuilder, XmlObjectRegistry};
pub use unknown::{unknown_provider_triple, UnknownElement};
pub use unmarshall::{
    unmarshall_element, unmarshall_node, DecryptionProvider, NamespaceScope, UnmarshallContext,
    Unmarshaller,
};
