//! SAML 2.0 element types over the marshalling framework.
//!
//! This crate supplies the concrete assertion and protocol vocabulary -
//! Assertion, Response, Issuer, NameID, Subject, Conditions, Attribute,
//! Status - each with a registered builder/marshaller/unmarshaller
//! triple, plus [`providers::register_saml_providers`] to install the
//! whole set (including `ds:Signature` and the unknown-element default)
//! into an [`saml_xml::registry::XmlObjectRegistry`].
//!
//! # Example
//!
//! ```rust,ignore
//! use saml_protocol::{register_saml_providers, Assertion, Response};
//! use saml_xml::{marshall_object, XmlObjectRegistry};
//!
//! let registry = XmlObjectRegistry::new();
//! register_saml_providers(&registry);
//!
//! let mut response = Response::success("https://idp.example.com")
//!     .with_assertion(Assertion::new("https://idp.example.com"));
//! let element = marshall_object(&mut response, &registry)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod constants;
pub mod providers;
pub mod types;

pub use constants::{saml_name, samlp_name, NameIdFormat, SAML_NS, SAMLP_NS};
pub use providers::register_saml_providers;
pub use types::*;
