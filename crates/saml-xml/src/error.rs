//! XML processing error types.
//!
//! Provides error types for DOM handling, marshalling, unmarshalling,
//! and structural validation.

use thiserror::Error;

use crate::qname::QName;

/// Result type for low-level XML operations.
pub type XmlResult<T> = Result<T, XmlError>;

/// Low-level XML and registry errors.
#[derive(Debug, Error)]
pub enum XmlError {
    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    Parse(String),

    /// XML serialization error.
    #[error("XML serialization error: {0}")]
    Serialize(String),

    /// No provider triple registered for the given name.
    #[error("no provider registered for {0}")]
    ProviderNotFound(QName),

    /// The document contained no root element.
    #[error("document has no root element")]
    NoRootElement,
}

impl From<quick_xml::Error> for XmlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Errors raised while marshalling an object tree into a DOM tree.
#[derive(Debug, Error)]
pub enum MarshallingError {
    /// An attribute could not be marshalled.
    #[error("failed to marshal attribute {name}: {reason}")]
    Attribute {
        /// The attribute's qualified name.
        name: String,
        /// Why marshalling failed.
        reason: String,
    },

    /// Element text content could not be marshalled.
    #[error("failed to marshal content of {0}: {1}")]
    Content(QName, String),

    /// A child object could not be marshalled.
    #[error("failed to marshal child {name}: {source}")]
    Child {
        /// The child element's qualified name.
        name: QName,
        /// The underlying failure.
        #[source]
        source: Box<MarshallingError>,
    },

    /// No marshaller is registered for an object in the tree.
    #[error("no marshaller registered for {0}")]
    ProviderNotFound(QName),

    /// The produced DOM could not be serialized.
    #[error("serialization failed: {0}")]
    Serialize(String),
}

/// Errors raised while unmarshalling a DOM tree into an object tree.
#[derive(Debug, Error)]
pub enum UnmarshallingError {
    /// No provider is registered for the element's name or xsi:type.
    #[error("no unmarshalling provider registered for {0}")]
    ProviderNotFound(QName),

    /// An element appeared where it is not allowed.
    #[error("unexpected element {child} inside {parent}")]
    UnexpectedElement {
        /// The offending child element name.
        child: QName,
        /// The enclosing element name.
        parent: QName,
    },

    /// A required attribute is missing.
    #[error("{element} is missing required attribute {attribute}")]
    MissingAttribute {
        /// The element being unmarshalled.
        element: QName,
        /// The missing attribute's name.
        attribute: String,
    },

    /// A required child element is missing.
    #[error("{element} is missing required child {child}")]
    MissingChild {
        /// The element being unmarshalled.
        element: QName,
        /// The missing child's name.
        child: String,
    },

    /// An attribute value could not be interpreted.
    #[error("invalid value for {attribute} on {element}: {reason}")]
    InvalidAttributeValue {
        /// The element being unmarshalled.
        element: QName,
        /// The attribute's name.
        attribute: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Decryption of an encrypted element failed.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The DOM itself was malformed.
    #[error("malformed DOM: {0}")]
    Malformed(String),
}

/// Errors raised by structural/profile validation of an object tree.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required piece of state is absent.
    #[error("{element}: required {what} is missing")]
    Missing {
        /// The element being validated.
        element: QName,
        /// What was expected.
        what: String,
    },

    /// A value is present but not allowed by the profile.
    #[error("{element}: {reason}")]
    Invalid {
        /// The element being validated.
        element: QName,
        /// Why validation failed.
        reason: String,
    },
}
