//! Qualified names and well-known XML namespaces.
//!
//! Contains the qualified-name type used to key registries and address
//! attributes, plus the namespace URIs every SAML processor needs.

use std::fmt;
use std::hash::{Hash, Hasher};

/// XML Schema instance namespace URI.
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML Schema namespace URI.
pub const XS_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// The `xmlns` reserved namespace URI.
pub const XMLNS_NS: &str = "http://www.w3.org/2000/xmlns/";

/// Conventional prefix for the XML Schema instance namespace.
pub const XSI_PREFIX: &str = "xsi";

/// Local name of the `xsi:type` attribute.
pub const XSI_TYPE_LOCAL: &str = "type";

/// A qualified XML name.
///
/// Two qualified names are equal when their namespace URI and local name
/// match; the prefix is presentation only and excluded from equality and
/// hashing.
#[derive(Debug, Clone, Eq)]
pub struct QName {
    namespace_uri: Option<String>,
    local_name: String,
    prefix: Option<String>,
}

impl QName {
    /// Creates a qualified name in the given namespace.
    #[must_use]
    pub fn new(namespace_uri: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace_uri: Some(namespace_uri.into()),
            local_name: local_name.into(),
            prefix: None,
        }
    }

    /// Creates a name with no namespace.
    #[must_use]
    pub fn unqualified(local_name: impl Into<String>) -> Self {
        Self {
            namespace_uri: None,
            local_name: local_name.into(),
            prefix: None,
        }
    }

    /// Sets the preferred prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Returns the namespace URI, if any.
    #[must_use]
    pub fn namespace_uri(&self) -> Option<&str> {
        self.namespace_uri.as_deref()
    }

    /// Returns the local name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Returns the preferred prefix, if any.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Returns the lexical form used in serialized XML
    /// (`prefix:local` or bare `local`).
    #[must_use]
    pub fn lexical(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{}", self.local_name),
            None => self.local_name.clone(),
        }
    }

    /// Returns true if this is the `xsi:type` attribute name.
    #[must_use]
    pub fn is_xsi_type(&self) -> bool {
        self.namespace_uri.as_deref() == Some(XSI_NS) && self.local_name == XSI_TYPE_LOCAL
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace_uri == other.namespace_uri && self.local_name == other.local_name
    }
}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace_uri.hash(state);
        self.local_name.hash(state);
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace_uri {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

/// Parses an `xsi:type` attribute value (`prefix:Local` or `Local`) against
/// the namespace declarations in scope, returning the resolved type name.
#[must_use]
pub fn resolve_type_value(
    value: &str,
    in_scope: impl Fn(Option<&str>) -> Option<String>,
) -> Option<QName> {
    let (prefix, local) = match value.split_once(':') {
        Some((p, l)) => (Some(p), l),
        None => (None, value),
    };
    let uri = in_scope(prefix)?;
    let mut name = QName::new(uri, local);
    if let Some(p) = prefix {
        name = name.with_prefix(p);
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_ignored_for_equality() {
        let a = QName::new("urn:example", "Widget").with_prefix("ex");
        let b = QName::new("urn:example", "Widget").with_prefix("other");
        assert_eq!(a, b);
    }

    #[test]
    fn different_namespaces_are_unequal() {
        let a = QName::new("urn:one", "Widget");
        let b = QName::new("urn:two", "Widget");
        assert_ne!(a, b);
    }

    #[test]
    fn lexical_form_includes_prefix() {
        let name = QName::new("urn:example", "Widget").with_prefix("ex");
        assert_eq!(name.lexical(), "ex:Widget");
        assert_eq!(QName::unqualified("ID").lexical(), "ID");
    }

    #[test]
    fn xsi_type_detection() {
        assert!(QName::new(XSI_NS, "type").is_xsi_type());
        assert!(!QName::new(XSI_NS, "nil").is_xsi_type());
        assert!(!QName::unqualified("type").is_xsi_type());
    }

    #[test]
    fn type_value_resolution_uses_scope() {
        let resolved = resolve_type_value("ex:WidgetType", |prefix| match prefix {
            Some("ex") => Some("urn:example".to_string()),
            _ => None,
        });
        assert_eq!(resolved, Some(QName::new("urn:example", "WidgetType")));

        let unresolved = resolve_type_value("missing:WidgetType", |_| None);
        assert!(unresolved.is_none());
    }
}
