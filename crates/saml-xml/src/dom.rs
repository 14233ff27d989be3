//! Owned XML element tree.
//!
//! The wire-adjacent representation consumed and produced by the
//! marshalling framework. Elements own their children, keep attributes in
//! document order, and carry namespace declarations explicitly so that a
//! serialize/parse cycle is structurally stable (digest computation over
//! serialized elements depends on this).

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use quick_xml::{NsReader, Writer};

use crate::error::{XmlError, XmlResult};
use crate::qname::QName;

/// A node in the element tree: a child element or a run of character data.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    /// A child element.
    Element(Element),
    /// Character data, unescaped.
    Text(String),
}

/// An XML attribute with its qualified name and unescaped value.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// The attribute's qualified name. Unprefixed attributes carry no
    /// namespace.
    pub name: QName,
    /// The unescaped attribute value.
    pub value: String,
    /// Whether this attribute is registered as an XML ID, making the
    /// element addressable by `#value` references.
    pub is_id: bool,
}

/// A namespace declaration (`xmlns` or `xmlns:prefix`).
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceDecl {
    /// The declared prefix; `None` for the default namespace.
    pub prefix: Option<String>,
    /// The namespace URI.
    pub uri: String,
}

/// An owned XML element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: QName,
    namespaces: Vec<NamespaceDecl>,
    attributes: Vec<Attribute>,
    children: Vec<XmlNode>,
}

impl Element {
    /// Creates an empty element with the given qualified name.
    #[must_use]
    pub fn new(name: QName) -> Self {
        Self {
            name,
            namespaces: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Returns the element's qualified name.
    #[must_use]
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Declares a namespace on this element.
    pub fn declare_namespace(&mut self, prefix: Option<&str>, uri: impl Into<String>) {
        let prefix = prefix.map(str::to_owned);
        let uri = uri.into();
        if !self
            .namespaces
            .iter()
            .any(|d| d.prefix == prefix && d.uri == uri)
        {
            self.namespaces.push(NamespaceDecl { prefix, uri });
        }
    }

    /// Returns the namespace declarations made on this element.
    #[must_use]
    pub fn namespaces(&self) -> &[NamespaceDecl] {
        &self.namespaces
    }

    /// Looks up a prefix among this element's own declarations.
    #[must_use]
    pub fn declared_uri_for(&self, prefix: Option<&str>) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|d| d.prefix.as_deref() == prefix)
            .map(|d| d.uri.as_str())
    }

    /// Sets an attribute, replacing any existing attribute with the same
    /// qualified name while keeping its position.
    pub fn set_attribute(&mut self, name: QName, value: impl Into<String>) {
        let value = value.into();
        if let Some(existing) = self.attributes.iter_mut().find(|a| a.name == name) {
            existing.value = value;
        } else {
            self.attributes.push(Attribute {
                name,
                value,
                is_id: false,
            });
        }
    }

    /// Sets an attribute and registers it as an XML ID.
    pub fn set_id_attribute(&mut self, name: QName, value: impl Into<String>) {
        self.set_attribute(name.clone(), value);
        self.promote_id_attribute(&name);
    }

    /// Marks an existing attribute as an XML ID.
    pub fn promote_id_attribute(&mut self, name: &QName) {
        if let Some(attr) = self.attributes.iter_mut().find(|a| &a.name == name) {
            attr.is_id = true;
        }
    }

    /// Returns an attribute value by qualified name.
    #[must_use]
    pub fn attribute_value(&self, name: &QName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| &a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Returns all attributes in document order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Appends a raw attribute, preserving its ID flag.
    pub fn push_attribute(&mut self, attr: Attribute) {
        self.attributes.push(attr);
    }

    /// Appends a child element.
    pub fn append_child(&mut self, child: Element) {
        self.children.push(XmlNode::Element(child));
    }

    /// Appends character data.
    pub fn append_text(&mut self, text: impl Into<String>) {
        self.children.push(XmlNode::Text(text.into()));
    }

    /// Returns all child nodes in document order.
    #[must_use]
    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// Iterates over child elements in document order.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// Returns the first child element with the given name.
    #[must_use]
    pub fn first_child(&self, name: &QName) -> Option<&Element> {
        self.child_elements().find(|e| e.name() == name)
    }

    /// Concatenates the direct text children of this element.
    #[must_use]
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                XmlNode::Text(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// Removes all child elements with the given qualified name, returning
    /// how many were removed.
    pub fn remove_children(&mut self, name: &QName) -> usize {
        let before = self.children.len();
        self.children.retain(|n| match n {
            XmlNode::Element(e) => e.name() != name,
            XmlNode::Text(_) => true,
        });
        before - self.children.len()
    }

    /// Finds the element carrying the given XML ID anywhere in this
    /// subtree.
    ///
    /// An attribute counts as an ID when it was registered as one, or, for
    /// parsed documents that carry no registration, when it is an
    /// unprefixed attribute named `ID` or `Id` (the XMLDSig reference
    /// convention).
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        let matches = self.attributes.iter().any(|a| {
            a.value == id
                && (a.is_id
                    || (a.name.namespace_uri().is_none()
                        && matches!(a.name.local_name(), "ID" | "Id")))
        });
        if matches {
            return Some(self);
        }
        self.child_elements().find_map(|c| c.find_by_id(id))
    }

    /// Serializes this element and its subtree to a string.
    ///
    /// Namespace declarations are written before other attributes and all
    /// stored orderings are preserved, so serializing the same tree twice
    /// yields byte-identical output.
    pub fn to_xml(&self) -> XmlResult<String> {
        let mut writer = Writer::new(Vec::new());
        write_element(&mut writer, self)?;
        String::from_utf8(writer.into_inner()).map_err(|e| XmlError::Serialize(e.to_string()))
    }

    /// Parses a document and returns its root element.
    pub fn parse(xml: &str) -> XmlResult<Element> {
        let mut reader = NsReader::from_str(xml);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let element = element_from_start(&reader, &start)?;
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&reader, &start)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| XmlError::Parse("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, element);
                }
                Event::Text(text) => {
                    let value = text
                        .unescape()
                        .map_err(|e| XmlError::Parse(e.to_string()))?
                        .into_owned();
                    if let Some(top) = stack.last_mut() {
                        top.append_text(value);
                    }
                }
                Event::CData(data) => {
                    let value = std::str::from_utf8(&data)
                        .map_err(|e| XmlError::Parse(e.to_string()))?
                        .to_owned();
                    if let Some(top) = stack.last_mut() {
                        top.append_text(value);
                    }
                }
                Event::Eof => break,
                // Declarations, comments, and PIs carry no model state.
                _ => {}
            }
        }

        root.ok_or(XmlError::NoRootElement)
    }
}

fn attach(stack: &mut Vec<Element>, root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.append_child(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn element_from_start(reader: &NsReader<&[u8]>, start: &BytesStart<'_>) -> XmlResult<Element> {
    let raw_name = start.name();
    let (resolution, local) = reader.resolve_element(raw_name);
    let local = String::from_utf8(local.as_ref().to_vec())
        .map_err(|e| XmlError::Parse(e.to_string()))?;

    let mut name = match resolution {
        ResolveResult::Bound(ns) => {
            let uri = String::from_utf8(ns.as_ref().to_vec())
                .map_err(|e| XmlError::Parse(e.to_string()))?;
            QName::new(uri, local)
        }
        _ => QName::unqualified(local),
    };
    if let Some(prefix) = raw_name.prefix() {
        let prefix = String::from_utf8(prefix.as_ref().to_vec())
            .map_err(|e| XmlError::Parse(e.to_string()))?;
        name = name.with_prefix(prefix);
    }

    let mut element = Element::new(name);

    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError::Parse(e.to_string()))?;
        let key = attr.key.as_ref();
        let value = attr
            .unescape_value()
            .map_err(|e| XmlError::Parse(e.to_string()))?
            .into_owned();

        if key == b"xmlns" {
            element.declare_namespace(None, value);
            continue;
        }
        if let Some(prefix) = key.strip_prefix(b"xmlns:") {
            let prefix = String::from_utf8(prefix.to_vec())
                .map_err(|e| XmlError::Parse(e.to_string()))?;
            element.declare_namespace(Some(&prefix), value);
            continue;
        }

        let (resolution, local) = reader.resolve_attribute(attr.key);
        let local = String::from_utf8(local.as_ref().to_vec())
            .map_err(|e| XmlError::Parse(e.to_string()))?;
        let mut attr_name = match resolution {
            ResolveResult::Bound(ns) => {
                let uri = String::from_utf8(ns.as_ref().to_vec())
                    .map_err(|e| XmlError::Parse(e.to_string()))?;
                QName::new(uri, local)
            }
            _ => QName::unqualified(local),
        };
        if let Some(prefix) = attr.key.prefix() {
            let prefix = String::from_utf8(prefix.as_ref().to_vec())
                .map_err(|e| XmlError::Parse(e.to_string()))?;
            attr_name = attr_name.with_prefix(prefix);
        }

        element.push_attribute(Attribute {
            name: attr_name,
            value,
            is_id: false,
        });
    }

    Ok(element)
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> XmlResult<()> {
    let tag = element.name().lexical();
    let mut start = BytesStart::new(tag.clone());

    for decl in element.namespaces() {
        let key = match &decl.prefix {
            Some(p) => format!("xmlns:{p}"),
            None => "xmlns".to_string(),
        };
        start.push_attribute((key.as_str(), decl.uri.as_str()));
    }
    for attr in element.attributes() {
        start.push_attribute((attr.name.lexical().as_str(), attr.value.as_str()));
    }

    if element.children().is_empty() {
        writer
            .write_event(Event::Empty(start))
            .map_err(|e| XmlError::Serialize(e.to_string()))?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| XmlError::Serialize(e.to_string()))?;

    for child in element.children() {
        match child {
            XmlNode::Element(e) => write_element(writer, e)?,
            XmlNode::Text(t) => writer
                .write_event(Event::Text(BytesText::new(t)))
                .map_err(|e| XmlError::Serialize(e.to_string()))?,
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .map_err(|e| XmlError::Serialize(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget_name() -> QName {
        QName::new("urn:example", "Widget").with_prefix("ex")
    }

    #[test]
    fn build_and_serialize() {
        let mut el = Element::new(widget_name());
        el.declare_namespace(Some("ex"), "urn:example");
        el.set_attribute(QName::unqualified("color"), "blue");
        el.append_text("body");

        let xml = el.to_xml().unwrap();
        assert_eq!(
            xml,
            r#"<ex:Widget xmlns:ex="urn:example" color="blue">body</ex:Widget>"#
        );
    }

    #[test]
    fn parse_resolves_namespaces() {
        let xml = r#"<ex:Widget xmlns:ex="urn:example" color="blue"><ex:Part/>text</ex:Widget>"#;
        let el = Element::parse(xml).unwrap();

        assert_eq!(el.name(), &QName::new("urn:example", "Widget"));
        assert_eq!(
            el.attribute_value(&QName::unqualified("color")),
            Some("blue")
        );
        assert_eq!(el.child_elements().count(), 1);
        assert_eq!(el.text(), "text");
    }

    #[test]
    fn serialize_parse_is_stable() {
        let xml = r#"<ex:Widget xmlns:ex="urn:example" a="1" b="2"><ex:Part kind="bolt"/><ex:Part kind="nut"/></ex:Widget>"#;
        let parsed = Element::parse(xml).unwrap();
        let reserialized = parsed.to_xml().unwrap();
        let reparsed = Element::parse(&reserialized).unwrap();
        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn child_order_is_preserved() {
        let mut el = Element::new(widget_name());
        for kind in ["a", "b", "c"] {
            let mut part = Element::new(QName::new("urn:example", "Part").with_prefix("ex"));
            part.set_attribute(QName::unqualified("kind"), kind);
            el.append_child(part);
        }
        let kinds: Vec<_> = el
            .child_elements()
            .map(|c| c.attribute_value(&QName::unqualified("kind")).unwrap())
            .collect();
        assert_eq!(kinds, ["a", "b", "c"]);
    }

    #[test]
    fn find_by_id_honors_registration_and_convention() {
        let mut inner = Element::new(QName::new("urn:example", "Inner"));
        inner.set_id_attribute(QName::unqualified("MyId"), "_abc");
        let mut outer = Element::new(widget_name());
        outer.append_child(inner);

        assert!(outer.find_by_id("_abc").is_some());

        // Parsed documents fall back to the ID/Id naming convention.
        let parsed =
            Element::parse(r#"<Root><Child ID="_xyz"/><Child other="_nope"/></Root>"#).unwrap();
        assert!(parsed.find_by_id("_xyz").is_some());
        assert!(parsed.find_by_id("_nope").is_none());
    }

    #[test]
    fn remove_children_by_name() {
        let mut el = Element::new(widget_name());
        el.append_child(Element::new(QName::new("urn:sig", "Signature")));
        el.append_child(Element::new(QName::new("urn:example", "Part")));
        let removed = el.remove_children(&QName::new("urn:sig", "Signature"));
        assert_eq!(removed, 1);
        assert_eq!(el.child_elements().count(), 1);
    }

    #[test]
    fn text_escaping_round_trips() {
        let mut el = Element::new(widget_name());
        el.append_text("a < b & c");
        let xml = el.to_xml().unwrap();
        assert!(xml.contains("a &lt; b &amp; c"));
        let parsed = Element::parse(&xml).unwrap();
        assert_eq!(parsed.text(), "a < b & c");
    }
}
