//! Conditions types.
//!
//! Conditions bound an assertion's validity: a time window, audience
//! restrictions, and the one-time-use marker.

use chrono::{DateTime, Duration, Utc};

use saml_xml::dom::{Attribute, Element};
use saml_xml::error::{MarshallingError, UnmarshallingError};
use saml_xml::marshall::Marshaller;
use saml_xml::object::{downcast_child, XmlObject, XmlObjectBase};
use saml_xml::qname::QName;
use saml_xml::registry::XmlObjectBuilder;
use saml_xml::unmarshall::Unmarshaller;

use crate::constants::{format_instant, saml_name};

use super::{downcast_ref, downcast_self, impl_xml_object_common, parse_instant_attr, push_attr};

/// A `saml:Audience` element carrying one audience URI.
#[derive(Debug)]
pub struct Audience {
    base: XmlObjectBase,
}

impl Audience {
    /// The element's qualified name.
    #[must_use]
    pub fn element_qname() -> QName {
        saml_name("Audience")
    }

    /// Creates an audience.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        let mut base = XmlObjectBase::new(Self::element_qname());
        base.set_text_content(Some(uri.into()));
        Self { base }
    }

    /// The audience URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        self.base.text_content().unwrap_or_default()
    }
}

impl XmlObject for Audience {
    impl_xml_object_common!();

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        Vec::new()
    }

    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
        Vec::new()
    }
}

/// Builds empty [`Audience`] objects.
#[derive(Debug, Default)]
pub struct AudienceBuilder;

impl XmlObjectBuilder for AudienceBuilder {
    fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
        Box::new(Audience::new(""))
    }
}

/// Marshals [`Audience`] objects.
#[derive(Debug, Default)]
pub struct AudienceMarshaller;

impl Marshaller for AudienceMarshaller {}

/// Unmarshals [`Audience`] objects.
#[derive(Debug, Default)]
pub struct AudienceUnmarshaller;

impl Unmarshaller for AudienceUnmarshaller {}

/// A `saml:AudienceRestriction` element.
#[derive(Debug)]
pub struct AudienceRestriction {
    base: XmlObjectBase,
    audiences: Vec<Audience>,
}

impl AudienceRestriction {
    /// The element's qualified name.
    #[must_use]
    pub fn element_qname() -> QName {
        saml_name("AudienceRestriction")
    }

    /// Creates an empty restriction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            audiences: Vec::new(),
        }
    }

    /// Appends an audience URI.
    #[must_use]
    pub fn with_audience(mut self, uri: impl Into<String>) -> Self {
        self.audiences.push(Audience::new(uri));
        self.base.invalidate_dom();
        self
    }

    /// The audiences, in document order.
    #[must_use]
    pub fn audiences(&self) -> &[Audience] {
        &self.audiences
    }

    /// Returns true if the given URI is among the audiences.
    #[must_use]
    pub fn permits(&self, audience: &str) -> bool {
        self.audiences.iter().any(|a| a.uri() == audience)
    }
}

impl Default for AudienceRestriction {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlObject for AudienceRestriction {
    impl_xml_object_common!();

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        self.audiences.iter().map(|a| a as &dyn XmlObject).collect()
    }

    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
        self.audiences
            .iter_mut()
            .map(|a| a as &mut dyn XmlObject)
            .collect()
    }
}

/// Builds empty [`AudienceRestriction`] objects.
#[derive(Debug, Default)]
pub struct AudienceRestrictionBuilder;

impl XmlObjectBuilder for AudienceRestrictionBuilder {
    fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
        Box::new(AudienceRestriction::new())
    }
}

/// Marshals [`AudienceRestriction`] objects.
#[derive(Debug, Default)]
pub struct AudienceRestrictionMarshaller;

impl Marshaller for AudienceRestrictionMarshaller {}

/// Unmarshals [`AudienceRestriction`] objects.
#[derive(Debug, Default)]
pub struct AudienceRestrictionUnmarshaller;

impl Unmarshaller for AudienceRestrictionUnmarshaller {
    fn process_child(
        &self,
        object: &mut dyn XmlObject,
        child: Box<dyn XmlObject>,
    ) -> Result<(), UnmarshallingError> {
        let child = match downcast_child::<Audience>(child) {
            Ok(audience) => {
                downcast_self::<AudienceRestriction>(object)?
                    .audiences
                    .push(*audience);
                return Ok(());
            }
            Err(child) => child,
        };
        Err(UnmarshallingError::UnexpectedElement {
            child: child.element_name().clone(),
            parent: object.element_name().clone(),
        })
    }
}

/// The empty `saml:OneTimeUse` condition marker.
#[derive(Debug)]
pub struct OneTimeUse {
    base: XmlObjectBase,
}

impl OneTimeUse {
    /// The element's qualified name.
    #[must_use]
    pub fn element_qname() -> QName {
        saml_name("OneTimeUse")
    }

    /// Creates the marker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
        }
    }
}

impl Default for OneTimeUse {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlObject for OneTimeUse {
    impl_xml_object_common!();

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        Vec::new()
    }

    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
        Vec::new()
    }
}

/// Builds [`OneTimeUse`] markers.
#[derive(Debug, Default)]
pub struct OneTimeUseBuilder;

impl XmlObjectBuilder for OneTimeUseBuilder {
    fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
        Box::new(OneTimeUse::new())
    }
}

/// Marshals [`OneTimeUse`] markers.
#[derive(Debug, Default)]
pub struct OneTimeUseMarshaller;

impl Marshaller for OneTimeUseMarshaller {}

/// Unmarshals [`OneTimeUse`] markers.
#[derive(Debug, Default)]
pub struct OneTimeUseUnmarshaller;

impl Unmarshaller for OneTimeUseUnmarshaller {}

/// A `saml:Conditions` element.
#[derive(Debug)]
pub struct Conditions {
    base: XmlObjectBase,
    /// Time before which the assertion is not yet valid.
    pub not_before: Option<DateTime<Utc>>,
    /// Time at or after which the assertion has expired.
    pub not_on_or_after: Option<DateTime<Utc>>,
    audience_restrictions: Vec<AudienceRestriction>,
    one_time_use: Option<OneTimeUse>,
}

impl Conditions {
    /// The element's qualified name.
    #[must_use]
    pub fn element_qname() -> QName {
        saml_name("Conditions")
    }

    /// Creates empty conditions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: XmlObjectBase::new(Self::element_qname()),
            not_before: None,
            not_on_or_after: None,
            audience_restrictions: Vec::new(),
            one_time_use: None,
        }
    }

    /// Creates conditions valid from now for the given number of
    /// minutes.
    #[must_use]
    pub fn with_validity(minutes: i64) -> Self {
        let now = Utc::now();
        let mut conditions = Self::new();
        conditions.not_before = Some(now);
        conditions.not_on_or_after = Some(now + Duration::minutes(minutes));
        conditions
    }

    /// Restricts the assertion to an audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience_restrictions
            .push(AudienceRestriction::new().with_audience(audience));
        self.base.invalidate_dom();
        self
    }

    /// Marks the assertion one-time-use.
    #[must_use]
    pub fn one_time_use(mut self) -> Self {
        self.one_time_use = Some(OneTimeUse::new());
        self.base.invalidate_dom();
        self
    }

    /// The audience restrictions, in document order.
    #[must_use]
    pub fn audience_restrictions(&self) -> &[AudienceRestriction] {
        &self.audience_restrictions
    }

    /// Returns true if the one-time-use marker is present.
    #[must_use]
    pub fn is_one_time_use(&self) -> bool {
        self.one_time_use.is_some()
    }

    /// Evaluates the time window and audience restrictions at `now` for
    /// `audience`.
    #[must_use]
    pub fn permits(&self, audience: &str, now: DateTime<Utc>) -> bool {
        if self.not_before.is_some_and(|nb| now < nb) {
            return false;
        }
        if self.not_on_or_after.is_some_and(|na| now >= na) {
            return false;
        }
        if !self.audience_restrictions.is_empty()
            && !self
                .audience_restrictions
                .iter()
                .any(|r| r.permits(audience))
        {
            return false;
        }
        true
    }
}

impl Default for Conditions {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlObject for Conditions {
    impl_xml_object_common!();

    fn ordered_children(&self) -> Vec<&dyn XmlObject> {
        let mut children: Vec<&dyn XmlObject> = self
            .audience_restrictions
            .iter()
            .map(|r| r as &dyn XmlObject)
            .collect();
        if let Some(marker) = &self.one_time_use {
            children.push(marker);
        }
        children
    }

    fn ordered_children_mut(&mut self) -> Vec<&mut dyn XmlObject> {
        let mut children: Vec<&mut dyn XmlObject> = self
            .audience_restrictions
            .iter_mut()
            .map(|r| r as &mut dyn XmlObject)
            .collect();
        if let Some(marker) = &mut self.one_time_use {
            children.push(marker);
        }
        children
    }
}

/// Builds empty [`Conditions`] objects.
#[derive(Debug, Default)]
pub struct ConditionsBuilder;

impl XmlObjectBuilder for ConditionsBuilder {
    fn build(&self, _name: &QName) -> Box<dyn XmlObject> {
        Box::new(Conditions::new())
    }
}

/// Marshals [`Conditions`] objects.
#[derive(Debug, Default)]
pub struct ConditionsMarshaller;

impl Marshaller for ConditionsMarshaller {
    fn marshall_attributes(
        &self,
        object: &dyn XmlObject,
        element: &mut Element,
    ) -> Result<(), MarshallingError> {
        let this = downcast_ref::<Conditions>(object)?;
        push_attr(
            element,
            "NotBefore",
            this.not_before.map(format_instant).as_deref(),
        );
        push_attr(
            element,
            "NotOnOrAfter",
            this.not_on_or_after.map(format_instant).as_deref(),
        );
        Ok(())
    }
}

/// Unmarshals [`Conditions`] objects.
#[derive(Debug, Default)]
pub struct ConditionsUnmarshaller;

impl Unmarshaller for ConditionsUnmarshaller {
    fn process_attribute(
        &self,
        object: &mut dyn XmlObject,
        attribute: &Attribute,
    ) -> Result<(), UnmarshallingError> {
        let element = Conditions::element_qname();
        let this = downcast_self::<Conditions>(object)?;
        match (attribute.name.namespace_uri(), attribute.name.local_name()) {
            (None, "NotBefore") => {
                this.not_before =
                    Some(parse_instant_attr(&element, "NotBefore", &attribute.value)?);
            }
            (None, "NotOnOrAfter") => {
                this.not_on_or_after =
                    Some(parse_instant_attr(&element, "NotOnOrAfter", &attribute.value)?);
            }
            _ => object.base_mut().add_unknown_attribute(attribute.clone()),
        }
        Ok(())
    }

    fn process_child(
        &self,
        object: &mut dyn XmlObject,
        child: Box<dyn XmlObject>,
    ) -> Result<(), UnmarshallingError> {
        let child = match downcast_child::<AudienceRestriction>(child) {
            Ok(restriction) => {
                downcast_self::<Conditions>(object)?
                    .audience_restrictions
                    .push(*restriction);
                return Ok(());
            }
            Err(child) => child,
        };
        let child = match downcast_child::<OneTimeUse>(child) {
            Ok(marker) => {
                downcast_self::<Conditions>(object)?.one_time_use = Some(*marker);
                return Ok(());
            }
            Err(child) => child,
        };
        Err(UnmarshallingError::UnexpectedElement {
            child: child.element_name().clone(),
            parent: object.element_name().clone(),
        })
    }
}
