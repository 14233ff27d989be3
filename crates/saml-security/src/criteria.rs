//! Criteria describing the credentials a caller wants resolved.
//!
//! A [`CriteriaSet`] holds at most one criterion of each kind; inserting a
//! second criterion of the same kind replaces the first. Resolvers
//! evaluate criteria open-world: a criterion kind a resolver does not
//! understand is ignored, never treated as a mismatch.

use std::mem::discriminant;

use crate::credential::{KeyAlgorithm, UsageType};

/// Data extracted from a KeyInfo element, usable both as resolution input
/// and as a filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInfoData {
    /// Key names carried by KeyName children.
    pub key_names: Vec<String>,
    /// Raw public keys carried by KeyValue children.
    pub public_keys: Vec<(KeyAlgorithm, Vec<u8>)>,
    /// DER certificates carried by X509Data children.
    pub certificates: Vec<Vec<u8>>,
}

impl KeyInfoData {
    /// Returns true if this KeyInfo carries no usable content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.key_names.is_empty() && self.public_keys.is_empty() && self.certificates.is_empty()
    }
}

/// One typed constraint on the credentials to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    /// Match credentials carrying this key name.
    KeyName(String),

    /// Match credentials owned by this entity.
    EntityId(String),

    /// Match credentials with a compatible usage type.
    Usage(UsageType),

    /// Match credentials whose public key equals these raw key bytes.
    PublicKey(Vec<u8>),

    /// KeyInfo-derived resolution input.
    KeyInfo(KeyInfoData),

    /// An extension criterion understood only by specific resolvers.
    Custom {
        /// Namespaced criterion name.
        name: String,
        /// Opaque value.
        value: String,
    },
}

/// An unordered set of criteria, at most one per criterion kind.
#[derive(Debug, Clone, Default)]
pub struct CriteriaSet {
    items: Vec<Criterion>,
}

impl CriteriaSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a criterion, replacing any existing criterion of the same
    /// kind.
    pub fn insert(&mut self, criterion: Criterion) {
        self.items
            .retain(|existing| discriminant(existing) != discriminant(&criterion));
        self.items.push(criterion);
    }

    /// Builder-style [`CriteriaSet::insert`].
    #[must_use]
    pub fn with(mut self, criterion: Criterion) -> Self {
        self.insert(criterion);
        self
    }

    /// Number of criteria in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the set holds no criteria.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over the criteria.
    pub fn iter(&self) -> impl Iterator<Item = &Criterion> {
        self.items.iter()
    }

    /// The key-name criterion, if present.
    #[must_use]
    pub fn key_name(&self) -> Option<&str> {
        self.items.iter().find_map(|c| match c {
            Criterion::KeyName(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// The entity-ID criterion, if present.
    #[must_use]
    pub fn entity_id(&self) -> Option<&str> {
        self.items.iter().find_map(|c| match c {
            Criterion::EntityId(id) => Some(id.as_str()),
            _ => None,
        })
    }

    /// The usage criterion, if present.
    #[must_use]
    pub fn usage(&self) -> Option<UsageType> {
        self.items.iter().find_map(|c| match c {
            Criterion::Usage(usage) => Some(*usage),
            _ => None,
        })
    }

    /// The public-key criterion, if present.
    #[must_use]
    pub fn public_key(&self) -> Option<&[u8]> {
        self.items.iter().find_map(|c| match c {
            Criterion::PublicKey(key) => Some(key.as_slice()),
            _ => None,
        })
    }

    /// The KeyInfo criterion, if present.
    #[must_use]
    pub fn key_info(&self) -> Option<&KeyInfoData> {
        self.items.iter().find_map(|c| match c {
            Criterion::KeyInfo(data) => Some(data),
            _ => None,
        })
    }
}

impl FromIterator<Criterion> for CriteriaSet {
    fn from_iter<I: IntoIterator<Item = Criterion>>(iter: I) -> Self {
        let mut set = Self::new();
        for criterion in iter {
            set.insert(criterion);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_criterion_per_kind() {
        let set = CriteriaSet::new()
            .with(Criterion::KeyName("first".into()))
            .with(Criterion::KeyName("second".into()));

        assert_eq!(set.len(), 1);
        assert_eq!(set.key_name(), Some("second"));
    }

    #[test]
    fn different_kinds_coexist() {
        let set = CriteriaSet::new()
            .with(Criterion::KeyName("k1".into()))
            .with(Criterion::EntityId("https://idp.example.com".into()))
            .with(Criterion::Usage(UsageType::Signing));

        assert_eq!(set.len(), 3);
        assert_eq!(set.key_name(), Some("k1"));
        assert_eq!(set.entity_id(), Some("https://idp.example.com"));
        assert_eq!(set.usage(), Some(UsageType::Signing));
    }

    #[test]
    fn custom_criteria_replace_by_kind_not_name() {
        // Uniqueness is per criterion kind; two Custom criteria collapse
        // to the last one inserted.
        let set = CriteriaSet::new()
            .with(Criterion::Custom {
                name: "a".into(),
                value: "1".into(),
            })
            .with(Criterion::Custom {
                name: "b".into(),
                value: "2".into(),
            });
        assert_eq!(set.len(), 1);
    }
}
