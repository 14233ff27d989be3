//! Credential resolver contract and the static/chaining implementations.
//!
//! All resolvers share the same evaluation contract: a credential matches
//! a criteria set iff it matches every criterion the resolver
//! understands; unknown criterion kinds are ignored. Result ordering is
//! stable for identical inputs and state, and no credential appears twice
//! in one resolution.

use std::collections::HashSet;
use std::sync::Arc;

use crate::credential::{Credential, CredentialContext, KeyMaterial};
use crate::criteria::{CriteriaSet, Criterion};
use crate::error::ResolverResult;

/// Resolves credentials matching a criteria set.
///
/// Implementations are stateless with respect to a resolution call and
/// safe for concurrent use.
pub trait CredentialResolver: Send + Sync {
    /// Resolves all matching credentials, in a stable order, without
    /// duplicates.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::ResolverError`] when the backing source
    /// fails or required criteria are missing.
    fn resolve(&self, criteria: &CriteriaSet) -> ResolverResult<Vec<Credential>>;

    /// Resolves the first matching credential, if any.
    ///
    /// # Errors
    ///
    /// Propagates any [`CredentialResolver::resolve`] failure.
    fn resolve_single(&self, criteria: &CriteriaSet) -> ResolverResult<Option<Credential>> {
        Ok(self.resolve(criteria)?.into_iter().next())
    }
}

/// Evaluates the criterion kinds shared by the built-in resolvers against
/// one credential. Kinds outside this list are ignored (open-world).
pub(crate) fn matches_common_criteria(credential: &Credential, criteria: &CriteriaSet) -> bool {
    criteria.iter().all(|criterion| match criterion {
        Criterion::KeyName(name) => credential.key_names().iter().any(|n| n == name),
        Criterion::EntityId(id) => credential.entity_id() == Some(id.as_str()),
        Criterion::Usage(usage) => credential.usage().satisfies(*usage),
        Criterion::PublicKey(key) => match credential.key() {
            KeyMaterial::Public { key: have, .. } => have == key,
            _ => false,
        },
        // Not filters for these resolvers: KeyInfo is resolution input,
        // Custom belongs to extension resolvers.
        Criterion::KeyInfo(_) | Criterion::Custom { .. } => true,
    })
}

/// A resolver over a fixed credential list.
#[derive(Default)]
pub struct StaticCredentialResolver {
    credentials: Vec<Credential>,
}

impl StaticCredentialResolver {
    /// Creates a resolver seeded with the given credentials. Each is
    /// tagged with a static provenance context.
    #[must_use]
    pub fn new(credentials: Vec<Credential>) -> Self {
        let credentials = credentials
            .into_iter()
            .map(|c| c.with_context(CredentialContext::Static))
            .collect();
        Self { credentials }
    }

    /// The seeded credentials, in resolution order.
    #[must_use]
    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }
}

impl CredentialResolver for StaticCredentialResolver {
    fn resolve(&self, criteria: &CriteriaSet) -> ResolverResult<Vec<Credential>> {
        Ok(self
            .credentials
            .iter()
            .filter(|c| matches_common_criteria(c, criteria))
            .cloned()
            .collect())
    }
}

/// Concatenates the results of member resolvers, de-duplicating by key
/// fingerprint. Member order fixes result order.
pub struct ChainingCredentialResolver {
    members: Vec<Arc<dyn CredentialResolver>>,
}

impl ChainingCredentialResolver {
    /// Creates a chain over the given members.
    #[must_use]
    pub fn new(members: Vec<Arc<dyn CredentialResolver>>) -> Self {
        Self { members }
    }
}

impl CredentialResolver for ChainingCredentialResolver {
    fn resolve(&self, criteria: &CriteriaSet) -> ResolverResult<Vec<Credential>> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for member in &self.members {
            for credential in member.resolve(criteria)? {
                if seen.insert(credential.fingerprint()) {
                    resolved.push(credential);
                } else {
                    tracing::debug!(
                        fingerprint = %credential.fingerprint(),
                        "skipping duplicate credential from chained resolver"
                    );
                }
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::UsageType;

    fn named_secret(name: &str, bytes: &[u8]) -> Credential {
        Credential::new(KeyMaterial::Secret(bytes.to_vec())).with_key_name(name)
    }

    #[test]
    fn key_name_criterion_filters() {
        let resolver = StaticCredentialResolver::new(vec![
            named_secret("k1", b"one"),
            named_secret("k2", b"two"),
        ]);
        let criteria = CriteriaSet::new().with(Criterion::KeyName("k1".into()));

        let resolved = resolver.resolve(&criteria).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].key_names(), ["k1"]);
    }

    #[test]
    fn unrecognized_criterion_is_ignored() {
        let resolver = StaticCredentialResolver::new(vec![named_secret("k1", b"one")]);
        let criteria = CriteriaSet::new()
            .with(Criterion::KeyName("k1".into()))
            .with(Criterion::Custom {
                name: "urn:example:color".into(),
                value: "blue".into(),
            });

        let resolved = resolver.resolve(&criteria).unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn empty_criteria_matches_everything() {
        let resolver = StaticCredentialResolver::new(vec![
            named_secret("k1", b"one"),
            named_secret("k2", b"two"),
        ]);
        let resolved = resolver.resolve(&CriteriaSet::new()).unwrap();
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn usage_filter_respects_unspecified() {
        let resolver = StaticCredentialResolver::new(vec![
            named_secret("sign", b"one").with_usage(UsageType::Signing),
            named_secret("enc", b"two").with_usage(UsageType::Encryption),
            named_secret("any", b"three"),
        ]);
        let criteria = CriteriaSet::new().with(Criterion::Usage(UsageType::Signing));

        let resolved = resolver.resolve(&criteria).unwrap();
        let names: Vec<_> = resolved
            .iter()
            .map(|c| c.key_names()[0].as_str())
            .collect();
        assert_eq!(names, ["sign", "any"]);
    }

    #[test]
    fn resolve_single_returns_first_match() {
        let resolver = StaticCredentialResolver::new(vec![
            named_secret("k", b"one"),
            named_secret("k", b"two"),
        ]);
        let criteria = CriteriaSet::new().with(Criterion::KeyName("k".into()));

        let single = resolver.resolve_single(&criteria).unwrap();
        assert_eq!(single.unwrap().fingerprint(), named_secret("k", b"one").fingerprint());
    }

    #[test]
    fn ordering_is_stable_across_calls() {
        let resolver = StaticCredentialResolver::new(vec![
            named_secret("k", b"one"),
            named_secret("k", b"two"),
            named_secret("k", b"three"),
        ]);
        let criteria = CriteriaSet::new().with(Criterion::KeyName("k".into()));

        let first: Vec<_> = resolver
            .resolve(&criteria)
            .unwrap()
            .iter()
            .map(Credential::fingerprint)
            .collect();
        let second: Vec<_> = resolver
            .resolve(&criteria)
            .unwrap()
            .iter()
            .map(Credential::fingerprint)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn chain_deduplicates_across_members() {
        let shared = named_secret("k", b"shared");
        let first = Arc::new(StaticCredentialResolver::new(vec![
            shared.clone(),
            named_secret("k", b"only-first"),
        ]));
        let second = Arc::new(StaticCredentialResolver::new(vec![
            shared,
            named_secret("k", b"only-second"),
        ]));
        let chain = ChainingCredentialResolver::new(vec![first, second]);

        let resolved = chain
            .resolve(&CriteriaSet::new().with(Criterion::KeyName("k".into())))
            .unwrap();
        assert_eq!(resolved.len(), 3);
    }
}
