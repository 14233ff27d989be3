//! Metadata-backed credential resolution.
//!
//! Resolves the keys an entity publishes in federation metadata. The
//! backing data is held as an immutable snapshot behind an `Arc`; a
//! resolution call pins one snapshot for its whole duration, so a refresh
//! happening mid-call can never produce a torn read mixing old and new
//! key sets. Ordering of results is guaranteed per call only: calls that
//! straddle a refresh may observe different orderings.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::credential::{Credential, CredentialContext};
use crate::criteria::CriteriaSet;
use crate::error::{ResolverError, ResolverResult};
use crate::resolver::{matches_common_criteria, CredentialResolver};

/// An immutable view of the credentials published per entity.
#[derive(Debug, Default)]
pub struct MetadataSnapshot {
    entries: HashMap<String, Vec<Credential>>,
}

impl MetadataSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity's published credentials. Each credential is tagged
    /// with the entity ID and metadata provenance.
    #[must_use]
    pub fn with_entity(mut self, entity_id: impl Into<String>, credentials: Vec<Credential>) -> Self {
        let entity_id = entity_id.into();
        let tagged = credentials
            .into_iter()
            .map(|c| {
                c.with_entity_id(entity_id.clone())
                    .with_context(CredentialContext::Metadata {
                        entity_id: entity_id.clone(),
                    })
            })
            .collect();
        self.entries.insert(entity_id, tagged);
        self
    }

    /// Number of entities in the snapshot.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entries.len()
    }
}

/// Resolves credentials from a refreshable metadata snapshot.
pub struct MetadataCredentialResolver {
    snapshot: RwLock<Arc<MetadataSnapshot>>,
}

impl MetadataCredentialResolver {
    /// Creates a resolver over an initial snapshot.
    #[must_use]
    pub fn new(snapshot: MetadataSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Installs a new snapshot.
    ///
    /// Callers prepare the snapshot first (fetching and parsing remote
    /// metadata happens before this call, never under the lock); the swap
    /// itself is a pointer store. In-flight resolutions keep the snapshot
    /// they pinned at entry.
    pub fn refresh(&self, snapshot: MetadataSnapshot) {
        let prepared = Arc::new(snapshot);
        *self.snapshot.write() = prepared;
        tracing::debug!("metadata snapshot refreshed");
    }

    fn pin(&self) -> Arc<MetadataSnapshot> {
        self.snapshot.read().clone()
    }
}

impl CredentialResolver for MetadataCredentialResolver {
    fn resolve(&self, criteria: &CriteriaSet) -> ResolverResult<Vec<Credential>> {
        let entity_id = criteria.entity_id().ok_or_else(|| {
            ResolverError::InsufficientCriteria("entity ID criterion required".to_string())
        })?;

        let snapshot = self.pin();
        let Some(published) = snapshot.entries.get(entity_id) else {
            return Ok(Vec::new());
        };

        Ok(published
            .iter()
            .filter(|c| matches_common_criteria(c, criteria))
            .cloned()
            .collect())
    }
}
