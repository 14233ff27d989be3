//! Credential model and resolution for SAML security processing.
//!
//! This crate supplies the query side of signature verification and
//! decryption: callers describe the credentials they need as a
//! [`criteria::CriteriaSet`] and a [`resolver::CredentialResolver`]
//! evaluates it against a candidate pool.
//!
//! - [`credential`] - Key material, usage types, provenance contexts
//! - [`criteria`] - Typed criteria with one-per-kind uniqueness and
//!   open-world evaluation
//! - [`resolver`] - The resolver contract plus static and chaining
//!   implementations
//! - [`keyinfo`] - Credentials derived from KeyInfo content
//! - [`metadata`] - Snapshot-consistent resolution against refreshable
//!   federation metadata

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod credential;
pub mod criteria;
pub mod error;
pub mod keyinfo;
pub mod metadata;
pub mod resolver;

pub use credential::{Credential, CredentialContext, KeyAlgorithm, KeyMaterial, UsageType};
pub use criteria::{CriteriaSet, Criterion, KeyInfoData};
pub use error::{ResolverError, ResolverResult};
pub use keyinfo::KeyInfoCredentialResolver;
pub use metadata::{MetadataCredentialResolver, MetadataSnapshot};
pub use resolver::{ChainingCredentialResolver, CredentialResolver, StaticCredentialResolver};
