//! # vera-did: Identifiers, Documents and Resolution
//!
//! - [`DidDocument`]: the resolved description of a DID's keys and
//!   verification relationships.
//! - [`ResolverRegistry`]: closed-world dispatch from DID method to a
//!   [`DidResolver`]. No caching; freshness matters for revocation-sensitive
//!   verification.
//! - [`IdentifierManager`]: creates and tracks managed [`Identifier`]s via
//!   named [`DidProvider`]s, persisting them in a [`DidStore`].
//! - `did:key` ([`KeyDidProvider`], [`KeyDidResolver`]) and `did:web`
//!   ([`WebDidProvider`], [`WebDidResolver`]).
//! - [`web_did_document`]: builds the document a host publishes at
//!   `/.well-known/did.json` from an explicit [`PublicationConfig`].

pub mod document;
pub mod error;
pub mod identifier;
pub mod key;
pub mod manager;
pub mod publication;
pub mod resolver;
pub mod store;
pub mod web;

pub use document::{DidDocument, Relationship, Service, VerificationMethod, VerificationRelationship};
pub use error::DidError;
pub use identifier::{CreateIdentifierOptions, Identifier, IdentifierKey};
pub use key::{KeyDidProvider, KeyDidResolver};
pub use manager::{DidProvider, IdentifierManager};
pub use publication::{web_did_document, PublicationConfig};
pub use resolver::{DidResolver, ResolverRegistry};
pub use store::{DidStore, FileDidStore, MemoryDidStore};
pub use web::{WebDidProvider, WebDidResolver};
