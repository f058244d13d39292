#![deny(missing_docs)]

//! # vera-core: Foundational Types for the Vera Agent
//!
//! Every other crate in the workspace depends on this one. It carries no
//! internal crate dependencies.
//!
//! ## Design Principles
//!
//! 1. **[`CanonicalBytes`] is the sole path to signing input and digests.**
//!    Sorted keys, compact separators and float rejection. Strings,
//!    datetimes included, are signed exactly as written.
//!
//! 2. **Newtype wrappers for domain primitives.** A [`Did`] is validated at
//!    construction and can never change afterwards.
//!
//! 3. **One error taxonomy ([`VeraError`]).** Configuration, not-found,
//!    validation, and backend families. Crate-local errors map into it.
//!
//! 4. **Typed pub/sub ([`EventBus`]).** Subscribers are keyed by an event's
//!    kind, not by free-form strings, and run in subscription order.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod events;
pub mod identity;
pub mod temporal;
pub mod timeout;

// Re-export primary types at crate root for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_bytes, sha256_digest, sha256_raw, ContentDigest};
pub use error::{
    BackendError, CanonicalizationError, ConfigurationError, ErrorClass, NotFoundError,
    ValidationError, VeraError,
};
pub use events::{Dispatch, DispatchReport, Event, EventBus, EventHandler, HandlerError};
pub use identity::{split_did_url, Did};
pub use temporal::Timestamp;
pub use timeout::with_timeout;
