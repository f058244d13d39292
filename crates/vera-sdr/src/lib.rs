//! # vera-sdr: Selective Disclosure Requests
//!
//! A selective disclosure request (SDR) asks a holder to present claims of
//! given types. The agent signs one per session, keyed by a correlation
//! tag; the holder answers with a presentation whose challenge is that tag.
//!
//! [`SdrActionHandler`] turns an [`ActionSignSdr`] into a compact token
//! signed by the requester. [`SdrRequest::from_claims`] reads one back from
//! verified token claims.

pub mod error;
pub mod handler;
pub mod request;

pub use error::SdrError;
pub use handler::SdrActionHandler;
pub use request::{ActionSignSdr, ClaimRequest, SdrData, SdrRequest, SDR_TYPE};
