//! Selective disclosure errors.

use thiserror::Error;
use vera_core::{ValidationError, VeraError};
use vera_vc::VcError;

/// Errors from building, signing or reading an SDR.
#[derive(Error, Debug)]
pub enum SdrError {
    /// The request is structurally invalid.
    #[error("invalid selective disclosure request: {0}")]
    InvalidRequest(String),

    /// Signing failed.
    #[error(transparent)]
    Vc(#[from] VcError),
}

impl From<SdrError> for VeraError {
    fn from(err: SdrError) -> Self {
        match err {
            SdrError::InvalidRequest(m) => ValidationError::Malformed(m).into(),
            SdrError::Vc(e) => e.into(),
        }
    }
}
