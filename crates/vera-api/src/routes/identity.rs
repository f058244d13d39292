//! # Identity Publication
//!
//! - `GET /.well-known/did.json` serves the host's `did:web` document.
//! - `GET /sdr/:tag` signs a selective disclosure request for a login
//!   session. The wallet answers with a presentation carrying the same tag,
//!   which the pipeline turns into a `loggedIn` session event.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use vera_agent::Action;
use vera_core::{Did, VeraError};
use vera_did::{web_did_document, DidDocument};
use vera_kms::KeyPurpose;
use vera_sdr::{ActionSignSdr, ClaimRequest};

use crate::error::AppError;
use crate::state::AppState;

/// A signed SDR for one session.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionRequest {
    pub tag: String,
    pub issuer: Did,
    /// Compact JWS.
    pub sdr: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/.well-known/did.json", get(did_document))
        .route("/sdr/:tag", get(session_request))
}

async fn did_document(State(state): State<AppState>) -> Result<Json<DidDocument>, AppError> {
    let identity = state.identity().await?;
    let encryption = state
        .services
        .kms
        .get_key_pair_for_identifier(&identity.did, KeyPurpose::Encryption)
        .await
        .map_err(VeraError::from)?;
    let doc = web_did_document(identity, encryption.as_ref(), &state.services.publication)
        .map_err(VeraError::from)?;
    Ok(Json(doc))
}

async fn session_request(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Result<Json<SessionRequest>, AppError> {
    let issuer = state.identity().await?.did.clone();
    let claims = vec![ClaimRequest::essential("name", "Sign in")];
    let sdr = state
        .services
        .agent
        .handle_action(Action::SignSdr(ActionSignSdr::new(
            issuer.clone(),
            tag.clone(),
            claims,
        )))
        .await?;
    tracing::info!(%tag, %issuer, "session request signed");
    Ok(Json(SessionRequest { tag, issuer, sdr }))
}
