//! # Message Intake
//!
//! `POST /didcomm` accepts one raw message as a text body and hands it to
//! the pipeline. The response is `202 Accepted` with the content hash; the
//! outcome arrives later as a stored message or a session event.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use vera_core::{sha256_raw, ContentDigest};
use vera_msg::{MessageMeta, RawMessage};

use crate::error::AppError;
use crate::state::AppState;

/// Provenance type recorded for messages posted to this host.
pub const SOURCE_TYPE: &str = "httpsPost";

/// Body of a `202 Accepted` intake response.
#[derive(Debug, Serialize, Deserialize)]
pub struct Accepted {
    pub hash: ContentDigest,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/didcomm", post(receive))
}

async fn receive(
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, Json<Accepted>), AppError> {
    if body.trim().is_empty() {
        return Err(AppError::BadRequest("empty message".into()));
    }
    let hash = sha256_raw(body.as_bytes());
    let meta = MessageMeta::new(SOURCE_TYPE, format!("{}/didcomm", state.hostname()));
    state
        .services
        .agent
        .on_raw_message(RawMessage::new(body, meta))?;
    tracing::debug!(%hash, "message accepted");
    Ok((StatusCode::ACCEPTED, Json(Accepted { hash })))
}
