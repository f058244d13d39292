//! # Login Sessions
//!
//! `GET /sessions/:tag` returns the latest event seen for a session tag, or
//! 404 while nobody has presented for it.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use vera_msg::SessionEvent;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/sessions/:tag", get(latest))
}

async fn latest(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Result<Json<SessionEvent>, AppError> {
    state
        .services
        .sessions
        .latest(&tag)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no session event for tag {tag}")))
}
