//! # Agent Methods
//!
//! - `GET /agent` lists every method the agent answers.
//! - `POST /agent/:method` runs one with a JSON object body.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/agent", get(methods))
        .route("/agent/:method", post(execute))
}

async fn methods(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(
        state
            .services
            .agent
            .available_methods()
            .into_iter()
            .map(str::to_string)
            .collect(),
    )
}

async fn execute(
    State(state): State<AppState>,
    Path(method): Path<String>,
    args: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(args) = args.map_err(|e| AppError::BadRequest(e.body_text()))?;
    Ok(Json(state.services.agent.execute(&method, args).await?))
}
