//! # Stored Messages
//!
//! `GET /messages?type=&tag=&issuer=&hash=` lists validated messages through
//! the agent's `dataStoreGetMessages` method.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use vera_agent::plugins::DataStoreGetMessages;
use vera_msg::{Message, MessageFilter};

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/messages", get(list))
}

async fn list(
    State(state): State<AppState>,
    filter: Result<Query<MessageFilter>, QueryRejection>,
) -> Result<Json<Vec<Message>>, AppError> {
    let Query(filter) = filter?;
    let messages = state
        .services
        .agent
        .call::<DataStoreGetMessages>(filter)
        .await?;
    Ok(Json(messages))
}
