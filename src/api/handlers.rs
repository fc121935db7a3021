use axum::{http::StatusCode, response::Json};
use serde::Serialize;
use std::sync::Arc;

use crate::error::RevisionError;
use crate::merge_queues::MergeQueueRegistry;
use crate::model::{Bbid, EntityType};
use crate::store::traits::{Store, Transaction};
use crate::worker::PostCommitQueue;

/// Shared state behind every route
pub struct AppContext<S> {
    pub store: S,
    pub merge_queues: MergeQueueRegistry,
    pub post_commit: PostCommitQueue,
}

pub type AppState<S> = Arc<AppContext<S>>;

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

pub fn not_found(message: &str) -> ApiError {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new(message)))
}

pub fn internal_error(e: anyhow::Error) -> ApiError {
    log::error!("Request failed: {:#}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(&e.to_string())),
    )
}

/// Map a pipeline failure onto its HTTP status
pub fn revision_error(e: RevisionError) -> ApiError {
    match e {
        RevisionError::NotFound(what) => not_found(&format!("{} not found", what)),
        RevisionError::NoChange => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("No changes to save")),
        ),
        RevisionError::ValidationConflict(message) => {
            (StatusCode::CONFLICT, Json(ErrorResponse::new(&message)))
        }
        RevisionError::Unexpected(e) => internal_error(e),
    }
}

/// Entity types appear in paths in kebab-case; an unknown one is a missing page
pub fn parse_entity_type(slug: &str) -> ApiResult<EntityType> {
    EntityType::from_slug(slug).ok_or_else(|| not_found(&format!("Unknown entity type '{}'", slug)))
}

pub fn parse_bbid(value: &str) -> ApiResult<Bbid> {
    Bbid::parse_str(value).map_err(|_| not_found(&format!("Entity {} not found", value)))
}

pub async fn begin<S: Store>(store: &S) -> ApiResult<Box<dyn Transaction>> {
    store.begin().await.map_err(internal_error)
}

pub async fn commit(tx: Box<dyn Transaction>) -> ApiResult<()> {
    tx.commit().await.map_err(internal_error)
}
