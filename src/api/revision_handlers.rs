use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, Json},
    Json as RequestJson,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::handlers::{begin, commit, revision_error, ApiResult, AppState};
use crate::logic;
use crate::model::{EditorContext, Note, NoteRequest, RevisionDiff, RevisionId, RevisionSummary};
use crate::render::render_page;
use crate::store::traits::Store;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct RecentRevisionsQuery {
    pub from: Option<i64>,
    pub size: Option<i64>,
}

async fn load_diff<S: Store>(ctx: &AppState<S>, revision_id: RevisionId) -> ApiResult<RevisionDiff> {
    let mut tx = begin(&ctx.store).await?;
    logic::diff_revision(tx.as_mut(), revision_id)
        .await
        .map_err(revision_error)
}

pub async fn revision_page<S: Store>(
    State(ctx): State<AppState<S>>,
    Path(revision_id): Path<RevisionId>,
) -> ApiResult<Html<String>> {
    let diff = load_diff(&ctx, revision_id).await?;
    let title = format!("Revision #{}", revision_id);
    let props = json!({ "title": title, "revision": diff });
    Ok(Html(render_page(&title, "revision", &props)))
}

pub async fn revision_changes<S: Store>(
    State(ctx): State<AppState<S>>,
    Path(revision_id): Path<RevisionId>,
) -> ApiResult<Json<RevisionDiff>> {
    Ok(Json(load_diff(&ctx, revision_id).await?))
}

pub async fn add_revision_note<S: Store>(
    State(ctx): State<AppState<S>>,
    Path(revision_id): Path<RevisionId>,
    editor: EditorContext,
    RequestJson(request): RequestJson<NoteRequest>,
) -> ApiResult<(StatusCode, Json<Note>)> {
    let mut tx = begin(&ctx.store).await?;
    let note = logic::add_revision_note(tx.as_mut(), &editor, revision_id, request.note.as_deref())
        .await
        .map_err(revision_error)?;
    commit(tx).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn recent_revisions<S: Store>(
    State(ctx): State<AppState<S>>,
    Query(query): Query<RecentRevisionsQuery>,
) -> ApiResult<Json<Vec<RevisionSummary>>> {
    let from = query.from.unwrap_or(0).max(0);
    let size = query.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let mut tx = begin(&ctx.store).await?;
    let revisions = logic::recent_revisions(tx.as_mut(), from, size)
        .await
        .map_err(revision_error)?;
    Ok(Json(revisions))
}
