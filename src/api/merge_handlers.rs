use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use crate::api::handlers::{
    begin, internal_error, not_found, parse_bbid, ApiResult, AppState,
};
use crate::logic;
use crate::model::{EditorContext, MergeQueue};
use crate::store::traits::Store;

pub async fn get_merge_queue<S: Store>(
    State(ctx): State<AppState<S>>,
    editor: EditorContext,
) -> Json<Option<MergeQueue>> {
    Json(ctx.merge_queues.get(editor.editor_id))
}

/// Queue a live entity for merging. The entity's type decides the queue's type.
pub async fn add_to_merge_queue<S: Store>(
    State(ctx): State<AppState<S>>,
    Path(bbid): Path<String>,
    editor: EditorContext,
) -> ApiResult<Json<MergeQueue>> {
    let bbid = parse_bbid(&bbid)?;

    let mut tx = begin(&ctx.store).await?;
    let entity = logic::load_entity(tx.as_mut(), &bbid)
        .await
        .map_err(internal_error)?
        .filter(|entity| entity.header.master_revision_id.is_some() && !entity.is_deleted())
        .ok_or_else(|| not_found(&format!("Entity {} not found", bbid)))?;

    let queue = ctx
        .merge_queues
        .add(editor.editor_id, bbid, entity.entity_type());
    log::debug!(
        "Editor {} queued {} {} for merging",
        editor.editor_id,
        queue.entity_type,
        bbid
    );
    Ok(Json(queue))
}

pub async fn remove_from_merge_queue<S: Store>(
    State(ctx): State<AppState<S>>,
    Path(bbid): Path<String>,
    editor: EditorContext,
) -> ApiResult<Json<Option<MergeQueue>>> {
    let bbid = parse_bbid(&bbid)?;
    Ok(Json(ctx.merge_queues.remove(editor.editor_id, &bbid)))
}

pub async fn clear_merge_queue<S: Store>(
    State(ctx): State<AppState<S>>,
    editor: EditorContext,
) -> StatusCode {
    ctx.merge_queues.clear(editor.editor_id);
    StatusCode::NO_CONTENT
}
