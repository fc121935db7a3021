use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
    Json as RequestJson,
};
use serde::Serialize;

use crate::api::handlers::{
    begin, commit, internal_error, not_found, parse_bbid, parse_entity_type, revision_error,
    ApiResult, AppState,
};
use crate::logic;
use crate::model::{
    Bbid, EditorContext, EntityEdit, EntityHistoryEntry, EntityType, EntityView, NoteRequest,
    Revision,
};
use crate::search::SearchDocument;
use crate::store::traits::Store;
use crate::worker::PostCommitEvent;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub revision: Revision,
    pub bbid: Bbid,
    pub entity_type: EntityType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResponse {
    pub revision: Revision,
    pub entity: EntityView,
    pub merged_away: Vec<Bbid>,
}

pub async fn create_entity<S: Store>(
    State(ctx): State<AppState<S>>,
    Path(entity_type): Path<String>,
    editor: EditorContext,
    RequestJson(edit): RequestJson<EntityEdit>,
) -> ApiResult<(StatusCode, Json<EntityView>)> {
    let entity_type = parse_entity_type(&entity_type)?;

    let mut tx = begin(&ctx.store).await?;
    let outcome = logic::create_entity(tx.as_mut(), &editor, entity_type, &edit)
        .await
        .map_err(revision_error)?;
    commit(tx).await?;

    ctx.post_commit
        .send(PostCommitEvent::IndexEntity(SearchDocument::from_view(&outcome.entity)));
    Ok((StatusCode::CREATED, Json(outcome.entity)))
}

/// Entity at its master revision. A merged-away BBID redirects to the
/// entity it was merged into.
pub async fn get_entity<S: Store>(
    State(ctx): State<AppState<S>>,
    Path((entity_type, bbid)): Path<(String, String)>,
) -> ApiResult<Response> {
    let entity_type = parse_entity_type(&entity_type)?;
    let bbid = parse_bbid(&bbid)?;

    let mut tx = begin(&ctx.store).await?;
    let target = logic::resolve_redirect(tx.as_mut(), &bbid)
        .await
        .map_err(internal_error)?;
    if target != bbid {
        let location = format!("/{}/{}", entity_type.slug(), target);
        return Ok(Redirect::permanent(&location).into_response());
    }

    let view = logic::entity_view(tx.as_mut(), &bbid)
        .await
        .map_err(revision_error)?;
    if view.entity_type != entity_type {
        return Err(not_found(&format!("{} {} not found", entity_type, bbid)));
    }
    Ok(Json(view).into_response())
}

pub async fn edit_entity<S: Store>(
    State(ctx): State<AppState<S>>,
    Path((entity_type, bbid)): Path<(String, String)>,
    editor: EditorContext,
    RequestJson(edit): RequestJson<EntityEdit>,
) -> ApiResult<Json<EntityView>> {
    let entity_type = parse_entity_type(&entity_type)?;
    let bbid = parse_bbid(&bbid)?;

    let mut tx = begin(&ctx.store).await?;
    let outcome = logic::edit_entity(tx.as_mut(), &editor, entity_type, bbid, &edit)
        .await
        .map_err(revision_error)?;
    commit(tx).await?;

    ctx.post_commit
        .send(PostCommitEvent::IndexEntity(SearchDocument::from_view(&outcome.entity)));
    Ok(Json(outcome.entity))
}

pub async fn delete_entity<S: Store>(
    State(ctx): State<AppState<S>>,
    Path((entity_type, bbid)): Path<(String, String)>,
    editor: EditorContext,
    RequestJson(request): RequestJson<NoteRequest>,
) -> ApiResult<Json<DeleteResponse>> {
    let entity_type = parse_entity_type(&entity_type)?;
    let bbid = parse_bbid(&bbid)?;

    let mut tx = begin(&ctx.store).await?;
    let outcome = logic::delete_entity(
        tx.as_mut(),
        &editor,
        entity_type,
        bbid,
        request.note.as_deref(),
    )
    .await
    .map_err(revision_error)?;
    commit(tx).await?;

    ctx.post_commit
        .send(PostCommitEvent::RemoveEntities(vec![(bbid, entity_type)]));
    Ok(Json(DeleteResponse {
        revision: outcome.revision,
        bbid: outcome.bbid,
        entity_type: outcome.entity_type,
    }))
}

/// Merge the editor's queue into this entity
pub async fn merge_entity<S: Store>(
    State(ctx): State<AppState<S>>,
    Path((entity_type, bbid)): Path<(String, String)>,
    editor: EditorContext,
    RequestJson(edit): RequestJson<EntityEdit>,
) -> ApiResult<Json<MergeResponse>> {
    let entity_type = parse_entity_type(&entity_type)?;
    let bbid = parse_bbid(&bbid)?;
    let queue = ctx.merge_queues.get(editor.editor_id);

    let mut tx = begin(&ctx.store).await?;
    let outcome = logic::merge_entities(
        tx.as_mut(),
        &editor,
        entity_type,
        bbid,
        queue.as_ref(),
        &edit,
    )
    .await
    .map_err(revision_error)?;
    commit(tx).await?;

    ctx.merge_queues.clear(editor.editor_id);
    ctx.post_commit
        .send(PostCommitEvent::IndexEntity(SearchDocument::from_view(&outcome.entity)));
    ctx.post_commit.send(PostCommitEvent::RemoveEntities(
        outcome
            .merged_away
            .iter()
            .map(|merged| (*merged, entity_type))
            .collect(),
    ));

    Ok(Json(MergeResponse {
        revision: outcome.revision,
        entity: outcome.entity,
        merged_away: outcome.merged_away,
    }))
}

pub async fn entity_revisions<S: Store>(
    State(ctx): State<AppState<S>>,
    Path((entity_type, bbid)): Path<(String, String)>,
) -> ApiResult<Json<Vec<EntityHistoryEntry>>> {
    let entity_type = parse_entity_type(&entity_type)?;
    let bbid = parse_bbid(&bbid)?;

    let mut tx = begin(&ctx.store).await?;
    let entity = logic::load_entity(tx.as_mut(), &bbid)
        .await
        .map_err(internal_error)?;
    if entity.map(|entity| entity.entity_type()) != Some(entity_type) {
        return Err(not_found(&format!("{} {} not found", entity_type, bbid)));
    }

    let history = logic::entity_history(tx.as_mut(), &bbid)
        .await
        .map_err(revision_error)?;
    Ok(Json(history))
}
