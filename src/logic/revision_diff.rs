use serde_json::{json, Value};

use crate::error::{RevisionError, RevisionResult};
use crate::model::{
    Bbid, DataId, EditorContext, EntityDiff, EntityHistoryEntry, EntityRevision, Note,
    RevisionDiff, RevisionEntity, RevisionId, RevisionSummary,
};
use crate::store::{EditorStore, EntityStore, RevisionStore, Transaction};

use super::deep_diff::deep_diff;
use super::diff_format::format_changes;
use super::load::load_content;
use super::snapshot::snapshot_content;

/// Snapshot of one data row plus its default alias name. A missing row (a
/// deleted entity) is an empty document.
async fn snapshot_of(
    tx: &mut dyn Transaction,
    data_id: Option<DataId>,
) -> RevisionResult<(Value, Option<String>)> {
    let Some(data_id) = data_id else {
        return Ok((json!({}), None));
    };
    let data = tx
        .get_entity_data(data_id)
        .await?
        .ok_or_else(|| RevisionError::not_found(format!("Entity data {}", data_id)))?;
    let content = load_content(tx, &data).await?;
    let name = content.default_alias().map(|alias| alias.name.clone());
    Ok((snapshot_content(tx, &content).await?, name))
}

/// The entity's row in the revision before `revision_id`, if any
async fn previous_entity_revision(
    tx: &mut dyn Transaction,
    bbid: &Bbid,
    revision_id: RevisionId,
) -> RevisionResult<Option<EntityRevision>> {
    Ok(tx
        .list_entity_revisions_for_entity(bbid)
        .await?
        .into_iter()
        .find(|er| er.revision_id < revision_id))
}

async fn diff_entity(
    tx: &mut dyn Transaction,
    entity_revision: &EntityRevision,
) -> RevisionResult<EntityDiff> {
    let bbid = entity_revision.bbid;
    let header = tx
        .get_entity(&bbid)
        .await?
        .ok_or_else(|| RevisionError::not_found(format!("Entity {}", bbid)))?;

    let previous = previous_entity_revision(tx, &bbid, entity_revision.revision_id).await?;
    let (before, before_name) = snapshot_of(tx, previous.and_then(|er| er.data_id)).await?;
    let (after, after_name) = snapshot_of(tx, entity_revision.data_id).await?;

    let changes = deep_diff(&before, &after);
    Ok(EntityDiff {
        bbid,
        entity_type: header.entity_type,
        default_alias: after_name.or(before_name),
        changes: format_changes(header.entity_type, &bbid, &changes),
    })
}

/// Every entity touched by a revision, diffed against its previous state
pub async fn diff_revision(
    tx: &mut dyn Transaction,
    revision_id: RevisionId,
) -> RevisionResult<RevisionDiff> {
    let revision = tx
        .get_revision(revision_id)
        .await?
        .ok_or_else(|| RevisionError::not_found(format!("Revision {}", revision_id)))?;
    let parent_ids = tx.get_revision_parents(revision_id).await?;
    let notes = tx.list_notes(revision_id).await?;

    let mut diffs = Vec::new();
    for entity_revision in tx.list_entity_revisions_for_revision(revision_id).await? {
        diffs.push(diff_entity(tx, &entity_revision).await?);
    }

    Ok(RevisionDiff {
        revision,
        parent_ids,
        notes,
        diffs,
    })
}

/// Revisions of one entity, newest first
pub async fn entity_history(
    tx: &mut dyn Transaction,
    bbid: &Bbid,
) -> RevisionResult<Vec<EntityHistoryEntry>> {
    if tx.get_entity(bbid).await?.is_none() {
        return Err(RevisionError::not_found(format!("Entity {}", bbid)));
    }

    let mut history = Vec::new();
    for entity_revision in tx.list_entity_revisions_for_entity(bbid).await? {
        let revision = tx
            .get_revision(entity_revision.revision_id)
            .await?
            .ok_or_else(|| {
                RevisionError::not_found(format!("Revision {}", entity_revision.revision_id))
            })?;
        let notes = tx.list_notes(revision.id).await?;
        history.push(EntityHistoryEntry {
            revision,
            notes,
            deleted: entity_revision.data_id.is_none(),
            is_merge: entity_revision.is_merge,
        });
    }
    Ok(history)
}

/// A page of the most recent revisions with the entities each one touched
pub async fn recent_revisions(
    tx: &mut dyn Transaction,
    from: i64,
    size: i64,
) -> RevisionResult<Vec<RevisionSummary>> {
    let mut summaries = Vec::new();
    for revision in tx.list_revisions(from, size).await? {
        let mut entities = Vec::new();
        for entity_revision in tx.list_entity_revisions_for_revision(revision.id).await? {
            let Some(header) = tx.get_entity(&entity_revision.bbid).await? else {
                continue;
            };
            entities.push(RevisionEntity {
                bbid: header.bbid,
                entity_type: header.entity_type,
                deleted: entity_revision.data_id.is_none(),
            });
        }
        summaries.push(RevisionSummary { revision, entities });
    }
    Ok(summaries)
}

pub async fn add_revision_note(
    tx: &mut dyn Transaction,
    editor: &EditorContext,
    revision_id: RevisionId,
    content: Option<&str>,
) -> RevisionResult<Note> {
    let editor = tx
        .get_editor(editor.editor_id)
        .await?
        .ok_or_else(|| RevisionError::not_found(format!("Editor {}", editor.editor_id)))?;
    if tx.get_revision(revision_id).await?.is_none() {
        return Err(RevisionError::not_found(format!("Revision {}", revision_id)));
    }

    let content = content
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .ok_or_else(|| RevisionError::conflict("Note must not be empty"))?;
    Ok(tx.add_note(editor.id, revision_id, content).await?)
}
