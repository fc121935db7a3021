use anyhow::Result;
use itertools::Itertools;

use crate::error::{RevisionError, RevisionResult};
use crate::model::{
    Bbid, EditorContext, EntityAttributes, EntityEdit, EntityType, MergeQueue, Relationship,
    RevisionId, SetKind,
};
use crate::store::{EntityStore, RedirectStore, RevisionStore, Transaction};

use super::edit::{run_edit, EditMode, EditOutcome, PendingEntities, PendingEntity};
use super::load::{load_entity, load_live_entity};
use super::sets::{load_items, next_set};

/// Merge every entity in the editor's queue into `survivor`, applying `edit`
/// to the survivor in the same revision.
pub async fn merge_entities(
    tx: &mut dyn Transaction,
    editor: &EditorContext,
    entity_type: EntityType,
    survivor: Bbid,
    queue: Option<&MergeQueue>,
    edit: &EntityEdit,
) -> RevisionResult<EditOutcome> {
    let mode = EditMode::Merge { survivor, queue };
    run_edit(tx, editor, entity_type, mode, edit).await
}

/// Check the queue before anything is written. Returns the entities that
/// will be merged away.
pub fn validate_merge_queue(
    queue: Option<&MergeQueue>,
    entity_type: EntityType,
    survivor: &Bbid,
) -> RevisionResult<Vec<Bbid>> {
    let queue = queue.ok_or_else(|| RevisionError::conflict("No merge queue"))?;

    if queue.entity_type != entity_type {
        return Err(RevisionError::conflict(format!(
            "Merge queue holds {} entities, not {}",
            queue.entity_type, entity_type
        )));
    }
    if !queue.contains(survivor) {
        return Err(RevisionError::conflict(format!(
            "Entity {} is not in the merge queue",
            survivor
        )));
    }

    let merged_away = queue.merged_away(survivor);
    if merged_away.is_empty() {
        return Err(RevisionError::conflict(
            "Merge queue has no other entities to merge",
        ));
    }
    Ok(merged_away)
}

async fn ensure_pending<'p>(
    tx: &mut dyn Transaction,
    pending: &'p mut PendingEntities,
    bbid: Bbid,
) -> RevisionResult<Option<&'p mut PendingEntity>> {
    if !pending.contains_key(&bbid) {
        let entity = load_entity(tx, &bbid)
            .await?
            .ok_or_else(|| RevisionError::not_found(format!("Entity {}", bbid)))?;
        let Some(data) = entity.data.clone() else {
            return Ok(None);
        };
        pending.insert(bbid, PendingEntity::unchanged(entity, data));
    }
    Ok(pending.get_mut(&bbid))
}

/// Pull the merged-away entities and everything that references them into
/// the revision: relationships to them are dropped, editions in a merged
/// edition group move to the survivor, and merged publishers are replaced by
/// the survivor.
pub(crate) async fn process_merge(
    tx: &mut dyn Transaction,
    pending: &mut PendingEntities,
    entity_type: EntityType,
    survivor: Bbid,
    merged_away: &[Bbid],
) -> RevisionResult<()> {
    for bbid in merged_away {
        if pending.contains_key(bbid) {
            continue;
        }
        let entity = load_live_entity(tx, entity_type, bbid).await?;
        let Some(data) = entity.data.clone() else {
            continue;
        };
        pending.insert(*bbid, PendingEntity::unchanged(entity, data));
    }

    // Entities related to a merged-away entity lose that relationship, even
    // when the edit never touched them
    let mut related = Vec::new();
    for bbid in merged_away {
        let Some(entry) = pending.get(bbid) else {
            continue;
        };
        let set_ids = [
            entry.current.as_ref().and_then(|data| data.relationship_set_id),
            entry.next.relationship_set_id,
        ];
        for set_id in set_ids.into_iter().flatten().unique() {
            let relationships: Vec<Relationship> = load_items(tx, Some(set_id)).await?;
            related.extend(
                relationships
                    .iter()
                    .flat_map(|r| [r.source_bbid, r.target_bbid])
                    .filter(|end| !merged_away.contains(end)),
            );
        }
    }
    for other in related.into_iter().sorted().dedup() {
        ensure_pending(tx, pending, other).await?;
    }

    match entity_type {
        EntityType::EditionGroup => {
            for edition in tx.find_editions_in_groups(merged_away).await? {
                let Some(entry) = ensure_pending(tx, pending, edition).await? else {
                    continue;
                };
                if let EntityAttributes::Edition(attrs) = &mut entry.next.attributes {
                    attrs.edition_group_bbid = Some(survivor);
                }
            }
        }
        EntityType::Publisher => {
            for edition in tx.find_editions_with_publishers(merged_away).await? {
                let Some(entry) = ensure_pending(tx, pending, edition).await? else {
                    continue;
                };
                let current_set = entry.next.publisher_set_id;
                let publishers: Vec<Bbid> = load_items(tx, current_set).await?;
                let replaced: Vec<Bbid> = publishers
                    .into_iter()
                    .map(|publisher| {
                        if merged_away.contains(&publisher) {
                            survivor
                        } else {
                            publisher
                        }
                    })
                    .sorted()
                    .dedup()
                    .collect();
                let next_id = next_set(tx, SetKind::Publisher, current_set, &replaced).await?;
                if let Some(entry) = pending.get_mut(&edition) {
                    entry.next.publisher_set_id = next_id;
                }
            }
        }
        EntityType::Author | EntityType::Edition | EntityType::Work => {}
    }

    for (bbid, entry) in pending.iter_mut() {
        if merged_away.contains(bbid) {
            continue;
        }
        let current_set = entry.next.relationship_set_id;
        let relationships: Vec<Relationship> = load_items(tx, current_set).await?;
        let kept: Vec<Relationship> = relationships
            .iter()
            .filter(|r| !merged_away.iter().any(|gone| r.involves(gone)))
            .cloned()
            .collect();
        if kept.len() != relationships.len() {
            entry.next.relationship_set_id =
                next_set(tx, SetKind::Relationship, current_set, &kept).await?;
        }
    }

    Ok(())
}

/// Flag the merge rows, soft delete the merged-away entities and redirect
/// them to the survivor. Runs after the survivor's rows are written.
pub(crate) async fn finalize_merge(
    tx: &mut dyn Transaction,
    revision_id: RevisionId,
    survivor: Bbid,
    merged_away: &[Bbid],
) -> Result<()> {
    let flagged: Vec<Bbid> = std::iter::once(survivor)
        .chain(merged_away.iter().copied())
        .collect();
    tx.flag_merge_entity_revisions(revision_id, &flagged).await?;
    tx.clear_entity_revision_data(revision_id, merged_away).await?;
    tx.insert_redirects(merged_away, &survivor).await?;
    Ok(())
}
