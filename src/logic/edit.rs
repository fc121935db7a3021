use anyhow::Result;
use itertools::Itertools;
use std::collections::BTreeMap;

use crate::error::{RevisionError, RevisionResult};
use crate::model::{
    Bbid, DataId, EditorContext, EditorId, EntityData, EntityEdit, EntityHeader, EntityRevision,
    EntityType, EntityView, MergeQueue, Relationship, Revision, RevisionId, SetId, SetKind,
    generate_bbid,
};
use crate::store::{EditorStore, EntityStore, RevisionStore, Transaction};

use super::load::{entity_view, load_entity, load_live_entity, LoadedEntity};
use super::merge::{finalize_merge, process_merge, validate_merge_queue};
use super::relationships::next_relationship_sets;
use super::sets::{load_items, next_annotation, next_disambiguation, next_set};

/// Result of a create, edit or merge
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub revision: Revision,
    pub entity: EntityView,
    /// Entities merged into `entity`; empty unless this was a merge
    pub merged_away: Vec<Bbid>,
}

pub(crate) enum EditMode<'a> {
    Create,
    Edit(Bbid),
    Merge {
        survivor: Bbid,
        queue: Option<&'a MergeQueue>,
    },
}

/// An entity that gets a row in the revision being written
#[derive(Debug, Clone)]
pub(crate) struct PendingEntity {
    pub header: EntityHeader,
    pub current_data_id: Option<DataId>,
    pub current: Option<EntityData>,
    pub next: EntityData,
}

impl PendingEntity {
    pub(crate) fn unchanged(entity: LoadedEntity, data: EntityData) -> Self {
        Self {
            header: entity.header,
            current_data_id: entity.data_id,
            current: Some(data.clone()),
            next: data,
        }
    }
}

pub(crate) type PendingEntities = BTreeMap<Bbid, PendingEntity>;

pub async fn create_entity(
    tx: &mut dyn Transaction,
    editor: &EditorContext,
    entity_type: EntityType,
    edit: &EntityEdit,
) -> RevisionResult<EditOutcome> {
    run_edit(tx, editor, entity_type, EditMode::Create, edit).await
}

pub async fn edit_entity(
    tx: &mut dyn Transaction,
    editor: &EditorContext,
    entity_type: EntityType,
    bbid: Bbid,
    edit: &EntityEdit,
) -> RevisionResult<EditOutcome> {
    run_edit(tx, editor, entity_type, EditMode::Edit(bbid), edit).await
}

pub(crate) async fn run_edit(
    tx: &mut dyn Transaction,
    editor: &EditorContext,
    entity_type: EntityType,
    mode: EditMode<'_>,
    edit: &EntityEdit,
) -> RevisionResult<EditOutcome> {
    let editor = tx
        .get_editor(editor.editor_id)
        .await?
        .ok_or_else(|| RevisionError::not_found(format!("Editor {}", editor.editor_id)))?;

    if let Some(attributes) = &edit.attributes {
        if attributes.entity_type() != entity_type {
            return Err(RevisionError::conflict(format!(
                "{} attributes submitted for a {}",
                attributes.entity_type(),
                entity_type
            )));
        }
    }

    let (is_merge, merged_away) = match &mode {
        EditMode::Merge { survivor, queue } => {
            (true, validate_merge_queue(*queue, entity_type, survivor)?)
        }
        EditMode::Create | EditMode::Edit(_) => (false, Vec::new()),
    };

    let current = match mode {
        EditMode::Create => {
            let header = EntityHeader {
                bbid: generate_bbid(),
                entity_type,
                master_revision_id: None,
            };
            tx.insert_entity(&header).await?;
            LoadedEntity {
                header,
                data_id: None,
                data: None,
            }
        }
        EditMode::Edit(bbid) | EditMode::Merge { survivor: bbid, .. } => {
            load_live_entity(tx, entity_type, &bbid).await?
        }
    };
    let bbid = current.bbid();

    let revision = tx.create_revision(editor.id, is_merge).await?;

    let current_data = current
        .data
        .clone()
        .unwrap_or_else(|| EntityData::empty(entity_type));
    let current_relationships: Vec<Relationship> =
        load_items(tx, current_data.relationship_set_id).await?;
    let proposed: Vec<Relationship> = edit
        .relationships
        .iter()
        .map(|relationship| relationship.resolve(bbid))
        .collect();
    let relationship_sets = next_relationship_sets(
        tx,
        bbid,
        current_data.relationship_set_id,
        &current_relationships,
        &proposed,
    )
    .await?;

    let next = next_entity_data(
        tx,
        entity_type,
        &current_data,
        edit,
        relationship_sets.get(&bbid).copied(),
        revision.id,
    )
    .await?;

    let changed = current.data.as_ref() != Some(&next);
    if !changed && relationship_sets.is_empty() && !is_merge {
        return Err(RevisionError::NoChange);
    }

    let mut pending = PendingEntities::new();
    pending.insert(
        bbid,
        PendingEntity {
            header: current.header.clone(),
            current_data_id: current.data_id,
            current: current.data.clone(),
            next,
        },
    );

    for (other, set_id) in &relationship_sets {
        if *other == bbid {
            continue;
        }
        let entity = load_entity(tx, other)
            .await?
            .ok_or_else(|| RevisionError::not_found(format!("Related entity {}", other)))?;
        let Some(data) = entity.data.clone() else {
            continue;
        };
        let mut entry = PendingEntity::unchanged(entity, data);
        entry.next.relationship_set_id = *set_id;
        pending.insert(*other, entry);
    }

    if is_merge {
        process_merge(tx, &mut pending, entity_type, bbid, &merged_away).await?;
    }

    save_pending(tx, revision.id, &pending).await?;

    if is_merge {
        finalize_merge(tx, revision.id, bbid, &merged_away).await?;
    }

    tx.increment_edit_count(editor.id).await?;
    add_optional_note(tx, editor.id, revision.id, edit.note.as_deref()).await?;

    log::info!(
        "Revision {} by editor {} wrote {} entities ({} {})",
        revision.id,
        editor.id,
        pending.len(),
        entity_type,
        bbid
    );

    let entity = entity_view(tx, &bbid).await?;
    Ok(EditOutcome {
        revision,
        entity,
        merged_away,
    })
}

/// The data row an edit proposes. Sets that this entity type does not carry
/// stay empty.
async fn next_entity_data(
    tx: &mut dyn Transaction,
    entity_type: EntityType,
    current: &EntityData,
    edit: &EntityEdit,
    relationship_set: Option<Option<SetId>>,
    revision_id: RevisionId,
) -> Result<EntityData> {
    let has_languages = matches!(entity_type, EntityType::Edition | EntityType::Work);
    let is_edition = entity_type == EntityType::Edition;

    let alias_set_id = next_set(
        tx,
        SetKind::Alias,
        current.alias_set_id,
        &edit.normalized_aliases(),
    )
    .await?;
    let identifier_set_id = next_set(
        tx,
        SetKind::Identifier,
        current.identifier_set_id,
        &edit.identifiers,
    )
    .await?;
    let language_set_id = if has_languages {
        next_set(
            tx,
            SetKind::Language,
            current.language_set_id,
            &edit.normalized_languages(),
        )
        .await?
    } else {
        None
    };
    let (publisher_set_id, release_event_set_id) = if is_edition {
        (
            next_set(
                tx,
                SetKind::Publisher,
                current.publisher_set_id,
                &edit.normalized_publishers(),
            )
            .await?,
            next_set(
                tx,
                SetKind::ReleaseEvent,
                current.release_event_set_id,
                &edit.release_events,
            )
            .await?,
        )
    } else {
        (None, None)
    };
    let annotation_id = next_annotation(
        tx,
        current.annotation_id,
        edit.annotation.as_deref(),
        revision_id,
    )
    .await?;
    let disambiguation_id =
        next_disambiguation(tx, current.disambiguation_id, edit.disambiguation.as_deref()).await?;

    Ok(EntityData {
        alias_set_id,
        identifier_set_id,
        relationship_set_id: relationship_set.unwrap_or(current.relationship_set_id),
        language_set_id,
        publisher_set_id,
        release_event_set_id,
        annotation_id,
        disambiguation_id,
        attributes: edit
            .attributes
            .clone()
            .unwrap_or_else(|| current.attributes.clone()),
    })
}

/// Write one entity revision per pending entity, move every master pointer
/// and link the revision to the masters it replaces.
async fn save_pending(
    tx: &mut dyn Transaction,
    revision_id: RevisionId,
    pending: &PendingEntities,
) -> Result<()> {
    let mut parents = Vec::new();

    for (bbid, entity) in pending {
        let data_id = match (entity.current_data_id, &entity.current) {
            (Some(id), Some(current)) if *current == entity.next => id,
            _ => tx.insert_entity_data(&entity.next).await?,
        };

        tx.insert_entity_revision(&EntityRevision {
            revision_id,
            bbid: *bbid,
            data_id: Some(data_id),
            is_merge: false,
        })
        .await?;
        tx.set_master_revision(bbid, revision_id).await?;
        parents.extend(entity.header.master_revision_id);
    }

    let parents: Vec<RevisionId> = parents.into_iter().sorted().dedup().collect();
    tx.add_revision_parents(revision_id, &parents).await?;
    Ok(())
}

pub(crate) async fn add_optional_note(
    tx: &mut dyn Transaction,
    author_id: EditorId,
    revision_id: RevisionId,
    note: Option<&str>,
) -> Result<()> {
    if let Some(note) = note.map(str::trim).filter(|note| !note.is_empty()) {
        tx.add_note(author_id, revision_id, note).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Alias, AuthorAttributes, EntityAttributes, RelationshipEdit};
    use crate::store::{MemoryStore, Store};

    const EDITOR: EditorId = 1;

    async fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.seed_editor(EDITOR, "editor").await;
        store
    }

    fn named(name: &str) -> EntityEdit {
        EntityEdit {
            aliases: vec![Alias {
                name: name.to_string(),
                sort_name: name.to_string(),
                language_id: None,
                primary: true,
                default: true,
            }],
            ..Default::default()
        }
    }

    async fn create(store: &MemoryStore, entity_type: EntityType, edit: &EntityEdit) -> EditOutcome {
        let mut tx = store.begin().await.unwrap();
        let outcome = create_entity(tx.as_mut(), &EditorContext::new(EDITOR), entity_type, edit)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        outcome
    }

    #[tokio::test]
    async fn test_create_sets_master_and_counts_revision() {
        let store = store().await;
        let outcome = create(&store, EntityType::Author, &named("Ursula")).await;

        assert_eq!(outcome.entity.revision_id, Some(outcome.revision.id));
        assert_eq!(
            outcome.entity.default_alias.as_ref().map(|a| a.name.as_str()),
            Some("Ursula")
        );
        assert!(!outcome.revision.is_merge);
        assert_eq!(store.editor(EDITOR).await.unwrap().total_revisions, 1);
    }

    #[tokio::test]
    async fn test_unchanged_edit_is_rejected_without_a_revision() {
        let store = store().await;
        let edit = named("Ursula");
        let created = create(&store, EntityType::Author, &edit).await;
        assert_eq!(store.revision_count().await, 1);

        let mut tx = store.begin().await.unwrap();
        let err = edit_entity(
            tx.as_mut(),
            &EditorContext::new(EDITOR),
            EntityType::Author,
            created.entity.bbid,
            &edit,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RevisionError::NoChange));
        drop(tx);

        assert_eq!(store.revision_count().await, 1);
    }

    #[tokio::test]
    async fn test_edit_links_parent_and_keeps_unchanged_sets() {
        let store = store().await;
        let created = create(&store, EntityType::Author, &named("Ursula")).await;

        let mut edit = named("Ursula");
        edit.attributes = Some(EntityAttributes::Author(AuthorAttributes {
            ended: true,
            ..Default::default()
        }));

        let mut tx = store.begin().await.unwrap();
        let edited = edit_entity(
            tx.as_mut(),
            &EditorContext::new(EDITOR),
            EntityType::Author,
            created.entity.bbid,
            &edit,
        )
        .await
        .unwrap();

        let parents = tx.get_revision_parents(edited.revision.id).await.unwrap();
        assert_eq!(parents, vec![created.revision.id]);

        let before = tx.get_entity_data(created.entity.data_id.unwrap()).await.unwrap().unwrap();
        let after = tx.get_entity_data(edited.entity.data_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(before.alias_set_id, after.alias_set_id);
        assert_ne!(before.attributes, after.attributes);
    }

    #[tokio::test]
    async fn test_relationship_edit_touches_both_ends() {
        let store = store().await;
        let work = create(&store, EntityType::Work, &named("Earthsea")).await;

        let mut edit = named("Ursula");
        edit.relationships.push(RelationshipEdit {
            type_id: 8,
            source_bbid: None,
            target_bbid: Some(work.entity.bbid),
        });
        let author = create(&store, EntityType::Author, &edit).await;

        let mut tx = store.begin().await.unwrap();
        let rows = tx
            .list_entity_revisions_for_revision(author.revision.id)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        let parents = tx.get_revision_parents(author.revision.id).await.unwrap();
        assert_eq!(parents, vec![work.revision.id]);

        let work_view = entity_view(tx.as_mut(), &work.entity.bbid).await.unwrap();
        let relationships = work_view.content.unwrap().relationships;
        assert_eq!(relationships.len(), 1);
        assert_eq!(relationships[0].source_bbid, author.entity.bbid);
    }

    #[tokio::test]
    async fn test_mismatched_attributes_conflict() {
        let store = store().await;
        let mut edit = named("Earthsea");
        edit.attributes = Some(EntityAttributes::Author(AuthorAttributes::default()));

        let mut tx = store.begin().await.unwrap();
        let err = create_entity(tx.as_mut(), &EditorContext::new(EDITOR), EntityType::Work, &edit)
            .await
            .unwrap_err();
        assert!(matches!(err, RevisionError::ValidationConflict(_)));
    }

    #[tokio::test]
    async fn test_unknown_editor_is_not_found() {
        let store = store().await;
        let mut tx = store.begin().await.unwrap();
        let err = create_entity(
            tx.as_mut(),
            &EditorContext::new(99),
            EntityType::Work,
            &named("Earthsea"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RevisionError::NotFound(_)));
    }
}
