use crate::error::{RevisionError, RevisionResult};
use crate::model::{Bbid, EditorContext, EntityRevision, EntityType, Revision};
use crate::store::{EditorStore, EntityStore, RevisionStore, Transaction};

use super::edit::add_optional_note;
use super::load::load_entity;

#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    pub revision: Revision,
    pub bbid: Bbid,
    pub entity_type: EntityType,
}

/// Record a revision in which the entity has no data. The entity keeps its
/// history and stays addressable.
pub async fn delete_entity(
    tx: &mut dyn Transaction,
    editor: &EditorContext,
    entity_type: EntityType,
    bbid: Bbid,
    note: Option<&str>,
) -> RevisionResult<DeleteOutcome> {
    let editor = tx
        .get_editor(editor.editor_id)
        .await?
        .ok_or_else(|| RevisionError::not_found(format!("Editor {}", editor.editor_id)))?;

    let entity = load_entity(tx, &bbid)
        .await?
        .filter(|entity| entity.entity_type() == entity_type)
        .ok_or_else(|| RevisionError::not_found(format!("{} {}", entity_type, bbid)))?;

    let Some(master) = entity.header.master_revision_id else {
        return Err(RevisionError::not_found(format!("{} {}", entity_type, bbid)));
    };
    if entity.data_id.is_none() {
        return Err(RevisionError::NoChange);
    }

    let revision = tx.create_revision(editor.id, false).await?;
    tx.add_revision_parents(revision.id, &[master]).await?;
    tx.insert_entity_revision(&EntityRevision {
        revision_id: revision.id,
        bbid,
        data_id: None,
        is_merge: false,
    })
    .await?;
    tx.set_master_revision(&bbid, revision.id).await?;
    tx.increment_edit_count(editor.id).await?;
    add_optional_note(tx, editor.id, revision.id, note).await?;

    log::info!(
        "Revision {} by editor {} deleted {} {}",
        revision.id,
        editor.id,
        entity_type,
        bbid
    );

    Ok(DeleteOutcome {
        revision,
        bbid,
        entity_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{create_entity, entity_view};
    use crate::model::{EntityEdit, Identifier};
    use crate::store::{MemoryStore, Store};

    #[tokio::test]
    async fn test_delete_then_delete_again() {
        let store = MemoryStore::new();
        store.seed_editor(1, "editor").await;
        let editor = EditorContext::new(1);

        let edit = EntityEdit {
            identifiers: vec![Identifier {
                type_id: 1,
                value: "x".into(),
            }],
            ..Default::default()
        };
        let mut tx = store.begin().await.unwrap();
        let created = create_entity(tx.as_mut(), &editor, EntityType::Work, &edit)
            .await
            .unwrap();
        let bbid = created.entity.bbid;

        let deleted = delete_entity(tx.as_mut(), &editor, EntityType::Work, bbid, Some("dupe"))
            .await
            .unwrap();
        assert_eq!(
            tx.get_revision_parents(deleted.revision.id).await.unwrap(),
            vec![created.revision.id]
        );
        assert_eq!(tx.list_notes(deleted.revision.id).await.unwrap().len(), 1);

        let view = entity_view(tx.as_mut(), &bbid).await.unwrap();
        assert!(view.deleted);
        assert!(view.content.is_none());

        let again = delete_entity(tx.as_mut(), &editor, EntityType::Work, bbid, None)
            .await
            .unwrap_err();
        assert!(matches!(again, RevisionError::NoChange));
    }

    #[tokio::test]
    async fn test_wrong_type_is_not_found() {
        let store = MemoryStore::new();
        store.seed_editor(1, "editor").await;
        let editor = EditorContext::new(1);

        let mut tx = store.begin().await.unwrap();
        let created = create_entity(tx.as_mut(), &editor, EntityType::Work, &EntityEdit::default())
            .await
            .unwrap();
        let err = delete_entity(tx.as_mut(), &editor, EntityType::Author, created.entity.bbid, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RevisionError::NotFound(_)));
    }
}
