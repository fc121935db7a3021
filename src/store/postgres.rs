use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, Postgres, Row,
};

use crate::model::{
    Annotation, Bbid, DataId, Disambiguation, Editor, EditorId, EntityData, EntityHeader,
    EntityRevision, EntityType, LookupKind, Note, Revision, RevisionId, SetId, SetKind,
};
use crate::store::traits::{
    EditorStore, EntityStore, LookupStore, RedirectStore, RevisionStore, SetStore, Store,
    Transaction,
};

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        Ok(Box::new(PostgresTransaction { tx }))
    }
}

/// A store transaction bound to one pooled connection. Rolled back on drop
/// unless committed.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait::async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx
            .commit()
            .await
            .context("Failed to commit transaction")
    }
}

fn header_from_row(row: &PgRow) -> Result<EntityHeader> {
    let entity_type: String = row.try_get("entity_type")?;
    Ok(EntityHeader {
        bbid: row.try_get("bbid")?,
        entity_type: entity_type.parse()?,
        master_revision_id: row.try_get("master_revision_id")?,
    })
}

fn revision_from_row(row: &PgRow) -> Result<Revision> {
    Ok(Revision {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        is_merge: row.try_get("is_merge")?,
        created_at: row.try_get("created_at")?,
    })
}

fn entity_revision_from_row(row: &PgRow) -> Result<EntityRevision> {
    Ok(EntityRevision {
        revision_id: row.try_get("id")?,
        bbid: row.try_get("bbid")?,
        data_id: row.try_get("data_id")?,
        is_merge: row.try_get("is_merge")?,
    })
}

fn note_from_row(row: &PgRow) -> Result<Note> {
    Ok(Note {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        revision_id: row.try_get("revision_id")?,
        content: row.try_get("content")?,
        posted_at: row.try_get("posted_at")?,
    })
}

#[async_trait::async_trait]
impl EntityStore for PostgresTransaction {
    async fn insert_entity(&mut self, header: &EntityHeader) -> Result<()> {
        sqlx::query("INSERT INTO entity (bbid, entity_type, master_revision_id) VALUES ($1, $2, $3)")
            .bind(header.bbid)
            .bind(header.entity_type.as_str())
            .bind(header.master_revision_id)
            .execute(&mut *self.tx)
            .await
            .context("Failed to insert entity")?;
        Ok(())
    }

    async fn get_entity(&mut self, bbid: &Bbid) -> Result<Option<EntityHeader>> {
        let row = sqlx::query("SELECT bbid, entity_type, master_revision_id FROM entity WHERE bbid = $1")
            .bind(bbid)
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to fetch entity")?;

        row.as_ref().map(header_from_row).transpose()
    }

    async fn set_master_revision(&mut self, bbid: &Bbid, revision_id: RevisionId) -> Result<()> {
        let result = sqlx::query("UPDATE entity SET master_revision_id = $2 WHERE bbid = $1")
            .bind(bbid)
            .bind(revision_id)
            .execute(&mut *self.tx)
            .await
            .context("Failed to update master revision")?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Entity not found: {}", bbid);
        }
        Ok(())
    }

    async fn insert_entity_data(&mut self, data: &EntityData) -> Result<DataId> {
        let attributes =
            serde_json::to_value(&data.attributes).context("Failed to serialize attributes")?;

        let id: DataId = sqlx::query_scalar(
            r#"
            INSERT INTO entity_data (entity_type, alias_set_id, identifier_set_id, relationship_set_id,
                                     language_set_id, publisher_set_id, release_event_set_id,
                                     annotation_id, disambiguation_id, attributes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(data.entity_type().as_str())
        .bind(data.alias_set_id)
        .bind(data.identifier_set_id)
        .bind(data.relationship_set_id)
        .bind(data.language_set_id)
        .bind(data.publisher_set_id)
        .bind(data.release_event_set_id)
        .bind(data.annotation_id)
        .bind(data.disambiguation_id)
        .bind(attributes)
        .fetch_one(&mut *self.tx)
        .await
        .context("Failed to insert entity data")?;

        Ok(id)
    }

    async fn get_entity_data(&mut self, id: DataId) -> Result<Option<EntityData>> {
        let row = sqlx::query(
            r#"
            SELECT alias_set_id, identifier_set_id, relationship_set_id, language_set_id,
                   publisher_set_id, release_event_set_id, annotation_id, disambiguation_id, attributes
            FROM entity_data
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to fetch entity data")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let attributes: Value = row.try_get("attributes")?;
        Ok(Some(EntityData {
            alias_set_id: row.try_get("alias_set_id")?,
            identifier_set_id: row.try_get("identifier_set_id")?,
            relationship_set_id: row.try_get("relationship_set_id")?,
            language_set_id: row.try_get("language_set_id")?,
            publisher_set_id: row.try_get("publisher_set_id")?,
            release_event_set_id: row.try_get("release_event_set_id")?,
            annotation_id: row.try_get("annotation_id")?,
            disambiguation_id: row.try_get("disambiguation_id")?,
            attributes: serde_json::from_value(attributes)
                .context("Failed to deserialize entity attributes")?,
        }))
    }

    async fn find_editions_in_groups(&mut self, groups: &[Bbid]) -> Result<Vec<Bbid>> {
        let bbids: Vec<Bbid> = sqlx::query_scalar(
            r#"
            SELECT e.bbid
            FROM entity e
            JOIN entity_revision er ON er.id = e.master_revision_id AND er.bbid = e.bbid
            JOIN entity_data d ON d.id = er.data_id
            WHERE e.entity_type = $1
              AND (d.attributes->>'editionGroupBbid')::uuid = ANY($2)
            ORDER BY e.bbid
            "#,
        )
        .bind(EntityType::Edition.as_str())
        .bind(groups.to_vec())
        .fetch_all(&mut *self.tx)
        .await
        .context("Failed to find editions by edition group")?;

        Ok(bbids)
    }

    async fn find_editions_with_publishers(&mut self, publishers: &[Bbid]) -> Result<Vec<Bbid>> {
        let bbids: Vec<Bbid> = sqlx::query_scalar(
            r#"
            SELECT e.bbid
            FROM entity e
            JOIN entity_revision er ON er.id = e.master_revision_id AND er.bbid = e.bbid
            JOIN entity_data d ON d.id = er.data_id
            JOIN entity_set s ON s.id = d.publisher_set_id
            WHERE e.entity_type = $1
              AND EXISTS (
                  SELECT 1 FROM jsonb_array_elements_text(s.items) AS p(bbid)
                  WHERE p.bbid::uuid = ANY($2)
              )
            ORDER BY e.bbid
            "#,
        )
        .bind(EntityType::Edition.as_str())
        .bind(publishers.to_vec())
        .fetch_all(&mut *self.tx)
        .await
        .context("Failed to find editions by publisher")?;

        Ok(bbids)
    }
}

#[async_trait::async_trait]
impl RevisionStore for PostgresTransaction {
    async fn create_revision(&mut self, author_id: EditorId, is_merge: bool) -> Result<Revision> {
        let row = sqlx::query(
            r#"
            INSERT INTO revision (author_id, is_merge)
            VALUES ($1, $2)
            RETURNING id, author_id, is_merge, created_at
            "#,
        )
        .bind(author_id)
        .bind(is_merge)
        .fetch_one(&mut *self.tx)
        .await
        .context("Failed to create revision")?;

        revision_from_row(&row)
    }

    async fn get_revision(&mut self, id: RevisionId) -> Result<Option<Revision>> {
        let row = sqlx::query("SELECT id, author_id, is_merge, created_at FROM revision WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to fetch revision")?;

        row.as_ref().map(revision_from_row).transpose()
    }

    async fn list_revisions(&mut self, offset: i64, limit: i64) -> Result<Vec<Revision>> {
        let rows = sqlx::query(
            r#"
            SELECT id, author_id, is_merge, created_at
            FROM revision
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await
        .context("Failed to list revisions")?;

        rows.iter().map(revision_from_row).collect()
    }

    async fn add_revision_parents(&mut self, child: RevisionId, parents: &[RevisionId]) -> Result<()> {
        for parent in parents {
            sqlx::query(
                "INSERT INTO revision_parent (parent_id, child_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(parent)
            .bind(child)
            .execute(&mut *self.tx)
            .await
            .context("Failed to link parent revision")?;
        }
        Ok(())
    }

    async fn get_revision_parents(&mut self, child: RevisionId) -> Result<Vec<RevisionId>> {
        let parents: Vec<RevisionId> = sqlx::query_scalar(
            "SELECT parent_id FROM revision_parent WHERE child_id = $1 ORDER BY parent_id",
        )
        .bind(child)
        .fetch_all(&mut *self.tx)
        .await
        .context("Failed to fetch parent revisions")?;

        Ok(parents)
    }

    async fn insert_entity_revision(&mut self, entity_revision: &EntityRevision) -> Result<()> {
        sqlx::query("INSERT INTO entity_revision (id, bbid, data_id, is_merge) VALUES ($1, $2, $3, $4)")
            .bind(entity_revision.revision_id)
            .bind(entity_revision.bbid)
            .bind(entity_revision.data_id)
            .bind(entity_revision.is_merge)
            .execute(&mut *self.tx)
            .await
            .context("Failed to insert entity revision")?;
        Ok(())
    }

    async fn get_entity_revision(
        &mut self,
        revision_id: RevisionId,
        bbid: &Bbid,
    ) -> Result<Option<EntityRevision>> {
        let row = sqlx::query(
            "SELECT id, bbid, data_id, is_merge FROM entity_revision WHERE id = $1 AND bbid = $2",
        )
        .bind(revision_id)
        .bind(bbid)
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to fetch entity revision")?;

        row.as_ref().map(entity_revision_from_row).transpose()
    }

    async fn list_entity_revisions_for_revision(
        &mut self,
        revision_id: RevisionId,
    ) -> Result<Vec<EntityRevision>> {
        let rows = sqlx::query(
            "SELECT id, bbid, data_id, is_merge FROM entity_revision WHERE id = $1 ORDER BY bbid",
        )
        .bind(revision_id)
        .fetch_all(&mut *self.tx)
        .await
        .context("Failed to list entity revisions")?;

        rows.iter().map(entity_revision_from_row).collect()
    }

    async fn list_entity_revisions_for_entity(&mut self, bbid: &Bbid) -> Result<Vec<EntityRevision>> {
        let rows = sqlx::query(
            "SELECT id, bbid, data_id, is_merge FROM entity_revision WHERE bbid = $1 ORDER BY id DESC",
        )
        .bind(bbid)
        .fetch_all(&mut *self.tx)
        .await
        .context("Failed to list entity history")?;

        rows.iter().map(entity_revision_from_row).collect()
    }

    async fn flag_merge_entity_revisions(&mut self, revision_id: RevisionId, bbids: &[Bbid]) -> Result<()> {
        sqlx::query("UPDATE entity_revision SET is_merge = TRUE WHERE id = $1 AND bbid = ANY($2)")
            .bind(revision_id)
            .bind(bbids.to_vec())
            .execute(&mut *self.tx)
            .await
            .context("Failed to flag merge entity revisions")?;
        Ok(())
    }

    async fn clear_entity_revision_data(&mut self, revision_id: RevisionId, bbids: &[Bbid]) -> Result<()> {
        sqlx::query("UPDATE entity_revision SET data_id = NULL WHERE id = $1 AND bbid = ANY($2)")
            .bind(revision_id)
            .bind(bbids.to_vec())
            .execute(&mut *self.tx)
            .await
            .context("Failed to clear entity revision data")?;
        Ok(())
    }

    async fn add_note(
        &mut self,
        author_id: EditorId,
        revision_id: RevisionId,
        content: &str,
    ) -> Result<Note> {
        let row = sqlx::query(
            r#"
            INSERT INTO note (author_id, revision_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, author_id, revision_id, content, posted_at
            "#,
        )
        .bind(author_id)
        .bind(revision_id)
        .bind(content)
        .fetch_one(&mut *self.tx)
        .await
        .context("Failed to add note")?;

        note_from_row(&row)
    }

    async fn list_notes(&mut self, revision_id: RevisionId) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            r#"
            SELECT id, author_id, revision_id, content, posted_at
            FROM note
            WHERE revision_id = $1
            ORDER BY posted_at, id
            "#,
        )
        .bind(revision_id)
        .fetch_all(&mut *self.tx)
        .await
        .context("Failed to list notes")?;

        rows.iter().map(note_from_row).collect()
    }
}

#[async_trait::async_trait]
impl SetStore for PostgresTransaction {
    async fn insert_set(&mut self, kind: SetKind, items: Value) -> Result<SetId> {
        let id: SetId = sqlx::query_scalar("INSERT INTO entity_set (kind, items) VALUES ($1, $2) RETURNING id")
            .bind(kind.as_str())
            .bind(items)
            .fetch_one(&mut *self.tx)
            .await
            .with_context(|| format!("Failed to insert {} set", kind.as_str()))?;
        Ok(id)
    }

    async fn get_set(&mut self, id: SetId) -> Result<Option<Value>> {
        let items: Option<Value> = sqlx::query_scalar("SELECT items FROM entity_set WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to fetch set")?;
        Ok(items)
    }

    async fn insert_annotation(&mut self, content: &str, revision_id: RevisionId) -> Result<Annotation> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO annotation (content, last_revision_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(content)
        .bind(revision_id)
        .fetch_one(&mut *self.tx)
        .await
        .context("Failed to insert annotation")?;

        Ok(Annotation {
            id,
            content: content.to_string(),
            last_revision_id: revision_id,
        })
    }

    async fn get_annotation(&mut self, id: i64) -> Result<Option<Annotation>> {
        let row = sqlx::query("SELECT id, content, last_revision_id FROM annotation WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to fetch annotation")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Annotation {
            id: row.try_get("id")?,
            content: row.try_get("content")?,
            last_revision_id: row.try_get("last_revision_id")?,
        }))
    }

    async fn insert_disambiguation(&mut self, comment: &str) -> Result<Disambiguation> {
        let id: i64 = sqlx::query_scalar("INSERT INTO disambiguation (comment) VALUES ($1) RETURNING id")
            .bind(comment)
            .fetch_one(&mut *self.tx)
            .await
            .context("Failed to insert disambiguation")?;

        Ok(Disambiguation {
            id,
            comment: comment.to_string(),
        })
    }

    async fn get_disambiguation(&mut self, id: i64) -> Result<Option<Disambiguation>> {
        let row = sqlx::query("SELECT id, comment FROM disambiguation WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to fetch disambiguation")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Disambiguation {
            id: row.try_get("id")?,
            comment: row.try_get("comment")?,
        }))
    }
}

#[async_trait::async_trait]
impl EditorStore for PostgresTransaction {
    async fn get_editor(&mut self, id: EditorId) -> Result<Option<Editor>> {
        let row = sqlx::query("SELECT id, name, total_revisions FROM editor WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to fetch editor")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Editor {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            total_revisions: row.try_get("total_revisions")?,
        }))
    }

    async fn increment_edit_count(&mut self, id: EditorId) -> Result<()> {
        let result = sqlx::query("UPDATE editor SET total_revisions = total_revisions + 1 WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .context("Failed to increment editor edit count")?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Editor not found: {}", id);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RedirectStore for PostgresTransaction {
    async fn insert_redirects(&mut self, sources: &[Bbid], target: &Bbid) -> Result<()> {
        for source in sources {
            sqlx::query("INSERT INTO entity_redirect (source_bbid, target_bbid) VALUES ($1, $2)")
                .bind(source)
                .bind(target)
                .execute(&mut *self.tx)
                .await
                .context("Failed to insert entity redirect")?;
        }
        Ok(())
    }

    async fn get_redirect(&mut self, source: &Bbid) -> Result<Option<Bbid>> {
        let target: Option<Bbid> =
            sqlx::query_scalar("SELECT target_bbid FROM entity_redirect WHERE source_bbid = $1")
                .bind(source)
                .fetch_optional(&mut *self.tx)
                .await
                .context("Failed to fetch entity redirect")?;
        Ok(target)
    }
}

#[async_trait::async_trait]
impl LookupStore for PostgresTransaction {
    async fn get_label(&mut self, kind: LookupKind, id: i32) -> Result<Option<String>> {
        let label: Option<String> = sqlx::query_scalar("SELECT label FROM lookup WHERE kind = $1 AND id = $2")
            .bind(kind.as_str())
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to fetch lookup label")?;
        Ok(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::create_entity;
    use crate::model::{EditorContext, EntityEdit, EntityType};

    // Needs a scratch database:
    // EREV_TEST_DATABASE_URL=postgres://... cargo test -- --ignored
    async fn test_store() -> Option<PostgresStore> {
        let url = std::env::var("EREV_TEST_DATABASE_URL").ok()?;
        let store = PostgresStore::new(&url, 2).await.unwrap();
        store.migrate().await.unwrap();
        Some(store)
    }

    async fn seed_editor(store: &PostgresStore) -> i64 {
        sqlx::query_scalar("INSERT INTO editor (name) VALUES ($1) RETURNING id")
            .bind("postgres test editor")
            .fetch_one(store.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore]
    async fn test_create_commit_and_redirect() {
        let Some(store) = test_store().await else {
            return;
        };
        let editor = EditorContext::new(seed_editor(&store).await);

        let mut tx = store.begin().await.unwrap();
        let a = create_entity(tx.as_mut(), &editor, EntityType::Work, &EntityEdit::default())
            .await
            .unwrap();
        let b = create_entity(tx.as_mut(), &editor, EntityType::Work, &EntityEdit::default())
            .await
            .unwrap();
        tx.commit().await.unwrap();
        let (a, b) = (a.entity.bbid, b.entity.bbid);

        let mut tx = store.begin().await.unwrap();
        let header = tx.get_entity(&a).await.unwrap().unwrap();
        assert_eq!(header.entity_type, EntityType::Work);
        assert!(header.master_revision_id.is_some());
        assert_eq!(tx.get_editor(editor.editor_id).await.unwrap().unwrap().total_revisions, 2);

        tx.insert_redirects(&[b], &a).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.get_redirect(&b).await.unwrap(), Some(a));
        assert_eq!(tx.get_redirect(&a).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore]
    async fn test_dropped_transaction_rolls_back() {
        let Some(store) = test_store().await else {
            return;
        };
        let editor = EditorContext::new(seed_editor(&store).await);

        let mut tx = store.begin().await.unwrap();
        let created = create_entity(tx.as_mut(), &editor, EntityType::Author, &EntityEdit::default())
            .await
            .unwrap();
        drop(tx);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.get_entity(&created.entity.bbid).await.unwrap().is_none());
    }
}
