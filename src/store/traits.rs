use anyhow::Result;
use serde_json::Value;

use crate::model::{
    Annotation, Bbid, DataId, Disambiguation, Editor, EditorId, EntityData, EntityHeader,
    EntityRevision, LookupKind, Note, Revision, RevisionId, SetId, SetKind,
};

/// Entity headers and immutable entity data rows
#[async_trait::async_trait]
pub trait EntityStore: Send {
    async fn insert_entity(&mut self, header: &EntityHeader) -> Result<()>;
    async fn get_entity(&mut self, bbid: &Bbid) -> Result<Option<EntityHeader>>;
    /// Point an entity at a new master revision
    async fn set_master_revision(&mut self, bbid: &Bbid, revision_id: RevisionId) -> Result<()>;
    async fn insert_entity_data(&mut self, data: &EntityData) -> Result<DataId>;
    async fn get_entity_data(&mut self, id: DataId) -> Result<Option<EntityData>>;
    /// Live editions whose edition group is one of `groups`
    async fn find_editions_in_groups(&mut self, groups: &[Bbid]) -> Result<Vec<Bbid>>;
    /// Live editions whose publisher set mentions one of `publishers`
    async fn find_editions_with_publishers(&mut self, publishers: &[Bbid]) -> Result<Vec<Bbid>>;
}

/// Revisions, their parent links, per-entity revision rows and notes
#[async_trait::async_trait]
pub trait RevisionStore: Send {
    async fn create_revision(&mut self, author_id: EditorId, is_merge: bool) -> Result<Revision>;
    async fn get_revision(&mut self, id: RevisionId) -> Result<Option<Revision>>;
    async fn list_revisions(&mut self, offset: i64, limit: i64) -> Result<Vec<Revision>>;
    async fn add_revision_parents(&mut self, child: RevisionId, parents: &[RevisionId]) -> Result<()>;
    async fn get_revision_parents(&mut self, child: RevisionId) -> Result<Vec<RevisionId>>;
    async fn insert_entity_revision(&mut self, entity_revision: &EntityRevision) -> Result<()>;
    async fn get_entity_revision(
        &mut self,
        revision_id: RevisionId,
        bbid: &Bbid,
    ) -> Result<Option<EntityRevision>>;
    async fn list_entity_revisions_for_revision(
        &mut self,
        revision_id: RevisionId,
    ) -> Result<Vec<EntityRevision>>;
    /// History of one entity, newest first
    async fn list_entity_revisions_for_entity(&mut self, bbid: &Bbid) -> Result<Vec<EntityRevision>>;
    async fn flag_merge_entity_revisions(&mut self, revision_id: RevisionId, bbids: &[Bbid]) -> Result<()>;
    async fn clear_entity_revision_data(&mut self, revision_id: RevisionId, bbids: &[Bbid]) -> Result<()>;
    async fn add_note(
        &mut self,
        author_id: EditorId,
        revision_id: RevisionId,
        content: &str,
    ) -> Result<Note>;
    async fn list_notes(&mut self, revision_id: RevisionId) -> Result<Vec<Note>>;
}

/// Immutable sub-object rows: item sets, annotations and disambiguations
#[async_trait::async_trait]
pub trait SetStore: Send {
    async fn insert_set(&mut self, kind: SetKind, items: Value) -> Result<SetId>;
    async fn get_set(&mut self, id: SetId) -> Result<Option<Value>>;
    async fn insert_annotation(&mut self, content: &str, revision_id: RevisionId) -> Result<Annotation>;
    async fn get_annotation(&mut self, id: i64) -> Result<Option<Annotation>>;
    async fn insert_disambiguation(&mut self, comment: &str) -> Result<Disambiguation>;
    async fn get_disambiguation(&mut self, id: i64) -> Result<Option<Disambiguation>>;
}

#[async_trait::async_trait]
pub trait EditorStore: Send {
    async fn get_editor(&mut self, id: EditorId) -> Result<Option<Editor>>;
    async fn increment_edit_count(&mut self, id: EditorId) -> Result<()>;
}

#[async_trait::async_trait]
pub trait RedirectStore: Send {
    async fn insert_redirects(&mut self, sources: &[Bbid], target: &Bbid) -> Result<()>;
    async fn get_redirect(&mut self, source: &Bbid) -> Result<Option<Bbid>>;
}

#[async_trait::async_trait]
pub trait LookupStore: Send {
    async fn get_label(&mut self, kind: LookupKind, id: i32) -> Result<Option<String>>;
}

/// A unit of work against the store. Every mutation happens through one of
/// these; dropping it without `commit` discards all of its writes.
#[async_trait::async_trait]
pub trait Transaction:
    EntityStore + RevisionStore + SetStore + EditorStore + RedirectStore + LookupStore + Send
{
    async fn commit(self: Box<Self>) -> Result<()>;
}

#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>>;
}
