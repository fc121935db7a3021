use anyhow::{Context, Result};
use chrono::Utc;
use itertools::Itertools;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::{
    Annotation, Bbid, DataId, Disambiguation, Editor, EditorId, EntityAttributes, EntityData,
    EntityHeader, EntityRevision, EntityType, LookupKind, Note, Revision, RevisionId, SetId,
    SetKind,
};
use crate::store::traits::{
    EditorStore, EntityStore, LookupStore, RedirectStore, RevisionStore, SetStore, Store,
    Transaction,
};

/// Everything the in-memory store holds. Row ids are 1-based positions.
#[derive(Debug, Clone, Default)]
struct MemoryState {
    entities: HashMap<Bbid, EntityHeader>,
    data: Vec<EntityData>,
    revisions: Vec<Revision>,
    revision_parents: Vec<(RevisionId, RevisionId)>,
    entity_revisions: Vec<EntityRevision>,
    notes: Vec<Note>,
    sets: Vec<(SetKind, Value)>,
    annotations: Vec<Annotation>,
    disambiguations: Vec<Disambiguation>,
    editors: HashMap<EditorId, Editor>,
    redirects: HashMap<Bbid, Bbid>,
    lookups: HashMap<(LookupKind, i32), String>,
}

impl MemoryState {
    fn master_data(&self, header: &EntityHeader) -> Option<&EntityData> {
        let revision_id = header.master_revision_id?;
        let data_id = self
            .entity_revisions
            .iter()
            .find(|er| er.revision_id == revision_id && er.bbid == header.bbid)?
            .data_id?;
        self.data.get(row_index(data_id)?)
    }

    fn live_editions(&self) -> impl Iterator<Item = (&Bbid, &EntityData)> {
        self.entities
            .values()
            .filter(|header| header.entity_type == EntityType::Edition)
            .filter_map(|header| self.master_data(header).map(|data| (&header.bbid, data)))
    }
}

fn row_index(id: i64) -> Option<usize> {
    usize::try_from(id).ok()?.checked_sub(1)
}

fn next_id(len: usize) -> i64 {
    len as i64 + 1
}

/// An in-process store. Transactions are serialized: each one holds the
/// state lock and works on a staged copy that replaces the shared state on
/// commit.
///
/// Every `begin`, read-only ones included, clones the whole state. Meant for
/// tests and local runs only.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_editor(&self, id: EditorId, name: &str) {
        self.state.lock().await.editors.insert(
            id,
            Editor {
                id,
                name: name.to_string(),
                total_revisions: 0,
            },
        );
    }

    pub async fn seed_lookup(&self, kind: LookupKind, id: i32, label: &str) {
        self.state
            .lock()
            .await
            .lookups
            .insert((kind, id), label.to_string());
    }

    pub async fn editor(&self, id: EditorId) -> Option<Editor> {
        self.state.lock().await.editors.get(&id).cloned()
    }

    pub async fn revision_count(&self) -> usize {
        self.state.lock().await.revisions.len()
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, staged }))
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait::async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[async_trait::async_trait]
impl EntityStore for MemoryTransaction {
    async fn insert_entity(&mut self, header: &EntityHeader) -> Result<()> {
        if self.staged.entities.contains_key(&header.bbid) {
            anyhow::bail!("Entity already exists: {}", header.bbid);
        }
        self.staged.entities.insert(header.bbid, header.clone());
        Ok(())
    }

    async fn get_entity(&mut self, bbid: &Bbid) -> Result<Option<EntityHeader>> {
        Ok(self.staged.entities.get(bbid).cloned())
    }

    async fn set_master_revision(&mut self, bbid: &Bbid, revision_id: RevisionId) -> Result<()> {
        let header = self
            .staged
            .entities
            .get_mut(bbid)
            .with_context(|| format!("Entity not found: {}", bbid))?;
        header.master_revision_id = Some(revision_id);
        Ok(())
    }

    async fn insert_entity_data(&mut self, data: &EntityData) -> Result<DataId> {
        self.staged.data.push(data.clone());
        Ok(next_id(self.staged.data.len() - 1))
    }

    async fn get_entity_data(&mut self, id: DataId) -> Result<Option<EntityData>> {
        Ok(row_index(id).and_then(|i| self.staged.data.get(i)).cloned())
    }

    async fn find_editions_in_groups(&mut self, groups: &[Bbid]) -> Result<Vec<Bbid>> {
        Ok(self
            .staged
            .live_editions()
            .filter(|(_, data)| match &data.attributes {
                EntityAttributes::Edition(attrs) => attrs
                    .edition_group_bbid
                    .is_some_and(|group| groups.contains(&group)),
                _ => false,
            })
            .map(|(bbid, _)| *bbid)
            .sorted()
            .collect())
    }

    async fn find_editions_with_publishers(&mut self, publishers: &[Bbid]) -> Result<Vec<Bbid>> {
        let mut found = Vec::new();
        for (bbid, data) in self.staged.live_editions() {
            let Some(set_id) = data.publisher_set_id else {
                continue;
            };
            let Some((_, items)) = row_index(set_id).and_then(|i| self.staged.sets.get(i)) else {
                continue;
            };
            let members: Vec<Bbid> = serde_json::from_value(items.clone())
                .context("Failed to deserialize publisher set")?;
            if members.iter().any(|member| publishers.contains(member)) {
                found.push(*bbid);
            }
        }
        found.sort();
        Ok(found)
    }
}

#[async_trait::async_trait]
impl RevisionStore for MemoryTransaction {
    async fn create_revision(&mut self, author_id: EditorId, is_merge: bool) -> Result<Revision> {
        let revision = Revision {
            id: next_id(self.staged.revisions.len()),
            author_id,
            is_merge,
            created_at: Utc::now(),
        };
        self.staged.revisions.push(revision.clone());
        Ok(revision)
    }

    async fn get_revision(&mut self, id: RevisionId) -> Result<Option<Revision>> {
        Ok(row_index(id).and_then(|i| self.staged.revisions.get(i)).cloned())
    }

    async fn list_revisions(&mut self, offset: i64, limit: i64) -> Result<Vec<Revision>> {
        Ok(self
            .staged
            .revisions
            .iter()
            .sorted_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)))
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn add_revision_parents(&mut self, child: RevisionId, parents: &[RevisionId]) -> Result<()> {
        for parent in parents {
            if !self.staged.revision_parents.contains(&(*parent, child)) {
                self.staged.revision_parents.push((*parent, child));
            }
        }
        Ok(())
    }

    async fn get_revision_parents(&mut self, child: RevisionId) -> Result<Vec<RevisionId>> {
        Ok(self
            .staged
            .revision_parents
            .iter()
            .filter(|(_, c)| *c == child)
            .map(|(parent, _)| *parent)
            .sorted()
            .collect())
    }

    async fn insert_entity_revision(&mut self, entity_revision: &EntityRevision) -> Result<()> {
        let duplicate = self.staged.entity_revisions.iter().any(|er| {
            er.revision_id == entity_revision.revision_id && er.bbid == entity_revision.bbid
        });
        if duplicate {
            anyhow::bail!(
                "Entity revision already exists: {} / {}",
                entity_revision.revision_id,
                entity_revision.bbid
            );
        }
        self.staged.entity_revisions.push(entity_revision.clone());
        Ok(())
    }

    async fn get_entity_revision(
        &mut self,
        revision_id: RevisionId,
        bbid: &Bbid,
    ) -> Result<Option<EntityRevision>> {
        Ok(self
            .staged
            .entity_revisions
            .iter()
            .find(|er| er.revision_id == revision_id && &er.bbid == bbid)
            .cloned())
    }

    async fn list_entity_revisions_for_revision(
        &mut self,
        revision_id: RevisionId,
    ) -> Result<Vec<EntityRevision>> {
        Ok(self
            .staged
            .entity_revisions
            .iter()
            .filter(|er| er.revision_id == revision_id)
            .sorted_by_key(|er| er.bbid)
            .cloned()
            .collect())
    }

    async fn list_entity_revisions_for_entity(&mut self, bbid: &Bbid) -> Result<Vec<EntityRevision>> {
        Ok(self
            .staged
            .entity_revisions
            .iter()
            .filter(|er| &er.bbid == bbid)
            .sorted_by_key(|er| std::cmp::Reverse(er.revision_id))
            .cloned()
            .collect())
    }

    async fn flag_merge_entity_revisions(&mut self, revision_id: RevisionId, bbids: &[Bbid]) -> Result<()> {
        self.staged
            .entity_revisions
            .iter_mut()
            .filter(|er| er.revision_id == revision_id && bbids.contains(&er.bbid))
            .for_each(|er| er.is_merge = true);
        Ok(())
    }

    async fn clear_entity_revision_data(&mut self, revision_id: RevisionId, bbids: &[Bbid]) -> Result<()> {
        self.staged
            .entity_revisions
            .iter_mut()
            .filter(|er| er.revision_id == revision_id && bbids.contains(&er.bbid))
            .for_each(|er| er.data_id = None);
        Ok(())
    }

    async fn add_note(
        &mut self,
        author_id: EditorId,
        revision_id: RevisionId,
        content: &str,
    ) -> Result<Note> {
        let note = Note {
            id: next_id(self.staged.notes.len()),
            author_id,
            revision_id,
            content: content.to_string(),
            posted_at: Utc::now(),
        };
        self.staged.notes.push(note.clone());
        Ok(note)
    }

    async fn list_notes(&mut self, revision_id: RevisionId) -> Result<Vec<Note>> {
        Ok(self
            .staged
            .notes
            .iter()
            .filter(|note| note.revision_id == revision_id)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl SetStore for MemoryTransaction {
    async fn insert_set(&mut self, kind: SetKind, items: Value) -> Result<SetId> {
        self.staged.sets.push((kind, items));
        Ok(next_id(self.staged.sets.len() - 1))
    }

    async fn get_set(&mut self, id: SetId) -> Result<Option<Value>> {
        Ok(row_index(id)
            .and_then(|i| self.staged.sets.get(i))
            .map(|(_, items)| items.clone()))
    }

    async fn insert_annotation(&mut self, content: &str, revision_id: RevisionId) -> Result<Annotation> {
        let annotation = Annotation {
            id: next_id(self.staged.annotations.len()),
            content: content.to_string(),
            last_revision_id: revision_id,
        };
        self.staged.annotations.push(annotation.clone());
        Ok(annotation)
    }

    async fn get_annotation(&mut self, id: i64) -> Result<Option<Annotation>> {
        Ok(row_index(id).and_then(|i| self.staged.annotations.get(i)).cloned())
    }

    async fn insert_disambiguation(&mut self, comment: &str) -> Result<Disambiguation> {
        let disambiguation = Disambiguation {
            id: next_id(self.staged.disambiguations.len()),
            comment: comment.to_string(),
        };
        self.staged.disambiguations.push(disambiguation.clone());
        Ok(disambiguation)
    }

    async fn get_disambiguation(&mut self, id: i64) -> Result<Option<Disambiguation>> {
        Ok(row_index(id)
            .and_then(|i| self.staged.disambiguations.get(i))
            .cloned())
    }
}

#[async_trait::async_trait]
impl EditorStore for MemoryTransaction {
    async fn get_editor(&mut self, id: EditorId) -> Result<Option<Editor>> {
        Ok(self.staged.editors.get(&id).cloned())
    }

    async fn increment_edit_count(&mut self, id: EditorId) -> Result<()> {
        let editor = self
            .staged
            .editors
            .get_mut(&id)
            .with_context(|| format!("Editor not found: {}", id))?;
        editor.total_revisions += 1;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RedirectStore for MemoryTransaction {
    async fn insert_redirects(&mut self, sources: &[Bbid], target: &Bbid) -> Result<()> {
        for source in sources {
            if self.staged.redirects.contains_key(source) {
                anyhow::bail!("Redirect already exists for {}", source);
            }
            self.staged.redirects.insert(*source, *target);
        }
        Ok(())
    }

    async fn get_redirect(&mut self, source: &Bbid) -> Result<Option<Bbid>> {
        Ok(self.staged.redirects.get(source).copied())
    }
}

#[async_trait::async_trait]
impl LookupStore for MemoryTransaction {
    async fn get_label(&mut self, kind: LookupKind, id: i32) -> Result<Option<String>> {
        Ok(self.staged.lookups.get(&(kind, id)).cloned())
    }
}
