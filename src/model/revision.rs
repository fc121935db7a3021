use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Bbid, DataId, EditorId, EntityType, RevisionId};

/// An immutable edit event. Parents form a DAG so merges can have several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub id: RevisionId,
    pub author_id: EditorId,
    pub is_merge: bool,
    pub created_at: DateTime<Utc>,
}

/// Links a revision to one entity's data at that revision.
/// A `data_id` of None marks the entity as deleted (or merged away).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRevision {
    pub revision_id: RevisionId,
    pub bbid: Bbid,
    pub data_id: Option<DataId>,
    pub is_merge: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Editor {
    pub id: EditorId,
    pub name: String,
    pub total_revisions: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub author_id: EditorId,
    pub revision_id: RevisionId,
    pub content: String,
    pub posted_at: DateTime<Utc>,
}

/// Permanent pointer from a merged-away entity to the entity it was merged into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Redirect {
    pub source_bbid: Bbid,
    pub target_bbid: Bbid,
}

/// One row of an entity's history
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityHistoryEntry {
    pub revision: Revision,
    pub notes: Vec<Note>,
    pub deleted: bool,
    pub is_merge: bool,
}

/// Entities touched by a revision, as listed in the recent revisions feed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionSummary {
    pub revision: Revision,
    pub entities: Vec<RevisionEntity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionEntity {
    pub bbid: Bbid,
    pub entity_type: EntityType,
    pub deleted: bool,
}
