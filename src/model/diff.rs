use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Bbid, EntityType, RevisionId};

/// A structural change between two entity snapshots. Paths locate the
/// changed field; array indices are rendered as decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Change {
    #[serde(rename = "N")]
    New { path: Vec<String>, rhs: Value },
    #[serde(rename = "D")]
    Deleted { path: Vec<String>, lhs: Value },
    #[serde(rename = "E")]
    Edited {
        path: Vec<String>,
        lhs: Value,
        rhs: Value,
    },
    /// An element appended to or removed from the array at `path`
    #[serde(rename = "A")]
    Array {
        path: Vec<String>,
        index: usize,
        item: ArrayItem,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ArrayItem {
    #[serde(rename = "N")]
    New { rhs: Value },
    #[serde(rename = "D")]
    Deleted { lhs: Value },
}

impl Change {
    pub fn path(&self) -> &[String] {
        match self {
            Change::New { path, .. }
            | Change::Deleted { path, .. }
            | Change::Edited { path, .. }
            | Change::Array { path, .. } => path,
        }
    }

    /// The row kind and old/new sides this change contributes. Array changes
    /// report their item's kind.
    pub fn sides(&self) -> (RowKind, Option<&Value>, Option<&Value>) {
        match self {
            Change::New { rhs, .. } => (RowKind::New, None, Some(rhs)),
            Change::Deleted { lhs, .. } => (RowKind::Deleted, Some(lhs), None),
            Change::Edited { lhs, rhs, .. } => (RowKind::Edited, Some(lhs), Some(rhs)),
            Change::Array { item, .. } => match item {
                ArrayItem::New { rhs } => (RowKind::New, None, Some(rhs)),
                ArrayItem::Deleted { lhs } => (RowKind::Deleted, Some(lhs), None),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowKind {
    #[serde(rename = "N")]
    New,
    #[serde(rename = "D")]
    Deleted,
    #[serde(rename = "E")]
    Edited,
}

/// A human-readable line of a revision diff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffRow {
    pub kind: RowKind,
    pub label: String,
    pub old_values: Option<Vec<String>>,
    pub new_values: Option<Vec<String>>,
}

/// Formatted changes for one entity touched by a revision
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDiff {
    pub bbid: Bbid,
    pub entity_type: EntityType,
    pub default_alias: Option<String>,
    pub changes: Vec<DiffRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionDiff {
    pub revision: crate::model::Revision,
    pub parent_ids: Vec<RevisionId>,
    pub notes: Vec<crate::model::Note>,
    pub diffs: Vec<EntityDiff>,
}
