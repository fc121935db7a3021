use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::{Bbid, EntityType};

/// Entities an editor has lined up to merge. All share one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeQueue {
    pub entity_type: EntityType,
    pub merging: BTreeSet<Bbid>,
}

impl MergeQueue {
    pub fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            merging: BTreeSet::new(),
        }
    }

    pub fn contains(&self, bbid: &Bbid) -> bool {
        self.merging.contains(bbid)
    }

    /// Queue members other than the entity they are merged into
    pub fn merged_away(&self, survivor: &Bbid) -> Vec<Bbid> {
        self.merging
            .iter()
            .filter(|bbid| *bbid != survivor)
            .copied()
            .collect()
    }
}
