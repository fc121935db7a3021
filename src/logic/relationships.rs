use itertools::Itertools;
use std::collections::BTreeMap;

use crate::error::{RevisionError, RevisionResult};
use crate::model::{Bbid, Relationship, SetId, SetKind};
use crate::store::Transaction;

use super::load::load_entity;
use super::sets::{load_items, next_set};

/// New relationship set ids for every entity at either end of an added or
/// removed relationship. Empty when the relationships did not change.
///
/// `current` is the edited entity's stored relationships and `proposed` the
/// full replacement; every proposed relationship must involve `bbid`.
pub async fn next_relationship_sets(
    tx: &mut dyn Transaction,
    bbid: Bbid,
    current_set: Option<SetId>,
    current: &[Relationship],
    proposed: &[Relationship],
) -> RevisionResult<BTreeMap<Bbid, Option<SetId>>> {
    for relationship in proposed {
        if !relationship.involves(&bbid) {
            return Err(RevisionError::conflict(format!(
                "Relationship {} -> {} does not involve {}",
                relationship.source_bbid, relationship.target_bbid, bbid
            )));
        }
        if relationship.source_bbid == relationship.target_bbid {
            return Err(RevisionError::conflict(format!(
                "Entity {} cannot be related to itself",
                bbid
            )));
        }
    }

    let proposed: Vec<Relationship> = proposed.iter().unique().cloned().collect();
    let added: Vec<Relationship> = proposed
        .iter()
        .filter(|r| !current.contains(r))
        .cloned()
        .collect();
    let removed: Vec<Relationship> = current
        .iter()
        .filter(|r| !proposed.contains(r))
        .cloned()
        .collect();

    if added.is_empty() && removed.is_empty() {
        return Ok(BTreeMap::new());
    }

    let affected: Vec<Bbid> = added
        .iter()
        .chain(removed.iter())
        .flat_map(|r| [r.source_bbid, r.target_bbid])
        .unique()
        .sorted()
        .collect();

    let mut sets = BTreeMap::new();
    for other in affected {
        let (other_set, other_current) = if other == bbid {
            (current_set, current.to_vec())
        } else {
            let entity = load_entity(tx, &other)
                .await?
                .ok_or_else(|| RevisionError::not_found(format!("Related entity {}", other)))?;
            let Some(data) = entity.data else {
                if added.iter().any(|r| r.involves(&other)) {
                    return Err(RevisionError::conflict(format!(
                        "Cannot add a relationship to deleted entity {}",
                        other
                    )));
                }
                continue;
            };
            let items: Vec<Relationship> = load_items(tx, data.relationship_set_id).await?;
            (data.relationship_set_id, items)
        };

        let next: Vec<Relationship> = other_current
            .into_iter()
            .filter(|r| !removed.contains(r))
            .chain(added.iter().filter(|r| r.involves(&other)).cloned())
            .unique()
            .collect();

        let next_id = next_set(tx, SetKind::Relationship, other_set, &next).await?;
        sets.insert(other, next_id);
    }

    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::generate_bbid;
    use crate::store::{MemoryStore, Store};

    fn link(source: Bbid, target: Bbid) -> Relationship {
        Relationship {
            type_id: 8,
            source_bbid: source,
            target_bbid: target,
        }
    }

    #[tokio::test]
    async fn test_unchanged_relationships_touch_nothing() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let bbid = generate_bbid();

        let sets = next_relationship_sets(tx.as_mut(), bbid, None, &[], &[])
            .await
            .unwrap();
        assert!(sets.is_empty());
    }

    #[tokio::test]
    async fn test_relationship_not_involving_entity_is_rejected() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let bbid = generate_bbid();
        let stranger = link(generate_bbid(), generate_bbid());

        let err = next_relationship_sets(tx.as_mut(), bbid, None, &[], &[stranger])
            .await
            .unwrap_err();
        assert!(matches!(err, RevisionError::ValidationConflict(_)));
    }

    #[tokio::test]
    async fn test_missing_related_entity_is_not_found() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let bbid = generate_bbid();
        let proposed = link(bbid, generate_bbid());

        let err = next_relationship_sets(tx.as_mut(), bbid, None, &[], &[proposed])
            .await
            .unwrap_err();
        assert!(matches!(err, RevisionError::NotFound(_)));
    }
}
