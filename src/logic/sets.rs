use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};

use crate::model::{RevisionId, SetId, SetKind};
use crate::store::{SetStore, Transaction};

/// Items of a stored set; a missing set has no items
pub async fn load_items<T: DeserializeOwned>(
    tx: &mut dyn Transaction,
    id: Option<SetId>,
) -> Result<Vec<T>> {
    let Some(id) = id else {
        return Ok(Vec::new());
    };
    let items = tx
        .get_set(id)
        .await?
        .with_context(|| format!("Set not found: {}", id))?;
    serde_json::from_value(items).with_context(|| format!("Failed to deserialize set {}", id))
}

/// Id of the set holding `items`. Reuses `current` when its items are
/// unchanged; an empty item list is no set at all.
pub async fn next_set<T>(
    tx: &mut dyn Transaction,
    kind: SetKind,
    current: Option<SetId>,
    items: &[T],
) -> Result<Option<SetId>>
where
    T: Serialize + DeserializeOwned + PartialEq + Sync,
{
    if items.is_empty() {
        return Ok(None);
    }

    if current.is_some() {
        let existing: Vec<T> = load_items(tx, current).await?;
        if existing.as_slice() == items {
            return Ok(current);
        }
    }

    let value = serde_json::to_value(items)
        .with_context(|| format!("Failed to serialize {} set", kind.as_str()))?;
    let id = tx.insert_set(kind, value).await?;
    Ok(Some(id))
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|text| !text.is_empty())
}

/// Annotations are stamped with the revision that last changed them
pub async fn next_annotation(
    tx: &mut dyn Transaction,
    current: Option<i64>,
    content: Option<&str>,
    revision_id: RevisionId,
) -> Result<Option<i64>> {
    let Some(content) = non_blank(content) else {
        return Ok(None);
    };

    if let Some(id) = current {
        if let Some(existing) = tx.get_annotation(id).await? {
            if existing.content == content {
                return Ok(Some(id));
            }
        }
    }

    let annotation = tx.insert_annotation(content, revision_id).await?;
    Ok(Some(annotation.id))
}

pub async fn next_disambiguation(
    tx: &mut dyn Transaction,
    current: Option<i64>,
    comment: Option<&str>,
) -> Result<Option<i64>> {
    let Some(comment) = non_blank(comment) else {
        return Ok(None);
    };

    if let Some(id) = current {
        if let Some(existing) = tx.get_disambiguation(id).await? {
            if existing.comment == comment {
                return Ok(Some(id));
            }
        }
    }

    let disambiguation = tx.insert_disambiguation(comment).await?;
    Ok(Some(disambiguation.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Identifier;
    use crate::store::{MemoryStore, Store};

    fn isbn(value: &str) -> Identifier {
        Identifier {
            type_id: 9,
            value: value.to_string(),
        }
    }

    #[tokio::test]
    async fn test_unchanged_items_reuse_the_current_set() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let first = next_set(tx.as_mut(), SetKind::Identifier, None, &[isbn("1")])
            .await
            .unwrap();
        assert!(first.is_some());

        let same = next_set(tx.as_mut(), SetKind::Identifier, first, &[isbn("1")])
            .await
            .unwrap();
        assert_eq!(same, first);

        let changed = next_set(tx.as_mut(), SetKind::Identifier, first, &[isbn("2")])
            .await
            .unwrap();
        assert_ne!(changed, first);

        let loaded: Vec<Identifier> = load_items(tx.as_mut(), changed).await.unwrap();
        assert_eq!(loaded, vec![isbn("2")]);
    }

    #[tokio::test]
    async fn test_empty_items_clear_the_set() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let first = next_set(tx.as_mut(), SetKind::Identifier, None, &[isbn("1")])
            .await
            .unwrap();
        let cleared = next_set::<Identifier>(tx.as_mut(), SetKind::Identifier, first, &[])
            .await
            .unwrap();
        assert_eq!(cleared, None);
    }

    #[tokio::test]
    async fn test_annotation_is_restamped_only_when_content_changes() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let id = next_annotation(tx.as_mut(), None, Some("First"), 1).await.unwrap();
        let kept = next_annotation(tx.as_mut(), id, Some("  First "), 2).await.unwrap();
        assert_eq!(kept, id);

        let changed = next_annotation(tx.as_mut(), id, Some("Second"), 3)
            .await
            .unwrap()
            .unwrap();
        let annotation = tx.get_annotation(changed).await.unwrap().unwrap();
        assert_eq!(annotation.last_revision_id, 3);

        assert_eq!(next_annotation(tx.as_mut(), id, Some(" "), 4).await.unwrap(), None);
    }
}
