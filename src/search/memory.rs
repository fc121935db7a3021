use anyhow::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{Bbid, EntityType};
use crate::search::{SearchDocument, SearchIndex};

/// In-process index keyed by BBID. Clones share the same documents.
#[derive(Debug, Clone, Default)]
pub struct MemorySearchIndex {
    documents: Arc<RwLock<HashMap<Bbid, SearchDocument>>>,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, bbid: &Bbid) -> Option<SearchDocument> {
        self.documents.read().get(bbid).cloned()
    }

    pub fn contains(&self, bbid: &Bbid) -> bool {
        self.documents.read().contains_key(bbid)
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

#[async_trait::async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn index_entity(&self, document: &SearchDocument) -> Result<()> {
        self.documents
            .write()
            .insert(document.bbid, document.clone());
        Ok(())
    }

    async fn delete_entity(&self, bbid: &Bbid, _entity_type: EntityType) -> Result<()> {
        self.documents.write().remove(bbid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::generate_bbid;

    #[tokio::test]
    async fn test_index_and_delete() {
        let index = MemorySearchIndex::new();
        let bbid = generate_bbid();
        let document = SearchDocument {
            bbid,
            entity_type: EntityType::Author,
            default_alias: Some("Ursula K. Le Guin".into()),
            aliases: vec!["Ursula K. Le Guin".into()],
            disambiguation: None,
        };

        index.index_entity(&document).await.unwrap();
        assert_eq!(index.get(&bbid), Some(document));

        index.delete_entity(&bbid, EntityType::Author).await.unwrap();
        assert!(index.is_empty());
    }
}
