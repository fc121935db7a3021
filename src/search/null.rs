use anyhow::Result;

use crate::model::{Bbid, EntityType};
use crate::search::{SearchDocument, SearchIndex};

/// Search disabled; every call succeeds without doing anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSearchIndex;

#[async_trait::async_trait]
impl SearchIndex for NullSearchIndex {
    async fn index_entity(&self, _document: &SearchDocument) -> Result<()> {
        Ok(())
    }

    async fn delete_entity(&self, _bbid: &Bbid, _entity_type: EntityType) -> Result<()> {
        Ok(())
    }
}
