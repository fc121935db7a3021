//! Search index collaborator. Indexing is best effort: callers log
//! failures and carry on.

pub mod http;
pub mod memory;
pub mod null;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::model::{Bbid, EntityType, EntityView};

pub use http::HttpSearchIndex;
pub use memory::MemorySearchIndex;
pub use null::NullSearchIndex;

/// What the search index knows about an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocument {
    pub bbid: Bbid,
    pub entity_type: EntityType,
    pub default_alias: Option<String>,
    pub aliases: Vec<String>,
    pub disambiguation: Option<String>,
}

impl SearchDocument {
    pub fn from_view(view: &EntityView) -> Self {
        let content = view.content.as_ref();
        Self {
            bbid: view.bbid,
            entity_type: view.entity_type,
            default_alias: view.default_alias.as_ref().map(|alias| alias.name.clone()),
            aliases: content
                .map(|content| content.aliases.iter().map(|a| a.name.clone()).collect())
                .unwrap_or_default(),
            disambiguation: content.and_then(|content| content.disambiguation.clone()),
        }
    }
}

#[async_trait::async_trait]
pub trait SearchIndex: Send + Sync {
    async fn index_entity(&self, document: &SearchDocument) -> Result<()>;
    async fn delete_entity(&self, bbid: &Bbid, entity_type: EntityType) -> Result<()>;
}
