use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};

use crate::model::{Bbid, EntityType};
use crate::search::{SearchDocument, SearchIndex};

/// Document-store style HTTP index: `PUT`/`DELETE {url}/{index}/_doc/{bbid}`
#[derive(Debug, Clone)]
pub struct HttpSearchIndex {
    client: Client,
    base_url: String,
    index: String,
}

impl HttpSearchIndex {
    pub fn new(base_url: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            index: index.into(),
        }
    }

    fn document_url(&self, bbid: &Bbid) -> String {
        format!("{}/{}/_doc/{}", self.base_url, self.index, bbid)
    }
}

#[async_trait::async_trait]
impl SearchIndex for HttpSearchIndex {
    async fn index_entity(&self, document: &SearchDocument) -> Result<()> {
        let url = self.document_url(&document.bbid);
        self.client
            .put(&url)
            .json(document)
            .send()
            .await
            .with_context(|| format!("Failed to reach search index at {}", url))?
            .error_for_status()
            .with_context(|| format!("Search index rejected document {}", document.bbid))?;
        Ok(())
    }

    async fn delete_entity(&self, bbid: &Bbid, entity_type: EntityType) -> Result<()> {
        let url = self.document_url(bbid);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach search index at {}", url))?;

        // Removing a document that was never indexed is fine
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        response
            .error_for_status()
            .with_context(|| format!("Search index refused to delete {} {}", entity_type, bbid))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_document_url_trims_trailing_slash() {
        let index = HttpSearchIndex::new("http://localhost:9200/", "bookbrainz");
        let bbid = Uuid::nil();
        assert_eq!(
            index.document_url(&bbid),
            "http://localhost:9200/bookbrainz/_doc/00000000-0000-0000-0000-000000000000"
        );
    }
}
