//! Side effects that run after a transaction commits. They must never fail
//! the request that produced them, so errors stop here as warnings.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::model::{Bbid, EntityType};
use crate::search::{SearchDocument, SearchIndex};

#[derive(Debug, Clone)]
pub enum PostCommitEvent {
    IndexEntity(SearchDocument),
    RemoveEntities(Vec<(Bbid, EntityType)>),
}

/// Sending half held by request handlers
#[derive(Debug, Clone)]
pub struct PostCommitQueue {
    sender: mpsc::UnboundedSender<PostCommitEvent>,
}

impl PostCommitQueue {
    pub fn send(&self, event: PostCommitEvent) {
        if self.sender.send(event).is_err() {
            log::warn!("Post-commit worker has stopped; dropping event");
        }
    }
}

pub struct PostCommitWorker {
    receiver: mpsc::UnboundedReceiver<PostCommitEvent>,
    search: Arc<dyn SearchIndex>,
}

pub fn post_commit_channel(search: Arc<dyn SearchIndex>) -> (PostCommitQueue, PostCommitWorker) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        PostCommitQueue { sender },
        PostCommitWorker { receiver, search },
    )
}

impl PostCommitWorker {
    /// Process events until every queue handle is dropped
    pub async fn run(mut self) {
        while let Some(event) = self.receiver.recv().await {
            self.handle(event).await;
        }
        log::info!("Post-commit worker finished");
    }

    /// Process whatever is already queued, then return
    pub async fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.handle(event).await;
            handled += 1;
        }
        handled
    }

    async fn handle(&self, event: PostCommitEvent) {
        match event {
            PostCommitEvent::IndexEntity(document) => {
                if let Err(e) = self.search.index_entity(&document).await {
                    log::warn!(
                        "Failed to index {} {}: {:#}",
                        document.entity_type,
                        document.bbid,
                        e
                    );
                }
            }
            PostCommitEvent::RemoveEntities(entities) => {
                for (bbid, entity_type) in entities {
                    if let Err(e) = self.search.delete_entity(&bbid, entity_type).await {
                        log::warn!(
                            "Failed to remove {} {} from search: {:#}",
                            entity_type,
                            bbid,
                            e
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::generate_bbid;
    use crate::search::MemorySearchIndex;

    struct FailingIndex;

    #[async_trait::async_trait]
    impl SearchIndex for FailingIndex {
        async fn index_entity(&self, _document: &SearchDocument) -> anyhow::Result<()> {
            anyhow::bail!("index unavailable")
        }

        async fn delete_entity(&self, _bbid: &Bbid, _entity_type: EntityType) -> anyhow::Result<()> {
            anyhow::bail!("index unavailable")
        }
    }

    fn document(bbid: Bbid) -> SearchDocument {
        SearchDocument {
            bbid,
            entity_type: EntityType::Publisher,
            default_alias: Some("Ace".into()),
            aliases: vec!["Ace".into()],
            disambiguation: None,
        }
    }

    #[tokio::test]
    async fn test_index_then_remove() {
        let index = MemorySearchIndex::new();
        let (queue, mut worker) = post_commit_channel(Arc::new(index.clone()));
        let bbid = generate_bbid();

        queue.send(PostCommitEvent::IndexEntity(document(bbid)));
        assert_eq!(worker.drain().await, 1);
        assert!(index.contains(&bbid));

        queue.send(PostCommitEvent::RemoveEntities(vec![(bbid, EntityType::Publisher)]));
        worker.drain().await;
        assert!(!index.contains(&bbid));
    }

    #[tokio::test]
    async fn test_search_failures_are_swallowed() {
        let (queue, mut worker) = post_commit_channel(Arc::new(FailingIndex));
        let bbid = generate_bbid();
        queue.send(PostCommitEvent::IndexEntity(document(bbid)));
        queue.send(PostCommitEvent::RemoveEntities(vec![(bbid, EntityType::Publisher)]));
        assert_eq!(worker.drain().await, 2);
    }

    #[tokio::test]
    async fn test_run_stops_when_queue_dropped() {
        let index = MemorySearchIndex::new();
        let (queue, worker) = post_commit_channel(Arc::new(index.clone()));
        let bbid = generate_bbid();
        queue.send(PostCommitEvent::IndexEntity(document(bbid)));
        drop(queue);
        worker.run().await;
        assert!(index.contains(&bbid));
    }
}
