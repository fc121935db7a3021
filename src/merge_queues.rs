use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{Bbid, EditorId, EntityType, MergeQueue};

/// Per-editor merge queues, held in process memory
#[derive(Debug, Clone, Default)]
pub struct MergeQueueRegistry {
    queues: Arc<Mutex<HashMap<EditorId, MergeQueue>>>,
}

impl MergeQueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, editor_id: EditorId) -> Option<MergeQueue> {
        self.queues.lock().get(&editor_id).cloned()
    }

    /// Add an entity to the editor's queue. An entity of a different type
    /// starts a fresh queue.
    pub fn add(&self, editor_id: EditorId, bbid: Bbid, entity_type: EntityType) -> MergeQueue {
        let mut queues = self.queues.lock();
        let queue = queues
            .entry(editor_id)
            .or_insert_with(|| MergeQueue::new(entity_type));
        if queue.entity_type != entity_type {
            *queue = MergeQueue::new(entity_type);
        }
        queue.merging.insert(bbid);
        queue.clone()
    }

    /// Remove an entity; an emptied queue is dropped
    pub fn remove(&self, editor_id: EditorId, bbid: &Bbid) -> Option<MergeQueue> {
        let mut queues = self.queues.lock();
        let queue = queues.get_mut(&editor_id)?;
        queue.merging.remove(bbid);
        if queue.merging.is_empty() {
            queues.remove(&editor_id);
            return None;
        }
        Some(queue.clone())
    }

    pub fn clear(&self, editor_id: EditorId) {
        self.queues.lock().remove(&editor_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::generate_bbid;

    #[test]
    fn test_add_and_remove() {
        let registry = MergeQueueRegistry::new();
        let (a, b) = (generate_bbid(), generate_bbid());

        registry.add(1, a, EntityType::Work);
        let queue = registry.add(1, b, EntityType::Work);
        assert_eq!(queue.merging.len(), 2);
        assert!(registry.get(2).is_none());

        let queue = registry.remove(1, &a).unwrap();
        assert!(!queue.contains(&a));
        assert!(registry.remove(1, &b).is_none());
        assert!(registry.get(1).is_none());
    }

    #[test]
    fn test_other_type_replaces_queue() {
        let registry = MergeQueueRegistry::new();
        let (work, author) = (generate_bbid(), generate_bbid());

        registry.add(1, work, EntityType::Work);
        let queue = registry.add(1, author, EntityType::Author);
        assert_eq!(queue.entity_type, EntityType::Author);
        assert_eq!(queue.merging.len(), 1);
        assert!(queue.contains(&author));

        registry.clear(1);
        assert!(registry.get(1).is_none());
    }
}
