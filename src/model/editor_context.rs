use serde::{Deserialize, Serialize};

use crate::model::EditorId;

/// The editor on whose behalf a request runs, taken from request headers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorContext {
    pub editor_id: EditorId,
    pub editor_name: Option<String>,
}

impl EditorContext {
    pub fn new(editor_id: EditorId) -> Self {
        Self {
            editor_id,
            editor_name: None,
        }
    }

    pub fn with_name(editor_id: EditorId, name: Option<String>) -> Self {
        Self {
            editor_id,
            editor_name: name,
        }
    }
}
