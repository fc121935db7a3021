pub mod deep_diff;
pub mod delete;
pub mod diff_format;
pub mod edit;
pub mod load;
pub mod merge;
pub mod relationships;
pub mod revision_diff;
pub mod sets;
pub mod snapshot;

pub use deep_diff::deep_diff;
pub use delete::{delete_entity, DeleteOutcome};
pub use diff_format::{display, format_changes, format_row};
pub use edit::{create_entity, edit_entity, EditOutcome};
pub use load::{entity_view, load_entity, resolve_redirect, LoadedEntity};
pub use merge::{merge_entities, validate_merge_queue};
pub use revision_diff::{add_revision_note, diff_revision, entity_history, recent_revisions};
pub use snapshot::snapshot;
