pub mod editor_extractor;
pub mod entity_handlers;
pub mod handlers;
pub mod merge_handlers;
pub mod revision_handlers;
pub mod routes;
