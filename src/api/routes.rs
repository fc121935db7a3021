use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::api::handlers::{self, AppState};
use crate::api::{entity_handlers, merge_handlers, revision_handlers};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Merge queue
        .route("/merge/queue", get(merge_handlers::get_merge_queue::<S>))
        .route("/merge/queue", delete(merge_handlers::clear_merge_queue::<S>))
        .route("/merge/add/:bbid", post(merge_handlers::add_to_merge_queue::<S>))
        .route(
            "/merge/remove/:bbid",
            post(merge_handlers::remove_from_merge_queue::<S>),
        )
        // Revisions
        .route("/revisions", get(revision_handlers::recent_revisions::<S>))
        .route("/revision/:id", get(revision_handlers::revision_page::<S>))
        .route(
            "/revision/:id/changes",
            get(revision_handlers::revision_changes::<S>),
        )
        .route(
            "/revision/:id/note",
            post(revision_handlers::add_revision_note::<S>),
        )
        // Entities
        .route(
            "/:entity_type/create",
            post(entity_handlers::create_entity::<S>),
        )
        .route("/:entity_type/:bbid", get(entity_handlers::get_entity::<S>))
        .route(
            "/:entity_type/:bbid/edit",
            post(entity_handlers::edit_entity::<S>),
        )
        .route(
            "/:entity_type/:bbid/delete",
            post(entity_handlers::delete_entity::<S>),
        )
        .route(
            "/:entity_type/:bbid/merge",
            post(entity_handlers::merge_entity::<S>),
        )
        .route(
            "/:entity_type/:bbid/revisions",
            get(entity_handlers::entity_revisions::<S>),
        )
        .layer(TraceLayer::new_for_http())
}
