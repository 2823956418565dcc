pub mod endpoint;
pub mod entities;
pub mod error;
pub mod extract;
pub mod pagination;
pub mod principals;
pub mod records;
pub mod relations;
pub mod resources;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::routing::{delete, get, post};
use axum::Router;

/// Builds the JSON RPC surface: one handler per spec.md §6 endpoint, laid
/// out as a conventional REST-ish tree over the same operations, wrapped in
/// the teacher's `TraceLayer` so every request gets a structured log span.
pub fn build_router(state: AppState) -> Router<()> {
    let router = Router::new()
        .route("/principals", post(principals::create))
        .route(
            "/principals/:id",
            get(principals::retrieve)
                .put(principals::update)
                .delete(principals::delete),
        )
        .route(
            "/principals/:id/children",
            get(principals::list_children),
        )
        .route(
            "/records",
            post(records::grant)
                .delete(records::revoke)
                .get(records::list_by_principal),
        )
        .route("/records/check", get(records::check))
        .route("/records/by-resource", get(records::list_by_resource))
        .route("/relations", post(relations::create))
        .route("/relations/:id", delete(relations::delete))
        .route("/relations/check", post(relations::check))
        .route("/relations/left", get(relations::list_left))
        .route("/relations/right", get(relations::list_right))
        .route("/resources", get(resources::list))
        .route("/resources/principals", get(resources::list_principals))
        .route("/entities", get(entities::list))
        .route("/entities/principals", get(entities::list_principals))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state);

    router
}
