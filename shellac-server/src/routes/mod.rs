use axum::{
    Router,
    routing::{get, post},
};

use crate::{handlers::albums, infra::app_state::AppState};

/// Assemble the catalog routes. Method enforcement (405 + `Allow`) comes from
/// the router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/album", get(albums::show_album))
        .route("/like", post(albums::add_like))
        .route("/popular", get(albums::list_popular))
        .with_state(state)
}
