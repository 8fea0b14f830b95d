pub mod config;
pub mod coordinator;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

use crate::state::AppState;

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, _api) = routes::api_routes().split_for_parts();
    axum::Router::new().nest("/api", router).with_state(state)
}
