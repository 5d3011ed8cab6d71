pub mod admin;
pub mod crisis;
pub mod session;

use crate::state::SharedState;
use axum::{routing::get, Router};

async fn health() -> &'static str {
    "OK"
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(crisis::router(state.clone()))
        .nest("/admin", admin::router(state))
}
