use crate::domain::models::CrisisEscalation;
use crate::state::SharedState;
use crate::web::session::AdminSession;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/crisis-escalations", get(list_open_escalations))
        .with_state(state)
}

/// Open escalations, newest first. Lets admins find cases whose alerts never arrived.
async fn list_open_escalations(
    AdminSession(admin_id): AdminSession,
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CrisisEscalation>>, StatusCode> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let escalations = state
        .escalations
        .store()
        .open_escalations(limit)
        .await
        .map_err(|e| {
            tracing::error!(admin_id = %admin_id, "Failed to load open escalations: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(escalations))
}
