use crate::domain::escalation::{CrisisReport, EscalationError, EscalationResult};
use crate::state::SharedState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

pub fn router(state: SharedState) -> Router {
    // Called from several first-party front-ends; any origin may post.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/crisis-escalation", post(report_crisis))
        .layer(cors)
        .with_state(state)
}

impl IntoResponse for EscalationError {
    fn into_response(self) -> Response {
        let status = match &self {
            EscalationError::Validation(_) => StatusCode::BAD_REQUEST,
            EscalationError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn report_crisis(
    State(state): State<SharedState>,
    payload: Result<Json<CrisisReport>, JsonRejection>,
) -> Result<Json<EscalationResult>, EscalationError> {
    let Json(report) = payload.map_err(|e| {
        tracing::warn!("Rejected crisis report body: {}", e.body_text());
        EscalationError::Validation(e.body_text())
    })?;

    let result = state.escalations.report_crisis(report).await?;
    Ok(Json(result))
}
