use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::{error, info};

use prospect_common::ProspectError;
use prospect_resolver::pipeline::{validate_batch_size, DEFAULT_BATCH};

use crate::auth::AuthCaller;
use crate::AppState;

/// `ProspectError` rendered as `{ "success": false, "error": ... }`.
pub struct ApiError(pub ProspectError);

impl From<ProspectError> for ApiError {
    fn from(e: ProspectError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            ProspectError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            ProspectError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.0.to_string()),
            ProspectError::RateLimitExceeded { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, self.0.to_string())
            }
            ProspectError::Database(_) | ProspectError::Config(_) | ProspectError::Anyhow(_) => {
                error!(error = %self.0, "Contact resolution failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };
        (
            status,
            Json(serde_json::json!({ "success": false, "error": message })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub max_companies: Option<i64>,
}

/// POST /api/contacts/resolve
pub async fn api_resolve_contacts(
    State(state): State<Arc<AppState>>,
    caller: AuthCaller,
    body: Result<Json<ResolveRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(|e| ProspectError::InvalidRequest(e.body_text()))?;
    let max_companies = match request.max_companies {
        Some(n) => validate_batch_size(n)?,
        None => DEFAULT_BATCH,
    };

    info!(caller = caller.caller_id.as_str(), max_companies, "Contact resolution requested");
    let report = state
        .pipeline
        .run_batch(&caller.caller_id, max_companies)
        .await?;

    Ok(Json(report).into_response())
}
