use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
    response::{IntoResponse, Response},
};
use tracing::debug;

use prospect_common::ProspectError;

use crate::rest::ApiError;
use crate::AppState;

/// Authenticated caller, from `Authorization: Bearer <jwt>`.
/// Missing or invalid tokens are rejected with a 401 JSON body.
pub struct AuthCaller {
    pub caller_id: String,
}

impl FromRequestParts<Arc<AppState>> for AuthCaller {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| unauthorized("missing bearer token"))?;

        let claims = state.jwt.verify_token(token).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            unauthorized("invalid or expired token")
        })?;

        if claims.sub.trim().is_empty() {
            return Err(unauthorized("token has no subject"));
        }

        Ok(AuthCaller {
            caller_id: claims.sub,
        })
    }
}

/// Token part of a `Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn unauthorized(message: &str) -> Response {
    ApiError(ProspectError::Unauthorized(message.to_string())).into_response()
}
