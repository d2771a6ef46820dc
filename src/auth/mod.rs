//! Admin-token authentication and actor identity.
//!
//! Implements constant-time comparison to mitigate timing attacks.

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;

/// Header name for the admin token.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Header carrying the display name of whoever performs a write.
pub const ACTOR_HEADER: &str = "x-actor";

/// Actor recorded in audit events when the caller does not identify itself.
pub const UNKNOWN_ACTOR: &str = "Unknown";

/// Admin token layer function that takes the expected token as a parameter.
pub async fn admin_auth_layer(
    expected_token: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // If no token is configured, allow all requests (dev mode)
    let Some(expected) = expected_token else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    match provided {
        Some(provided_token) => {
            if constant_time_compare(&provided_token, &expected) {
                next.run(request).await
            } else {
                unauthorized_response("Invalid admin token")
            }
        }
        None => {
            // Also accept the token as a bearer credential
            let bearer = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
                .map(|s| s.to_string());

            match bearer {
                Some(bearer_token) if constant_time_compare(&bearer_token, &expected) => {
                    next.run(request).await
                }
                _ => unauthorized_response("Missing or invalid admin token"),
            }
        }
    }
}

/// Resolve the audit actor from request headers.
pub fn actor_from_headers(headers: &HeaderMap) -> String {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|actor| !actor.is_empty())
        .unwrap_or(UNKNOWN_ACTOR)
        .to_string()
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn unauthorized_response(message: &str) -> Response {
    AppError::Unauthorized(message.to_string()).into_response()
}
