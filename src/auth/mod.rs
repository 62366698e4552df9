//! Shared-secret authentication for the admin routes.
//!
//! Implements constant-time comparison to mitigate timing attacks.

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;

/// Header name for the admin password.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Admin authentication layer function that takes the expected password as a parameter.
pub async fn admin_auth_layer(
    expected_password: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // If no password is configured, allow all requests (dev mode)
    let Some(expected) = expected_password else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
        .map(|s| s.to_string());

    match provided {
        Some(key) if constant_time_compare(&key, &expected) => next.run(request).await,
        Some(_) => {
            tracing::warn!("Rejected admin request with wrong password");
            AppError::Unauthorized("Incorrect admin password".to_string()).into_response()
        }
        None => AppError::Unauthorized("Missing admin password".to_string()).into_response(),
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
