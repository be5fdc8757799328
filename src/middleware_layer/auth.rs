use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, state::AppState};

/// Extracts the bearer token from the `Authorization` header.
fn extract_bearer_token(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

/// A middleware that requires a verified bearer token.
///
/// On success the request carries the caller's [`Subject`](crate::services::identity::Subject)
/// as an extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    tracing::debug!("🔐 Checking authentication...");

    let token = extract_bearer_token(&request).ok_or_else(|| {
        tracing::warn!("❌ No bearer token found");
        AppError::Unauthorized
    })?;

    let subject = state.verifier.verify(&token).await?;
    tracing::debug!("✅ User authenticated: {}", subject.as_str());

    request.extensions_mut().insert(subject);

    Ok(next.run(request).await)
}
