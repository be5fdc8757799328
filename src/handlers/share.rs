use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};

use crate::{
    error::Result,
    models::api::{CustodyInfoResponse, FetchShareResponse, StatusResponse, UploadShareRequest},
    services::identity::Subject,
    state::AppState,
    validation::{
        extract::{JsonBody, PathParam},
        request::{decode_ciphertext, parse_session_id},
    },
};

/// Takes custody of the caller's share.
#[axum::debug_handler]
pub async fn upload_share(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    JsonBody(payload): JsonBody<UploadShareRequest>,
) -> Result<Response> {
    tracing::info!("📥 Share upload by user {}", subject.as_str());

    let session_id = parse_session_id(&payload.session_id)?;
    let ciphertext = decode_ciphertext(&payload.encrypted_share)?;

    state
        .custodian
        .receive_share(subject.as_str(), session_id, &ciphertext)
        .await?;

    Ok((StatusCode::OK, Json(StatusResponse::ok())).into_response())
}

/// Returns the caller's share sealed for the given session.
#[axum::debug_handler]
pub async fn fetch_share(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    PathParam(session_id): PathParam<String>,
) -> Result<Response> {
    tracing::info!("📤 Share fetch by user {}", subject.as_str());

    let session_id = parse_session_id(&session_id)?;
    let ciphertext = state
        .custodian
        .deliver_share(subject.as_str(), session_id)
        .await?;

    let response = FetchShareResponse {
        encrypted_share: hex::encode(ciphertext),
        session_id: session_id.to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Erases the caller's custodied share.
#[axum::debug_handler]
pub async fn reset_custody(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
) -> Result<Response> {
    tracing::info!("🗑️ Custody reset requested by user {}", subject.as_str());

    state.custodian.reset_custody(subject.as_str()).await?;

    Ok((StatusCode::OK, Json(StatusResponse::ok())).into_response())
}

/// Reports whether the caller has a share in custody.
#[axum::debug_handler]
pub async fn custody_info(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
) -> Result<Response> {
    let configured = state.custodian.custody_status(subject.as_str()).await?;

    Ok((StatusCode::OK, Json(CustodyInfoResponse { configured })).into_response())
}
