use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};

use crate::{
    error::Result,
    models::api::{CreateSessionRequest, CreateSessionResponse},
    services::identity::Subject,
    state::AppState,
    validation::{extract::JsonBody, request::decode_public_key},
};

/// Opens a key-agreement session for the caller.
#[axum::debug_handler]
pub async fn create_session(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    JsonBody(payload): JsonBody<CreateSessionRequest>,
) -> Result<Response> {
    tracing::info!("🤝 Session requested by user {}", subject.as_str());

    let peer_public_key = decode_public_key(&payload.temp_public_key)?;
    let created = state
        .sessions
        .create_session(subject.as_str(), &peer_public_key)
        .await?;

    let response = CreateSessionResponse {
        id: created.session_id.to_string(),
        public_key_enc: hex::encode(created.server_public_key),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}
