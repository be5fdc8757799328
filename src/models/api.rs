//! JSON bodies exchanged between the recovery client and the custodian.
//!
//! All byte fields travel as lowercase hex.

use serde::{Deserialize, Serialize};

/// `POST /session`
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub temp_public_key: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub id: String,
    pub public_key_enc: String,
}

/// `POST /share`
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UploadShareRequest {
    pub encrypted_share: String,
    pub session_id: String,
}

/// `GET /session/{id}/share`
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FetchShareResponse {
    pub encrypted_share: String,
    pub session_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self { status: "ok".to_string() }
    }
}

/// `GET /wallet/info`
#[derive(Serialize, Deserialize, Debug)]
pub struct CustodyInfoResponse {
    pub configured: bool,
}

/// Error body produced by `AppError::into_response`.
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub message: String,
}
