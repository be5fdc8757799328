use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
///
/// Every variant carries a stable machine-readable kind (see [`AppError::kind`])
/// which is the only thing surfaced across the trust boundary besides a fixed
/// public message.
#[derive(Error, Debug)]
pub enum AppError {
    /// The session id is unknown, or belongs to another subject.
    #[error("Session not found")]
    SessionNotFound,

    /// The session was already used for an upload or a fetch.
    #[error("Session already consumed")]
    SessionConsumed,

    /// The subject already has a share in custody.
    #[error("A share is already in custody for this user")]
    DuplicateShare,

    /// The subject has no share in custody.
    #[error("No share in custody for this user")]
    NoShare,

    /// A public or private key could not be decoded.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// A ciphertext was malformed or failed to decrypt.
    #[error("Cipher error: {0}")]
    Cipher(String),

    /// The record store is unavailable or rejected the operation.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The bearer token is missing or invalid.
    #[error("Unauthorized")]
    Unauthorized,

    /// A request field failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Splitting or combining shares failed.
    #[error("Secret sharing error: {0}")]
    Sharing(String),

    /// The local device holds no share for the account.
    #[error("No device share on file")]
    DeviceShareMissing,

    /// The remote custodian could not be reached or answered garbage.
    #[error("Transport error: {0}")]
    Transport(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// The stable, machine-readable kind of this error.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::SessionNotFound => "session_not_found",
            AppError::SessionConsumed => "session_consumed",
            AppError::DuplicateShare => "duplicate_share",
            AppError::NoShare => "no_share",
            AppError::InvalidKey(_) => "invalid_key",
            AppError::Cipher(_) => "cipher_error",
            AppError::Persistence(_) => "persistence_error",
            AppError::Unauthorized => "unauthorized",
            AppError::Validation(_) => "validation_error",
            AppError::Sharing(_) => "sharing_error",
            AppError::DeviceShareMissing => "device_share_missing",
            AppError::Transport(_) => "transport_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Rebuilds an error from a kind received over the wire.
    ///
    /// Unknown kinds become [`AppError::Transport`].
    pub fn from_kind(kind: &str, message: String) -> Self {
        match kind {
            "session_not_found" => AppError::SessionNotFound,
            "session_consumed" => AppError::SessionConsumed,
            "duplicate_share" => AppError::DuplicateShare,
            "no_share" => AppError::NoShare,
            "invalid_key" => AppError::InvalidKey(message),
            "cipher_error" => AppError::Cipher(message),
            "persistence_error" => AppError::Persistence(message),
            "unauthorized" => AppError::Unauthorized,
            "validation_error" => AppError::Validation(message),
            "sharing_error" => AppError::Sharing(message),
            "device_share_missing" => AppError::DeviceShareMissing,
            "internal_error" => AppError::Internal(message),
            other => AppError::Transport(format!("unexpected error kind '{}': {}", other, message)),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::SessionNotFound | AppError::NoShare | AppError::DeviceShareMissing => {
                StatusCode::NOT_FOUND
            }
            AppError::SessionConsumed | AppError::DuplicateShare => StatusCode::CONFLICT,
            AppError::InvalidKey(_) | AppError::Cipher(_) | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Transport(_) => StatusCode::BAD_GATEWAY,
            AppError::Sharing(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message returned to callers. Internal detail stays in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::InvalidKey(_) => "Invalid public key encoding".to_string(),
            AppError::Cipher(_) => "Ciphertext could not be decrypted".to_string(),
            AppError::Persistence(_) => "Storage unavailable".to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Sharing(_) | AppError::Transport(_) | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<tokio_postgres::Error> for AppError {
    fn from(e: tokio_postgres::Error) -> Self {
        AppError::Persistence(e.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for AppError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        AppError::Persistence(e.to_string())
    }
}

impl From<deadpool_postgres::CreatePoolError> for AppError {
    fn from(e: deadpool_postgres::CreatePoolError) -> Self {
        AppError::Persistence(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                "Expected a JSON body (Content-Type: application/json)".to_string()
            }
            JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON".to_string(),
            JsonRejection::JsonDataError(e) => format!("Invalid request body: {}", e.body_text()),
            _ => "Invalid request body".to_string(),
        };
        AppError::Validation(message)
    }
}

impl From<PathRejection> for AppError {
    fn from(_: PathRejection) -> Self {
        AppError::Validation("Invalid path parameter".to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Transport(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Persistence(ref e) => tracing::error!("Persistence error: {}", e),
            AppError::Internal(ref e) => tracing::error!("Internal error: {}", e),
            AppError::Sharing(ref e) => tracing::error!("Sharing error: {}", e),
            AppError::Transport(ref e) => tracing::error!("Transport error: {}", e),
            AppError::Cipher(ref e) => tracing::warn!("Cipher error: {}", e),
            AppError::InvalidKey(ref e) => tracing::warn!("Invalid key: {}", e),
            AppError::Unauthorized => tracing::warn!("Unauthorized request"),
            ref other => tracing::debug!("Request rejected: {}", other.kind()),
        }

        let status = self.status();
        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": self.kind(),
            "message": self.public_message(),
        }))
        .unwrap_or_else(|_| r#"{"error":"internal_error","message":"Internal server error"}"#.to_string());

        (status, [(http::header::CONTENT_TYPE, "application/json")], body).into_response()
    }
}
