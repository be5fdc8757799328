use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::api::{
        CreateSessionRequest, CreateSessionResponse, CustodyInfoResponse, ErrorResponse,
        FetchShareResponse, UploadShareRequest,
    },
    services::{custody::ShareCustodian, session::SessionManager},
};

/// The custodian's answer to a session request.
#[derive(Debug, Clone)]
pub struct SessionHandshake {
    pub session_id: Uuid,
    pub server_public_key: Vec<u8>,
}

/// The four custodian operations as seen from the client.
#[async_trait]
pub trait CustodianTransport: Send + Sync {
    async fn create_session(&self, public_key: &[u8]) -> Result<SessionHandshake>;
    async fn upload_share(&self, session_id: Uuid, sealed_share: &[u8]) -> Result<()>;
    async fn fetch_share(&self, session_id: Uuid) -> Result<Vec<u8>>;
    async fn reset(&self) -> Result<()>;
    async fn is_configured(&self) -> Result<bool>;
}

/// Calls the custodian services in-process as an already-verified subject.
#[derive(Clone)]
pub struct LocalCustodian {
    user_id: String,
    sessions: SessionManager,
    custodian: ShareCustodian,
}

impl LocalCustodian {
    pub fn new(user_id: impl Into<String>, sessions: SessionManager, custodian: ShareCustodian) -> Self {
        Self {
            user_id: user_id.into(),
            sessions,
            custodian,
        }
    }
}

#[async_trait]
impl CustodianTransport for LocalCustodian {
    async fn create_session(&self, public_key: &[u8]) -> Result<SessionHandshake> {
        let created = self.sessions.create_session(&self.user_id, public_key).await?;
        Ok(SessionHandshake {
            session_id: created.session_id,
            server_public_key: created.server_public_key,
        })
    }

    async fn upload_share(&self, session_id: Uuid, sealed_share: &[u8]) -> Result<()> {
        self.custodian.receive_share(&self.user_id, session_id, sealed_share).await
    }

    async fn fetch_share(&self, session_id: Uuid) -> Result<Vec<u8>> {
        self.custodian.deliver_share(&self.user_id, session_id).await
    }

    async fn reset(&self) -> Result<()> {
        self.custodian.reset_custody(&self.user_id).await
    }

    async fn is_configured(&self) -> Result<bool> {
        self.custodian.custody_status(&self.user_id).await
    }
}

/// Talks to a remote custodian over its JSON API.
#[derive(Clone)]
pub struct HttpCustodian {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpCustodian {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, token)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turns a non-2xx answer back into the custodian's error kind.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        match response.json::<ErrorResponse>().await {
            Ok(body) => Err(AppError::from_kind(&body.error, body.message)),
            Err(_) => Err(AppError::Transport(format!("custodian answered {}", status))),
        }
    }
}

#[async_trait]
impl CustodianTransport for HttpCustodian {
    async fn create_session(&self, public_key: &[u8]) -> Result<SessionHandshake> {
        let response = self
            .client
            .post(self.url("/session"))
            .bearer_auth(&self.token)
            .json(&CreateSessionRequest {
                temp_public_key: hex::encode(public_key),
            })
            .send()
            .await?;
        let body: CreateSessionResponse = Self::check(response).await?.json().await?;

        let session_id = Uuid::parse_str(&body.id)
            .map_err(|e| AppError::Transport(format!("custodian sent a bad session id: {}", e)))?;
        let server_public_key = hex::decode(&body.public_key_enc)
            .map_err(|e| AppError::InvalidKey(format!("custodian key is not hex: {}", e)))?;

        Ok(SessionHandshake {
            session_id,
            server_public_key,
        })
    }

    async fn upload_share(&self, session_id: Uuid, sealed_share: &[u8]) -> Result<()> {
        let response = self
            .client
            .post(self.url("/share"))
            .bearer_auth(&self.token)
            .json(&UploadShareRequest {
                encrypted_share: hex::encode(sealed_share),
                session_id: session_id.to_string(),
            })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn fetch_share(&self, session_id: Uuid) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(self.url(&format!("/session/{}/share", session_id)))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let body: FetchShareResponse = Self::check(response).await?.json().await?;

        hex::decode(&body.encrypted_share)
            .map_err(|e| AppError::Cipher(format!("custodian ciphertext is not hex: {}", e)))
    }

    async fn reset(&self) -> Result<()> {
        let response = self
            .client
            .post(self.url("/reset"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn is_configured(&self) -> Result<bool> {
        let response = self
            .client
            .get(self.url("/wallet/info"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let body: CustodyInfoResponse = Self::check(response).await?.json().await?;
        Ok(body.configured)
    }
}
