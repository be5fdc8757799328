use std::sync::Arc;

use axum::{body::Body, http::Request, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use keyshare_custodian::{
    client::{HttpCustodian, MemoryDeviceStore, RecoveryClient, ShamirSharing},
    crypto::{aes, ecdh::{self, EphemeralKeyPair}},
    error::AppError,
    repositories::{MemorySessionStore, MemoryShareVault},
    router::app_router,
    services::identity::StaticTokenVerifier,
    state::AppState,
};

const ALICE_TOKEN: &str = "alice-token";
const BOB_TOKEN: &str = "bob-token";

fn test_app() -> Router {
    let verifier = StaticTokenVerifier::new()
        .with_token(ALICE_TOKEN, "alice")
        .with_token(BOB_TOKEN, "bob");
    let state = AppState::from_parts(
        Arc::new(MemorySessionStore::new()),
        Arc::new(MemoryShareVault::new()),
        Arc::new(aes::generate_key()),
        Arc::new(verifier),
    );
    app_router(state)
}

// Shared test context: a custodian served on an ephemeral port
struct TestContext {
    client: reqwest::Client,
    base_url: String,
}

impl TestContext {
    async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, test_app()).await.unwrap();
        });

        Self {
            client: reqwest::Client::new(),
            base_url: format!("http://{}", addr),
        }
    }

    fn recovery_client(&self, token: &str) -> RecoveryClient<HttpCustodian> {
        RecoveryClient::new(
            token,
            HttpCustodian::with_client(self.client.clone(), &self.base_url, token),
            Arc::new(ShamirSharing),
            Arc::new(MemoryDeviceStore::new()),
        )
    }
}

async fn send(app: &Router, request: Request<Body>) -> (u16, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status().as_u16();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post(uri).header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::get(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requests_without_a_valid_token_are_rejected() {
        let app = test_app();

        let (status, body) = send(&app, post_json("/session", None, json!({ "tempPublicKey": "04" }))).await;
        assert_eq!(status, 401);
        assert_eq!(body["error"], "unauthorized");

        let (status, body) = send(&app, get("/wallet/info", "forged-token")).await;
        assert_eq!(status, 401);
        assert_eq!(body["error"], "unauthorized");
    }

    #[tokio::test]
    async fn test_session_creation_validates_the_public_key() {
        let app = test_app();

        let (status, body) = send(
            &app,
            post_json("/session", Some(ALICE_TOKEN), json!({ "tempPublicKey": "not-hex" })),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "invalid_key");

        // a well-formed encoding of a point that is not on the curve
        let off_curve = format!("04{}", "00".repeat(64));
        let (status, body) = send(
            &app,
            post_json("/session", Some(ALICE_TOKEN), json!({ "tempPublicKey": off_curve })),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "invalid_key");

        let key_pair = EphemeralKeyPair::generate();
        let (status, body) = send(
            &app,
            post_json(
                "/session",
                Some(ALICE_TOKEN),
                json!({ "tempPublicKey": hex::encode(key_pair.public_key_bytes()) }),
            ),
        )
        .await;
        assert_eq!(status, 200);
        assert!(uuid::Uuid::parse_str(body["id"].as_str().unwrap()).is_ok());
        let server_key = hex::decode(body["publicKeyEnc"].as_str().unwrap()).unwrap();
        assert_eq!(server_key.len(), ecdh::PUBLIC_KEY_SIZE);
    }

    #[tokio::test]
    async fn test_error_kinds_reach_the_caller() {
        let app = test_app();

        // Step 1: unknown and malformed session ids
        let (status, body) = send(&app, get(&format!("/session/{}/share", uuid::Uuid::new_v4()), ALICE_TOKEN)).await;
        assert_eq!(status, 404);
        assert_eq!(body["error"], "session_not_found");

        let (status, body) = send(&app, get("/session/12/share", ALICE_TOKEN)).await;
        assert_eq!(status, 404);
        assert_eq!(body["error"], "session_not_found");

        // Step 2: a valid session but nothing in custody
        let key_pair = EphemeralKeyPair::generate();
        let (_, session) = send(
            &app,
            post_json(
                "/session",
                Some(ALICE_TOKEN),
                json!({ "tempPublicKey": hex::encode(key_pair.public_key_bytes()) }),
            ),
        )
        .await;
        let session_id = session["id"].as_str().unwrap().to_string();

        let (status, body) = send(&app, get(&format!("/session/{}/share", session_id), ALICE_TOKEN)).await;
        assert_eq!(status, 404);
        assert_eq!(body["error"], "no_share");

        // Step 3: garbage ciphertext is a cipher error, and it does not leak detail
        let (status, body) = send(
            &app,
            post_json(
                "/share",
                Some(ALICE_TOKEN),
                json!({ "encryptedShare": "00".repeat(40), "sessionId": session_id }),
            ),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "cipher_error");
        assert_eq!(body["message"], "Ciphertext could not be decrypted");

        // Step 4: bob cannot use alice's session
        let (status, body) = send(&app, get(&format!("/session/{}/share", session_id), BOB_TOKEN)).await;
        assert_eq!(status, 404);
        assert_eq!(body["error"], "session_not_found");
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_validation_errors() {
        let app = test_app();

        // Step 1: wrong field type, missing field
        let (status, body) = send(&app, post_json("/share", Some(ALICE_TOKEN), json!({ "sessionId": 1 }))).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "validation_error");

        // Step 2: not JSON at all
        let request = Request::post("/session")
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", ALICE_TOKEN))
            .body(Body::from("{tempPublicKey"))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "validation_error");

        // Step 3: missing content type
        let request = Request::post("/session")
            .header("authorization", format!("Bearer {}", ALICE_TOKEN))
            .body(Body::from(json!({ "tempPublicKey": "04" }).to_string()))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "validation_error");
        assert!(body["message"].as_str().unwrap().contains("application/json"));
    }

    #[tokio::test]
    async fn test_enrollment_and_recovery_over_http() {
        let context = TestContext::start().await;
        let alice = context.recovery_client(ALICE_TOKEN);
        let secret = [0x42u8; 32];

        // Step 1: nothing in custody yet
        assert!(!alice.is_enrolled().await.unwrap());

        // Step 2: enroll
        let export = alice.enroll(&secret).await.unwrap();
        assert!(alice.is_enrolled().await.unwrap());

        // Step 3: recover from the device share and the custodian's share
        let recovered = alice.recover().await.unwrap();
        assert_eq!(recovered.as_slice(), &secret);

        // Step 4: a second enrollment is refused with the custodian's error kind
        let err = alice.enroll(&[0x07u8; 32]).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateShare), "got {:?}", err);

        // Step 5: a replacement device recovers through the export
        let replacement = context.recovery_client(ALICE_TOKEN);
        let recovered = replacement.recover_with_export(&export).await.unwrap();
        assert_eq!(recovered.as_slice(), &secret);

        // Step 6: bob's custody is independent
        let bob = context.recovery_client(BOB_TOKEN);
        assert!(!bob.is_enrolled().await.unwrap());
        let err = bob.recover_with_export(&export).await.unwrap_err();
        assert!(matches!(err, AppError::NoShare), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_reset_over_http() {
        let context = TestContext::start().await;
        let alice = context.recovery_client(ALICE_TOKEN);

        alice.enroll(&[0x01u8; 32]).await.unwrap();
        alice.reset().await.unwrap();
        assert!(!alice.is_enrolled().await.unwrap());

        let response = context
            .client
            .post(format!("{}/reset", context.base_url))
            .bearer_auth(ALICE_TOKEN)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200, "reset is idempotent");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "ok");

        alice.enroll(&[0x02u8; 32]).await.unwrap();
        assert_eq!(alice.recover().await.unwrap().as_slice(), &[0x02u8; 32]);
    }

    #[tokio::test]
    async fn test_unreachable_custodian_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let custodian = HttpCustodian::new(format!("http://{}", addr), ALICE_TOKEN);
        let client = RecoveryClient::new(
            "alice",
            custodian,
            Arc::new(ShamirSharing),
            Arc::new(MemoryDeviceStore::new()),
        );
        assert!(matches!(client.is_enrolled().await, Err(AppError::Transport(_))));
    }
}
