use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{handlers, middleware_layer, state::AppState};

/// Builds the custodian's HTTP surface. Every route requires a bearer token.
pub fn app_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/session", post(handlers::session::create_session))
        .route("/session/{id}/share", get(handlers::share::fetch_share))
        .route("/share", post(handlers::share::upload_share))
        .route("/reset", post(handlers::share::reset_custody))
        .route("/wallet/info", get(handlers::share::custody_info))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state);

    Router::new().merge(protected_routes).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::default())
            .on_request(DefaultOnRequest::default().level(Level::DEBUG))
            .on_response(DefaultOnResponse::default().level(Level::DEBUG))
            .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
    )
}

/// Allows browser wallets on `origins` to call the API with a bearer token.
pub fn cors_layer(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}
