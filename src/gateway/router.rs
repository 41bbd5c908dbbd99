use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, LINK};
use axum::http::{HeaderName, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::dispatch::{handle_auth, handle_reserve};
use super::envelope::{parse_envelope, Action};
use super::response::{JsonResponse, Reply};
use super::GatewayState;
use crate::web::{extract_unauthed, RequestAdapter};

/// Builds the gateway's HTTP routes.
///
/// - `GET /` banner
/// - `GET /health` liveness probe
/// - `POST /handle` action envelope
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(broker))
        .route("/health", get(health))
        .route("/handle", post(handle))
        .layer(TraceLayer::new_for_http())
        .layer(cors())
        .with_state(state)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            ACCEPT,
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([LINK])
        .max_age(Duration::from_secs(300))
}

async fn broker() -> Json<JsonResponse> {
    Json(JsonResponse::ok("Hit the broker"))
}

async fn health() -> Json<JsonResponse> {
    Json(JsonResponse::ok("ok"))
}

async fn handle(
    State(state): State<GatewayState>,
    adapter: RequestAdapter,
    body: Bytes,
) -> impl IntoResponse {
    let ctx = extract_unauthed(&adapter);

    let action = match parse_envelope(&body) {
        Ok(action) => action,
        Err(e) => {
            ctx.log().info(format_args!("{e}"));
            return Reply::new(StatusCode::BAD_REQUEST, JsonResponse::failure(e.public_message()));
        }
    };
    ctx.log().debug(format_args!("handling '{}' envelope", action.tag()));

    match action {
        Action::Auth(request) => handle_auth(&state, &ctx, request).await,
        Action::Reserve(request) => handle_reserve(&state, &adapter, request).await,
    }
}
