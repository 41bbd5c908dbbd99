//! End-to-end tests: a stub credential service, both workers on in-memory
//! stores, and the gateway, all on loopback sockets.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use mesh_gateway::audit::AuditClient;
use mesh_gateway::config::{GatewayConfig, ListenerConfig};
use mesh_gateway::gateway::{router, GatewayState, JsonResponse};
use mesh_gateway::rpc::{RpcClient, RpcListener, ServiceRegistry};
use mesh_gateway::store::{MemoryLogStore, MemoryReservationStore};
use mesh_gateway::workers::{LoggingService, ReservationService};
use mesh_gateway::{Secret, TokenService};

const SECRET: &str = "e2e-signing-secret-0123456789";
const ALICE_EMAIL: &str = "alice@example.com";
const ALICE_PASSWORD: &str = "correct-horse";
const ALICE_ID: i64 = 7;

// ============================================================================
// Stub credential service
// ============================================================================

#[derive(Clone, Default)]
struct Accounts {
    emails: Arc<Mutex<HashSet<String>>>,
}

async fn stub_auth(State(accounts): State<Accounts>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let email = body["authData"]["email"].as_str().unwrap_or_default().to_string();
    let password = body["authData"]["password"].as_str().unwrap_or_default();

    match body["action"].as_str() {
        Some("login") if email == ALICE_EMAIL && password == ALICE_PASSWORD => (
            StatusCode::OK,
            Json(json!({
                "error": false,
                "message": "Login success",
                "data": {"id": ALICE_ID, "email": ALICE_EMAIL, "fullName": "Alice"}
            })),
        ),
        Some("login") => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": true, "message": "invalid credentials"})),
        ),
        Some("signup") => {
            let mut emails = accounts.emails.lock().unwrap();
            if !emails.insert(email) {
                return (
                    StatusCode::OK,
                    Json(json!({"error": true, "message": "User already exists"})),
                );
            }
            let id = emails.len() + 100;
            (
                StatusCode::OK,
                Json(json!({"error": false, "message": "Signup success", "data": {"id": id}})),
            )
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": true, "message": "?"}))),
    }
}

async fn spawn_credential_service() -> SocketAddr {
    let accounts = Accounts::default();
    accounts.emails.lock().unwrap().insert(ALICE_EMAIL.to_string());

    let app = Router::new().route("/auth", post(stub_auth)).with_state(accounts);
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(tcp, app).await });
    addr
}

// ============================================================================
// Mesh
// ============================================================================

fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("mesh_gateway=debug")
        .try_init();
}

async fn spawn_worker(registry: ServiceRegistry) -> SocketAddr {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let listener = RpcListener::new(registry, ListenerConfig::with_budget(3));
    tokio::spawn(async move { listener.serve(tcp).await });
    addr
}

async fn unused_addr() -> SocketAddr {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    tcp.local_addr().unwrap()
}

/// A logger that accepts connections and never answers.
async fn spawn_silent_logger() -> SocketAddr {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((conn, _)) = tcp.accept().await {
            held.push(conn);
        }
    });
    addr
}

#[derive(Default)]
struct Overrides {
    reservation: Option<SocketAddr>,
    gateway_logger: Option<SocketAddr>,
}

struct Mesh {
    base: String,
    http: reqwest::Client,
    logs: MemoryLogStore,
    reservations: MemoryReservationStore,
}

impl Mesh {
    async fn start() -> Self {
        Self::start_with(Overrides::default()).await
    }

    /// Starts everything; `overrides` points the gateway at different
    /// reservation or logger addresses.
    async fn start_with(overrides: Overrides) -> Self {
        init_test_tracing();
        let logs = MemoryLogStore::new();
        let reservations = MemoryReservationStore::new();

        let logger_addr = spawn_worker(
            ServiceRegistry::new().register(LoggingService::new(logs.clone(), Duration::from_secs(3))),
        )
        .await;

        let audit = AuditClient::new(RpcClient::new(logger_addr.to_string(), Duration::from_secs(2)));
        let reservation_addr = spawn_worker(ServiceRegistry::new().register(ReservationService::new(
            reservations.clone(),
            audit,
            Duration::from_secs(3),
        )))
        .await;

        let credential_addr = spawn_credential_service().await;
        let reservation_addr = overrides.reservation.unwrap_or(reservation_addr);
        let gateway_logger = overrides.gateway_logger.unwrap_or(logger_addr);

        let config = GatewayConfig::from_lookup(|k| match k {
            "TOKEN_SECRET" => Some(SECRET.to_string()),
            "AUTH_SERVICE_URL" => Some(format!("http://{credential_addr}")),
            "RESERVATION_RPC_ADDR" => Some(reservation_addr.to_string()),
            "LOGGER_RPC_ADDR" => Some(gateway_logger.to_string()),
            "RPC_TIMEOUT_MS" => Some("2000".to_string()),
            _ => None,
        })
        .unwrap();

        let app = router(GatewayState::from_config(&config).unwrap());
        let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let gateway_addr = tcp.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(tcp, app).await });

        Self {
            base: format!("http://{gateway_addr}"),
            http: reqwest::Client::new(),
            logs,
            reservations,
        }
    }

    async fn post(&self, body: Value, bearer: Option<&str>) -> (StatusCode, JsonResponse) {
        let mut req = self.http.post(format!("{}/handle", self.base)).json(&body);
        if let Some(token) = bearer {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        let resp = req.send().await.unwrap();
        let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
        (status, resp.json().await.unwrap())
    }

    /// Audit records are written off the request path; waits until `count`
    /// records named `name` have arrived.
    async fn wait_for_logs(&self, name: &str, count: usize) -> usize {
        for _ in 0..50 {
            if self.logs.named(name).len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.logs.named(name).len()
    }

    async fn login(&self, password: &str) -> (StatusCode, JsonResponse) {
        self.post(
            json!({
                "action": "auth",
                "auth": {"action": "login", "authData": {"email": ALICE_EMAIL, "password": password}}
            }),
            None,
        )
        .await
    }
}

fn signup_body(email: &str) -> Value {
    json!({
        "action": "auth",
        "auth": {"action": "signup", "authData": {"email": email, "fullName": "Bob", "password": "pw"}}
    })
}

fn reserve_body(user_id: &str) -> Value {
    json!({
        "action": "reserve",
        "reservation": {
            "action": "add",
            "reservationData": {
                "restaurantID": "7",
                "userID": user_id,
                "count": "2",
                "reservationTime": "2026-10-20T19:00:00Z",
                "remarks": "window seat"
            }
        }
    })
}

// ============================================================================
// auth
// ============================================================================

#[tokio::test]
async fn login_returns_token_and_audits_once() {
    let mesh = Mesh::start().await;

    let (status, body) = mesh.login(ALICE_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.error);
    let token = body.data.and_then(|d| d.as_str().map(str::to_string)).unwrap();
    assert!(!token.is_empty());

    assert_eq!(mesh.wait_for_logs("Auth_Login", 1).await, 1);
    let logins = mesh.logs.named("Auth_Login");
    assert_eq!(logins[0].data, "User with id: 7 logged in");
}

#[tokio::test]
async fn wrong_password_is_401_without_audit() {
    let mesh = Mesh::start().await;

    let (status, body) = mesh.login("wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.error);
    assert_eq!(body.message, "invalid credentials");
    assert!(body.data.is_none());
    assert!(mesh.logs.entries().is_empty());
}

#[tokio::test]
async fn signup_is_accepted_then_reported_as_existing() {
    let mesh = Mesh::start().await;
    let body = signup_body("bob@example.com");

    let (status, first) = mesh.post(body.clone(), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(!first.error);
    assert!(first.data.is_none(), "signup must not mint a token");
    assert_eq!(mesh.wait_for_logs("Auth_Signup", 1).await, 1);

    let (status, second) = mesh.post(body, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(second.error);
    assert_eq!(second.message, "User already exists");
    assert_eq!(mesh.logs.named("Auth_Signup").len(), 1);
}

async fn assert_auth_unaffected_by_logger(logger: SocketAddr) {
    let mesh = Mesh::start_with(Overrides {
        gateway_logger: Some(logger),
        ..Overrides::default()
    })
    .await;

    let started = Instant::now();
    let (status, body) = mesh.login(ALICE_PASSWORD).await;
    let elapsed = started.elapsed();
    assert_eq!(status, StatusCode::OK);
    assert!(!body.error);
    assert!(body.data.and_then(|d| d.as_str().map(|t| !t.is_empty())).unwrap_or(false));
    assert!(elapsed < Duration::from_secs(1), "login waited {elapsed:?} on the logger");

    let started = Instant::now();
    let (status, body) = mesh.post(signup_body("carol@example.com"), None).await;
    let elapsed = started.elapsed();
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(!body.error);
    assert!(elapsed < Duration::from_secs(1), "signup waited {elapsed:?} on the logger");

    assert!(mesh.logs.named("Auth_Login").is_empty());
}

#[tokio::test]
async fn auth_succeeds_when_logger_is_down() {
    assert_auth_unaffected_by_logger(unused_addr().await).await;
}

#[tokio::test]
async fn auth_does_not_wait_for_silent_logger() {
    assert_auth_unaffected_by_logger(spawn_silent_logger().await).await;
}

// ============================================================================
// reserve
// ============================================================================

#[tokio::test]
async fn reserve_records_token_subject_not_client_user() {
    let mesh = Mesh::start().await;
    let (_, login) = mesh.login(ALICE_PASSWORD).await;
    let token = login.data.and_then(|d| d.as_str().map(str::to_string)).unwrap();

    let (status, body) = mesh.post(reserve_body("999"), Some(&token)).await;
    assert_eq!(status, StatusCode::OK, "{body:?}");
    assert!(!body.error);
    assert!(body.message.starts_with("Reservation Service!: "));
    assert!(body.message.contains("Reservation: 1 "), "{}", body.message);

    let rows = mesh.reservations.records();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, ALICE_ID.to_string());
    assert_eq!(rows[0].count, 2);

    assert_eq!(mesh.wait_for_logs("Reservation_Created", 1).await, 1);
    let created = mesh.logs.named("Reservation_Created");
    assert!(created[0].data.contains("userID: 7"));
}

#[tokio::test]
async fn reserve_without_header_never_reaches_worker() {
    let mesh = Mesh::start().await;

    let (status, body) = mesh.post(reserve_body("7"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.message, "authorization required");
    assert!(mesh.reservations.records().is_empty());
}

#[tokio::test]
async fn reserve_with_foreign_token_is_unauthorized() {
    let mesh = Mesh::start().await;
    let forged = TokenService::new(Secret::new(b"not-the-gateway-secret".to_vec()))
        .unwrap()
        .mint("7");

    let (status, body) = mesh.post(reserve_body("7"), Some(&forged)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.message, "unauthorized");
    assert!(mesh.reservations.records().is_empty());
}

#[tokio::test]
async fn invalid_reservation_payload_is_400() {
    let mesh = Mesh::start().await;
    let token = TokenService::new(Secret::new(SECRET.as_bytes().to_vec()))
        .unwrap()
        .mint("7");

    let mut body = reserve_body("7");
    body["reservation"]["reservationData"]["count"] = json!("0");
    let (status, resp) = mesh.post(body, Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.message, "invalid request");
    assert!(mesh.reservations.records().is_empty());
}

#[tokio::test]
async fn unreachable_reservation_worker_is_generic_failure() {
    let dead = unused_addr().await;
    let mesh = Mesh::start_with(Overrides {
        reservation: Some(dead),
        ..Overrides::default()
    })
    .await;
    let token = TokenService::new(Secret::new(SECRET.as_bytes().to_vec()))
        .unwrap()
        .mint("7");

    let (status, body) = tokio::time::timeout(
        Duration::from_secs(10),
        mesh.post(reserve_body("7"), Some(&token)),
    )
    .await
    .expect("gateway must not hang");

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.error);
    assert_eq!(body.message, "error creating reservation booking");
}

// ============================================================================
// envelope and routes
// ============================================================================

#[tokio::test]
async fn malformed_envelopes_are_400() {
    let mesh = Mesh::start().await;
    for body in [json!({"action": "dance"}), json!({"action": "auth"}), json!([1, 2, 3])] {
        let (status, resp) = mesh.post(body, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.message, "invalid request");
    }
    assert!(mesh.logs.entries().is_empty());
}

#[tokio::test]
async fn health_and_banner_respond() {
    let mesh = Mesh::start().await;

    let health: Value = mesh
        .http
        .get(format!("{}/health", mesh.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health, json!({"error": false, "message": "ok"}));

    let banner: JsonResponse = mesh
        .http
        .get(format!("{}/", mesh.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(banner.message, "Hit the broker");
}

#[tokio::test]
async fn preflight_allows_authorization_header() {
    let mesh = Mesh::start().await;

    let resp = mesh
        .http
        .request(reqwest::Method::OPTIONS, format!("{}/handle", mesh.base))
        .header("Origin", "http://example.com")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "authorization")
        .send()
        .await
        .unwrap();

    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
