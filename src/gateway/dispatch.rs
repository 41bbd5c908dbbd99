//! The two envelope flows.
//!
//! Both return a finished [`Reply`]; every error has already been logged
//! with the request id and reduced to its caller-facing form.

use axum::http::StatusCode;

use super::envelope::{ReservationAction, ReservationData, ReservationRequest};
use super::response::{JsonResponse, Reply};
use super::GatewayState;
use crate::audit::AuditEventKind;
use crate::context::Ctx;
use crate::credential::{AuthAction, AuthRequest, CredentialOutcome, CredentialResponse};
use crate::error::{Error, TransportError};
use crate::state::{Authed, Unauthed};
use crate::web::{extract_authed, RequestAdapter};
use crate::workers::CREATE_METHOD;

const AUTH_UPSTREAM_MESSAGE: &str = "error calling authentication service";
const RESERVE_UPSTREAM_MESSAGE: &str = "error creating reservation booking";

// ============================================================================
// auth
// ============================================================================

/// Forwards an `auth` request to the credential service.
///
/// Login success mints a token for the returned account id. Signup success
/// is accepted without a token. In both cases the audit record is sent on a
/// detached task, so a slow or absent Logging worker never delays the reply.
pub async fn handle_auth(state: &GatewayState, ctx: &Ctx<Unauthed>, request: AuthRequest) -> Reply {
    let log = ctx.log();
    let action = request.action;
    log.debug(format_args!("forwarding {action} to credential service"));

    let response = match state.credential.authenticate(&request).await {
        Ok(CredentialOutcome::Accepted(response)) => response,
        Ok(CredentialOutcome::Rejected(message)) => {
            log.info(format_args!("credential service declined {action}: {message}"));
            return Reply::new(StatusCode::OK, JsonResponse::failure(message));
        }
        Err(e) => {
            log.warn(format_args!(
                "{action} via {} failed: {e}",
                state.credential.base_url()
            ));
            return Reply::from_error(&e, AUTH_UPSTREAM_MESSAGE);
        }
    };

    match action {
        AuthAction::Login => login(state, ctx, response),
        AuthAction::Signup => signup(state, ctx, response),
    }
}

fn spawn_audit(state: &GatewayState, kind: AuditEventKind, data: String) {
    let audit = state.audit.clone();
    tokio::spawn(async move {
        audit.record(kind, data).await;
    });
}

fn login(state: &GatewayState, ctx: &Ctx<Unauthed>, response: CredentialResponse) -> Reply {
    let Some(user_id) = response.user_id() else {
        let err = Error::from(TransportError::Remote(
            "login response carried no user id".to_string(),
        ));
        ctx.log().error(format_args!("{err}"));
        return Reply::from_error(&err, AUTH_UPSTREAM_MESSAGE);
    };

    let token = state.tokens.mint(user_id);
    let reply = Reply::new(
        StatusCode::OK,
        JsonResponse::ok(format!("Authentication Service!: {}", response.message))
            .with_data(token),
    );

    let data = format!("User with id: {user_id} logged in");
    ctx.log().info(format_args!("{data}"));
    spawn_audit(state, AuditEventKind::AuthLogin, data);

    reply
}

fn signup(state: &GatewayState, ctx: &Ctx<Unauthed>, response: CredentialResponse) -> Reply {
    let reply = Reply::new(
        StatusCode::ACCEPTED,
        JsonResponse::ok(format!("Authentication Service!: {}", response.message)),
    );

    let data = match response.user_id() {
        Some(id) => format!("New user with id: {id} created"),
        None => "New user created".to_string(),
    };
    ctx.log().info(format_args!("{data}"));
    spawn_audit(state, AuditEventKind::AuthSignup, data);

    reply
}

// ============================================================================
// reserve
// ============================================================================

/// Authenticates the caller and creates a reservation on their behalf.
///
/// The order is fixed: token first, then payload validation, then the one
/// remote call. Nothing reaches the Reservation worker unless the first two
/// succeed.
pub async fn handle_reserve(
    state: &GatewayState,
    adapter: &RequestAdapter,
    request: ReservationRequest,
) -> Reply {
    let ctx = match extract_authed(adapter, &state.tokens) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::warn!(request_id = adapter.request_id(), error = %e, "reserve rejected");
            return Reply::from_error(&Error::from(e), RESERVE_UPSTREAM_MESSAGE);
        }
    };

    match request.action {
        ReservationAction::Add => create_reservation(state, &ctx, request).await,
    }
}

async fn create_reservation(
    state: &GatewayState,
    ctx: &Ctx<Authed>,
    request: ReservationRequest,
) -> Reply {
    let log = ctx.log();

    let payload = match ReservationData::bind(request.data, ctx) {
        Ok(payload) => payload,
        Err(e) => {
            log.info(format_args!("reservation payload rejected: {e}"));
            return Reply::from_error(&e, RESERVE_UPSTREAM_MESSAGE);
        }
    };

    match state.reservation.call(CREATE_METHOD, &payload).await {
        Ok(status) => {
            log.info(format_args!("{status}"));
            Reply::new(
                StatusCode::OK,
                JsonResponse::ok(format!("Reservation Service!: {status}")),
            )
        }
        Err(e) => {
            log.error(format_args!(
                "{CREATE_METHOD} via {} failed: {e}",
                state.reservation.addr()
            ));
            Reply::from_error(&Error::from(e), RESERVE_UPSTREAM_MESSAGE)
        }
    }
}
