use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use contractdesk_application::RequestActivityContext;
use contractdesk_core::{ActorId, AppError};
use contractdesk_domain::ClientContext;

use crate::error::ApiResult;
use crate::state::AppState;

pub const ACTOR_ID_HEADER: &str = "x-contractdesk-actor-id";

pub async fn require_admin_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let headers = request.headers();

    let presented = bearer_token(headers)
        .ok_or_else(|| AppError::Unauthorized("admin token required".to_owned()))?;
    if !tokens_match(presented.as_bytes(), state.admin_api_token.as_bytes()) {
        return Err(AppError::Unauthorized("invalid admin token".to_owned()).into());
    }

    let actor_id = acting_admin(headers)?;
    let peer_address = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(address)| *address);
    let client_context = client_context_from_headers(headers, peer_address);

    request
        .extensions_mut()
        .insert(RequestActivityContext::for_actor(actor_id, client_context));
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn acting_admin(headers: &HeaderMap) -> Result<ActorId, AppError> {
    let raw = headers
        .get(ACTOR_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Unauthorized(format!("{ACTOR_ID_HEADER} header required")))?;

    raw.parse::<ActorId>()
        .map_err(|_| AppError::Unauthorized(format!("invalid {ACTOR_ID_HEADER} header")))
}

/// Compares without short-circuiting on the first differing byte.
fn tokens_match(presented: &[u8], expected: &[u8]) -> bool {
    if presented.len() != expected.len() {
        return false;
    }

    presented
        .iter()
        .zip(expected)
        .fold(0_u8, |difference, (left, right)| difference | (left ^ right))
        == 0
}

fn client_context_from_headers(
    headers: &HeaderMap,
    peer_address: Option<SocketAddr>,
) -> ClientContext {
    let forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok());

    let ip_address = forwarded_for
        .or(real_ip)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .or_else(|| peer_address.map(|address| address.ip().to_string()));

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);

    ClientContext::new(ip_address, user_agent)
}
