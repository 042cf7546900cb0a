use crate::params::{credential_secret_from_headers, peer_from_headers};
use crate::response;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use pnp_core::GatewayError;
use pnp_security::{Capability, Credential, SecurityError};
use serde::Deserialize;
use serde_json::{json, Value};

/// Credential management has no `CommandKind` counterpart and is gated on
/// `Capability::Admin` specifically, rather than the read/write split
/// `Dispatcher::authorize` applies to ordinary commands — so it is handled
/// entirely outside the Dispatcher pipeline.
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Credential, GatewayError> {
    let secret = credential_secret_from_headers(headers);
    let peer = peer_from_headers(headers);
    let Some(secret) = secret else {
        state.auth_log.record_failure(&peer);
        return Err(GatewayError::Unauthenticated("missing credential".to_string()));
    };
    match state.credentials.validate(&secret) {
        Some(credential) => {
            state.auth_log.record_success(&peer);
            Ok(credential)
        }
        None => {
            state.auth_log.record_failure(&peer);
            Err(GatewayError::Unauthenticated("invalid credential".to_string()))
        }
    }
}

fn authenticate_admin(state: &AppState, headers: &HeaderMap) -> Result<Credential, GatewayError> {
    let credential = authenticate(state, headers)?;
    if !state.credentials.check_capability(&credential, Capability::Admin) {
        return Err(GatewayError::PermissionDenied("credential management requires admin capability".to_string()));
    }
    Ok(credential)
}

fn parse_capabilities(values: &[String]) -> Result<std::collections::HashSet<Capability>, GatewayError> {
    values
        .iter()
        .map(|s| Capability::parse(s).ok_or_else(|| GatewayError::InvalidRequest(format!("unknown capability: {s}"))))
        .collect()
}

#[derive(Deserialize)]
pub struct CreateKeyRequest {
    name: String,
    capabilities: Vec<String>,
    #[serde(default = "default_budget")]
    budget: u32,
    #[serde(default)]
    description: String,
}

fn default_budget() -> u32 {
    100
}

pub async fn create_key(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<CreateKeyRequest>) -> Response {
    if let Err(e) = authenticate_admin(&state, &headers) {
        return response::error(e);
    }
    let capabilities = match parse_capabilities(&body.capabilities) {
        Ok(c) => c,
        Err(e) => return response::error(e),
    };
    match state.credentials.create(body.name, capabilities, body.budget, body.description) {
        Ok((id, secret)) => response::created(json!({ "id": id, "secret": secret })),
        Err(e) => response::error(map_security_error(e)),
    }
}

pub async fn list_keys(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(e) = authenticate_admin(&state, &headers) {
        return response::error(e);
    }
    let credentials = state.credentials.list();
    (StatusCode::OK, Json(json!({ "status": "success", "data": { "credentials": credentials } }))).into_response()
}

pub async fn get_key(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(e) = authenticate_admin(&state, &headers) {
        return response::error(e);
    }
    match state.credentials.get(&id) {
        Some(summary) => (StatusCode::OK, Json(json!({ "status": "success", "data": summary }))).into_response(),
        None => response::error(GatewayError::KeyNotFound(id)),
    }
}

#[derive(Deserialize, Default)]
pub struct UpdateKeyRequest {
    name: Option<String>,
    capabilities: Option<Vec<String>>,
    budget: Option<u32>,
    description: Option<String>,
    active: Option<bool>,
}

pub async fn update_key(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>, Json(body): Json<UpdateKeyRequest>) -> Response {
    if let Err(e) = authenticate_admin(&state, &headers) {
        return response::error(e);
    }
    let capabilities = match body.capabilities {
        Some(names) => match parse_capabilities(&names) {
            Ok(c) => Some(c),
            Err(e) => return response::error(e),
        },
        None => None,
    };
    match state.credentials.update(&id, body.name, capabilities, body.budget, body.description, body.active) {
        Ok(summary) => (StatusCode::OK, Json(json!({ "status": "success", "data": summary }))).into_response(),
        Err(e) => response::error(map_security_error(e)),
    }
}

pub async fn delete_key(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(e) = authenticate_admin(&state, &headers) {
        return response::error(e);
    }
    match state.credentials.delete(&id) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "success", "data": { "deleted": id } }))).into_response(),
        Err(e) => response::error(map_security_error(e)),
    }
}

fn map_security_error(err: SecurityError) -> GatewayError {
    match err {
        SecurityError::KeyNotFound(id) => GatewayError::KeyNotFound(id),
        other => GatewayError::ExecutionError(other.to_string()),
    }
}

/// `GET /api/v1/auth/status`: any valid credential may inspect its own
/// remaining budget, no admin capability required.
pub async fn status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let credential = match authenticate(&state, &headers) {
        Ok(c) => c,
        Err(e) => return response::error(e),
    };
    let remaining = state.credentials.remaining(&credential.id);
    let reset_at_ms = state.credentials.reset_at(&credential.id).map(|instant| instant.saturating_duration_since(std::time::Instant::now()).as_millis() as u64);
    let data: Value = json!({
        "credential": credential.summary(),
        "remaining": remaining,
        "reset_in_ms": reset_at_ms,
    });
    (StatusCode::OK, Json(json!({ "status": "success", "data": data }))).into_response()
}
