use crate::dispatcher::Dispatcher;
use crate::params::{credential_secret_from_headers, params_from_body, peer_from_headers};
use crate::response;
use crate::state::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use pnp_core::{CommandKind, GatewayError};
use pnp_tasks::{execute_batch, BatchStatus, CancellationToken};
use serde_json::{json, Value};

/// `POST /api/v1/batch/execute`: authenticates once, then runs each
/// sub-command through the same authorize/budget/dispatch path a standalone
/// request would take (spec §6.2). A failed item in a non-`stop_on_error`
/// batch still runs the remaining items and reports `partial_success`.
pub async fn execute(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let secret = credential_secret_from_headers(&headers);
    let peer = peer_from_headers(&headers);
    let dispatcher = Dispatcher::new(&state);

    let credential = match dispatcher.authenticate(secret.as_deref(), &peer) {
        Ok(c) => c,
        Err(e) => return response::error(e),
    };

    let commands = match body.get("parameters").and_then(|p| p.get("commands")).or_else(|| body.get("commands")) {
        Some(Value::Array(items)) => items.clone(),
        _ => return response::error(GatewayError::MissingParameter("commands".to_string())),
    };
    let stop_on_error = body
        .get("parameters")
        .and_then(|p| p.get("stop_on_error"))
        .or_else(|| body.get("stop_on_error"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let mut parsed = Vec::with_capacity(commands.len());
    for item in &commands {
        let kind_name = match item.get("command").and_then(Value::as_str) {
            Some(name) => name,
            None => return response::error(GatewayError::MissingParameter("command".to_string())),
        };
        let kind = match CommandKind::parse(kind_name) {
            Some(k) => k,
            None => return response::error(GatewayError::UnknownCommand(kind_name.to_string())),
        };
        let parameters = match params_from_body(item) {
            Ok(p) => p,
            Err(e) => return response::error(e),
        };
        parsed.push((kind, parameters));
    }

    let token = CancellationToken::new();
    let result = execute_batch(parsed.len(), stop_on_error, token, |index| {
        let (kind, parameters) = parsed[index].clone();
        let dispatcher = Dispatcher::new(&state);
        let credential = credential.clone();
        async move { dispatcher.dispatch_item(&credential, kind, parameters).await.map_err(|e| e.message()) }
    })
    .await;

    let status = match result.status {
        BatchStatus::Success => "success",
        BatchStatus::PartialSuccess => "partial_success",
    };
    (StatusCode::OK, Json(json!({ "status": status, "command": CommandKind::BatchExecute.as_str(), "data": { "results": result.results } }))).into_response()
}
