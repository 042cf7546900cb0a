use super::dispatch_command;
use crate::state::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use pnp_core::CommandKind;
use serde_json::json;

pub async fn status(state: State<AppState>, headers: HeaderMap) -> Response {
    dispatch_command(state, headers, CommandKind::Status, json!({})).await
}

pub async fn system_info(state: State<AppState>, headers: HeaderMap) -> Response {
    dispatch_command(state, headers, CommandKind::SystemInfo, json!({})).await
}

pub async fn version(state: State<AppState>, headers: HeaderMap) -> Response {
    dispatch_command(state, headers, CommandKind::Version, json!({})).await
}

pub async fn queue(state: State<AppState>, headers: HeaderMap) -> Response {
    dispatch_command(state, headers, CommandKind::Queue, json!({})).await
}

pub async fn queue_clear(state: State<AppState>, headers: HeaderMap) -> Response {
    dispatch_command(state, headers, CommandKind::QueueClear, json!({})).await
}

pub async fn emergency_stop(state: State<AppState>, headers: HeaderMap) -> Response {
    dispatch_command(state, headers, CommandKind::EmergencyStop, json!({})).await
}
