use super::dispatch_command;
use crate::state::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use pnp_core::CommandKind;
use serde_json::Value;

pub async fn move_axes(state: State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    dispatch_command(state, headers, CommandKind::Move, body).await
}

pub async fn home(state: State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    dispatch_command(state, headers, CommandKind::Home, body).await
}
