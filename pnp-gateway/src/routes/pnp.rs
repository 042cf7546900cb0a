use super::dispatch_command;
use crate::state::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use pnp_core::CommandKind;
use serde_json::Value;

pub async fn pick(state: State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    dispatch_command(state, headers, CommandKind::Pick, body).await
}

pub async fn place(state: State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    dispatch_command(state, headers, CommandKind::Place, body).await
}

pub async fn pick_and_place(state: State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    dispatch_command(state, headers, CommandKind::PickAndPlace, body).await
}
