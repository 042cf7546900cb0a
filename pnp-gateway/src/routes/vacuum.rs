use super::dispatch_command;
use crate::state::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use pnp_core::CommandKind;
use serde_json::Value;

pub async fn vacuum_on(state: State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    dispatch_command(state, headers, CommandKind::VacuumOn, body).await
}

pub async fn vacuum_off(state: State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    dispatch_command(state, headers, CommandKind::VacuumOff, body).await
}

pub async fn vacuum_set(state: State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    dispatch_command(state, headers, CommandKind::VacuumSet, body).await
}

pub async fn pwm_set(state: State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    dispatch_command(state, headers, CommandKind::PwmSet, body).await
}

pub async fn pwm_ramp(state: State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    dispatch_command(state, headers, CommandKind::PwmRamp, body).await
}
