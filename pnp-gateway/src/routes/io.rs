use super::dispatch_command;
use crate::state::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use pnp_core::CommandKind;
use serde_json::Value;

pub async fn gpio_read(state: State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    dispatch_command(state, headers, CommandKind::GpioRead, body).await
}

pub async fn gpio_write(state: State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    dispatch_command(state, headers, CommandKind::GpioWrite, body).await
}

pub async fn actuator_actuate(state: State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    dispatch_command(state, headers, CommandKind::ActuatorActuate, body).await
}

pub async fn actuator_on(state: State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    dispatch_command(state, headers, CommandKind::ActuatorOn, body).await
}

pub async fn actuator_off(state: State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    dispatch_command(state, headers, CommandKind::ActuatorOff, body).await
}

pub async fn feeder_advance(state: State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    dispatch_command(state, headers, CommandKind::FeederAdvance, body).await
}

pub async fn sensor_read(state: State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    dispatch_command(state, headers, CommandKind::SensorRead, body).await
}
