use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use pnp_core::{CommandKind, GatewayError};
use serde_json::{json, Value};

/// Uniform success envelope (spec §6.1): `{"status":"success","command":<kind>,"data":{…}}`.
pub fn success(kind: CommandKind, data: Value) -> Response {
    (StatusCode::OK, Json(json!({ "status": "success", "command": kind.as_str(), "data": data }))).into_response()
}

/// `201` variant for credential creation.
pub fn created(data: Value) -> Response {
    (StatusCode::CREATED, Json(json!({ "status": "success", "data": data }))).into_response()
}

/// Uniform error envelope: `{"status":"error","error_code":<enum>,"error_message":<string>,"details":{…}?}`.
pub fn error(err: GatewayError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut body = json!({
        "status": "error",
        "error_code": err.code(),
        "error_message": err.message(),
    });
    if let GatewayError::BoundsViolation(errors) = &err {
        body["details"] = json!({ "errors": errors });
    }
    if let GatewayError::RateLimited { retry_after_ms } = &err {
        body["details"] = json!({ "retry_after_ms": retry_after_ms });
    }
    (status, Json(body)).into_response()
}
