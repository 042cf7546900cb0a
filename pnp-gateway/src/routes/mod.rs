mod auth;
mod batch;
mod io;
mod motion;
mod pnp;
mod status;
mod vacuum;

use crate::dispatcher::Dispatcher;
use crate::params::{credential_secret_from_headers, params_from_body, peer_from_headers};
use crate::response;
use crate::state::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use pnp_core::CommandKind;
use serde_json::Value;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/motion/move", post(motion::move_axes))
        .route("/api/v1/motion/home", post(motion::home))
        .route("/api/v1/pnp/pick", post(pnp::pick))
        .route("/api/v1/pnp/place", post(pnp::place))
        .route("/api/v1/pnp/pick_and_place", post(pnp::pick_and_place))
        .route("/api/v1/vacuum/on", post(vacuum::vacuum_on))
        .route("/api/v1/vacuum/off", post(vacuum::vacuum_off))
        .route("/api/v1/vacuum/set", post(vacuum::vacuum_set))
        .route("/api/v1/pwm/set", post(vacuum::pwm_set))
        .route("/api/v1/pwm/ramp", post(vacuum::pwm_ramp))
        .route("/api/v1/gpio/read", post(io::gpio_read))
        .route("/api/v1/gpio/write", post(io::gpio_write))
        .route("/api/v1/actuators/actuate", post(io::actuator_actuate))
        .route("/api/v1/actuators/on", post(io::actuator_on))
        .route("/api/v1/actuators/off", post(io::actuator_off))
        .route("/api/v1/feeders/advance", post(io::feeder_advance))
        .route("/api/v1/sensors/read", post(io::sensor_read))
        .route("/api/v1/status", get(status::status))
        .route("/api/v1/system/info", get(status::system_info))
        .route("/api/v1/version", get(status::version))
        .route("/api/v1/queue", get(status::queue))
        .route("/api/v1/queue/clear", post(status::queue_clear))
        .route("/api/v1/system/emergency_stop", post(status::emergency_stop))
        .route("/api/v1/batch/execute", post(batch::execute))
        .route("/api/v1/auth/keys", post(auth::create_key).get(auth::list_keys))
        .route("/api/v1/auth/keys/{id}", get(auth::get_key).put(auth::update_key).delete(auth::delete_key))
        .route("/api/v1/auth/status", get(auth::status))
        .with_state(state)
}

/// Shared request path for every single-command endpoint: parse the body,
/// run the Dispatcher, and map the outcome onto the response envelope.
pub(crate) async fn dispatch_command(State(state): State<AppState>, headers: HeaderMap, kind: CommandKind, body: Value) -> Response {
    let parameters = match params_from_body(&body) {
        Ok(p) => p,
        Err(e) => return response::error(e),
    };
    let secret = credential_secret_from_headers(&headers);
    let peer = peer_from_headers(&headers);

    let dispatcher = Dispatcher::new(&state);
    match dispatcher.handle(secret.as_deref(), &peer, kind, parameters).await {
        Ok(data) => response::success(kind, data),
        Err(e) => response::error(e),
    }
}
