use crate::state::AppState;
use crate::telemetry::{GpioState, SensorReading};
use pnp_cache::Category;
use pnp_controller::ControllerError;
use pnp_core::{CommandKind, CommandRequest, GatewayError, ParamValue, TranslationError};
use pnp_security::Capability;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

fn category_from_str(name: &str) -> Option<Category> {
    Category::ALL.into_iter().find(|c| c.as_str() == name)
}

/// Capability required to invoke `kind`, per spec §4.I step 2: read-only for
/// queries, write for mutations, admin for credential management (handled
/// separately by the `auth` routes, which never reach this dispatcher).
fn required_capability(kind: CommandKind) -> Capability {
    if kind.is_query() { Capability::Read } else { Capability::Write }
}

fn map_translation_error(err: TranslationError) -> GatewayError {
    match err {
        TranslationError::UnknownCommand(k) => GatewayError::UnknownCommand(k),
        TranslationError::MissingParameter(p) => GatewayError::MissingParameter(p),
        TranslationError::ValidationFailed(errors) => GatewayError::BoundsViolation(errors),
        TranslationError::Template(e) => GatewayError::ExecutionError(e.to_string()),
    }
}

fn map_controller_error(err: ControllerError) -> GatewayError {
    GatewayError::ControllerError(err.message)
}

/// Orchestrates authenticate -> authorize -> rate-limit -> validate ->
/// translate -> dispatch -> post-conditions -> respond for a single inbound
/// command (spec §4.I). Batch execution drives this once per item.
pub struct Dispatcher<'a> {
    pub state: &'a AppState,
}

impl<'a> Dispatcher<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// `peer` is a coarse client identifier (remote address) used only for
    /// `AuthLog` bookkeeping, independent of the credential identity.
    pub async fn handle(&self, presented_secret: Option<&str>, peer: &str, kind: CommandKind, parameters: BTreeMap<String, ParamValue>) -> Result<Value, GatewayError> {
        let credential = self.authenticate(presented_secret, peer)?;
        self.dispatch_item(&credential, kind, parameters).await
    }

    /// Authorizes and budgets a single command against an already-validated
    /// credential, then dispatches it. Shared by `handle` (one command per
    /// request) and batch execution (one credential, many commands, each
    /// independently authorized and budgeted as if sent on its own).
    pub async fn dispatch_item(&self, credential: &pnp_security::Credential, kind: CommandKind, parameters: BTreeMap<String, ParamValue>) -> Result<Value, GatewayError> {
        self.authorize(credential, kind)?;
        self.check_budget(&credential.id)?;

        let request = CommandRequest { kind, parameters };

        match kind {
            CommandKind::Status => self.query_status().await,
            CommandKind::SystemInfo => self.query_system_info().await,
            CommandKind::Version => self.query_version().await,
            CommandKind::Queue => Ok(self.queue_snapshot()),
            CommandKind::QueueClear => self.queue_clear().await,
            CommandKind::PwmRamp => self.start_pwm_ramp(&request).await,
            CommandKind::GpioRead => self.query_gpio(&request).await,
            CommandKind::SensorRead => self.query_sensor(&request).await,
            CommandKind::EmergencyStop => self.emergency_stop().await,
            _ => self.dispatch_mutation(&request).await,
        }
    }

    pub fn authenticate(&self, presented_secret: Option<&str>, peer: &str) -> Result<pnp_security::Credential, GatewayError> {
        let Some(secret) = presented_secret else {
            self.state.auth_log.record_failure(peer);
            return Err(GatewayError::Unauthenticated("missing credential".to_string()));
        };
        match self.state.credentials.validate(secret) {
            Some(credential) => {
                self.state.auth_log.record_success(peer);
                Ok(credential)
            }
            None => {
                self.state.auth_log.record_failure(peer);
                Err(GatewayError::Unauthenticated("invalid credential".to_string()))
            }
        }
    }

    fn authorize(&self, credential: &pnp_security::Credential, kind: CommandKind) -> Result<(), GatewayError> {
        let required = required_capability(kind);
        if self.state.credentials.check_capability(credential, required) {
            Ok(())
        } else {
            Err(GatewayError::PermissionDenied(format!("{kind} requires {required:?} capability")))
        }
    }

    fn check_budget(&self, credential_id: &str) -> Result<(), GatewayError> {
        self.state
            .credentials
            .reserve_or_reject(credential_id)
            .map_err(|retry_after| GatewayError::RateLimited { retry_after_ms: retry_after.as_millis() as u64 })
    }

    /// Runs validate+translate under the context mutex, then dispatches
    /// every low-level command in order, aborting on first controller
    /// failure (spec §4.I steps 4-6, §5 "MotionContext" discipline).
    fn translate_under_lock(&self, request: &CommandRequest) -> Result<pnp_core::TranslationResult, GatewayError> {
        let mut context = self.state.context.lock().expect("context mutex poisoned");
        self.state.safety.validate(request, &context).map_err(GatewayError::BoundsViolation)?;
        self.state.translator.translate(request, &mut context).map_err(map_translation_error)
    }

    async fn dispatch_mutation(&self, request: &CommandRequest) -> Result<Value, GatewayError> {
        let translation = self.translate_under_lock(request)?;

        let mut outcome: Result<(), GatewayError> = Ok(());
        for command in &translation.commands {
            if let Err(e) = self.state.controller.run_command(command).await {
                outcome = Err(map_controller_error(e));
                break;
            }
        }

        if outcome.is_ok() && !translation.axes_to_mark_homed.is_empty() {
            self.state.safety.mark_homed(&translation.axes_to_mark_homed);
        }

        // Run unconditionally: side effects already sent to the controller
        // are never rolled back on a mid-sequence failure, so the affected
        // categories are invalidated regardless, and the next read re-fetches
        // rather than serving a stale pre-command value (spec §4.G/§4.I).
        for category in request.kind.invalidated_categories() {
            if let Some(category) = category_from_str(category) {
                self.state.cache.invalidate_category(category);
            }
        }

        outcome?;

        info!(command = %request.kind, commands = translation.commands.len(), "dispatched mutation");
        Ok(json!({ "commands": translation.commands }))
    }

    /// Surfaces the controller's raw status payload alongside live task/ramp
    /// queue introspection (spec's "PWM ramp status introspection" supplement);
    /// only the controller payload itself is cached, so ramp/task progress is
    /// never served stale.
    async fn query_status(&self) -> Result<Value, GatewayError> {
        let controller = self.state.controller.clone();
        let mut status = self
            .state
            .cache
            .get("status", Category::System, || async move { controller.get_status().await.map_err(|e| e.message) })
            .await
            .map_err(GatewayError::ControllerError)?;

        if let Value::Object(ref mut map) = status {
            map.insert("active_tasks".to_string(), json!(self.state.tasks.active_keys()));
            map.insert("active_ramps".to_string(), json!(self.state.ramps.active_ramps()));
        }

        Ok(status)
    }

    async fn query_system_info(&self) -> Result<Value, GatewayError> {
        let controller = self.state.controller.clone();
        self.state
            .cache
            .get("system_info", Category::System, || async move { controller.get_version().await.map_err(|e| e.message) })
            .await
            .map_err(GatewayError::ControllerError)
    }

    async fn query_version(&self) -> Result<Value, GatewayError> {
        let controller = self.state.controller.clone();
        self.state
            .cache
            .get("version", Category::System, || async move { controller.get_version().await.map_err(|e| e.message) })
            .await
            .map_err(GatewayError::ControllerError)
    }

    async fn query_gpio(&self, request: &pnp_core::CommandRequest) -> Result<Value, GatewayError> {
        {
            let context = self.state.context.lock().expect("context mutex poisoned");
            self.state.safety.validate(request, &context).map_err(GatewayError::BoundsViolation)?;
        }

        let pin = request.get("pin").and_then(ParamValue::as_str).ok_or_else(|| GatewayError::MissingParameter("pin".to_string()))?.to_string();
        let key = format!("gpio:{pin}");
        let controller = self.state.controller.clone();
        let objects: HashMap<String, Option<Vec<String>>> = HashMap::from([("output_pin".to_string(), Some(vec![pin.clone()]))]);
        let pin_for_refill = pin.clone();
        self.state
            .cache
            .get(&key, Category::Gpio, || async move {
                let raw = controller.query_objects(&objects).await.map_err(|e| e.message)?;
                let state = GpioState::from_controller_response(&pin_for_refill, &raw)?;
                serde_json::to_value(state).map_err(|e| e.to_string())
            })
            .await
            .map_err(GatewayError::ControllerError)
    }

    async fn query_sensor(&self, request: &pnp_core::CommandRequest) -> Result<Value, GatewayError> {
        {
            let context = self.state.context.lock().expect("context mutex poisoned");
            self.state.safety.validate(request, &context).map_err(GatewayError::BoundsViolation)?;
        }

        let sensor = request.get("sensor").and_then(ParamValue::as_str).ok_or_else(|| GatewayError::MissingParameter("sensor".to_string()))?.to_string();
        let key = format!("sensor:{sensor}");
        let controller = self.state.controller.clone();
        let objects: HashMap<String, Option<Vec<String>>> = HashMap::from([(sensor.clone(), None)]);
        let sensor_for_refill = sensor.clone();
        self.state
            .cache
            .get(&key, Category::Sensors, || async move {
                let raw = controller.query_objects(&objects).await.map_err(|e| e.message)?;
                let reading = SensorReading::from_controller_response(&sensor_for_refill, &raw)?;
                serde_json::to_value(reading).map_err(|e| e.to_string())
            })
            .await
            .map_err(GatewayError::ControllerError)
    }

    fn queue_snapshot(&self) -> Value {
        json!({
            "active_tasks": self.state.tasks.active_keys(),
            "active_ramps": self.state.ramps.active_ramps(),
        })
    }

    async fn queue_clear(&self) -> Result<Value, GatewayError> {
        self.state.tasks.cancel_all().await;
        Ok(json!({ "cleared": true }))
    }

    /// Validates and authorizes synchronously, then spawns the ramp as a
    /// background task keyed `ramp:<pin>`; a new ramp for the same pin
    /// preempts any ramp already running (spec scenario S6).
    async fn start_pwm_ramp(&self, request: &pnp_core::CommandRequest) -> Result<Value, GatewayError> {
        {
            let context = self.state.context.lock().expect("context mutex poisoned");
            self.state.safety.validate(request, &context).map_err(GatewayError::BoundsViolation)?;
        }

        let pin = request.get("pin").and_then(ParamValue::as_str).ok_or_else(|| GatewayError::MissingParameter("pin".to_string()))?.to_string();
        let start = request.get("start").and_then(ParamValue::as_f64).ok_or_else(|| GatewayError::MissingParameter("start".to_string()))?;
        let end = request.get("end").and_then(ParamValue::as_f64).ok_or_else(|| GatewayError::MissingParameter("end".to_string()))?;
        let duration_secs = request.get("duration").and_then(ParamValue::as_f64).ok_or_else(|| GatewayError::MissingParameter("duration".to_string()))?;
        let steps = request.get("steps").and_then(ParamValue::as_i64).ok_or_else(|| GatewayError::MissingParameter("steps".to_string()))? as u32;

        let key = format!("ramp:{pin}");
        let controller = self.state.controller.clone();
        let ramps = self.state.ramps.as_ref().clone();
        let pin_for_body = pin.clone();
        let key_for_body = key.clone();

        self.state
            .tasks
            .spawn(key.clone(), move |token| async move {
                let pin_for_ramp = pin_for_body.clone();
                let set_pin = move |value: f64| {
                    let controller = controller.clone();
                    let pin = pin_for_body.clone();
                    async move { controller.run_command(&format!("SET_PIN PIN={pin} VALUE={value:.3}")).await.map_err(|e| e.message) }
                };
                pnp_tasks::run_pwm_ramp(ramps, key_for_body, pin_for_ramp, start, end, std::time::Duration::from_secs_f64(duration_secs), steps, set_pin, token).await;
            })
            .await;

        self.state.cache.invalidate_category(Category::Pwm);
        warn!(pin, "pwm ramp started, preempting any prior ramp for this pin");
        Ok(json!({ "task_key": key }))
    }

    /// Cancels every active task, stops the machine, clears HomedAxes, and
    /// empties every cache category (spec §4.E, property §8.6).
    async fn emergency_stop(&self) -> Result<Value, GatewayError> {
        self.state.tasks.cancel_all().await;
        self.state.controller.emergency_stop().await.map_err(map_controller_error)?;
        self.state.safety.clear_homed_axes();
        self.state.cache.invalidate_all();
        Ok(json!({ "stopped": true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use pnp_controller::MockControllerClient;
    use std::sync::Arc;

    fn state_with(controller: MockControllerClient, known_sensors: &[&str]) -> AppState {
        let mut config = GatewayConfig::default();
        config.safety_limits.known_sensors = known_sensors.iter().map(|s| s.to_string()).collect();
        AppState::new(config, Arc::new(controller)).expect("state construction")
    }

    #[tokio::test]
    async fn sensor_read_of_unknown_sensor_is_rejected_before_touching_the_controller() {
        let state = state_with(MockControllerClient::new(), &["temp_bed"]);
        let dispatcher = Dispatcher::new(&state);
        let request = CommandRequest::new(CommandKind::SensorRead).with("sensor", ParamValue::Text("mystery".to_string()));

        let err = dispatcher.query_sensor(&request).await.unwrap_err();

        assert!(matches!(err, GatewayError::BoundsViolation(_)));
    }

    #[tokio::test]
    async fn gpio_read_goes_through_safety_validate_and_returns_typed_state() {
        let controller = MockControllerClient::new().with_status(json!({"output_pin P9": {"value": 1.0, "mode": "output"}}));
        let state = state_with(controller, &[]);
        let dispatcher = Dispatcher::new(&state);
        let request = CommandRequest::new(CommandKind::GpioRead).with("pin", ParamValue::Text("P9".to_string()));

        let value = dispatcher.query_gpio(&request).await.expect("gpio read succeeds");

        assert_eq!(value["pin"], json!("P9"));
        assert_eq!(value["value"], json!(1.0));
    }

    #[tokio::test]
    async fn mutation_invalidates_its_categories_even_when_the_controller_rejects_it() {
        let controller = MockControllerClient::new().failing_on("M106");
        let state = state_with(controller, &[]);
        state.cache.set("fans_probe", Category::Fans, json!({"stale": true}));
        let dispatcher = Dispatcher::new(&state);
        let request = CommandRequest { kind: CommandKind::VacuumOn, parameters: BTreeMap::from([("vacuum_power".to_string(), ParamValue::Number(255.0))]) };

        let err = dispatcher.dispatch_mutation(&request).await.unwrap_err();

        assert!(matches!(err, GatewayError::ControllerError(_)));
        assert!(state.cache.is_empty());
    }
}
