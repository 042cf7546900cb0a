use crate::command::{CommandKind, CommandRequest, ParamValue};
use crate::error::BoundsError;
use crate::motion::{Axis, MotionContext, PositioningMode};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Configured at startup, read-only thereafter (spec §3).
#[derive(Debug, Clone)]
pub struct SafetyLimits {
    pub axis_min: HashMap<Axis, f64>,
    pub axis_max: HashMap<Axis, f64>,
    pub max_feedrate: f64,
    pub pwm_min: f64,
    pub pwm_max: f64,
    pub max_feed_distance: f64,
    pub max_feed_speed: Option<f64>,
    pub require_homed_before_move: bool,
    pub gpio_allow_list: Option<HashSet<String>>,
    pub known_sensors: HashSet<String>,
}

impl Default for SafetyLimits {
    fn default() -> Self {
        let mut axis_min = HashMap::new();
        let mut axis_max = HashMap::new();
        for axis in Axis::ALL {
            axis_min.insert(axis, 0.0);
            axis_max.insert(axis, 300.0);
        }
        Self {
            axis_min,
            axis_max,
            max_feedrate: 6000.0,
            pwm_min: 0.0,
            pwm_max: 255.0,
            max_feed_distance: 200.0,
            max_feed_speed: None,
            require_homed_before_move: false,
            gpio_allow_list: None,
            known_sensors: HashSet::new(),
        }
    }
}

/// Set of axes known to have been homed since the last reset. Mutated only
/// by the Safety Manager, guarded by a single mutex per spec §5.
#[derive(Default)]
pub struct HomedAxes {
    inner: Mutex<HashSet<Axis>>,
}

impl HomedAxes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self, axes: &[Axis]) {
        let mut set = self.inner.lock().expect("HomedAxes mutex poisoned");
        for &axis in axes {
            set.insert(axis);
        }
    }

    pub fn is_homed(&self, axis: Axis) -> bool {
        self.inner.lock().expect("HomedAxes mutex poisoned").contains(&axis)
    }

    pub fn clear(&self) {
        self.inner.lock().expect("HomedAxes mutex poisoned").clear();
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().expect("HomedAxes mutex poisoned").is_empty()
    }
}

/// Stateful limit enforcement: axis bounds, homed-axes set, numerical
/// envelopes per command family (spec §4.E).
pub struct SafetyManager {
    limits: SafetyLimits,
    homed: HomedAxes,
}

impl SafetyManager {
    pub fn new(limits: SafetyLimits) -> Self {
        Self {
            limits,
            homed: HomedAxes::new(),
        }
    }

    pub fn limits(&self) -> &SafetyLimits {
        &self.limits
    }

    pub fn homed_axes(&self) -> &HomedAxes {
        &self.homed
    }

    /// `validate(request) -> (ok, errors[])`, per command family.
    pub fn validate(&self, request: &CommandRequest, context: &MotionContext) -> Result<(), Vec<BoundsError>> {
        let errors = match request.kind {
            CommandKind::Move | CommandKind::Pick | CommandKind::Place | CommandKind::PickAndPlace => {
                self.validate_move(request, context)
            }
            CommandKind::PwmSet | CommandKind::PwmRamp | CommandKind::VacuumOn | CommandKind::VacuumOff | CommandKind::VacuumSet => {
                self.validate_pwm(request)
            }
            CommandKind::FeederAdvance => self.validate_feeder(request),
            CommandKind::GpioWrite => self.validate_gpio_write(request),
            CommandKind::SensorRead => self.validate_sensor(request),
            CommandKind::Home | CommandKind::EmergencyStop => Vec::new(),
            _ => Vec::new(),
        };
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_move(&self, request: &CommandRequest, context: &MotionContext) -> Vec<BoundsError> {
        let mut errors = Vec::new();
        for axis in Axis::ALL {
            let Some(value) = request.get(axis.as_str()).and_then(ParamValue::as_f64) else {
                continue;
            };
            let target = match context.positioning_mode() {
                PositioningMode::Absolute => value,
                PositioningMode::Relative => context.get(axis) + value,
            };
            let min = *self.limits.axis_min.get(&axis).unwrap_or(&f64::MIN);
            let max = *self.limits.axis_max.get(&axis).unwrap_or(&f64::MAX);
            if target < min || target > max {
                errors.push(BoundsError::new(
                    axis.as_str(),
                    target,
                    format!("{axis} target {target} out of range [{min}, {max}]"),
                ));
            }
            if self.limits.require_homed_before_move && !self.homed.is_homed(axis) {
                errors.push(BoundsError::new(axis.as_str(), target, "unhomed axis"));
            }
        }
        if let Some(feedrate) = request.get("feedrate").and_then(ParamValue::as_f64) {
            if feedrate <= 0.0 || feedrate > self.limits.max_feedrate {
                errors.push(BoundsError::new(
                    "feedrate",
                    feedrate,
                    format!("must be in (0, {}]", self.limits.max_feedrate),
                ));
            }
        }
        errors
    }

    fn validate_pwm(&self, request: &CommandRequest) -> Vec<BoundsError> {
        let mut errors = Vec::new();
        if let Some(power) = request.get("power").and_then(ParamValue::as_f64).or_else(|| request.get("vacuum_power").and_then(ParamValue::as_f64)) {
            if power < self.limits.pwm_min || power > self.limits.pwm_max {
                errors.push(BoundsError::new(
                    "power",
                    power,
                    format!("must be in [{}, {}]", self.limits.pwm_min, self.limits.pwm_max),
                ));
            }
        }
        if let Some(value) = request.get("value").and_then(ParamValue::as_f64) {
            if !(0.0..=1.0).contains(&value) {
                errors.push(BoundsError::new("value", value, "must be in [0.0, 1.0]"));
            }
        }
        errors
    }

    fn validate_feeder(&self, request: &CommandRequest) -> Vec<BoundsError> {
        let mut errors = Vec::new();
        match request.get("distance").and_then(ParamValue::as_f64) {
            Some(distance) if distance > 0.0 && distance <= self.limits.max_feed_distance => {}
            Some(distance) => errors.push(BoundsError::new(
                "distance",
                distance,
                format!("must be in (0, {}]", self.limits.max_feed_distance),
            )),
            None => errors.push(BoundsError::new("distance", "<missing>", "required")),
        }
        if let (Some(speed), Some(max_speed)) = (request.get("speed").and_then(ParamValue::as_f64), self.limits.max_feed_speed) {
            if speed > max_speed {
                errors.push(BoundsError::new("speed", speed, format!("must be <= {max_speed}")));
            }
        }
        errors
    }

    fn validate_gpio_write(&self, request: &CommandRequest) -> Vec<BoundsError> {
        let mut errors = Vec::new();
        match request.get("value").and_then(ParamValue::as_i64) {
            Some(0) | Some(1) => {}
            Some(other) => errors.push(BoundsError::new("value", other, "digital value must be 0 or 1")),
            None => errors.push(BoundsError::new("value", "<missing>", "required")),
        }
        if let Some(allow_list) = &self.limits.gpio_allow_list {
            if let Some(pin) = request.get("pin").and_then(ParamValue::as_str) {
                if !allow_list.contains(pin) {
                    errors.push(BoundsError::new("pin", pin, "pin not in allow-list"));
                }
            }
        }
        errors
    }

    fn validate_sensor(&self, request: &CommandRequest) -> Vec<BoundsError> {
        let mut errors = Vec::new();
        if let Some(sensor) = request.get("sensor").and_then(ParamValue::as_str) {
            if !self.limits.known_sensors.is_empty() && !self.limits.known_sensors.contains(sensor) {
                errors.push(BoundsError::new("sensor", sensor, "unknown sensor type"));
            }
        }
        errors
    }

    /// Called by the Dispatcher once a `home` translation's low-level
    /// command has been accepted by the controller (spec §4.E).
    pub fn mark_homed(&self, axes: &[Axis]) {
        self.homed.mark(axes);
    }

    /// Emergency stop clears HomedAxes; task cancellation and cache
    /// invalidation are orchestrated by the Dispatcher (spec §4.E).
    pub fn clear_homed_axes(&self) {
        self.homed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandRequest;

    #[test]
    fn move_outside_axis_bounds_is_rejected() {
        let manager = SafetyManager::new(SafetyLimits::default());
        let ctx = MotionContext::new();
        let req = CommandRequest::new(CommandKind::Move).with("x", ParamValue::Number(500.0));
        let errors = manager.validate(&req, &ctx).unwrap_err();
        assert!(errors[0].parameter == "x");
        assert!(errors[0].reason.contains("300"));
    }

    #[test]
    fn unhomed_axis_rejected_when_required() {
        let mut limits = SafetyLimits::default();
        limits.require_homed_before_move = true;
        let manager = SafetyManager::new(limits);
        let ctx = MotionContext::new();
        let req = CommandRequest::new(CommandKind::Move).with("x", ParamValue::Number(10.0));
        let errors = manager.validate(&req, &ctx).unwrap_err();
        assert!(errors.iter().any(|e| e.reason == "unhomed axis"));
    }

    #[test]
    fn homing_then_moving_succeeds() {
        let mut limits = SafetyLimits::default();
        limits.require_homed_before_move = true;
        let manager = SafetyManager::new(limits);
        manager.mark_homed(&Axis::ALL);
        let ctx = MotionContext::new();
        let req = CommandRequest::new(CommandKind::Move).with("x", ParamValue::Number(10.0)).with("feedrate", ParamValue::Number(1000.0));
        assert!(manager.validate(&req, &ctx).is_ok());
    }

    #[test]
    fn gpio_digital_value_must_be_zero_or_one() {
        let manager = SafetyManager::new(SafetyLimits::default());
        let ctx = MotionContext::new();
        let req = CommandRequest::new(CommandKind::GpioWrite).with("value", ParamValue::Integer(2)).with("pin", ParamValue::Text("P1".into()));
        assert!(manager.validate(&req, &ctx).is_err());
    }

    #[test]
    fn emergency_stop_clears_homed_axes() {
        let manager = SafetyManager::new(SafetyLimits::default());
        manager.mark_homed(&Axis::ALL);
        assert!(!manager.homed_axes().is_empty());
        manager.clear_homed_axes();
        assert!(manager.homed_axes().is_empty());
    }
}
