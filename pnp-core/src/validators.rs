use crate::command::ParamValue;
use crate::error::BoundsError;
use std::collections::HashMap;
use std::sync::Arc;

/// A predicate on a named parameter's value. Returns `Err(reason)` on
/// rejection.
pub type Validator = Arc<dyn Fn(&ParamValue) -> Result<(), String> + Send + Sync>;

/// Registry of parameter validators keyed by parameter name (not by command):
/// registering a validator for `feedrate` applies to every command that
/// declares a `feedrate` parameter (spec §4.C).
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    by_param: HashMap<String, Vec<Validator>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, parameter: impl Into<String>, validator: Validator) {
        self.by_param.entry(parameter.into()).or_default().push(validator);
    }

    /// Convenience: register a numeric range `(min, max]` style predicate,
    /// matching the `feedrate -> v ∈ (0, max_feedrate]` example in spec §4.C.
    pub fn register_range(&mut self, parameter: impl Into<String>, min_exclusive: f64, max_inclusive: f64) {
        self.register(
            parameter,
            Arc::new(move |v: &ParamValue| {
                let n = v.as_f64().ok_or_else(|| "expected a number".to_string())?;
                if n > min_exclusive && n <= max_inclusive {
                    Ok(())
                } else {
                    Err(format!("must be in ({min_exclusive}, {max_inclusive}]"))
                }
            }),
        );
    }

    /// Run every validator registered for `parameter` against `value`;
    /// all must hold (composable predicates, spec §4.C).
    pub fn validate(&self, parameter: &str, value: &ParamValue) -> Result<(), BoundsError> {
        if let Some(validators) = self.by_param.get(parameter) {
            for validator in validators {
                if let Err(reason) = validator(value) {
                    return Err(BoundsError::new(parameter, value, reason));
                }
            }
        }
        Ok(())
    }

    /// Validate every supplied parameter that has a registered validator,
    /// collecting every failure rather than stopping at the first (spec §4.C:
    /// "collect failures").
    pub fn validate_all(&self, parameters: &std::collections::BTreeMap<String, ParamValue>) -> Vec<BoundsError> {
        let mut errors = Vec::new();
        for (name, value) in parameters {
            if let Err(e) = self.validate(name, value) {
                errors.push(e);
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_validator_accepts_inside_and_rejects_outside() {
        let mut reg = ValidatorRegistry::new();
        reg.register_range("feedrate", 0.0, 6000.0);
        assert!(reg.validate("feedrate", &ParamValue::Number(1500.0)).is_ok());
        assert!(reg.validate("feedrate", &ParamValue::Number(0.0)).is_err());
        assert!(reg.validate("feedrate", &ParamValue::Number(6001.0)).is_err());
    }

    #[test]
    fn composable_validators_all_must_pass() {
        let mut reg = ValidatorRegistry::new();
        reg.register(
            "power",
            Arc::new(|v: &ParamValue| {
                if v.as_f64().unwrap_or(-1.0) >= 0.0 {
                    Ok(())
                } else {
                    Err("must be non-negative".into())
                }
            }),
        );
        reg.register_range("power", -1.0, 255.0);
        assert!(reg.validate("power", &ParamValue::Number(100.0)).is_ok());
        let err = reg.validate("power", &ParamValue::Number(-5.0)).unwrap_err();
        assert_eq!(err.parameter, "power");
    }

    #[test]
    fn unregistered_parameter_always_passes() {
        let reg = ValidatorRegistry::new();
        assert!(reg.validate("unknown", &ParamValue::Bool(true)).is_ok());
    }
}
