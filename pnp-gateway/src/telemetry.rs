//! Validated response shapes for the `gpio` and `sensors` cache categories
//! (spec §4 supplement, grounded in `gpio_monitor.py`/`sensor_query.py`):
//! the raw controller `query_objects` payload is parsed into one of these
//! before it is cached, so a malformed controller response surfaces as a
//! controller error instead of silently caching garbage.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpioState {
    pub pin: String,
    pub value: f64,
    pub mode: String,
}

impl GpioState {
    pub fn from_controller_response(pin: &str, raw: &Value) -> Result<Self, String> {
        let object = raw
            .get(format!("output_pin {pin}"))
            .or_else(|| raw.get(pin))
            .ok_or_else(|| format!("controller response missing object for pin '{pin}'"))?;
        let value = object.get("value").and_then(Value::as_f64).ok_or_else(|| format!("pin '{pin}' response missing numeric 'value'"))?;
        let mode = object.get("mode").and_then(Value::as_str).unwrap_or("output").to_string();
        Ok(Self { pin: pin.to_string(), value, mode })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    pub name: String,
    pub kind: String,
    pub value: f64,
}

impl SensorReading {
    pub fn from_controller_response(name: &str, raw: &Value) -> Result<Self, String> {
        let object = raw.get(name).ok_or_else(|| format!("controller response missing object for sensor '{name}'"))?;
        let value = object.get("value").and_then(Value::as_f64).ok_or_else(|| format!("sensor '{name}' response missing numeric 'value'"))?;
        let kind = object.get("type").and_then(Value::as_str).unwrap_or("generic").to_string();
        Ok(Self { name: name.to_string(), kind, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpio_state_parses_moonraker_style_output_pin_object() {
        let raw = serde_json::json!({ "output_pin P1": { "value": 1.0, "mode": "output" } });
        let state = GpioState::from_controller_response("P1", &raw).unwrap();
        assert_eq!(state.pin, "P1");
        assert_eq!(state.value, 1.0);
        assert_eq!(state.mode, "output");
    }

    #[test]
    fn gpio_state_rejects_response_missing_the_requested_pin() {
        let raw = serde_json::json!({ "output_pin P2": { "value": 0.0 } });
        assert!(GpioState::from_controller_response("P1", &raw).is_err());
    }

    #[test]
    fn sensor_reading_parses_named_object() {
        let raw = serde_json::json!({ "temperature_sensor bed": { "value": 42.5, "type": "temperature" } });
        let reading = SensorReading::from_controller_response("temperature_sensor bed", &raw).unwrap();
        assert_eq!(reading.kind, "temperature");
        assert_eq!(reading.value, 42.5);
    }
}
