use pnp_core::{GatewayError, ParamValue};
use serde_json::Value;
use std::collections::BTreeMap;

/// Converts the `parameters` object of an inbound request body into the
/// scalar `ParamValue` map the core pipeline consumes (spec §6.1).
pub fn params_from_body(body: &Value) -> Result<BTreeMap<String, ParamValue>, GatewayError> {
    let object = body.get("parameters").unwrap_or(body);
    let Some(map) = object.as_object() else {
        return Err(GatewayError::InvalidRequest("request body must be a JSON object".to_string()));
    };

    let mut parameters = BTreeMap::new();
    for (key, value) in map {
        let parsed = match value {
            Value::String(s) => ParamValue::Text(s.clone()),
            Value::Bool(b) => ParamValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ParamValue::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    ParamValue::Number(f)
                } else {
                    return Err(GatewayError::InvalidRequest(format!("parameter {key} is not a representable number")));
                }
            }
            other => return Err(GatewayError::InvalidRequest(format!("parameter {key} has unsupported type {other}"))),
        };
        parameters.insert(key.clone(), parsed);
    }
    Ok(parameters)
}

/// Extracts the caller's peer identity for `AuthLog` bookkeeping: the
/// `X-Forwarded-For` header if present, else `"unknown"`.
pub fn peer_from_headers(headers: &axum::http::HeaderMap) -> String {
    headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()).unwrap_or("unknown").to_string()
}

pub fn credential_secret_from_headers(headers: &axum::http::HeaderMap) -> Option<String> {
    headers.get("x-api-key").and_then(|v| v.to_str().ok()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_numbers_strings_and_bools() {
        let body = json!({ "parameters": { "x": 1.5, "pin": "P1", "enabled": true, "steps": 11 } });
        let parsed = params_from_body(&body).unwrap();
        assert_eq!(parsed.get("x").and_then(ParamValue::as_f64), Some(1.5));
        assert_eq!(parsed.get("pin").and_then(ParamValue::as_str), Some("P1"));
        assert_eq!(parsed.get("enabled").and_then(ParamValue::as_bool), Some(true));
        assert_eq!(parsed.get("steps").and_then(ParamValue::as_i64), Some(11));
    }

    #[test]
    fn falls_back_to_the_body_itself_when_there_is_no_parameters_wrapper() {
        let body = json!({ "x": 1.0 });
        let parsed = params_from_body(&body).unwrap();
        assert_eq!(parsed.get("x").and_then(ParamValue::as_f64), Some(1.0));
    }

    #[test]
    fn non_object_body_is_rejected() {
        let body = json!([1, 2, 3]);
        assert!(params_from_body(&body).is_err());
    }
}
