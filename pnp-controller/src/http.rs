use crate::client::{ControllerClient, ControllerError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Configuration for the HTTP/JSON-RPC transport to the controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl ControllerConfig {
    fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// HTTP client speaking the controller's JSON-RPC-over-HTTP dialect. Every
/// call carries the configured timeout; expiry surfaces as a
/// `ControllerError` (spec §5, "Cancellation & timeouts").
pub struct HttpControllerClient {
    http: reqwest::Client,
    config: ControllerConfig,
}

impl HttpControllerClient {
    pub fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ControllerError::new(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let builder = self.http.post(format!("{}{endpoint}", self.config.base_url()));
        match &self.config.api_key {
            Some(key) => builder.header("X-Api-Key", key),
            None => builder,
        }
    }

    async fn call(&self, endpoint: &str, body: Value) -> Result<Value, ControllerError> {
        let response = self
            .request(endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ControllerError::new(format!("request to {endpoint} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ControllerError::new(format!("{endpoint} returned status {}", response.status())));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| ControllerError::new(format!("malformed response from {endpoint}: {e}")))?;

        parsed
            .get("result")
            .cloned()
            .ok_or_else(|| ControllerError::new(format!("{endpoint} response missing 'result'")))
    }
}

#[async_trait]
impl ControllerClient for HttpControllerClient {
    async fn run_command(&self, text: &str) -> Result<(), ControllerError> {
        let result = self.call("/api/printer/gcode/script", json!({ "script": text })).await?;
        match result.get("status").and_then(Value::as_str) {
            Some("ok") => Ok(()),
            _ => Err(ControllerError::new(format!("command rejected: {result}"))),
        }
    }

    async fn query_objects(&self, objects: &HashMap<String, Option<Vec<String>>>) -> Result<Value, ControllerError> {
        self.call("/api/printer/query", json!({ "objects": objects })).await
    }

    async fn get_status(&self) -> Result<Value, ControllerError> {
        self.call("/api/printer/status", json!({})).await
    }

    async fn emergency_stop(&self) -> Result<(), ControllerError> {
        self.call("/api/printer/emergency_stop", json!({})).await.map(|_| ())
    }

    async fn get_version(&self) -> Result<Value, ControllerError> {
        self.call("/api/server/info", json!({})).await
    }
}
