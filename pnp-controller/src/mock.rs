use crate::client::{ControllerClient, ControllerError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Records every command it is asked to run and returns canned responses;
/// used in place of a live controller across the gateway's test suite.
#[derive(Default)]
pub struct MockControllerClient {
    commands: Mutex<Vec<String>>,
    status: Value,
    version: Value,
    fail_commands_matching: Option<String>,
    query_calls: Mutex<u32>,
}

impl MockControllerClient {
    pub fn new() -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            status: serde_json::json!({ "state": "ready" }),
            version: serde_json::json!({ "version": "mock-1.0" }),
            fail_commands_matching: None,
            query_calls: Mutex::new(0),
        }
    }

    /// Any `run_command` call whose text contains `needle` returns an error.
    pub fn failing_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_commands_matching = Some(needle.into());
        self
    }

    pub fn with_status(mut self, status: Value) -> Self {
        self.status = status;
        self
    }

    pub fn dispatched_commands(&self) -> Vec<String> {
        self.commands.lock().expect("mock controller mutex poisoned").clone()
    }

    pub fn query_call_count(&self) -> u32 {
        *self.query_calls.lock().expect("mock controller mutex poisoned")
    }
}

#[async_trait]
impl ControllerClient for MockControllerClient {
    async fn run_command(&self, text: &str) -> Result<(), ControllerError> {
        if let Some(needle) = &self.fail_commands_matching {
            if text.contains(needle.as_str()) {
                return Err(ControllerError::new(format!("mock rejected: {text}")));
            }
        }
        self.commands.lock().expect("mock controller mutex poisoned").push(text.to_string());
        Ok(())
    }

    async fn query_objects(&self, _objects: &HashMap<String, Option<Vec<String>>>) -> Result<Value, ControllerError> {
        *self.query_calls.lock().expect("mock controller mutex poisoned") += 1;
        Ok(self.status.clone())
    }

    async fn get_status(&self) -> Result<Value, ControllerError> {
        Ok(self.status.clone())
    }

    async fn emergency_stop(&self) -> Result<(), ControllerError> {
        self.commands.lock().expect("mock controller mutex poisoned").push("EMERGENCY_STOP".to_string());
        Ok(())
    }

    async fn get_version(&self) -> Result<Value, ControllerError> {
        Ok(self.version.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_dispatched_commands_in_order() {
        let mock = MockControllerClient::new();
        mock.run_command("G0 X10").await.unwrap();
        mock.run_command("G0 Y20").await.unwrap();
        assert_eq!(mock.dispatched_commands(), vec!["G0 X10", "G0 Y20"]);
    }

    #[tokio::test]
    async fn failing_on_rejects_matching_commands() {
        let mock = MockControllerClient::new().failing_on("M106");
        assert!(mock.run_command("M106 S255").await.is_err());
        assert!(mock.run_command("G0 X1").await.is_ok());
        assert_eq!(mock.dispatched_commands(), vec!["G0 X1"]);
    }

    #[tokio::test]
    async fn emergency_stop_is_recorded() {
        let mock = MockControllerClient::new();
        mock.emergency_stop().await.unwrap();
        assert_eq!(mock.dispatched_commands(), vec!["EMERGENCY_STOP"]);
    }
}
