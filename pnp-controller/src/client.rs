use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Transport-level failure talking to the controller: connection refused,
/// timeout, or a malformed response. Distinct from a command the controller
/// understood and rejected.
#[derive(Debug, Clone)]
pub struct ControllerError {
    pub message: String,
}

impl ControllerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "controller error: {}", self.message)
    }
}

impl std::error::Error for ControllerError {}

/// Abstract interface the core consumes to reach the upstream
/// motion-controller service (spec §6.2). Implementations may speak
/// HTTP/JSON-RPC over the network or, in tests, stand in entirely in memory.
#[async_trait]
pub trait ControllerClient: Send + Sync {
    /// Submits a single low-level command line (e.g. `"G0 X10 Y20 F1500"`).
    async fn run_command(&self, text: &str) -> Result<(), ControllerError>;

    /// Structured state query. Keys are object names; values are either a
    /// field-name list or `null` for "all fields" (mirrors the controller's
    /// own query_objects contract).
    async fn query_objects(&self, objects: &HashMap<String, Option<Vec<String>>>) -> Result<Value, ControllerError>;

    async fn get_status(&self) -> Result<Value, ControllerError>;

    async fn emergency_stop(&self) -> Result<(), ControllerError>;

    async fn get_version(&self) -> Result<Value, ControllerError>;
}
