use serde::Serialize;
use std::fmt;

/// The flat, stable error taxonomy exposed on the wire.
///
/// Every rejection anywhere in the pipeline collapses into one of these
/// before it reaches a caller; nothing downstream of a handler needs to know
/// which component raised it.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayError {
    InvalidRequest(String),
    MissingParameter(String),
    BoundsViolation(Vec<BoundsError>),
    UnknownCommand(String),
    Unauthenticated(String),
    PermissionDenied(String),
    RateLimited { retry_after_ms: u64 },
    KeyNotFound(String),
    ControllerError(String),
    ExecutionError(String),
    Cancelled(String),
}

/// One failed safety/validator check, as surfaced in `BOUNDS_VIOLATION.details.errors`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundsError {
    pub parameter: String,
    pub value: String,
    pub reason: String,
}

impl BoundsError {
    pub fn new(parameter: impl Into<String>, value: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl GatewayError {
    /// Stable wire identifier, as named in spec §7.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::InvalidRequest(_) => "INVALID_REQUEST",
            GatewayError::MissingParameter(_) => "MISSING_PARAMETER",
            GatewayError::BoundsViolation(_) => "BOUNDS_VIOLATION",
            GatewayError::UnknownCommand(_) => "UNKNOWN_COMMAND",
            GatewayError::Unauthenticated(_) => "UNAUTHENTICATED",
            GatewayError::PermissionDenied(_) => "PERMISSION_DENIED",
            GatewayError::RateLimited { .. } => "RATE_LIMITED",
            GatewayError::KeyNotFound(_) => "KEY_NOT_FOUND",
            GatewayError::ControllerError(_) => "CONTROLLER_ERROR",
            GatewayError::ExecutionError(_) => "EXECUTION_ERROR",
            GatewayError::Cancelled(_) => "CANCELLED",
        }
    }

    /// HTTP status per the mapping table in spec §6.1.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::InvalidRequest(_)
            | GatewayError::MissingParameter(_)
            | GatewayError::BoundsViolation(_) => 400,
            GatewayError::Unauthenticated(_) => 401,
            GatewayError::PermissionDenied(_) => 403,
            GatewayError::UnknownCommand(_) | GatewayError::KeyNotFound(_) => 404,
            GatewayError::RateLimited { .. } => 429,
            GatewayError::ExecutionError(_) | GatewayError::Cancelled(_) => 500,
            GatewayError::ControllerError(_) => 502,
        }
    }

    pub fn message(&self) -> String {
        match self {
            GatewayError::InvalidRequest(m) => m.clone(),
            GatewayError::MissingParameter(name) => format!("missing required parameter {name}"),
            GatewayError::BoundsViolation(_) => "one or more safety checks failed".to_string(),
            GatewayError::UnknownCommand(kind) => format!("unknown command kind: {kind}"),
            GatewayError::Unauthenticated(m) => m.clone(),
            GatewayError::PermissionDenied(m) => m.clone(),
            GatewayError::RateLimited { .. } => "rate limit exceeded".to_string(),
            GatewayError::KeyNotFound(id) => format!("credential not found: {id}"),
            GatewayError::ControllerError(m) => m.clone(),
            GatewayError::ExecutionError(m) => m.clone(),
            GatewayError::Cancelled(m) => m.clone(),
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for GatewayError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_spec_table() {
        assert_eq!(GatewayError::MissingParameter("x".into()).status_code(), 400);
        assert_eq!(GatewayError::Unauthenticated("no key".into()).status_code(), 401);
        assert_eq!(GatewayError::PermissionDenied("need admin".into()).status_code(), 403);
        assert_eq!(GatewayError::UnknownCommand("frob".into()).status_code(), 404);
        assert_eq!(GatewayError::RateLimited { retry_after_ms: 10 }.status_code(), 429);
        assert_eq!(GatewayError::ExecutionError("oops".into()).status_code(), 500);
        assert_eq!(GatewayError::ControllerError("timeout".into()).status_code(), 502);
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = GatewayError::UnknownCommand("spin".into());
        assert_eq!(err.to_string(), "UNKNOWN_COMMAND: unknown command kind: spin");
    }
}
