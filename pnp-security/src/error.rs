use std::fmt;

/// Credential-registry errors, kept separate from `pnp_core::GatewayError` so
/// this crate has no dependency on the rest of the pipeline — the Dispatcher
/// maps these onto the wire taxonomy (spec §7).
#[derive(Debug)]
pub enum SecurityError {
    Unauthenticated(String),
    PermissionDenied(String),
    RateLimited { retry_after_ms: u64 },
    KeyNotFound(String),
    Persistence(String),
}

impl fmt::Display for SecurityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityError::Unauthenticated(m) => write!(f, "unauthenticated: {m}"),
            SecurityError::PermissionDenied(m) => write!(f, "permission denied: {m}"),
            SecurityError::RateLimited { retry_after_ms } => write!(f, "rate limited, retry after {retry_after_ms}ms"),
            SecurityError::KeyNotFound(id) => write!(f, "credential not found: {id}"),
            SecurityError::Persistence(m) => write!(f, "persistence error: {m}"),
        }
    }
}

impl std::error::Error for SecurityError {}
