//! Credential registry, capability checks, and sliding-window rate budgets
//! for the pick-and-place gateway.

mod authlog;
mod credential;
mod error;
mod persistence;
mod rate_window;
mod registry;

pub use authlog::AuthLog;
pub use credential::{Capability, Credential, CredentialSummary};
pub use error::SecurityError;
pub use persistence::CredentialStorePath;
pub use rate_window::RateWindow;
pub use registry::CredentialRegistry;
