//! Abstract controller transport: the `ControllerClient` trait consumed by
//! the gateway core, an HTTP/JSON-RPC implementation, and an in-memory mock
//! for tests.

mod client;
mod http;
mod mock;

pub use client::{ControllerClient, ControllerError};
pub use http::{ControllerConfig, HttpControllerClient};
pub use mock::MockControllerClient;
