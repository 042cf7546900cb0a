//! Cancellable background task supervisor: PWM ramps, batch execution, and
//! key-based preemption for the pick-and-place gateway.

mod batch;
mod ramp;
mod supervisor;

pub use batch::{execute_batch, BatchItemResult, BatchResult, BatchStatus, ItemStatus};
pub use ramp::{run_pwm_ramp, RampRegistry, RampStatus};
pub use supervisor::TaskSupervisor;

pub use tokio_util::sync::CancellationToken;
