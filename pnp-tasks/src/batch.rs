use serde::Serialize;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Ok,
    Error,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItemResult {
    pub index: usize,
    pub status: ItemStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Success,
    PartialSuccess,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub status: BatchStatus,
    pub results: Vec<BatchItemResult>,
}

/// Runs `count` commands through `execute_one` in order (spec §6.2,
/// `POST /api/v1/batch/execute`). If `stop_on_error` is set, the first
/// failure halts the batch and every remaining item is reported cancelled;
/// otherwise execution continues and the batch reports `partial_success`.
/// `execute_one` is responsible for translating, dispatching, and
/// invalidating any cache categories its command touches — including on
/// failure, per the documented policy of invalidating optimistically since
/// the controller's state may have partially changed.
pub async fn execute_batch<F, Fut>(count: usize, stop_on_error: bool, token: CancellationToken, execute_one: F) -> BatchResult
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Result<serde_json::Value, String>>,
{
    let mut results = Vec::with_capacity(count);
    let mut any_failed = false;
    let mut halted = false;

    for index in 0..count {
        if halted {
            results.push(BatchItemResult { index, status: ItemStatus::Cancelled, result: None, error: None });
            continue;
        }
        if token.is_cancelled() {
            warn!(index, "batch execution cancelled before item ran");
            results.push(BatchItemResult { index, status: ItemStatus::Cancelled, result: None, error: None });
            halted = true;
            continue;
        }

        match execute_one(index).await {
            Ok(value) => {
                results.push(BatchItemResult { index, status: ItemStatus::Ok, result: Some(value), error: None });
            }
            Err(err) => {
                any_failed = true;
                results.push(BatchItemResult { index, status: ItemStatus::Error, result: None, error: Some(err) });
                if stop_on_error {
                    halted = true;
                }
            }
        }
    }

    let status = if any_failed { BatchStatus::PartialSuccess } else { BatchStatus::Success };
    BatchResult { status, results }
}
