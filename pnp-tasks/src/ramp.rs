use dashmap::DashMap;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Snapshot of a running PWM ramp, exposed for introspection (e.g.
/// `GET /api/v1/pwm/ramps`, not present in the original Moonraker surface
/// but useful for operators watching a long ramp).
#[derive(Debug, Clone, Serialize)]
pub struct RampStatus {
    pub pin: String,
    pub start: f64,
    pub end: f64,
    pub duration_secs: f64,
    pub total_steps: u32,
    pub completed_steps: u32,
}

/// Tracks in-flight ramps by key so their progress can be queried while the
/// owning task is still running.
#[derive(Clone, Default)]
pub struct RampRegistry {
    inner: Arc<DashMap<String, RampStatus>>,
}

impl RampRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_ramps(&self) -> Vec<RampStatus> {
        self.inner.iter().map(|e| e.value().clone()).collect()
    }

    fn start(&self, key: &str, pin: &str, start: f64, end: f64, duration_secs: f64, total_steps: u32) {
        self.inner.insert(
            key.to_string(),
            RampStatus { pin: pin.to_string(), start, end, duration_secs, total_steps, completed_steps: 0 },
        );
    }

    fn advance(&self, key: &str) {
        if let Some(mut entry) = self.inner.get_mut(key) {
            entry.completed_steps += 1;
        }
    }

    fn finish(&self, key: &str) {
        self.inner.remove(key);
    }
}

/// Emits `steps` evenly spaced set-pin commands between `start` and `end`,
/// sleeping `duration/(steps-1)` between them, re-checking cancellation
/// before every step (spec §4.H). On cancellation the last-applied value is
/// left in place; on controller failure the ramp aborts and later steps are
/// skipped.
pub async fn run_pwm_ramp<F, Fut>(
    registry: RampRegistry,
    key: String,
    pin: String,
    start: f64,
    end: f64,
    duration: Duration,
    steps: u32,
    set_pin: F,
    token: CancellationToken,
) where
    F: Fn(f64) -> Fut,
    Fut: Future<Output = Result<(), String>>,
{
    if steps == 0 {
        registry.finish(&key);
        return;
    }
    registry.start(&key, &pin, start, end, duration.as_secs_f64(), steps);

    let step_interval = if steps > 1 { duration / (steps - 1) } else { Duration::ZERO };

    for step in 0..steps {
        if token.is_cancelled() {
            break;
        }
        let t = if steps > 1 { step as f64 / (steps - 1) as f64 } else { 1.0 };
        let value = start + (end - start) * t;

        if let Err(err) = set_pin(value).await {
            error!(pin = %pin, step, error = %err, "pwm ramp aborted by controller failure");
            break;
        }
        registry.advance(&key);

        if step + 1 < steps {
            tokio::select! {
                _ = tokio::time::sleep(step_interval) => {}
                _ = token.cancelled() => break,
            }
        }
    }

    registry.finish(&key);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn ramp_emits_one_command_per_step() {
        let registry = RampRegistry::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let token = CancellationToken::new();

        run_pwm_ramp(
            registry.clone(),
            "ramp:P1".into(),
            "P1".into(),
            0.0,
            1.0,
            Duration::from_millis(10),
            5,
            move |_value| {
                let calls = calls2.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            token,
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(registry.active_ramps().is_empty());
    }

    #[tokio::test]
    async fn cancellation_stops_before_remaining_steps_run() {
        let registry = RampRegistry::new();
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();
        let token_for_cancel = token.clone();

        let calls2 = calls.clone();
        let ramp = run_pwm_ramp(
            registry.clone(),
            "ramp:P2".into(),
            "P2".into(),
            0.0,
            10.0,
            Duration::from_millis(200),
            11,
            move |_value| {
                let calls = calls2.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            token,
        );

        tokio::pin!(ramp);
        tokio::select! {
            _ = &mut ramp => {}
            _ = tokio::time::sleep(Duration::from_millis(30)) => {
                token_for_cancel.cancel();
                ramp.await;
            }
        }

        let observed = calls.load(Ordering::SeqCst);
        assert!(observed < 11, "ramp should have been preempted before completion, got {observed} steps");
    }

    #[tokio::test]
    async fn controller_failure_aborts_remaining_steps() {
        let registry = RampRegistry::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let token = CancellationToken::new();

        run_pwm_ramp(
            registry,
            "ramp:P3".into(),
            "P3".into(),
            0.0,
            1.0,
            Duration::from_millis(10),
            5,
            move |_value| {
                let calls = calls2.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n == 1 {
                        Err("controller unreachable".to_string())
                    } else {
                        Ok(())
                    }
                }
            },
            token,
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
