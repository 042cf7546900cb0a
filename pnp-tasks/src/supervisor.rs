use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

struct Handle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

/// Owns background tasks (PWM ramps, batch executions) keyed by a string
/// such as `ramp:P1` (spec §4.H). At most one task exists per key: spawning
/// a new task for an occupied key cancels and awaits the old one first.
#[derive(Clone)]
pub struct TaskSupervisor {
    tasks: Arc<DashMap<String, Handle>>,
    preemption_grace: Duration,
}

impl TaskSupervisor {
    pub fn new(preemption_grace: Duration) -> Self {
        Self { tasks: Arc::new(DashMap::new()), preemption_grace }
    }

    /// Cancels and installs under `key`, waiting up to the configured grace
    /// period for the previous task (if any) to observe cancellation before
    /// the new one starts (spec scenario S6).
    pub async fn spawn<F, Fut>(&self, key: impl Into<String>, body: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let key = key.into();
        self.cancel_and_wait(&key).await;

        let token = CancellationToken::new();
        let join = tokio::spawn(body(token.clone()));
        self.tasks.insert(key, Handle { token, join });
    }

    async fn cancel_and_wait(&self, key: &str) {
        let Some((_, previous)) = self.tasks.remove(key) else { return };
        previous.token.cancel();
        if tokio::time::timeout(self.preemption_grace, previous.join).await.is_err() {
            warn!(key, "preempted task did not observe cancellation within grace period");
        }
    }

    /// Requests cancellation; idempotent, returns immediately without
    /// waiting for the task to exit.
    pub fn cancel(&self, key: &str) {
        if let Some(handle) = self.tasks.get(key) {
            handle.token.cancel();
        }
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.tasks.contains_key(key)
    }

    pub fn active_keys(&self) -> Vec<String> {
        self.tasks.iter().map(|e| e.key().clone()).collect()
    }

    /// Cancels every task and waits for all of them to exit; used on
    /// shutdown (spec §4.H).
    pub async fn cancel_all(&self) {
        let keys: Vec<String> = self.tasks.iter().map(|e| e.key().clone()).collect();
        let mut joins = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some((_, handle)) = self.tasks.remove(&key) {
                handle.token.cancel();
                joins.push(handle.join);
            }
        }
        for join in joins {
            let _ = join.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    #[tokio::test]
    async fn spawning_a_second_task_under_the_same_key_cancels_the_first() {
        let supervisor = TaskSupervisor::new(Duration::from_millis(200));
        let first_cancelled = Arc::new(AtomicBool::new(false));
        let flag = first_cancelled.clone();

        supervisor
            .spawn("ramp:P1", move |token| async move {
                token.cancelled().await;
                flag.store(true, Ordering::SeqCst);
            })
            .await;

        supervisor.spawn("ramp:P1", |_token| async move {}).await;

        assert!(first_cancelled.load(Ordering::SeqCst));
        assert_eq!(supervisor.active_keys().len(), 1);
    }

    #[tokio::test]
    async fn cancel_all_waits_for_every_task_to_exit() {
        let supervisor = TaskSupervisor::new(Duration::from_millis(200));
        let completed = Arc::new(AtomicU32::new(0));

        for key in ["a", "b", "c"] {
            let counter = completed.clone();
            supervisor
                .spawn(key, move |token| async move {
                    token.cancelled().await;
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }

        supervisor.cancel_all().await;
        assert_eq!(completed.load(Ordering::SeqCst), 3);
        assert!(supervisor.active_keys().is_empty());
    }

    #[tokio::test]
    async fn cancel_is_idempotent_on_unknown_key() {
        let supervisor = TaskSupervisor::new(Duration::from_millis(50));
        supervisor.cancel("nothing-here");
    }
}
