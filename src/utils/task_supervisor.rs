use std::collections::HashMap;
use std::future::{poll_fn, Future};
use std::pin::Pin;
use std::task::Poll;
use std::time::Duration;
use tokio::task::JoinHandle;
use crate::error::{Error, Result};
use tracing::{info, warn};

/// Task Supervisor - Tracks the service's long-running tasks
///
/// ## Purpose
/// Every task returns `Result<()>`. The service waits for the first task to
/// end, whichever it is, because any of them ending means the process should
/// stop and let its supervisor restart it.
///
/// ## Usage
/// ```rust,ignore
/// let mut supervisor = TaskSupervisor::new();
/// supervisor.spawn("ingestion", ingestion.run(shutdown.clone()));
/// supervisor.spawn("rollup_refresher", refresher.run(shutdown.clone()));
///
/// if let Some((name, result)) = supervisor.wait_any().await {
///     trigger.trigger();
///     supervisor.shutdown(Duration::from_secs(10)).await;
/// }
/// ```
pub struct TaskSupervisor {
    tasks: HashMap<String, JoinHandle<Result<()>>>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        TaskSupervisor {
            tasks: HashMap::new(),
        }
    }

    /// Spawn a new background task and register it for monitoring
    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F) -> &mut Self
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        let handle = tokio::spawn(future);

        info!("Spawned background task: {}", name);
        self.tasks.insert(name, handle);
        self
    }

    /// Waits for the first registered task to finish and removes it.
    /// A panic or abort is reported as [`Error::Task`].
    pub async fn wait_any(&mut self) -> Option<(String, Result<()>)> {
        if self.tasks.is_empty() {
            return None;
        }

        let tasks = &mut self.tasks;
        let (name, joined) = poll_fn(|cx| {
            for (name, handle) in tasks.iter_mut() {
                if let Poll::Ready(joined) = Pin::new(handle).poll(cx) {
                    return Poll::Ready((name.clone(), joined));
                }
            }
            Poll::Pending
        })
        .await;

        self.tasks.remove(&name);
        let result = joined.unwrap_or_else(|e| Err(Error::Task(format!("Task {} failed: {}", name, e))));
        Some((name, result))
    }

    /// Gives every remaining task `grace` to finish on its own, then aborts it.
    pub async fn shutdown(&mut self, grace: Duration) {
        info!("Shutting down {} background tasks", self.tasks.len());
        let deadline = tokio::time::Instant::now() + grace;

        for (name, mut handle) in self.tasks.drain() {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(Ok(()))) => info!("Task {} completed", name),
                Ok(Ok(Err(e))) => warn!("Task {} ended with error: {}", name, e),
                Ok(Err(e)) => warn!("Task {} failed: {}", name, e),
                Err(_) => {
                    handle.abort();
                    warn!("Aborted task: {}", name);
                }
            }
        }
    }
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}
