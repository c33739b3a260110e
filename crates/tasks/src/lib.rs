//! Task management.
//!
//! A [`TaskManager`] owns the node's shutdown signal and tracks every task
//! spawned through its [`TaskExecutor`]s. Critical tasks report a panic back
//! to the manager, which lets the node shut down instead of limping along
//! without, say, its sync loop.

use std::{any::Any, future::Future, panic::AssertUnwindSafe, time::Duration};

use futures::FutureExt;
use tokio::{runtime::Handle, sync::mpsc, task::JoinHandle};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, warn};

mod metrics;
use metrics::{IncCounterOnDrop, TaskExecutorMetrics};

/// Shutdown signal handed to long-running tasks.
pub type Shutdown = CancellationToken;

/// A critical task panicked.
#[derive(Debug, Clone, thiserror::Error)]
#[error("critical task `{task_name}` panicked: `{error}`")]
pub struct PanickedTaskError {
    task_name: &'static str,
    error: String,
}

impl PanickedTaskError {
    fn new(task_name: &'static str, panic: &(dyn Any + Send)) -> Self {
        let error = if let Some(s) = panic.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self { task_name, error }
    }

    pub fn task_name(&self) -> &'static str {
        self.task_name
    }
}

/// Owns the shutdown signal and the set of spawned tasks.
#[derive(Debug)]
pub struct TaskManager {
    handle: Handle,
    shutdown: Shutdown,
    tracker: TaskTracker,
    panicked_tx: mpsc::UnboundedSender<PanickedTaskError>,
    panicked_rx: mpsc::UnboundedReceiver<PanickedTaskError>,
}

impl TaskManager {
    pub fn new(handle: Handle) -> Self {
        let (panicked_tx, panicked_rx) = mpsc::unbounded_channel();
        Self {
            handle,
            shutdown: Shutdown::new(),
            tracker: TaskTracker::new(),
            panicked_tx,
            panicked_rx,
        }
    }

    /// Manager for the runtime this is called from.
    ///
    /// # Panics
    ///
    /// Panics outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    pub fn executor(&self) -> TaskExecutor {
        TaskExecutor {
            handle: self.handle.clone(),
            shutdown: self.shutdown.clone(),
            tracker: self.tracker.clone(),
            panicked_tx: self.panicked_tx.clone(),
            metrics: TaskExecutorMetrics::default(),
        }
    }

    pub fn shutdown_signal(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Number of tasks still running.
    pub fn running(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until `signal` resolves, shutdown is triggered, or a critical task
    /// panics.
    pub async fn wait_for<F>(&mut self, signal: F) -> Result<(), PanickedTaskError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = signal => Ok(()),
            _ = self.shutdown.cancelled() => Ok(()),
            Some(err) = self.panicked_rx.recv() => Err(err),
        }
    }

    /// Fire the shutdown signal and wait up to `timeout` for every task to
    /// finish. Returns `false` if some were still running at the deadline.
    pub async fn graceful_shutdown(self, timeout: Duration) -> bool {
        self.shutdown.cancel();
        self.tracker.close();

        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => {
                debug!("All tasks finished");
                true
            }
            Err(_) => {
                warn!(remaining = self.tracker.len(), ?timeout, "Tasks still running after shutdown");
                false
            }
        }
    }
}

/// Cloneable handle for spawning tracked tasks.
#[derive(Debug, Clone)]
pub struct TaskExecutor {
    handle: Handle,
    shutdown: Shutdown,
    tracker: TaskTracker,
    panicked_tx: mpsc::UnboundedSender<PanickedTaskError>,
    metrics: TaskExecutorMetrics,
}

impl TaskExecutor {
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn on_shutdown_signal(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Spawn a task that is dropped when shutdown fires.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.metrics.regular_tasks_total.increment(1);
        let finished = IncCounterOnDrop::new(self.metrics.finished_regular_tasks_total.clone());
        let shutdown = self.shutdown.clone();

        let task = async move {
            let _finished = finished;
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = fut => {}
            }
        };
        self.tracker.spawn_on(task, &self.handle)
    }

    /// Spawn a task whose panic shuts the node down. The task is dropped when
    /// shutdown fires.
    pub fn spawn_critical<F>(&self, name: &'static str, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        self.spawn_critical_with_shutdown(name, move |_| async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = fut => {}
            }
        })
    }

    /// Spawn a critical task that receives the shutdown signal and is
    /// expected to return on its own once it fires.
    pub fn spawn_critical_with_shutdown<F, Fut>(&self, name: &'static str, f: F) -> JoinHandle<()>
    where
        F: FnOnce(Shutdown) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.metrics.critical_tasks_total.increment(1);
        let finished = IncCounterOnDrop::new(self.metrics.finished_critical_tasks_total.clone());
        let panicked_tx = self.panicked_tx.clone();
        let fut = f(self.shutdown.clone());

        let task = async move {
            let _finished = finished;
            if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
                let err = PanickedTaskError::new(name, &*panic);
                error!(task = name, error = %err, "Critical task panicked");
                let _ = panicked_tx.send(err);
            }
        };
        self.tracker.spawn_on(task, &self.handle)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    use super::*;

    #[tokio::test]
    async fn test_spawn_runs_to_completion() {
        let manager = TaskManager::current();
        let executor = manager.executor();
        let (tx, rx) = tokio::sync::oneshot::channel();

        executor.spawn(async move {
            let _ = tx.send(42);
        });

        assert_eq!(rx.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_shutdown_drops_regular_tasks() {
        let manager = TaskManager::current();
        let executor = manager.executor();
        executor.spawn(futures::future::pending());
        executor.spawn_critical("pending", futures::future::pending());

        assert!(manager.graceful_shutdown(Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_graceful_task_sees_signal() {
        let manager = TaskManager::current();
        let executor = manager.executor();
        let cleaned_up = Arc::new(AtomicBool::new(false));

        let flag = cleaned_up.clone();
        executor.spawn_critical_with_shutdown("graceful", move |shutdown| async move {
            shutdown.cancelled().await;
            flag.store(true, Ordering::SeqCst);
        });

        assert!(manager.graceful_shutdown(Duration::from_secs(5)).await);
        assert!(cleaned_up.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_critical_panic_is_reported() {
        let mut manager = TaskManager::current();
        let executor = manager.executor();

        executor.spawn_critical("doomed", async { panic!("boom") });

        let err = manager
            .wait_for(futures::future::pending())
            .await
            .unwrap_err();
        assert_eq!(err.task_name(), "doomed");
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_wait_for_signal() {
        let mut manager = TaskManager::current();
        assert!(manager.wait_for(async {}).await.is_ok());
    }
}
