//! Registry of detached background work.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinSet;

/// Detached tasks that must finish before the process exits.
///
/// Spawning never blocks the caller; [`BackgroundTasks::drain`] waits for
/// everything spawned so far.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `fut` as a detached task.
    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks();
        // Reap finished tasks so the set does not grow without bound
        while tasks.try_join_next().is_some() {}
        tasks.spawn(fut);
    }

    /// Number of tasks not yet reaped.
    pub fn len(&self) -> usize {
        self.tasks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for every task spawned so far.
    pub async fn drain(&self) {
        let mut pending = std::mem::take(&mut *self.tasks());
        if !pending.is_empty() {
            tracing::info!(pending = pending.len(), "Waiting for background tasks");
        }
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Background task failed");
            }
        }
    }
}
