//! Cleanup registry
//!
//! Teardowns queued during resolution, invoked together at shutdown. All
//! teardowns run concurrently and every one of them is awaited regardless of
//! earlier failures; the aggregate result reports the first failure in queue
//! order.

use futures::future::{BoxFuture, join_all};
use wirebox_domain::Result;

type CleanupThunk = Box<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Ordered list of teardown callbacks collected during resolution.
#[derive(Default)]
pub(crate) struct CleanupRegistry {
    cleanups: Vec<CleanupThunk>,
}

impl CleanupRegistry {
    /// Queue a teardown.
    pub fn push<F>(&mut self, thunk: F)
    where
        F: Fn() -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        self.cleanups.push(Box::new(thunk));
    }

    pub fn len(&self) -> usize {
        self.cleanups.len()
    }

    /// Run every teardown concurrently; settle all, report the first failure.
    /// Drains the queue, so a second call is a no-op.
    pub async fn run_all(&mut self) -> Result<()> {
        let thunks = std::mem::take(&mut self.cleanups);
        let results = join_all(thunks.iter().map(|thunk| thunk())).await;
        for result in results {
            result?;
        }
        Ok(())
    }
}
