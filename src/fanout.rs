//! Bounded fan-out for independent per-item lookups. Tasks settle into a
//! caller-owned accumulator and report their own failures; one bad item
//! never takes the batch down with it.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::common::errors::ResolveError;

/// Per-item failure callback: receives the item's original index and the
/// error that sank it.
pub type ItemErrorHandler<'a> = &'a (dyn Fn(usize, ResolveError) + Send + Sync);

/// Runs every task with at most `limit` in flight. All tasks are
/// attempted regardless of sibling failures and the call returns only
/// once every task has settled. Completion order is unspecified;
/// positional data must come from the task's input index.
pub async fn run_all<F>(tasks: Vec<F>, limit: usize)
where
    F: Future<Output = ()>,
{
    if tasks.is_empty() {
        return;
    }

    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let bounded: Vec<_> = tasks
        .into_iter()
        .map(|task| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore.acquire().await.unwrap();
                task.await;
            }
        })
        .collect();

    join_all(bounded).await;
}
