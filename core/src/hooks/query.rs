use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::state::{LifecycleState, StateCell};
use crate::error::ApiError;

type Fetcher<T, D> = Arc<dyn Fn(&D) -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

/// Fetch-on-mount read hook.
///
/// States: `loading -> (success | error)`, re-entering `loading` on
/// [`Query::refetch`] or when [`Query::set_dependencies`] receives a
/// different value. Every activation runs to completion; when several
/// overlap, the state reflects whichever settles last.
///
/// A successful settle replaces `data` and clears `error`. A failed settle
/// stores the error and leaves the previous `data` in place.
///
/// Must be created inside a tokio runtime; activations are spawned tasks.
pub struct Query<T, D = ()> {
    cell: Arc<StateCell<T>>,
    fetcher: Fetcher<T, D>,
    deps: D,
}

impl<T, D> Query<T, D>
where
    T: Send + Sync + 'static,
    D: PartialEq + Send + Sync + 'static,
{
    /// Create the hook and run the first fetch with `deps`.
    ///
    /// Errors from `fetch` that are not an `ApiError` are wrapped into an
    /// unclassified one with the generic message.
    pub fn mount<F, Fut, E>(deps: D, fetch: F) -> Self
    where
        F: Fn(&D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>> + 'static,
    {
        let fetcher: Fetcher<T, D> = Arc::new(move |deps: &D| {
            fetch(deps)
                .map(|outcome| outcome.map_err(|e| ApiError::from_failure(e.into())))
                .boxed()
        });
        let query = Self {
            cell: Arc::new(StateCell::new(LifecycleState::loading())),
            fetcher,
            deps,
        };
        query.activate();
        query
    }

    /// Re-run the fetch with the current dependencies.
    ///
    /// The returned handle resolves once this activation has settled (and
    /// its outcome has been applied, unless the hook was torn down).
    pub fn refetch(&self) -> JoinHandle<()> {
        self.activate()
    }

    /// Replace the dependencies, re-fetching only if they changed.
    pub fn set_dependencies(&mut self, deps: D) -> Option<JoinHandle<()>> {
        if self.deps == deps {
            return None;
        }
        self.deps = deps;
        Some(self.activate())
    }

    pub fn dependencies(&self) -> &D {
        &self.deps
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState<T>> {
        self.cell.subscribe()
    }

    pub fn state(&self) -> LifecycleState<T>
    where
        T: Clone,
    {
        self.cell.snapshot()
    }

    pub fn is_mounted(&self) -> bool {
        self.cell.is_mounted()
    }

    /// Stop publishing state. Activations still in flight, and any started
    /// afterwards, run to completion but their outcomes are discarded.
    pub fn unmount(&self) {
        self.cell.teardown();
    }

    fn activate(&self) -> JoinHandle<()> {
        self.cell.update(LifecycleState::begin);
        let pending = (self.fetcher)(&self.deps);
        let cell = Arc::clone(&self.cell);
        tokio::spawn(async move {
            let outcome = pending.await;
            let applied = cell.update(|state| {
                state.loading = false;
                match outcome {
                    Ok(data) => {
                        state.data = Some(data);
                        state.error = None;
                    }
                    Err(error) => {
                        debug!(kind = ?error.kind(), status = error.status(), %error, "query failed");
                        state.error = Some(error);
                    }
                }
            });
            if !applied {
                debug!("query unmounted, dropping late outcome");
            }
        })
    }
}

impl<T, D> Drop for Query<T, D> {
    fn drop(&mut self) {
        self.cell.teardown();
    }
}
