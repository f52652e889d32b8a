use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::watch;
use tracing::debug;

use super::state::{LifecycleState, StateCell};
use crate::error::ApiError;

type MutateFn<I, T> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

/// On-demand mutation hook.
///
/// Starts idle and never runs by itself. Each [`Mutation::mutate`] call
/// moves through `loading` and back to idle with either data or an error;
/// the outcome is both stored and returned to the caller.
pub struct Mutation<I, T> {
    cell: Arc<StateCell<T>>,
    mutate_fn: MutateFn<I, T>,
}

impl<I, T> Mutation<I, T>
where
    I: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut, E>(mutate_fn: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>> + 'static,
    {
        let mutate_fn: MutateFn<I, T> = Arc::new(move |input| {
            mutate_fn(input)
                .map(|outcome| outcome.map_err(|e| ApiError::from_failure(e.into())))
                .boxed()
        });
        Self {
            cell: Arc::new(StateCell::new(LifecycleState::idle())),
            mutate_fn,
        }
    }

    /// Run the mutation with `input`.
    ///
    /// On failure the error is stored and also returned, so the caller can
    /// handle it locally.
    pub async fn mutate(&self, input: I) -> Result<T, ApiError> {
        self.cell.update(LifecycleState::begin);
        let outcome = (self.mutate_fn)(input).await;
        let applied = self.cell.update(|state| {
            state.loading = false;
            match &outcome {
                Ok(data) => state.data = Some(data.clone()),
                Err(error) => state.error = Some(error.clone()),
            }
        });
        if let Err(error) = &outcome {
            debug!(kind = ?error.kind(), status = error.status(), %error, applied, "mutation failed");
        }
        outcome
    }

    /// Return to `{data: None, loading: false, error: None}`.
    pub fn reset(&self) {
        self.cell.update(|state| *state = LifecycleState::idle());
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState<T>> {
        self.cell.subscribe()
    }

    pub fn state(&self) -> LifecycleState<T> {
        self.cell.snapshot()
    }

    pub fn is_mounted(&self) -> bool {
        self.cell.is_mounted()
    }

    /// Stop publishing state. Pending `mutate` calls still return their
    /// outcome to the caller.
    pub fn unmount(&self) {
        self.cell.teardown();
    }
}

impl<I, T> Drop for Mutation<I, T> {
    fn drop(&mut self) {
        self.cell.teardown();
    }
}
