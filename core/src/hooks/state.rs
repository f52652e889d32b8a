use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use crate::error::ApiError;

/// The `{data, loading, error}` triple owned by one hook instance.
#[derive(Debug, Clone)]
pub struct LifecycleState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<ApiError>,
}

/// Coarse view of a `LifecycleState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Success,
    Failed,
}

impl<T> LifecycleState<T> {
    pub fn idle() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }

    pub(crate) fn loading() -> Self {
        Self {
            loading: true,
            ..Self::idle()
        }
    }

    pub fn phase(&self) -> Phase {
        if self.loading {
            Phase::Loading
        } else if self.error.is_some() {
            Phase::Failed
        } else if self.data.is_some() {
            Phase::Success
        } else {
            Phase::Idle
        }
    }

    pub(crate) fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }
}

impl<T> Default for LifecycleState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

/// Publishing side of a hook's state.
///
/// Writes after `teardown` are dropped. The mounted flag is only read and
/// cleared under the channel's write lock, so a write racing a teardown
/// either lands before it or not at all.
pub(crate) struct StateCell<T> {
    tx: watch::Sender<LifecycleState<T>>,
    mounted: AtomicBool,
}

impl<T> StateCell<T> {
    pub(crate) fn new(initial: LifecycleState<T>) -> Self {
        Self {
            tx: watch::Sender::new(initial),
            mounted: AtomicBool::new(true),
        }
    }

    /// Apply `f` and notify subscribers; returns `false` once torn down.
    pub(crate) fn update(&self, f: impl FnOnce(&mut LifecycleState<T>)) -> bool {
        let mut applied = false;
        self.tx.send_if_modified(|state| {
            if !self.mounted.load(Ordering::Acquire) {
                return false;
            }
            f(state);
            applied = true;
            true
        });
        applied
    }

    pub(crate) fn teardown(&self) {
        self.tx.send_if_modified(|_| {
            self.mounted.store(false, Ordering::Release);
            false
        });
    }

    pub(crate) fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<LifecycleState<T>> {
        self.tx.subscribe()
    }

    pub(crate) fn snapshot(&self) -> LifecycleState<T>
    where
        T: Clone,
    {
        self.tx.borrow().clone()
    }
}
