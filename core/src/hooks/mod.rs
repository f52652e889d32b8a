//! Async lifecycle hooks.
//!
//! # Overview
//! Two state machines give a consumer a consistent `{data, loading, error}`
//! view over any asynchronous call:
//! - [`Query`] fetches on mount and again on `refetch` or when its
//!   dependencies change.
//! - [`Mutation`] only runs when `mutate` is called and hands the outcome
//!   back to the caller as well as storing it.
//!
//! # Design
//! Each instance owns its state exclusively and publishes every transition
//! through a `tokio::sync::watch` channel; subscribers re-render from the
//! receiver.
//!
//! Both hooks share one teardown contract: `unmount(&self)`, or dropping the
//! hook, stops all publication for good. Calls still in flight run to
//! completion but their outcome is never published; `Mutation::mutate` still
//! returns it to its caller. Nothing is cancelled and no timeout is applied.

mod mutation;
mod query;
mod state;

pub use mutation::Mutation;
pub use query::Query;
pub use state::{LifecycleState, Phase};
