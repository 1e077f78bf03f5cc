//! Submitting computations and waiting for them to finish.
//!
//! [`Poller`] holds the polling state of a single computation and decides when
//! to refresh it and when to give up. [`LifecycleManager`] drives pollers on
//! the tokio timer and talks to the service through a [`ComputationApi`].
//!
//! [`ComputationApi`]: crate::client::ComputationApi

mod backoff;
mod manager;
mod notify;
mod poller;
#[cfg(test)]
mod tests;

pub use self::{
    backoff::Backoff,
    manager::LifecycleManager,
    notify::{Notify, PassiveNotifier},
    poller::{Poller, Refresh, Tick},
};
