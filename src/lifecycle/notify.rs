use crate::models::Computation;

/// A trait used by the [`LifecycleManager`] to emit non-fatal notices while
/// it waits for a computation.
///
/// [`LifecycleManager`]: crate::lifecycle::LifecycleManager
pub trait Notify {
    /// Emit the newest warning the server attached to a computation. This is
    /// called once per poll tick for as long as the computation carries a
    /// warning.
    fn warning(&mut self, _computation_id: &str, _warning: &str) {}
    /// Emit a notification when the status of a computation changed
    fn status_changed(&mut self, _computation: &Computation) {}
    /// Emit a notification when the manager stopped waiting for a computation
    /// that may still be running
    fn timed_out(&mut self, _computation: &Computation) {}
}

/// A notifier that ignores every notice.
pub struct PassiveNotifier;

impl Notify for PassiveNotifier {}
