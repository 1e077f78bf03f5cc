use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::{Backoff, Notify, PassiveNotifier, Poller, Tick};
use crate::{
    client::ComputationApi,
    definition::DefinitionBuilder,
    error::{ComputationError, Error, TimeoutError},
    models::{Computation, ComputationDefinition},
    settings::LifecycleSettings,
};

/// Drives computations from submission to a terminal status.
///
/// A computation that does not finish before the configured deadline is not
/// cancelled: the manager keeps its last known snapshot so that waiting can be
/// picked up again with [`LifecycleManager::resume()`]. Only the most recent
/// timed out computation is kept.
pub struct LifecycleManager<A> {
    api: A,
    settings: LifecycleSettings,
    notifier: Box<dyn Notify + Send>,
    /// Snapshot of the last computation the manager stopped waiting for
    timed_out: Option<Computation>,
    /// Every snapshot a polling loop ended on
    recorded_computations: Vec<Computation>,
}

impl<A> LifecycleManager<A>
where
    A: ComputationApi,
{
    pub fn new(api: A, settings: LifecycleSettings) -> Self {
        Self {
            api,
            settings,
            notifier: Box::new(PassiveNotifier),
            timed_out: None,
            recorded_computations: Vec::new(),
        }
    }

    /// Set the notifier that receives warnings and status changes.
    pub fn with_notifier<N>(mut self, notifier: N) -> Self
    where
        N: Notify + Send + 'static,
    {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    /// A [`DefinitionBuilder`] whose timeout matches the deadline of this
    /// manager.
    pub fn definition_builder(&self) -> DefinitionBuilder {
        DefinitionBuilder::new(self.settings.max_timeout())
    }

    /// The computation that can be resumed, if a timeout occurred.
    pub fn timed_out_computation(&self) -> Option<&Computation> {
        self.timed_out.as_ref()
    }

    pub fn recorded_computations(&self) -> &[Computation] {
        &self.recorded_computations
    }

    /// Submit a computation. Definitions that belong to a project are posted
    /// to the project.
    pub async fn submit(
        &mut self,
        definition: &ComputationDefinition,
    ) -> Result<Computation, Error> {
        let computation = match definition.common().project_id.as_deref() {
            Some(project_id) => {
                self.api
                    .post_project_computation(project_id, definition)
                    .await?
            }
            None => self.api.post_computation(definition).await?,
        };
        info!(
            "submitted {} computation {}",
            definition.kind(),
            computation.id
        );
        Ok(computation)
    }

    /// Submit a computation and wait for it to finish.
    pub async fn run(&mut self, definition: &ComputationDefinition) -> Result<Computation, Error> {
        let computation = self.submit(definition).await?;
        self.poll(computation).await
    }

    /// Wait for a computation that was submitted elsewhere.
    pub async fn attach(&mut self, computation_id: &str) -> Result<Computation, Error> {
        let computation = self.api.get_computation(computation_id).await?;
        info!(
            "attached to computation {} ({})",
            computation.id, computation.status
        );
        self.poll(computation).await
    }

    /// Resume waiting for the last computation that timed out.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::NoTimedOutComputation`] if no computation timed out
    /// since the last resume.
    pub async fn resume(&mut self) -> Result<Computation, Error> {
        let computation = self.timed_out.take().ok_or(Error::NoTimedOutComputation)?;
        info!("resuming computation {}", computation.id);
        self.poll(computation).await
    }

    /// Wait for `computation` with the backoff and deadline of the manager
    /// settings.
    pub async fn poll(&mut self, computation: Computation) -> Result<Computation, Error> {
        let backoff = self.settings.backoff();
        let deadline = self.settings.max_timeout();
        self.poll_with(computation, backoff, deadline).await
    }

    /// Wait for `computation` until it reaches a terminal status, or until
    /// `deadline` has elapsed.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] when the deadline passed. The snapshot is kept for
    ///   [`LifecycleManager::resume()`].
    /// - [`Error::Computation`] when the computation failed or reported errors.
    /// - [`Error::MissingResults`] when it succeeded without any result.
    /// - [`Error::Protocol`] when refreshing the computation failed.
    pub async fn poll_with(
        &mut self,
        computation: Computation,
        backoff: Backoff,
        deadline: Duration,
    ) -> Result<Computation, Error> {
        let start = Instant::now();
        let mut poller = Poller::new(computation, backoff, deadline);

        loop {
            match poller.tick(start.elapsed()) {
                Tick::Done => break,
                Tick::TimedOut => {
                    let elapsed = start.elapsed();
                    let snapshot = poller.into_snapshot();
                    warn!(
                        "stopped waiting for computation {} after {:?}, it may still be running",
                        snapshot.id, elapsed
                    );
                    self.notifier.timed_out(&snapshot);
                    self.recorded_computations.push(snapshot.clone());
                    self.timed_out = Some(snapshot.clone());
                    return Err(TimeoutError {
                        snapshot: Box::new(snapshot),
                        elapsed,
                    }
                    .into());
                }
                Tick::Wait(duration) => {
                    let id = poller.snapshot().id.clone();
                    debug!("polling computation {} in {:?}", id, duration);
                    sleep(duration).await;

                    let refreshed = self.api.get_computation(&id).await?;
                    let refresh = poller.refresh(refreshed);
                    if refresh.status_changed {
                        info!("computation {} is {}", id, poller.snapshot().status);
                        self.notifier.status_changed(poller.snapshot());
                    }
                    if let Some(warning) = refresh.warning {
                        warn!("computation {}: {}", id, warning);
                        self.notifier.warning(&id, &warning);
                    }
                }
            }
        }

        let computation = poller.into_snapshot();
        self.recorded_computations.push(computation.clone());
        check_outcome(computation)
    }
}

fn check_outcome(computation: Computation) -> Result<Computation, Error> {
    if computation.has_failed() {
        let error = ComputationError::new(&computation);
        warn!("{}", error);
        return Err(error.into());
    }
    if computation.results.is_empty() {
        return Err(Error::MissingResults(computation.id));
    }
    Ok(computation)
}
