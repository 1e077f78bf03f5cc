//! Synchronous API for callers without an async runtime.

use thiserror::Error;
use tokio::runtime::Runtime;

use crate::{
    client::ComputationApi,
    error::Error,
    lifecycle::LifecycleManager,
    models::{Computation, ComputationDefinition},
    router::{PostProcess, ResultRouter, RoutedResult},
};

/// Error that can occur when instantiating a new [`BlockingManager`].
#[derive(Error, Debug)]
pub enum InitError {
    #[error("failed to initialize the runtime {:?}", _0)]
    Runtime(std::io::Error),
}

/// A [`LifecycleManager`] that blocks the calling thread. It owns a
/// single-threaded runtime on which every call is executed, so the backoff
/// sleeps happen on the calling thread.
pub struct BlockingManager<A> {
    /// Async runtime to execute the manager
    runtime: Runtime,
    manager: LifecycleManager<A>,
}

impl<A> BlockingManager<A>
where
    A: ComputationApi,
{
    pub fn new(manager: LifecycleManager<A>) -> Result<Self, InitError> {
        Ok(Self {
            runtime: Self::runtime()?,
            manager,
        })
    }

    fn runtime() -> Result<Runtime, InitError> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(InitError::Runtime)
    }

    pub fn manager(&self) -> &LifecycleManager<A> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut LifecycleManager<A> {
        &mut self.manager
    }

    pub fn into_inner(self) -> LifecycleManager<A> {
        self.manager
    }

    /// See [`LifecycleManager::submit()`].
    pub fn submit(&mut self, definition: &ComputationDefinition) -> Result<Computation, Error> {
        let Self {
            ref runtime,
            ref mut manager,
        } = self;
        runtime.block_on(manager.submit(definition))
    }

    /// See [`LifecycleManager::run()`].
    pub fn run(&mut self, definition: &ComputationDefinition) -> Result<Computation, Error> {
        let Self {
            ref runtime,
            ref mut manager,
        } = self;
        runtime.block_on(manager.run(definition))
    }

    /// See [`LifecycleManager::poll()`].
    pub fn poll(&mut self, computation: Computation) -> Result<Computation, Error> {
        let Self {
            ref runtime,
            ref mut manager,
        } = self;
        runtime.block_on(manager.poll(computation))
    }

    /// See [`LifecycleManager::attach()`].
    pub fn attach(&mut self, computation_id: &str) -> Result<Computation, Error> {
        let Self {
            ref runtime,
            ref mut manager,
        } = self;
        runtime.block_on(manager.attach(computation_id))
    }

    /// See [`LifecycleManager::resume()`].
    pub fn resume(&mut self) -> Result<Computation, Error> {
        let Self {
            ref runtime,
            ref mut manager,
        } = self;
        runtime.block_on(manager.resume())
    }

    /// Route the results of `computation` with the API of the manager.
    pub fn route<P>(
        &mut self,
        router: &mut ResultRouter<P>,
        computation: &Computation,
    ) -> Result<RoutedResult<P::Output>, Error>
    where
        P: PostProcess,
    {
        let Self {
            ref runtime,
            ref mut manager,
        } = self;
        runtime.block_on(router.route(manager.api_mut(), computation))
    }
}
