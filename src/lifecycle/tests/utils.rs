use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use serde_json::json;

use crate::{
    client::MockComputationApi,
    lifecycle::Notify,
    models::Computation,
    settings::LifecycleSettings,
};

/// Two seconds deadline, one second initial interval growing by 5%.
pub fn settings() -> LifecycleSettings {
    LifecycleSettings {
        max_timeout: 2,
        initial_interval: 1000,
        max_sleep: 30_000,
        growth: 1.05,
    }
}

pub fn computation(status: &str) -> Computation {
    serde_json::from_value(json!({"id": "c-1", "status": status})).unwrap()
}

pub fn succeeded() -> Computation {
    serde_json::from_value(json!({"id": "c-1", "status": "success", "results": ["do-1"]}))
        .unwrap()
}

/// Make `get_computation` return the given snapshots, in order, and fail the
/// test if it is called any other number of times.
pub fn expect_refreshes(api: &mut MockComputationApi, snapshots: Vec<Computation>) {
    let times = snapshots.len();
    let mut snapshots: VecDeque<Computation> = snapshots.into();
    api.expect_get_computation()
        .withf(|id| id == "c-1")
        .times(times)
        .returning(move |_| Ok(snapshots.pop_front().unwrap()));
}

/// Notifier recording every notice it receives.
#[derive(Clone, Default)]
pub struct Recorder(pub Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub fn notices(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl Notify for Recorder {
    fn warning(&mut self, computation_id: &str, warning: &str) {
        self.0
            .lock()
            .unwrap()
            .push(format!("warning {}: {}", computation_id, warning));
    }

    fn status_changed(&mut self, computation: &Computation) {
        self.0
            .lock()
            .unwrap()
            .push(format!("status {}: {}", computation.id, computation.status));
    }

    fn timed_out(&mut self, computation: &Computation) {
        self.0
            .lock()
            .unwrap()
            .push(format!("timed out {}", computation.id));
    }
}
