use std::{collections::HashMap, sync::Arc, time::Duration};

use cluster::{ClusterControlPlane, ClusterError, Workload};
use registry::{RegistryError, StoreRegistry};
use shared::domain::{StoreId, StoreState};
use tokio::{
    sync::mpsc,
    task::{self, JoinError, JoinSet},
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

/// Completion report of a background package install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub store_id: StoreId,
    pub error: Option<String>,
}

impl InstallOutcome {
    pub fn succeeded(store_id: StoreId) -> Self {
        Self {
            store_id,
            error: None,
        }
    }

    pub fn failed(store_id: StoreId, error: impl Into<String>) -> Self {
        Self {
            store_id,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug)]
struct Probe {
    store_id: StoreId,
    result: Result<Vec<Workload>, ClusterError>,
}

/// At least one workload, and every workload has all containers ready.
pub fn workloads_ready(workloads: &[Workload]) -> bool {
    !workloads.is_empty() && workloads.iter().all(Workload::is_ready)
}

/// Periodic readiness loop. Owns the receiving end of install outcomes and
/// one probe task per provisioning store.
pub struct Reconciler {
    registry: StoreRegistry,
    cluster: Arc<dyn ClusterControlPlane>,
    interval: Duration,
    outcomes: mpsc::UnboundedReceiver<InstallOutcome>,
    probes: JoinSet<Probe>,
    in_flight: HashMap<task::Id, StoreId>,
}

impl Reconciler {
    pub(crate) fn new(
        registry: StoreRegistry,
        cluster: Arc<dyn ClusterControlPlane>,
        interval: Duration,
        outcomes: mpsc::UnboundedReceiver<InstallOutcome>,
    ) -> Self {
        Self {
            registry,
            cluster,
            interval,
            outcomes,
            probes: JoinSet::new(),
            in_flight: HashMap::new(),
        }
    }

    /// Drives the loop forever. Ticks that fall behind are delayed, never
    /// run concurrently.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = self.interval.as_millis() as u64, "reconciler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_cycle().await,
                Some(outcome) = self.outcomes.recv() => {
                    apply_install_outcome(&self.registry, outcome).await;
                }
                Some(joined) = self.probes.join_next_with_id(), if !self.probes.is_empty() => {
                    self.finish_probe(joined).await;
                }
            }
        }
    }

    /// One reconciliation pass: apply pending install outcomes, then start a
    /// probe for every provisioning store that has none running.
    pub async fn run_cycle(&mut self) {
        self.drain_outcomes().await;

        for store_id in self.registry.ids_in_state(StoreState::Provisioning).await {
            if self.in_flight.values().any(|id| *id == store_id) {
                debug!(store_id = %store_id, "previous readiness probe still running");
                continue;
            }
            let cluster = Arc::clone(&self.cluster);
            let namespace = store_id.clone();
            let handle = self.probes.spawn(async move {
                let result = cluster.list_workloads(namespace.as_str()).await;
                Probe {
                    store_id: namespace,
                    result,
                }
            });
            self.in_flight.insert(handle.id(), store_id);
        }
    }

    /// Waits for every running probe and applies its result.
    pub async fn settle(&mut self) {
        while let Some(joined) = self.probes.join_next_with_id().await {
            self.finish_probe(joined).await;
        }
        self.drain_outcomes().await;
    }

    async fn drain_outcomes(&mut self) {
        while let Ok(outcome) = self.outcomes.try_recv() {
            apply_install_outcome(&self.registry, outcome).await;
        }
    }

    async fn finish_probe(&mut self, joined: Result<(task::Id, Probe), JoinError>) {
        match joined {
            Ok((task_id, probe)) => {
                self.in_flight.remove(&task_id);
                self.apply_probe(probe).await;
            }
            Err(error) => {
                if let Some(store_id) = self.in_flight.remove(&error.id()) {
                    warn!(store_id = %store_id, %error, "readiness probe aborted");
                }
            }
        }
    }

    async fn apply_probe(&self, probe: Probe) {
        let store_id = probe.store_id;
        let workloads = match probe.result {
            Ok(workloads) => workloads,
            Err(error) => {
                warn!(store_id = %store_id, %error, "readiness probe failed; retrying next cycle");
                return;
            }
        };
        if !workloads_ready(&workloads) {
            debug!(store_id = %store_id, workloads = workloads.len(), "store not ready yet");
            return;
        }
        match self.registry.transition(&store_id, StoreState::Ready).await {
            Ok(_) => info!(store_id = %store_id, "store is ready"),
            Err(RegistryError::InvalidTransition { from, .. }) => {
                debug!(store_id = %store_id, state = %from, "store left provisioning during probe");
            }
            Err(RegistryError::NotFound(_)) => {
                debug!(store_id = %store_id, "store removed during probe");
            }
            Err(error) => warn!(store_id = %store_id, %error, "could not mark store ready"),
        }
    }
}

pub(crate) async fn apply_install_outcome(registry: &StoreRegistry, outcome: InstallOutcome) {
    let InstallOutcome { store_id, error } = outcome;
    let Some(error) = error else {
        debug!(store_id = %store_id, "install outcome: success");
        return;
    };
    match registry.transition(&store_id, StoreState::Failed).await {
        Ok(_) => warn!(store_id = %store_id, %error, "store marked failed"),
        Err(RegistryError::InvalidTransition { from, .. }) => {
            info!(store_id = %store_id, state = %from, "ignoring install failure for store no longer provisioning");
        }
        Err(RegistryError::NotFound(_)) => {
            debug!(store_id = %store_id, "ignoring install failure for removed store");
        }
        Err(other) => warn!(store_id = %store_id, error = %other, "could not mark store failed"),
    }
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;
