//! Cluster collaborators used while activating remote debugging.

use std::path::Path;

use futures::stream::BoxStream;
use k8s_openapi::api::core::v1::{EnvVar, Pod};
use kube::core::Selector;

use crate::{
    debug::Error,
    entity::{Entity, WorkloadEntity},
};

/// Read access to pods and to the live state of workloads.
pub trait ClusterReader {
    async fn list_pods(&self, selector: &Selector) -> Result<Vec<Pod>, Error>;

    /// Pods added to or modified in the cluster that match `selector`, in the
    /// order the cluster reports them. The stream ends when the watch can no
    /// longer be continued.
    fn watch_pods(&self, selector: &Selector) -> BoxStream<'static, Result<Pod, Error>>;

    /// Environment of the first container of the workload as it currently
    /// runs in the cluster. Empty when the workload or its env is missing.
    async fn live_container_env(&self, entity: &WorkloadEntity) -> Result<Vec<EnvVar>, Error>;
}

pub trait ApplyService {
    async fn is_already_applied(&self, entity: &Entity) -> Result<bool, Error>;

    /// Persists `entity` in the cluster. `manifest` is the file the entity was
    /// loaded from.
    async fn apply(&self, entity: &Entity, manifest: &Path) -> Result<(), Error>;
}

pub trait PortForwardService {
    async fn start_port_forward(
        &self,
        pod_name: &str,
        container_port: u16,
        local_port: u16,
    ) -> Result<(), Error>;
}

/// Receives progress while waiting for a debug-enabled pod.
pub trait PodWaitLog: Send + Sync {
    fn pod_observed(&self, pod: &Pod);

    fn pod_ready(&self, pod_name: &str);
}
