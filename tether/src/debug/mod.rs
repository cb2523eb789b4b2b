//! Remote debugging of workloads that already run in the cluster.
//!
//! Activation switches the pod templates of the application's workloads into
//! debug mode, waits for a pod that runs with that configuration and forwards
//! a local port to its debug port.

mod cluster;
mod env;
pub mod error;
mod gate;
mod mutator;
#[cfg(test)]
mod testing;
mod waiter;

use std::{path::PathBuf, sync::Arc, time::Duration};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use snafu::ResultExt;
use tether_base::consts::debug::ENV_VAR_JAVA_DEBUG_PORT_DEFAULT;

use self::{gate::is_debug_applicable, mutator::ResourceMutator, waiter::PodWaiter};
pub use self::{
    cluster::{ApplyService, ClusterReader, PodWaitLog, PortForwardService},
    env::{DebugEnvVars, DebugSettings},
    error::Error,
};
use crate::entity::{Entity, PodTemplateOwner};

const LOCAL_DEBUG_PORT: &str = "localDebugPort";
const CONTAINER_DEBUG_PORT: &str = "containerDebugPort";

/// One debug activation for the resources of a manifest.
#[derive(Clone, Debug)]
pub struct DebugRequest {
    /// File the entities were loaded from.
    pub manifest: PathBuf,

    pub entities: Vec<Entity>,

    pub local_debug_port: String,

    pub suspend: bool,
}

/// How an activation ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Activation {
    /// The application is not deployed in the cluster.
    NotApplicable,

    /// None of the resources selects pods that could be debugged.
    NoSelector,

    /// The port forward to the debug port of `pod_name` ran to completion.
    Forwarded { pod_name: String, container_port: u16, local_port: u16 },
}

pub struct DebugService<'a, C, A, P> {
    cluster: &'a C,
    apply_service: &'a A,
    port_forward: &'a P,
    pod_wait_timeout: Option<Duration>,
}

impl<'a, C, A, P> DebugService<'a, C, A, P>
where
    C: ClusterReader,
    A: ApplyService,
    P: PortForwardService,
{
    pub const fn new(cluster: &'a C, apply_service: &'a A, port_forward: &'a P) -> Self {
        Self { cluster, apply_service, port_forward, pod_wait_timeout: None }
    }

    /// Bounds the wait for a debug-enabled pod. `None` waits until the pod
    /// watch ends.
    pub const fn pod_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.pod_wait_timeout = timeout;
        self
    }

    /// Enables debugging on the workloads of `request`, waits for a pod that
    /// runs with debug enabled and forwards the local debug port to it.
    ///
    /// # Errors
    ///
    /// Returns an error if a port is not a valid port number, if a cluster
    /// operation fails, or if no debug-enabled pod shows up.
    pub async fn activate(
        &self,
        request: DebugRequest,
        wait_log: Arc<dyn PodWaitLog>,
    ) -> Result<Activation, Error> {
        let DebugRequest { manifest, mut entities, local_debug_port, suspend } = request;
        let local_port = parse_port(LOCAL_DEBUG_PORT, &local_debug_port)?;

        if !is_debug_applicable(&entities, self.apply_service).await? {
            tracing::error!(
                "Unable to proceed with Debug. No application resource found running in the \
                 cluster"
            );
            return Ok(Activation::NotApplicable);
        }

        let settings = DebugSettings::new(suspend);
        let mutator = ResourceMutator::new(self.cluster);
        let mut target: Option<(LabelSelector, Option<String>)> = None;
        let mut session_token = None;

        for entity in &mut entities {
            let Entity::Workload(workload) = &mut *entity else {
                continue;
            };

            let mutation = mutator.mutate(workload, &settings).await?;
            let needs_apply = mutation.needs_apply();
            if target.is_none() {
                target = workload.pod_selector().map(|selector| (selector, mutation.debug_port));
            }
            if needs_apply {
                tracing::info!(
                    "Updating {} {} with Debug variables in containers",
                    workload.kind(),
                    workload.name()
                );
                if settings.suspend() {
                    session_token = settings.session_token().cloned();
                }
                self.apply_service.apply(entity, &manifest).await?;
            }
        }

        let Some((selector, debug_port)) = target else {
            tracing::error!("Debug is not applicable for the currently generated resources");
            return Ok(Activation::NoSelector);
        };

        let debug_port = debug_port.unwrap_or_else(|| ENV_VAR_JAVA_DEBUG_PORT_DEFAULT.to_string());
        let container_port = parse_port(CONTAINER_DEBUG_PORT, &debug_port)?;
        let env_vars = DebugEnvVars::new(suspend, session_token.as_ref());

        let pod_name = PodWaiter::new(self.cluster, self.pod_wait_timeout)
            .resolve_ready_pod(&selector, &env_vars, wait_log)
            .await?;

        self.port_forward.start_port_forward(&pod_name, container_port, local_port).await?;
        Ok(Activation::Forwarded { pod_name, container_port, local_port })
    }
}

fn parse_port(name: &'static str, value: &str) -> Result<u16, Error> {
    value.trim().parse().with_context(|_| error::InvalidPortSnafu { name, value })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::json;

    use super::*;
    use crate::debug::testing::{FakeCluster, RecordingWaitLog, WatchEvent, env_vars, pod};

    fn deployment(name: &str) -> Entity {
        Entity::from_json(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": name },
            "spec": {
                "selector": { "matchLabels": { "app": name } },
                "template": {
                    "metadata": { "labels": { "app": name } },
                    "spec": { "containers": [{ "name": name }] }
                }
            }
        }))
        .expect("valid entity")
    }

    fn kube_service(name: &str) -> Entity {
        Entity::from_json(json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": { "name": name }
        }))
        .expect("valid entity")
    }

    fn request(entities: Vec<Entity>, local_debug_port: &str, suspend: bool) -> DebugRequest {
        DebugRequest {
            manifest: Path::new("target/manifest.yaml").to_path_buf(),
            entities,
            local_debug_port: local_debug_port.to_string(),
            suspend,
        }
    }

    fn wait_log() -> Arc<dyn PodWaitLog> { Arc::new(RecordingWaitLog::default()) }

    #[tokio::test]
    async fn test_activate_forwards_to_debug_enabled_pod() {
        let cluster = FakeCluster::default().with_watch_events(vec![WatchEvent::Pod(pod(
            "app-xyz",
            "2024-01-01T00:00:00Z",
            "Running",
            &[("JAVA_ENABLE_DEBUG", "true"), ("JAVA_DEBUG_SUSPEND", "false")],
        ))]);
        let service = DebugService::new(&cluster, &cluster, &cluster);

        let activation = service
            .activate(
                request(vec![kube_service("app-svc"), deployment("app")], "5005", false),
                wait_log(),
            )
            .await
            .expect("activation");

        assert_eq!(activation, Activation::Forwarded {
            pod_name: "app-xyz".to_string(),
            container_port: 5005,
            local_port: 5005,
        });
        assert_eq!(cluster.applied(), vec!["app".to_string()]);
        assert_eq!(cluster.forwarded(), vec![("app-xyz".to_string(), 5005, 5005)]);

        let container = cluster.applied_container("app").expect("applied deployment");
        let env = container.env.unwrap_or_default();
        for expected in env_vars(&[("JAVA_ENABLE_DEBUG", "true"), ("JAVA_DEBUG_SUSPEND", "false")])
        {
            assert!(env.contains(&expected), "missing {expected:?} in {env:?}");
        }
        assert!(env.iter().all(|var| var.name != "JAVA_DEBUG_SESSION"));
        let ports = container.ports.unwrap_or_default();
        assert!(
            ports.iter().any(|port| port.name.as_deref() == Some("debug")
                && port.container_port == 5005),
            "missing debug port in {ports:?}"
        );
    }

    #[tokio::test]
    async fn test_suspend_waits_for_the_session_token() {
        let cluster = FakeCluster::default()
            .with_watch_events(vec![WatchEvent::Pod(pod(
                "app-old",
                "2024-01-01T00:00:00Z",
                "Running",
                &[("JAVA_ENABLE_DEBUG", "true"), ("JAVA_DEBUG_SUSPEND", "true")],
            ))])
            .keep_watch_open();
        let service = DebugService::new(&cluster, &cluster, &cluster)
            .pod_wait_timeout(Some(Duration::from_millis(50)));

        let err = service
            .activate(request(vec![deployment("app")], "8000", true), wait_log())
            .await
            .expect_err("no pod carries the new session token");

        match err {
            Error::WaitTimedOut { env_vars, .. } => {
                assert!(env_vars.to_string().contains("JAVA_DEBUG_SESSION="));
            }
            err => panic!("unexpected error: {err}"),
        }
        assert_eq!(cluster.applied(), vec!["app".to_string()]);
        assert!(cluster.forwarded().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_local_port_is_rejected_before_any_cluster_change() {
        let cluster = FakeCluster::default();
        let service = DebugService::new(&cluster, &cluster, &cluster);

        let err = service
            .activate(request(vec![deployment("app")], "abc", false), wait_log())
            .await
            .expect_err("invalid port");

        assert!(matches!(err, Error::InvalidPort { name: LOCAL_DEBUG_PORT, .. }));
        assert_eq!(err.to_string(), "Invalid port value: localDebugPort=abc");
        assert!(cluster.applied_checks().is_empty());
        assert!(cluster.applied().is_empty());
        assert_eq!(cluster.watch_calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_container_port_is_rejected_before_waiting() {
        let cluster = FakeCluster::default();
        let service = DebugService::new(&cluster, &cluster, &cluster);
        let Entity::Workload(mut app) = deployment("app") else {
            panic!("expected a workload");
        };
        if let Some(container) = app
            .pod_template_mut()
            .and_then(|template| template.spec.as_mut())
            .and_then(|spec| spec.containers.first_mut())
        {
            container.env = Some(env_vars(&[("JAVA_DEBUG_PORT", "jdwp")]));
        }

        let err = service
            .activate(request(vec![Entity::from(app)], "5005", false), wait_log())
            .await
            .expect_err("invalid port");

        assert_eq!(err.to_string(), "Invalid port value: containerDebugPort=jdwp");
        assert_eq!(cluster.watch_calls(), 0);
    }

    #[tokio::test]
    async fn test_unapplied_application_is_not_applicable() {
        let cluster = FakeCluster::default().with_unapplied("app");
        let service = DebugService::new(&cluster, &cluster, &cluster);

        let activation = service
            .activate(request(vec![deployment("app")], "5005", false), wait_log())
            .await
            .expect("activation");

        assert_eq!(activation, Activation::NotApplicable);
        assert!(cluster.applied().is_empty());
    }

    #[tokio::test]
    async fn test_resources_without_selector() {
        let cluster = FakeCluster::default();
        let service = DebugService::new(&cluster, &cluster, &cluster);

        let activation = service
            .activate(request(vec![kube_service("app-svc")], "5005", false), wait_log())
            .await
            .expect("activation");

        assert_eq!(activation, Activation::NoSelector);
        assert_eq!(cluster.watch_calls(), 0);
    }
}
