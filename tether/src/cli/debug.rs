use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Args;

use crate::{
    cli::Error,
    config::Config,
    debug::{Activation, DebugRequest, DebugService},
    entity::{Entity, PodTemplateOwner},
    kube_cluster::KubeCluster,
    manifest,
    port_forwarder::PodPortForward,
    ui::PodWaitSpinner,
};

/// Command-line arguments of `tether debug`.
#[derive(Args, Clone)]
pub struct DebugCommand {
    #[arg(
        short = 'f',
        long = "file",
        help = "Manifest the application was deployed with (YAML or JSON, multiple documents \
                allowed)."
    )]
    pub manifest: PathBuf,

    #[arg(
        short,
        long,
        help = "Kubernetes namespace of the application. If not specified, the default namespace \
                will be used."
    )]
    pub namespace: Option<String>,

    #[arg(
        short = 'p',
        long = "local-port",
        help = "Local port the debugger attaches to. Defaults to debug.localPort of the config."
    )]
    pub local_port: Option<String>,

    #[arg(long, help = "Start the application suspended until a debugger attaches.")]
    pub suspend: bool,

    #[arg(
        short = 't',
        long = "timeout-seconds",
        help = "The maximum time in seconds to wait for a debug-enabled pod, 0 waits without \
                limit. Defaults to debug.podWaitTimeoutSeconds of the config."
    )]
    pub timeout_secs: Option<u64>,
}

impl DebugCommand {
    /// Enables debugging on the application of the manifest and forwards the
    /// local debug port until Ctrl+C is pressed.
    ///
    /// Returns exit code `1` when the application is not deployed or none of
    /// its resources selects pods.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be loaded or activation fails.
    pub async fn run(self, kube_client: kube::Client, config: Config) -> Result<i32, Error> {
        let Self { manifest, namespace, local_port, suspend, timeout_secs } = self;

        let namespace = namespace
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| kube_client.default_namespace().to_string());
        let pod_wait_timeout = timeout_secs.map_or_else(
            || config.debug.pod_wait_timeout(),
            |seconds| (seconds > 0).then(|| Duration::from_secs(seconds)),
        );

        let entities = manifest::load(&manifest).await?;
        let request = DebugRequest {
            manifest,
            entities,
            local_debug_port: local_port.unwrap_or_else(|| config.debug.local_port.to_string()),
            suspend: suspend || config.debug.suspend,
        };

        let pod_namespace = pod_namespace(&request.entities, &namespace);
        let cluster = KubeCluster::new(kube_client.clone(), namespace)
            .with_pod_namespace(pod_namespace.clone());
        let port_forward = PodPortForward::new(kube_client, pod_namespace);
        let activation = DebugService::new(&cluster, &cluster, &port_forward)
            .pod_wait_timeout(pod_wait_timeout)
            .activate(request, Arc::new(PodWaitSpinner::new()))
            .await?;

        match activation {
            Activation::Forwarded { pod_name, container_port, local_port } => {
                tracing::info!("Debug session {local_port} -> {pod_name}:{container_port} closed");
                Ok(0)
            }
            Activation::NotApplicable | Activation::NoSelector => Ok(1),
        }
    }
}

/// Namespace of the pods debugging attaches to: the one the first
/// pod-selecting workload is deployed in.
fn pod_namespace(entities: &[Entity], fallback: &str) -> String {
    entities
        .iter()
        .find_map(|entity| match entity {
            Entity::Workload(workload) if workload.pod_selector().is_some() => {
                Some(workload.namespace())
            }
            _ => None,
        })
        .flatten()
        .unwrap_or_else(|| fallback.to_string())
}
