use std::{sync::Arc, time::Duration};

use futures::{StreamExt, stream::BoxStream};
use k8s_openapi::{api::core::v1::Pod, apimachinery::pkg::apis::meta::v1::LabelSelector};
use kube::{ResourceExt, core::Selector};
use snafu::ResultExt;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::{
    debug::{ClusterReader, DebugEnvVars, Error, PodWaitLog, error},
    ext::{PodExt, newest_pod},
};

/// Finds the running pod that reflects a debug configuration.
///
/// The pods already in the cluster are checked first. Only if the newest of
/// them does not qualify is a watch opened, and the first qualifying pod it
/// reports wins.
pub struct PodWaiter<'c, C> {
    cluster: &'c C,
    timeout: Option<Duration>,
}

impl<'c, C> PodWaiter<'c, C>
where
    C: ClusterReader,
{
    /// Without a timeout the waiter blocks until a pod qualifies or the watch
    /// ends.
    pub const fn new(cluster: &'c C, timeout: Option<Duration>) -> Self {
        Self { cluster, timeout }
    }

    /// Returns the name of a running pod selected by `selector` whose first
    /// container carries `env_vars`.
    ///
    /// # Errors
    ///
    /// * `InvalidSelector` if `selector` holds a malformed requirement.
    /// * `ListPods` if the existing pods cannot be listed.
    /// * `PodNotFound` if the watch ends before a pod qualifies.
    /// * `WaitTimedOut` if the timeout expires first.
    pub async fn resolve_ready_pod(
        &self,
        selector: &LabelSelector,
        env_vars: &DebugEnvVars,
        wait_log: Arc<dyn PodWaitLog>,
    ) -> Result<String, Error> {
        let selector = Selector::try_from(selector.clone())
            .with_context(|_| error::InvalidSelectorSnafu { selector: selector.clone() })?;
        let pods = self.cluster.list_pods(&selector).await?;
        if let Some(pod) = newest_pod(&pods).filter(|pod| reflects_debug(pod, env_vars)) {
            let pod_name = pod.name_any();
            tracing::debug!("Pod {pod_name} already runs with debug enabled");
            wait_log.pod_ready(&pod_name);
            return Ok(pod_name);
        }

        let pods = self.cluster.watch_pods(&selector);
        let selector = selector.to_string();
        tracing::info!(
            "Waiting for a running pod with selector {selector} and environment variables \
             {env_vars}"
        );

        let (ready_sender, ready_receiver) = oneshot::channel();
        let cancel_token = CancellationToken::new();
        // Stops the watch as soon as this future completes or is dropped.
        let _watch_guard = cancel_token.clone().drop_guard();
        let _handle = tokio::spawn(deliver_first_ready_pod(
            pods,
            env_vars.clone(),
            wait_log,
            ready_sender,
            cancel_token,
        ));

        let ready = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, ready_receiver).await.map_err(|_| {
                Error::WaitTimedOut {
                    selector: selector.clone(),
                    env_vars: env_vars.clone(),
                    timeout,
                }
            })?,
            None => ready_receiver.await,
        };
        ready.map_err(|_| Error::PodNotFound { selector, env_vars: env_vars.clone() })
    }
}

fn reflects_debug(pod: &Pod, env_vars: &DebugEnvVars) -> bool {
    env_vars.matches_container(pod.first_container()) && pod.is_running()
}

async fn deliver_first_ready_pod(
    mut pods: BoxStream<'static, Result<Pod, Error>>,
    env_vars: DebugEnvVars,
    wait_log: Arc<dyn PodWaitLog>,
    ready_sender: oneshot::Sender<String>,
    cancel_token: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            () = cancel_token.cancelled() => break,
            event = pods.next() => event,
        };

        match event {
            Some(Ok(pod)) => {
                wait_log.pod_observed(&pod);
                if reflects_debug(&pod, &env_vars) {
                    let pod_name = pod.name_any();
                    wait_log.pod_ready(&pod_name);
                    drop(ready_sender.send(pod_name));
                    return;
                }
            }
            Some(Err(err)) => tracing::warn!("{err}"),
            None => {
                tracing::debug!("Pod watch ended");
                break;
            }
        }
    }
}
