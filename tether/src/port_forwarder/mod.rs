//! Forwarding of a local port to the debug port of a pod.

mod error;

use std::{
    future::Future,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};

use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use sigfinn::{ExitStatus, LifecycleManager};
use snafu::{IntoError, OptionExt, ResultExt};
use tokio::{
    net::{TcpListener, TcpStream},
    task::{JoinError, JoinSet},
};
use tokio_util::sync::CancellationToken;

pub use self::error::Error;
use crate::debug::PortForwardService;

/// Port forwarding backed by the Kubernetes API, run until Ctrl+C.
#[derive(Clone)]
pub struct PodPortForward {
    client: kube::Client,
    namespace: String,
}

impl PodPortForward {
    pub const fn new(client: kube::Client, namespace: String) -> Self { Self { client, namespace } }
}

impl PortForwardService for PodPortForward {
    async fn start_port_forward(
        &self,
        pod_name: &str,
        container_port: u16,
        local_port: u16,
    ) -> Result<(), crate::debug::Error> {
        let local_address = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), local_port);
        let tunnel = DebugTunnel {
            api: Api::namespaced(self.client.clone(), &self.namespace),
            pod_name: pod_name.to_string(),
            container_port,
            local_address,
        };

        let lifecycle_manager = LifecycleManager::<Error>::new();
        let worker_name = format!("debug-forwarder-{local_address}/{pod_name}:{container_port}");
        let _handle = lifecycle_manager.spawn(worker_name, move |shutdown_signal| async move {
            match tunnel.run(shutdown_signal).await {
                Ok(()) => ExitStatus::Success,
                Err(err) => ExitStatus::Error(err),
            }
        });

        tracing::info!("Attach a debugger to {local_address}. Use Ctrl+C to stop.");

        if let Ok(Err(err)) = lifecycle_manager.serve().await {
            tracing::error!("{err}");
            Err(err.into())
        } else {
            Ok(())
        }
    }
}

/// Accepts debugger connections on a local socket and bridges each of them to
/// the container port of one pod.
struct DebugTunnel {
    api: Api<Pod>,
    pod_name: String,
    container_port: u16,
    local_address: SocketAddr,
}

impl DebugTunnel {
    async fn run(
        self,
        mut shutdown_signal: impl Future<Output = ()> + Send + Unpin + 'static,
    ) -> Result<(), Error> {
        let Self { api, pod_name, container_port, local_address } = self;

        let listener = TcpListener::bind(local_address)
            .await
            .context(error::BindTcpSocketSnafu { socket_address: local_address })?;
        tracing::info!("Forwarding from {local_address} -> {pod_name}:{container_port}");

        let cancel_token = CancellationToken::new();
        let bridge = Bridge { api, pod_name, container_port, cancel_token: cancel_token.clone() };
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                () = &mut shutdown_signal => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let _handle = connections.spawn(bridge.clone().run(stream, peer));
                    }
                    Err(err) => tracing::warn!("Failed to accept connection, error: {err}"),
                },
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    log_finished_connection(finished);
                }
            }
        }

        tracing::info!("Closing {} debugger connections...", connections.len());
        cancel_token.cancel();
        while let Some(finished) = connections.join_next().await {
            log_finished_connection(finished);
        }
        tracing::info!("Port forward to {}:{container_port} stopped", bridge.pod_name);
        Ok(())
    }
}

fn log_finished_connection(finished: Result<Result<(), Error>, JoinError>) {
    match finished {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::error!("{err}"),
        Err(err) => tracing::error!("Debugger connection task failed, error: {err}"),
    }
}

/// One debugger connection.
#[derive(Clone)]
struct Bridge {
    api: Api<Pod>,
    pod_name: String,
    container_port: u16,
    cancel_token: CancellationToken,
}

impl Bridge {
    async fn run(self, mut local_stream: TcpStream, peer: SocketAddr) -> Result<(), Error> {
        let Self { api, pod_name, container_port, cancel_token } = self;

        let pod_stream = match api.portforward(&pod_name, &[container_port]).await {
            Ok(mut forwarder) => forwarder.take_stream(container_port),
            Err(source) => {
                return Err(error::OpenPodStreamSnafu { pod_name, container_port, peer }
                    .into_error(source));
            }
        };
        let mut pod_stream = pod_stream.with_context(|| error::PodStreamUnavailableSnafu {
            pod_name: &pod_name,
            container_port,
            peer,
        })?;

        tracing::info!("Debugger connected: {peer} <-> {pod_name}:{container_port}");
        tokio::select! {
            () = cancel_token.cancelled() => {
                tracing::debug!("Closing debugger connection {peer} on shutdown");
            }
            copied = tokio::io::copy_bidirectional(&mut local_stream, &mut pod_stream) => {
                match copied {
                    Ok((sent, received)) => tracing::info!(
                        "Debugger {peer} disconnected, sent {sent} bytes, received {received} bytes"
                    ),
                    Err(err) => tracing::debug!("Connection {peer} closed with error: {err}"),
                }
            }
        }
        Ok(())
    }
}
