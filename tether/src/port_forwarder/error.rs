use std::net::SocketAddr;

use snafu::Snafu;

/// Errors of the local tunnel to a pod's debug port.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// The local debug port is taken or not allowed.
    #[snafu(display("Failed to bind TCP socket {socket_address}, error: {source}"))]
    BindTcpSocket { socket_address: SocketAddr, source: std::io::Error },

    /// The API server refused the port forward for one debugger connection.
    #[snafu(display(
        "Failed to open port forward to {pod_name}:{container_port} for {peer}, error: {source}"
    ))]
    OpenPodStream {
        pod_name: String,
        container_port: u16,
        peer: SocketAddr,
        #[snafu(source(from(kube::Error, Box::new)))]
        source: Box<kube::Error>,
    },

    /// The API server accepted the port forward but gave no stream for the
    /// port, so the debugger connection is dropped.
    #[snafu(display(
        "No stream to {pod_name}:{container_port} for {peer}, dropping the debugger connection"
    ))]
    PodStreamUnavailable { pod_name: String, container_port: u16, peer: SocketAddr },
}
