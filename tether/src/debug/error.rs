use std::{num::ParseIntError, time::Duration};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::core::ParseExpressionError;
use snafu::Snafu;

use crate::debug::DebugEnvVars;

/// Errors raised while activating remote debugging.
///
/// Cluster failures are reported with the resource they concern and are not
/// retried.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// A port argument is not a valid port number.
    #[snafu(display("Invalid port value: {name}={value}"))]
    InvalidPort { name: &'static str, value: String, source: ParseIntError },

    #[snafu(display("Invalid pod selector {selector:?}, error: {source}"))]
    InvalidSelector { selector: LabelSelector, source: ParseExpressionError },

    /// The pod watch ended before any pod reflected the debug configuration.
    #[snafu(display(
        "Could not find a running pod with selector {selector} and environment variables \
         {env_vars}"
    ))]
    PodNotFound { selector: String, env_vars: DebugEnvVars },

    #[snafu(display(
        "Timed out after {}s waiting for a running pod with selector {selector} and environment \
         variables {env_vars}",
        timeout.as_secs()
    ))]
    WaitTimedOut { selector: String, env_vars: DebugEnvVars, timeout: Duration },

    #[snafu(display(
        "Failed to list pods with selector {selector} in namespace {namespace}, error: {source}"
    ))]
    ListPods {
        namespace: String,
        selector: String,
        #[snafu(source(from(kube::Error, Box::new)))]
        source: Box<kube::Error>,
    },

    #[snafu(display("Failed to watch pods with selector {selector}, error: {source}"))]
    WatchPods {
        selector: String,
        #[snafu(source(from(kube::runtime::watcher::Error, Box::new)))]
        source: Box<kube::runtime::watcher::Error>,
    },

    #[snafu(display("Failed to discover the API serving {kind} in {api_version}, error: {source}"))]
    DiscoverResource {
        api_version: String,
        kind: String,
        #[snafu(source(from(kube::Error, Box::new)))]
        source: Box<kube::Error>,
    },

    #[snafu(display("Failed to get {kind} {name} in namespace {namespace}, error: {source}"))]
    GetLiveEntity {
        kind: String,
        name: String,
        namespace: String,
        #[snafu(source(from(kube::Error, Box::new)))]
        source: Box<kube::Error>,
    },

    #[snafu(display(
        "Failed to check whether {kind} {name} exists in namespace {namespace}, error: {source}"
    ))]
    CheckApplied {
        kind: String,
        name: String,
        namespace: String,
        #[snafu(source(from(kube::Error, Box::new)))]
        source: Box<kube::Error>,
    },

    #[snafu(display("Failed to apply {kind} {name} in namespace {namespace}, error: {source}"))]
    ApplyEntity {
        kind: String,
        name: String,
        namespace: String,
        #[snafu(source(from(kube::Error, Box::new)))]
        source: Box<kube::Error>,
    },

    #[snafu(display("Failed to serialize {kind} {name}, error: {source}"))]
    SerializeEntity { kind: String, name: String, source: serde_json::Error },

    #[snafu(display("{kind} {name} has an invalid apiVersion, cannot resolve its API"))]
    UnknownApiVersion { kind: String, name: String },

    #[snafu(display("{source}"))]
    PortForward { source: crate::port_forwarder::Error },
}

impl From<crate::port_forwarder::Error> for Error {
    fn from(source: crate::port_forwarder::Error) -> Self { Self::PortForward { source } }
}
