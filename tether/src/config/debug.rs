use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_LOCAL_PORT: u16 = 5005;

/// Defaults for `tether debug`, each of which can be overridden on the command
/// line.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugConfig {
    /// Local port the debugger attaches to.
    #[serde(default = "DebugConfig::default_local_port")]
    pub local_port: u16,

    /// Start the JVM suspended until a debugger attaches.
    #[serde(default)]
    pub suspend: bool,

    /// How long to wait for a debug-enabled pod, `0` waits without limit.
    #[serde(default = "DebugConfig::default_pod_wait_timeout_seconds")]
    pub pod_wait_timeout_seconds: u64,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            local_port: Self::default_local_port(),
            suspend: false,
            pod_wait_timeout_seconds: Self::default_pod_wait_timeout_seconds(),
        }
    }
}

impl DebugConfig {
    #[inline]
    #[must_use]
    pub const fn default_local_port() -> u16 { DEFAULT_LOCAL_PORT }

    #[inline]
    #[must_use]
    pub const fn default_pod_wait_timeout_seconds() -> u64 { 600 }

    #[must_use]
    pub const fn pod_wait_timeout(&self) -> Option<Duration> {
        match self.pod_wait_timeout_seconds {
            0 => None,
            seconds => Some(Duration::from_secs(seconds)),
        }
    }
}
