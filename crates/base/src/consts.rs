pub mod debug {
    //! Environment variables understood by debug-enabled container images.

    /// Set to `"true"` to start the runtime with a debug agent listening.
    pub const ENV_VAR_JAVA_DEBUG: &str = "JAVA_ENABLE_DEBUG";

    /// Set to `"true"` to block the process at startup until a debugger
    /// attaches.
    pub const ENV_VAR_JAVA_DEBUG_SUSPEND: &str = "JAVA_DEBUG_SUSPEND";

    /// Random value changed on every suspend activation so that the pod
    /// template differs and the controller rolls out new pods.
    pub const ENV_VAR_JAVA_DEBUG_SESSION: &str = "JAVA_DEBUG_SESSION";

    /// Overrides the port the debug agent listens on inside the container.
    pub const ENV_VAR_JAVA_DEBUG_PORT: &str = "JAVA_DEBUG_PORT";

    pub const ENV_VAR_JAVA_DEBUG_PORT_DEFAULT: &str = "5005";

    /// Name given to the container port exposing the debug agent.
    pub const DEBUG_PORT_NAME: &str = "debug";
}

pub mod k8s {
    /// Field manager recorded on server-side apply requests.
    pub const FIELD_MANAGER: &str = crate::PROJECT_NAME;
}
