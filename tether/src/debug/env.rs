use std::{collections::BTreeMap, fmt};

use k8s_openapi::api::core::v1::{Container, EnvVar};
use tether_base::consts::debug::{
    ENV_VAR_JAVA_DEBUG, ENV_VAR_JAVA_DEBUG_SESSION, ENV_VAR_JAVA_DEBUG_SUSPEND,
};

/// The environment a container carries once remote debugging is enabled.
///
/// Keys are kept sorted so two mappings built from the same inputs compare
/// and print identically.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DebugEnvVars(BTreeMap<String, String>);

impl DebugEnvVars {
    /// The session token is only part of the mapping while suspend mode is
    /// on.
    pub fn new(suspend: bool, session_token: Option<&SessionToken>) -> Self {
        let mut vars = BTreeMap::from([
            (ENV_VAR_JAVA_DEBUG.to_string(), "true".to_string()),
            (ENV_VAR_JAVA_DEBUG_SUSPEND.to_string(), suspend.to_string()),
        ]);
        if let Some(token) = session_token.filter(|_| suspend) {
            let _previous = vars.insert(ENV_VAR_JAVA_DEBUG_SESSION.to_string(), token.to_string());
        }
        Self(vars)
    }

    /// Whether every expected variable is present in `env` with the same
    /// literal value. Additional variables are allowed.
    pub fn matches(&self, env: &[EnvVar]) -> bool {
        self.0.iter().all(|(name, value)| {
            env.iter().any(|var| var.name == *name && var.value.as_deref() == Some(value.as_str()))
        })
    }

    pub fn matches_container(&self, container: Option<&Container>) -> bool {
        container
            .and_then(|container| container.env.as_deref())
            .is_some_and(|env| self.matches(env))
    }
}

impl fmt::Display for DebugEnvVars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs =
            self.0.iter().map(|(name, value)| format!("{name}={value}")).collect::<Vec<_>>();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

/// Opaque value that changes on every suspend activation, forcing the
/// controller to roll out pods even when nothing else in the template
/// changed. It is not a secret.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Self { Self(rand::random::<u64>().to_string()) }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Debug mode requested for one activation.
#[derive(Clone, Debug)]
pub struct DebugSettings {
    suspend: bool,
    session_token: Option<SessionToken>,
}

impl DebugSettings {
    /// A session token is generated exactly once, and only in suspend mode.
    pub fn new(suspend: bool) -> Self {
        Self { suspend, session_token: suspend.then(SessionToken::generate) }
    }

    pub const fn suspend(&self) -> bool { self.suspend }

    pub const fn session_token(&self) -> Option<&SessionToken> { self.session_token.as_ref() }

    pub fn env_vars(&self) -> DebugEnvVars {
        DebugEnvVars::new(self.suspend, self.session_token.as_ref())
    }
}
