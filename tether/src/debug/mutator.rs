use k8s_openapi::api::core::v1::{Container, ContainerPort};
use tether_base::consts::debug::{
    DEBUG_PORT_NAME, ENV_VAR_JAVA_DEBUG, ENV_VAR_JAVA_DEBUG_PORT, ENV_VAR_JAVA_DEBUG_PORT_DEFAULT,
    ENV_VAR_JAVA_DEBUG_SESSION, ENV_VAR_JAVA_DEBUG_SUSPEND,
};

use crate::{
    debug::{ClusterReader, DebugSettings, Error},
    entity::{PodTemplateOwner, WorkloadEntity},
    ext::ContainerExt,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MutationOutcome {
    /// The workload has no pod template to edit.
    NoTemplate,
    /// The live workload already runs with the requested debug environment.
    AlreadyEnabled,
    /// Every container already carried the debug configuration.
    Unchanged,
    /// At least one container changed; the workload must be applied.
    Mutated,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Mutation {
    pub outcome: MutationOutcome,

    /// Value of `JAVA_DEBUG_PORT` in the first container, or the default
    /// debug port when it is not set.
    pub debug_port: Option<String>,
}

impl Mutation {
    pub const fn needs_apply(&self) -> bool { matches!(self.outcome, MutationOutcome::Mutated) }
}

/// Switches the pod template of a workload into debug mode.
pub struct ResourceMutator<'c, C> {
    cluster: &'c C,
}

impl<'c, C> ResourceMutator<'c, C>
where
    C: ClusterReader,
{
    pub const fn new(cluster: &'c C) -> Self { Self { cluster } }

    /// Edits every container of the workload's pod template in place.
    ///
    /// Replication controllers and deployment configs are compared against
    /// their live state first; if the cluster already runs them with the
    /// requested debug environment the template is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the live state of a guarded workload cannot be
    /// fetched.
    pub async fn mutate(
        &self,
        entity: &mut WorkloadEntity,
        settings: &DebugSettings,
    ) -> Result<Mutation, Error> {
        let Some(containers) = entity
            .pod_template()
            .and_then(|template| template.spec.as_ref())
            .map(|spec| &spec.containers)
        else {
            return Ok(Mutation { outcome: MutationOutcome::NoTemplate, debug_port: None });
        };
        let debug_port = containers.first().map(container_debug_port);

        if entity.has_live_state_guard() {
            let live_env = self.cluster.live_container_env(entity).await?;
            if settings.env_vars().matches(&live_env) {
                tracing::debug!(
                    "{} {} already runs with debug enabled",
                    entity.kind(),
                    entity.name()
                );
                return Ok(Mutation { outcome: MutationOutcome::AlreadyEnabled, debug_port });
            }
        }

        let Some(spec) = entity.pod_template_mut().and_then(|template| template.spec.as_mut())
        else {
            return Ok(Mutation { outcome: MutationOutcome::NoTemplate, debug_port });
        };

        let mut changed = false;
        for container in &mut spec.containers {
            changed |= enable_debug(container, settings);
        }

        let outcome = if changed { MutationOutcome::Mutated } else { MutationOutcome::Unchanged };
        Ok(Mutation { outcome, debug_port })
    }
}

fn container_debug_port(container: &Container) -> String {
    container
        .env_var(ENV_VAR_JAVA_DEBUG_PORT)
        .unwrap_or(ENV_VAR_JAVA_DEBUG_PORT_DEFAULT)
        .to_string()
}

// Every step runs even when an earlier one already reported a change.
fn enable_debug(container: &mut Container, settings: &DebugSettings) -> bool {
    let debug_port = container_debug_port(container);
    set_debug_env_vars(container, settings.suspend())
        | expose_debug_port(container, &debug_port)
        | toggle_suspend(container, settings)
}

fn set_debug_env_vars(container: &mut Container, suspend: bool) -> bool {
    container.set_env_var(ENV_VAR_JAVA_DEBUG, "true")
        | container.set_env_var(ENV_VAR_JAVA_DEBUG_SUSPEND, &suspend.to_string())
}

fn expose_debug_port(container: &mut Container, debug_port: &str) -> bool {
    let Ok(container_port) = debug_port.parse::<i32>() else {
        tracing::warn!(
            "Container {} has a non-numeric {ENV_VAR_JAVA_DEBUG_PORT} value {debug_port}, not \
             exposing it",
            container.name
        );
        return false;
    };
    if container.exposes_port(container_port) {
        return false;
    }
    container.add_port(ContainerPort {
        name: Some(DEBUG_PORT_NAME.to_string()),
        container_port,
        ..ContainerPort::default()
    });
    true
}

fn toggle_suspend(container: &mut Container, settings: &DebugSettings) -> bool {
    let Some(token) = settings.session_token() else {
        return container.remove_env_var(ENV_VAR_JAVA_DEBUG_SESSION);
    };

    let _changed = container.set_env_var(ENV_VAR_JAVA_DEBUG_SESSION, &token.to_string());
    // A suspended JVM never answers health checks.
    if container.readiness_probe.take().is_some() {
        tracing::info!(
            "Removing readiness probe from container {} to allow debugging",
            container.name
        );
    }
    if container.liveness_probe.take().is_some() {
        tracing::info!(
            "Removing liveness probe from container {} to allow debugging",
            container.name
        );
    }
    true
}
