use k8s_openapi::api::core::v1::{Container, ContainerPort, EnvVar};

/// In-place editing of a container's environment and port list.
///
/// Setters report whether they changed anything, so callers can decide if the
/// owning resource has to be applied again.
pub trait ContainerExt {
    /// Literal value of the env var `name`, if it is set with a plain value.
    fn env_var(&self, name: &str) -> Option<&str>;

    /// Sets `name` to `value`, returning `false` when it already had exactly
    /// that value.
    fn set_env_var(&mut self, name: &str, value: &str) -> bool;

    /// Removes every env var called `name`, returning `true` if one existed.
    fn remove_env_var(&mut self, name: &str) -> bool;

    fn exposes_port(&self, container_port: i32) -> bool;

    fn add_port(&mut self, port: ContainerPort);
}

impl ContainerExt for Container {
    fn env_var(&self, name: &str) -> Option<&str> {
        self.env.iter().flatten().find(|var| var.name == name).and_then(|var| var.value.as_deref())
    }

    fn set_env_var(&mut self, name: &str, value: &str) -> bool {
        let env = self.env.get_or_insert_with(Vec::new);
        match env.iter_mut().find(|var| var.name == name) {
            Some(var) if var.value.as_deref() == Some(value) && var.value_from.is_none() => false,
            Some(var) => {
                var.value = Some(value.to_string());
                var.value_from = None;
                true
            }
            None => {
                env.push(EnvVar {
                    name: name.to_string(),
                    value: Some(value.to_string()),
                    ..EnvVar::default()
                });
                true
            }
        }
    }

    fn remove_env_var(&mut self, name: &str) -> bool {
        let Some(env) = self.env.as_mut() else {
            return false;
        };
        let before = env.len();
        env.retain(|var| var.name != name);
        env.len() != before
    }

    fn exposes_port(&self, container_port: i32) -> bool {
        self.ports.iter().flatten().any(|port| port.container_port == container_port)
    }

    fn add_port(&mut self, port: ContainerPort) {
        self.ports.get_or_insert_with(Vec::new).push(port);
    }
}
