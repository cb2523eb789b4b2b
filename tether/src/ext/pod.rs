use k8s_openapi::api::core::v1::{Container, Pod};
use kube::runtime::{conditions::is_pod_running, wait::Condition};

pub trait PodExt {
    fn first_container(&self) -> Option<&Container>;

    fn phase(&self) -> &str;

    fn is_running(&self) -> bool;
}

impl PodExt for Pod {
    fn first_container(&self) -> Option<&Container> {
        self.spec.as_ref().and_then(|spec| spec.containers.first())
    }

    fn phase(&self) -> &str {
        self.status.as_ref().and_then(|status| status.phase.as_deref()).unwrap_or("Unknown")
    }

    fn is_running(&self) -> bool { is_pod_running().matches_object(Some(self)) }
}

/// Picks the pod created last; pods without a creation timestamp sort first.
pub fn newest_pod(pods: &[Pod]) -> Option<&Pod> {
    pods.iter().max_by(|a, b| a.metadata.creation_timestamp.cmp(&b.metadata.creation_timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod(name: &str, created: Option<&str>, phase: &str) -> Pod {
        serde_json::from_value(serde_json::json!({
            "metadata": { "name": name, "creationTimestamp": created },
            "spec": { "containers": [{ "name": "app" }, { "name": "sidecar" }] },
            "status": { "phase": phase },
        }))
        .expect("valid pod")
    }

    #[test]
    fn test_newest_pod() {
        let pods = vec![
            pod("old", Some("2024-01-01T00:00:00Z"), "Running"),
            pod("new", Some("2024-03-01T00:00:00Z"), "Pending"),
            pod("unknown", None, "Running"),
        ];

        assert_eq!(newest_pod(&pods).and_then(|pod| pod.metadata.name.as_deref()), Some("new"));
        assert!(newest_pod(&[]).is_none());
    }

    #[test]
    fn test_status_helpers() {
        let running = pod("web-1", None, "Running");
        assert!(running.is_running());
        assert_eq!(running.phase(), "Running");
        assert_eq!(running.first_container().map(|c| c.name.as_str()), Some("app"));

        let pending = pod("web-2", None, "Pending");
        assert!(!pending.is_running());
        assert_eq!(Pod::default().phase(), "Unknown");
        assert!(Pod::default().first_container().is_none());
    }
}
