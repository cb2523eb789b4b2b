use std::collections::BTreeMap;

use k8s_openapi::{
    ListableResource, Metadata, NamespaceResourceScope, Resource,
    api::core::v1::PodTemplateSpec, apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
use serde::{Deserialize, Serialize};

/// OpenShift `DeploymentConfig`.
///
/// Only the fields tether reads or edits are typed; everything else in the
/// spec (triggers, strategy, ...) is carried through untouched so that an
/// apply does not drop it.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DeploymentConfig {
    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<DeploymentConfigSpec>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfigSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PodTemplateSpec>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Resource for DeploymentConfig {
    const API_VERSION: &'static str = "apps.openshift.io/v1";
    const GROUP: &'static str = "apps.openshift.io";
    const KIND: &'static str = "DeploymentConfig";
    const VERSION: &'static str = "v1";
    const URL_PATH_SEGMENT: &'static str = "deploymentconfigs";
    type Scope = NamespaceResourceScope;
}

impl ListableResource for DeploymentConfig {
    const LIST_KIND: &'static str = "DeploymentConfigList";
}

impl Metadata for DeploymentConfig {
    type Ty = ObjectMeta;

    fn metadata(&self) -> &Self::Ty { &self.metadata }

    fn metadata_mut(&mut self) -> &mut Self::Ty { &mut self.metadata }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_spec_fields_survive_round_trip() {
        let raw = serde_json::json!({
            "apiVersion": "apps.openshift.io/v1",
            "kind": "DeploymentConfig",
            "metadata": { "name": "app" },
            "spec": {
                "replicas": 1,
                "selector": { "app": "app" },
                "triggers": [{ "type": "ConfigChange" }],
                "template": {
                    "metadata": { "labels": { "app": "app" } },
                    "spec": { "containers": [{ "name": "app", "image": "app:latest" }] }
                }
            }
        });

        let dc: DeploymentConfig = serde_json::from_value(raw).expect("valid DeploymentConfig");
        let spec = dc.spec.as_ref().expect("spec");
        assert_eq!(spec.replicas, Some(1));
        assert!(spec.extra.contains_key("triggers"));

        let value = serde_json::to_value(&dc).expect("serializable");
        assert_eq!(value["spec"]["triggers"][0]["type"], "ConfigChange");
        assert_eq!(value["spec"]["template"]["spec"]["containers"][0]["name"], "app");
    }
}
