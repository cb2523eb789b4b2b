//! Kubernetes resources as they appear in an application manifest.
//!
//! [`Entity`] is any decoded manifest document. The four controller kinds
//! whose pod template tether knows how to edit are lifted into
//! [`WorkloadEntity`]; everything else stays a [`DynamicObject`] and only
//! takes part in the "is the application deployed" check.

mod deployment_config;

use std::collections::BTreeMap;

use k8s_openapi::{
    Resource,
    api::{
        apps::v1::{Deployment, ReplicaSet},
        core::v1::{PodTemplateSpec, ReplicationController},
    },
    apimachinery::pkg::apis::meta::v1::LabelSelector,
};
use kube::{ResourceExt, api::DynamicObject};

pub use self::deployment_config::DeploymentConfig;
use crate::ext::LabelSelectorExt;

/// Kinds that manage pods through a pod template.
const CONTROLLER_KINDS: [&str; 7] = [
    "Deployment",
    "ReplicaSet",
    "ReplicationController",
    "DeploymentConfig",
    "StatefulSet",
    "DaemonSet",
    "Job",
];

/// Access to the pod template and pod selector of a controller resource.
pub trait PodTemplateOwner {
    fn pod_template(&self) -> Option<&PodTemplateSpec>;

    fn pod_template_mut(&mut self) -> Option<&mut PodTemplateSpec>;

    /// Selector matching the pods created from the template. Empty selectors
    /// are reported as `None`.
    fn pod_selector(&self) -> Option<LabelSelector>;
}

impl PodTemplateOwner for Deployment {
    fn pod_template(&self) -> Option<&PodTemplateSpec> {
        self.spec.as_ref().map(|spec| &spec.template)
    }

    fn pod_template_mut(&mut self) -> Option<&mut PodTemplateSpec> {
        self.spec.as_mut().map(|spec| &mut spec.template)
    }

    fn pod_selector(&self) -> Option<LabelSelector> {
        self.spec.as_ref().map(|spec| spec.selector.clone()).filter(|s| !s.is_empty())
    }
}

impl PodTemplateOwner for ReplicaSet {
    fn pod_template(&self) -> Option<&PodTemplateSpec> {
        self.spec.as_ref().and_then(|spec| spec.template.as_ref())
    }

    fn pod_template_mut(&mut self) -> Option<&mut PodTemplateSpec> {
        self.spec.as_mut().and_then(|spec| spec.template.as_mut())
    }

    fn pod_selector(&self) -> Option<LabelSelector> {
        self.spec.as_ref().map(|spec| spec.selector.clone()).filter(|s| !s.is_empty())
    }
}

impl PodTemplateOwner for ReplicationController {
    fn pod_template(&self) -> Option<&PodTemplateSpec> {
        self.spec.as_ref().and_then(|spec| spec.template.as_ref())
    }

    fn pod_template_mut(&mut self) -> Option<&mut PodTemplateSpec> {
        self.spec.as_mut().and_then(|spec| spec.template.as_mut())
    }

    fn pod_selector(&self) -> Option<LabelSelector> {
        // The API server defaults an absent selector to the template labels.
        let labels = self
            .spec
            .as_ref()
            .and_then(|spec| spec.selector.clone())
            .or_else(|| template_labels(self.pod_template()));
        match_labels_selector(labels)
    }
}

impl PodTemplateOwner for DeploymentConfig {
    fn pod_template(&self) -> Option<&PodTemplateSpec> {
        self.spec.as_ref().and_then(|spec| spec.template.as_ref())
    }

    fn pod_template_mut(&mut self) -> Option<&mut PodTemplateSpec> {
        self.spec.as_mut().and_then(|spec| spec.template.as_mut())
    }

    fn pod_selector(&self) -> Option<LabelSelector> {
        let labels = self
            .spec
            .as_ref()
            .and_then(|spec| spec.selector.clone())
            .or_else(|| template_labels(self.pod_template()));
        match_labels_selector(labels)
    }
}

fn template_labels(template: Option<&PodTemplateSpec>) -> Option<BTreeMap<String, String>> {
    template.and_then(|template| template.metadata.as_ref()).and_then(|meta| meta.labels.clone())
}

fn match_labels_selector(labels: Option<BTreeMap<String, String>>) -> Option<LabelSelector> {
    labels
        .filter(|labels| !labels.is_empty())
        .map(|labels| LabelSelector { match_labels: Some(labels), ..LabelSelector::default() })
}

/// A controller resource whose pod template can be switched into debug mode.
#[derive(Clone, Debug)]
pub enum WorkloadEntity {
    Deployment(Box<Deployment>),
    ReplicaSet(Box<ReplicaSet>),
    ReplicationController(Box<ReplicationController>),
    DeploymentConfig(Box<DeploymentConfig>),
}

macro_rules! with_workload {
    ($entity:expr, $inner:ident => $body:expr) => {
        match $entity {
            WorkloadEntity::Deployment($inner) => $body,
            WorkloadEntity::ReplicaSet($inner) => $body,
            WorkloadEntity::ReplicationController($inner) => $body,
            WorkloadEntity::DeploymentConfig($inner) => $body,
        }
    };
}

impl WorkloadEntity {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Deployment(_) => Deployment::KIND,
            Self::ReplicaSet(_) => ReplicaSet::KIND,
            Self::ReplicationController(_) => ReplicationController::KIND,
            Self::DeploymentConfig(_) => DeploymentConfig::KIND,
        }
    }

    pub const fn api_version(&self) -> &'static str {
        match self {
            Self::Deployment(_) => Deployment::API_VERSION,
            Self::ReplicaSet(_) => ReplicaSet::API_VERSION,
            Self::ReplicationController(_) => ReplicationController::API_VERSION,
            Self::DeploymentConfig(_) => DeploymentConfig::API_VERSION,
        }
    }

    pub fn name(&self) -> String { with_workload!(self, inner => inner.name_any()) }

    pub fn namespace(&self) -> Option<String> { with_workload!(self, inner => inner.namespace()) }

    /// Whether the live object is consulted before mutating, so that an
    /// already debug-enabled workload is not applied again.
    ///
    /// Only replication controllers and deployment configs are guarded.
    /// Deployments and replica sets are always re-applied; the server treats
    /// an unchanged apply as a no-op. Keep this asymmetry unless it is changed
    /// on purpose together with the tests that pin it.
    pub const fn has_live_state_guard(&self) -> bool {
        matches!(self, Self::ReplicationController(_) | Self::DeploymentConfig(_))
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        with_workload!(self, inner => serde_json::to_value(inner))
    }
}

impl PodTemplateOwner for WorkloadEntity {
    fn pod_template(&self) -> Option<&PodTemplateSpec> {
        with_workload!(self, inner => inner.pod_template())
    }

    fn pod_template_mut(&mut self) -> Option<&mut PodTemplateSpec> {
        with_workload!(self, inner => inner.pod_template_mut())
    }

    fn pod_selector(&self) -> Option<LabelSelector> {
        with_workload!(self, inner => inner.pod_selector())
    }
}

impl From<Deployment> for WorkloadEntity {
    fn from(value: Deployment) -> Self { Self::Deployment(Box::new(value)) }
}

impl From<ReplicaSet> for WorkloadEntity {
    fn from(value: ReplicaSet) -> Self { Self::ReplicaSet(Box::new(value)) }
}

impl From<ReplicationController> for WorkloadEntity {
    fn from(value: ReplicationController) -> Self { Self::ReplicationController(Box::new(value)) }
}

impl From<DeploymentConfig> for WorkloadEntity {
    fn from(value: DeploymentConfig) -> Self { Self::DeploymentConfig(Box::new(value)) }
}

/// Any resource found in a manifest.
#[derive(Clone, Debug)]
pub enum Entity {
    Workload(WorkloadEntity),
    Other(Box<DynamicObject>),
}

impl Entity {
    /// Decodes a single manifest document, picking the typed representation
    /// for the workload kinds tether can edit.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the document does not match the
    /// schema of its kind.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let type_field =
            |field: &str| value.get(field).and_then(serde_json::Value::as_str).map(str::to_owned);
        let (api_version, kind) = (type_field("apiVersion"), type_field("kind"));
        let workload = match (api_version.as_deref(), kind.as_deref()) {
            (Some(Deployment::API_VERSION), Some(Deployment::KIND)) => {
                WorkloadEntity::from(serde_json::from_value::<Deployment>(value)?)
            }
            (Some(ReplicaSet::API_VERSION), Some(ReplicaSet::KIND)) => {
                WorkloadEntity::from(serde_json::from_value::<ReplicaSet>(value)?)
            }
            (Some(ReplicationController::API_VERSION), Some(ReplicationController::KIND)) => {
                WorkloadEntity::from(serde_json::from_value::<ReplicationController>(value)?)
            }
            // Older clusters serve DeploymentConfig from the legacy core group.
            (Some(DeploymentConfig::API_VERSION | "v1"), Some(DeploymentConfig::KIND)) => {
                WorkloadEntity::from(serde_json::from_value::<DeploymentConfig>(value)?)
            }
            _ => return Ok(Self::Other(Box::new(serde_json::from_value(value)?))),
        };
        Ok(Self::Workload(workload))
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::Workload(workload) => workload.kind(),
            Self::Other(object) => object.types.as_ref().map_or("Unknown", |t| t.kind.as_str()),
        }
    }

    pub fn api_version(&self) -> &str {
        match self {
            Self::Workload(workload) => workload.api_version(),
            Self::Other(object) => object.types.as_ref().map_or("", |t| t.api_version.as_str()),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Workload(workload) => workload.name(),
            Self::Other(object) => object.name_any(),
        }
    }

    pub fn namespace(&self) -> Option<String> {
        match self {
            Self::Workload(workload) => workload.namespace(),
            Self::Other(object) => object.namespace(),
        }
    }

    pub fn is_controller(&self) -> bool { CONTROLLER_KINDS.contains(&self.kind()) }

    /// Serializes the resource as a server-side apply body, which must carry
    /// `apiVersion` and `kind`.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the resource cannot be serialized.
    pub fn to_apply_body(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut body = match self {
            Self::Workload(workload) => workload.to_json()?,
            Self::Other(object) => serde_json::to_value(object)?,
        };
        if let Some(object) = body.as_object_mut() {
            let _previous = object.insert(
                "apiVersion".to_string(),
                serde_json::Value::String(self.api_version().to_string()),
            );
            let _previous = object
                .insert("kind".to_string(), serde_json::Value::String(self.kind().to_string()));
        }
        Ok(body)
    }
}

impl From<WorkloadEntity> for Entity {
    fn from(value: WorkloadEntity) -> Self { Self::Workload(value) }
}
