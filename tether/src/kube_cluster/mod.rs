//! Cluster collaborators backed by the Kubernetes API.

use std::{fmt, path::Path};

use futures::{StreamExt, TryStreamExt, stream::BoxStream};
use k8s_openapi::{
    NamespaceResourceScope,
    api::{
        apps::v1::{Deployment, ReplicaSet},
        core::v1::{EnvVar, Pod, ReplicationController},
    },
};
use kube::{
    Api,
    api::{DynamicObject, ListParams, Patch, PatchParams},
    core::{GroupVersion, GroupVersionKind, Selector},
    discovery::{self, Scope},
    runtime::{WatchStreamExt, watcher},
};
use serde::de::DeserializeOwned;
use snafu::{OptionExt, ResultExt};
use tether_base::consts::k8s::FIELD_MANAGER;

use crate::{
    debug::{ApplyService, ClusterReader, Error, error},
    entity::{DeploymentConfig, Entity, PodTemplateOwner, WorkloadEntity},
};

#[derive(Clone)]
pub struct KubeCluster {
    client: kube::Client,
    namespace: String,
    pod_namespace: String,
}

impl KubeCluster {
    /// `namespace` applies to every resource that does not name its own and
    /// is where pods are looked up unless [`Self::with_pod_namespace`] says
    /// otherwise.
    pub fn new(client: kube::Client, namespace: String) -> Self {
        Self { client, pod_namespace: namespace.clone(), namespace }
    }

    #[must_use]
    pub fn with_pod_namespace(self, pod_namespace: String) -> Self {
        Self { pod_namespace, ..self }
    }

    fn namespace_of(&self, namespace: Option<String>) -> String {
        namespace.unwrap_or_else(|| self.namespace.clone())
    }

    fn pods(&self) -> Api<Pod> { Api::namespaced(self.client.clone(), &self.pod_namespace) }

    async fn live_first_container_env<K>(
        &self,
        entity: &WorkloadEntity,
    ) -> Result<Vec<EnvVar>, Error>
    where
        K: kube::Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + PodTemplateOwner
            + Clone
            + DeserializeOwned
            + fmt::Debug,
    {
        let (name, namespace) = (entity.name(), self.namespace_of(entity.namespace()));
        let live = Api::<K>::namespaced(self.client.clone(), &namespace)
            .get_opt(&name)
            .await
            .with_context(|_| error::GetLiveEntitySnafu {
                kind: entity.kind(),
                name: &name,
                namespace: &namespace,
            })?;

        Ok(live
            .as_ref()
            .and_then(PodTemplateOwner::pod_template)
            .and_then(|template| template.spec.as_ref())
            .and_then(|spec| spec.containers.first())
            .and_then(|container| container.env.clone())
            .unwrap_or_default())
    }

    /// Resolves the API serving `entity`, scoped the way the cluster serves
    /// its kind.
    async fn dynamic_api(&self, entity: &Entity) -> Result<Api<DynamicObject>, Error> {
        let gvk = group_version_kind(entity)?;
        let (resource, capabilities) = discovery::pinned_kind(&self.client, &gvk)
            .await
            .with_context(|_| error::DiscoverResourceSnafu {
                api_version: entity.api_version(),
                kind: entity.kind(),
            })?;

        Ok(match capabilities.scope {
            Scope::Cluster => Api::all_with(self.client.clone(), &resource),
            Scope::Namespaced => Api::namespaced_with(
                self.client.clone(),
                &self.namespace_of(entity.namespace()),
                &resource,
            ),
        })
    }
}

fn group_version_kind(entity: &Entity) -> Result<GroupVersionKind, Error> {
    entity
        .api_version()
        .parse::<GroupVersion>()
        .ok()
        .filter(|group_version| !group_version.version.is_empty())
        .map(|group_version| group_version.with_kind(entity.kind()))
        .with_context(|| error::UnknownApiVersionSnafu { kind: entity.kind(), name: entity.name() })
}

impl ClusterReader for KubeCluster {
    async fn list_pods(&self, selector: &Selector) -> Result<Vec<Pod>, Error> {
        let pods = self
            .pods()
            .list(&ListParams::default().labels_from(selector))
            .await
            .with_context(|_| error::ListPodsSnafu {
                namespace: &self.pod_namespace,
                selector: selector.to_string(),
            })?;
        Ok(pods.items)
    }

    fn watch_pods(&self, selector: &Selector) -> BoxStream<'static, Result<Pod, Error>> {
        let config = watcher::Config::default().labels_from(selector);
        let selector = selector.to_string();
        watcher(self.pods(), config)
            .default_backoff()
            .applied_objects()
            .map_err(move |source| Error::WatchPods {
                selector: selector.clone(),
                source: Box::new(source),
            })
            .boxed()
    }

    async fn live_container_env(&self, entity: &WorkloadEntity) -> Result<Vec<EnvVar>, Error> {
        match entity {
            WorkloadEntity::Deployment(_) => {
                self.live_first_container_env::<Deployment>(entity).await
            }
            WorkloadEntity::ReplicaSet(_) => {
                self.live_first_container_env::<ReplicaSet>(entity).await
            }
            WorkloadEntity::ReplicationController(_) => {
                self.live_first_container_env::<ReplicationController>(entity).await
            }
            WorkloadEntity::DeploymentConfig(_) => {
                self.live_first_container_env::<DeploymentConfig>(entity).await
            }
        }
    }
}

impl ApplyService for KubeCluster {
    async fn is_already_applied(&self, entity: &Entity) -> Result<bool, Error> {
        let name = entity.name();
        let live = self.dynamic_api(entity).await?.get_opt(&name).await.with_context(|_| {
            error::CheckAppliedSnafu {
                kind: entity.kind(),
                name: &name,
                namespace: self.namespace_of(entity.namespace()),
            }
        })?;
        Ok(live.is_some())
    }

    async fn apply(&self, entity: &Entity, manifest: &Path) -> Result<(), Error> {
        let name = entity.name();
        let body = entity
            .to_apply_body()
            .with_context(|_| error::SerializeEntitySnafu { kind: entity.kind(), name: &name })?;

        tracing::debug!("Applying {} {name} from {}", entity.kind(), manifest.display());
        let _applied = self
            .dynamic_api(entity)
            .await?
            .patch(&name, &PatchParams::apply(FIELD_MANAGER).force(), &Patch::Apply(&body))
            .await
            .with_context(|_| error::ApplyEntitySnafu {
                kind: entity.kind(),
                name: &name,
                namespace: self.namespace_of(entity.namespace()),
            })?;
        Ok(())
    }
}
