//! In-memory collaborators for exercising the debug workflow.

use std::{
    path::Path,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use futures::{
    StreamExt,
    stream::{self, BoxStream},
};
use k8s_openapi::{
    api::core::v1::{Container, EnvVar, Pod},
    apimachinery::pkg::apis::meta::v1::LabelSelector,
};
use kube::{
    ResourceExt,
    core::{Selector, SelectorExt},
};
use serde_json::json;

use crate::{
    debug::{ApplyService, ClusterReader, Error, PodWaitLog, PortForwardService},
    entity::{Entity, WorkloadEntity},
};

pub enum WatchEvent {
    Pod(Pod),
    Error,
}

#[derive(Default)]
pub struct FakeCluster {
    pods: Vec<Pod>,
    watch_events: Mutex<Vec<WatchEvent>>,
    keep_watch_open: bool,
    live_env: Vec<EnvVar>,
    unapplied: Vec<String>,
    live_env_calls: AtomicUsize,
    list_calls: AtomicUsize,
    watch_calls: AtomicUsize,
    applied_checks: Mutex<Vec<String>>,
    applied: Mutex<Vec<(String, serde_json::Value)>>,
    forwarded: Mutex<Vec<(String, u16, u16)>>,
}

impl FakeCluster {
    pub fn with_pods(mut self, pods: Vec<Pod>) -> Self {
        self.pods = pods;
        self
    }

    pub fn with_watch_events(self, events: Vec<WatchEvent>) -> Self {
        Self { watch_events: Mutex::new(events), ..self }
    }

    /// The watch stream never ends after its events are delivered.
    pub const fn keep_watch_open(mut self) -> Self {
        self.keep_watch_open = true;
        self
    }

    pub fn with_live_env(mut self, env: Vec<EnvVar>) -> Self {
        self.live_env = env;
        self
    }

    pub fn with_unapplied(mut self, name: &str) -> Self {
        self.unapplied.push(name.to_string());
        self
    }

    pub fn live_env_calls(&self) -> usize { self.live_env_calls.load(Ordering::SeqCst) }

    pub fn list_calls(&self) -> usize { self.list_calls.load(Ordering::SeqCst) }

    pub fn watch_calls(&self) -> usize { self.watch_calls.load(Ordering::SeqCst) }

    pub fn applied_checks(&self) -> Vec<String> {
        self.applied_checks.lock().expect("lock").clone()
    }

    pub fn applied(&self) -> Vec<String> {
        self.applied.lock().expect("lock").iter().map(|(name, _)| name.clone()).collect()
    }

    /// First container of the pod template as it was last sent to the cluster
    /// for the entity called `name`.
    pub fn applied_container(&self, name: &str) -> Option<Container> {
        self.applied
            .lock()
            .expect("lock")
            .iter()
            .rev()
            .find(|(applied, _)| applied == name)
            .and_then(|(_, body)| body.pointer("/spec/template/spec/containers/0").cloned())
            .map(|container| serde_json::from_value(container).expect("valid container"))
    }

    pub fn forwarded(&self) -> Vec<(String, u16, u16)> {
        self.forwarded.lock().expect("lock").clone()
    }
}

impl ClusterReader for FakeCluster {
    async fn list_pods(&self, selector: &Selector) -> Result<Vec<Pod>, Error> {
        let _previous = self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pods.iter().filter(|pod| selector.matches(pod.labels())).cloned().collect())
    }

    fn watch_pods(&self, selector: &Selector) -> BoxStream<'static, Result<Pod, Error>> {
        let _previous = self.watch_calls.fetch_add(1, Ordering::SeqCst);
        let events = std::mem::take(&mut *self.watch_events.lock().expect("lock"));
        let events = events
            .into_iter()
            .filter_map(|event| match event {
                WatchEvent::Pod(pod) => selector.matches(pod.labels()).then_some(Ok(pod)),
                WatchEvent::Error => Some(Err(Error::UnknownApiVersion {
                    kind: "Pod".to_string(),
                    name: "watch".to_string(),
                })),
            })
            .collect::<Vec<_>>();
        let events = stream::iter(events);
        if self.keep_watch_open { events.chain(stream::pending()).boxed() } else { events.boxed() }
    }

    async fn live_container_env(&self, _entity: &WorkloadEntity) -> Result<Vec<EnvVar>, Error> {
        let _previous = self.live_env_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.live_env.clone())
    }
}

impl ApplyService for FakeCluster {
    async fn is_already_applied(&self, entity: &Entity) -> Result<bool, Error> {
        let name = entity.name();
        let applied = !self.unapplied.contains(&name);
        self.applied_checks.lock().expect("lock").push(name);
        Ok(applied)
    }

    async fn apply(&self, entity: &Entity, _manifest: &Path) -> Result<(), Error> {
        let body = entity.to_apply_body().expect("serializable entity");
        self.applied.lock().expect("lock").push((entity.name(), body));
        Ok(())
    }
}

impl PortForwardService for FakeCluster {
    async fn start_port_forward(
        &self,
        pod_name: &str,
        container_port: u16,
        local_port: u16,
    ) -> Result<(), Error> {
        self.forwarded.lock().expect("lock").push((
            pod_name.to_string(),
            container_port,
            local_port,
        ));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingWaitLog {
    observed: Mutex<Vec<String>>,
    ready: Mutex<Vec<String>>,
}

impl RecordingWaitLog {
    pub fn observed(&self) -> Vec<String> { self.observed.lock().expect("lock").clone() }

    pub fn ready(&self) -> Vec<String> { self.ready.lock().expect("lock").clone() }
}

impl PodWaitLog for RecordingWaitLog {
    fn pod_observed(&self, pod: &Pod) { self.observed.lock().expect("lock").push(pod.name_any()); }

    fn pod_ready(&self, pod_name: &str) {
        self.ready.lock().expect("lock").push(pod_name.to_string());
    }
}

pub fn env_vars(vars: &[(&str, &str)]) -> Vec<EnvVar> {
    vars.iter()
        .map(|(name, value)| EnvVar {
            name: (*name).to_string(),
            value: Some((*value).to_string()),
            ..EnvVar::default()
        })
        .collect()
}

pub fn workload(value: serde_json::Value) -> WorkloadEntity {
    match Entity::from_json(value).expect("valid entity") {
        Entity::Workload(workload) => workload,
        Entity::Other(object) => panic!("not a workload: {object:?}"),
    }
}

/// A pod labelled `app=<name prefix>` whose single container carries `env`.
pub fn pod(name: &str, created: &str, phase: &str, env: &[(&str, &str)]) -> Pod {
    let app = name.split('-').next().unwrap_or(name);
    serde_json::from_value(json!({
        "metadata": {
            "name": name,
            "creationTimestamp": created,
            "labels": { "app": app }
        },
        "spec": { "containers": [{ "name": "app", "env": env_vars(env) }] },
        "status": { "phase": phase }
    }))
    .expect("valid pod")
}

pub fn selector(app: &str) -> LabelSelector {
    LabelSelector {
        match_labels: Some([("app".to_string(), app.to_string())].into()),
        ..LabelSelector::default()
    }
}
