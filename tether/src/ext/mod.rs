//! Extensions to `k8s_openapi` types.
//!
//! The traits here add the small amount of domain logic tether needs on top
//! of plain Kubernetes objects: env-var and port editing on containers, empty
//! label selectors, and status helpers on pods.

mod container;
mod label_selector;
mod pod;

pub use self::{
    container::ContainerExt,
    label_selector::LabelSelectorExt,
    pod::{PodExt, newest_pod},
};
