use std::time::Duration;

use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;

use crate::{debug::PodWaitLog, ext::PodExt};

/// Spinner shown while waiting for a pod that runs with debug enabled.
pub struct PodWaitSpinner {
    inner: indicatif::ProgressBar,
}

impl PodWaitSpinner {
    pub fn new() -> Self {
        let spinner = Self::with_progress_bar(indicatif::ProgressBar::new_spinner());
        spinner.inner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }

    fn with_progress_bar(inner: indicatif::ProgressBar) -> Self {
        let style = indicatif::ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {msg}",
        )
        .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner());
        inner.set_style(style);
        inner.set_message("Waiting for a pod with debug enabled");
        Self { inner }
    }
}

impl Default for PodWaitSpinner {
    fn default() -> Self { Self::new() }
}

impl PodWaitLog for PodWaitSpinner {
    fn pod_observed(&self, pod: &Pod) {
        self.inner.set_message(format!("Pod {} status: {}", pod.name_any(), pod.phase()));
    }

    fn pod_ready(&self, pod_name: &str) {
        self.inner.finish_with_message(format!("Pod {pod_name} is ready for debugging"));
    }
}

impl Drop for PodWaitSpinner {
    fn drop(&mut self) {
        if !self.inner.is_finished() {
            self.inner.finish_and_clear();
        }
    }
}
