use std::path::PathBuf;

use snafu::Snafu;

/// Errors raised while loading an application manifest.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Failed to read manifest {}, error: {source}", path.display()))]
    ReadManifest { path: PathBuf, source: std::io::Error },

    /// A document is not valid YAML (or JSON).
    #[snafu(display(
        "Failed to parse document #{index} of manifest {}, error: {source}",
        path.display()
    ))]
    ParseDocument { path: PathBuf, index: usize, source: serde_yaml::Error },

    /// A document is valid YAML but not a Kubernetes resource.
    #[snafu(display(
        "Document #{index} of manifest {} is not a valid resource, error: {source}",
        path.display()
    ))]
    DecodeResource { path: PathBuf, index: usize, source: serde_json::Error },
}
