use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{source}"))]
    Configuration { source: crate::config::Error },

    #[snafu(display("{source}"))]
    Manifest { source: crate::manifest::Error },

    #[snafu(display("{source}"))]
    Debug {
        #[snafu(source(from(crate::debug::Error, Box::new)))]
        source: Box<crate::debug::Error>,
    },

    #[snafu(display("Failed to write to stdout, error: {source}"))]
    WriteStdout { source: std::io::Error },

    #[snafu(display("Failed to initialize Kubernetes client configuration, error: {source}"))]
    KubeConfig {
        #[snafu(source(from(kube::Error, Box::new)))]
        source: Box<kube::Error>,
    },

    #[snafu(display("Failed to create tokio runtime, error: {source}"))]
    InitializeTokioRuntime { source: std::io::Error },
}

impl From<crate::config::Error> for Error {
    fn from(source: crate::config::Error) -> Self { Self::Configuration { source } }
}

impl From<crate::manifest::Error> for Error {
    fn from(source: crate::manifest::Error) -> Self { Self::Manifest { source } }
}

impl From<crate::debug::Error> for Error {
    fn from(source: crate::debug::Error) -> Self { Self::Debug { source: Box::new(source) } }
}
