//! Command-line interface of tether.
//!
//! # Examples
//!
//! ```bash
//! # Enable debugging on the application deployed from a manifest and forward
//! # local port 5005 to the JVM debug port of a debug-enabled pod
//! tether debug -f target/classes/META-INF/jkube/kubernetes.yml
//!
//! # Start the JVM suspended, forward local port 8000
//! tether debug -f kubernetes.yml --suspend -p 8000 -n shop
//! ```

mod debug;
pub mod error;

use std::{io::Write, path::PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use snafu::ResultExt;
use tether_base::CLI_PROGRAM_NAME;
use tokio::runtime::Runtime;

use self::debug::DebugCommand;
pub use self::error::Error;
use crate::{config::Config, shadow};

#[derive(Parser)]
#[command(
    name = CLI_PROGRAM_NAME,
    author,
    version,
    long_version = shadow::CLAP_LONG_VERSION,
    about = "Tether: attach a remote debugger to Java workloads running in Kubernetes.",
    long_about = "Tether switches the workloads of an already deployed application into \
                  remote-debug mode, waits until a pod runs with debugging enabled and forwards \
                  a local port to its debug port.",
    color = clap::ColorChoice::Always
)]
pub struct Cli {
    #[clap(subcommand)]
    commands: Option<Commands>,

    #[clap(
        long = "config",
        short = 'c',
        env = "TETHER_CONFIG_FILE_PATH",
        help = "Specify a configuration file. Defaults to ~/.config/tether/config.yaml or \
                TETHER_CONFIG_FILE_PATH env var."
    )]
    config_file: Option<PathBuf>,

    #[clap(
        long = "log-level",
        env = "TETHER_LOG_LEVEL",
        help = "Set the logging level (e.g., info, debug, trace)."
    )]
    log_level: Option<tracing::Level>,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    #[command(about = "Display client and server version information")]
    Version {
        #[clap(long = "client", help = "If true, shows client version only (no server required).")]
        client: bool,
    },

    #[command(about = "Generate shell completion script for the specified shell (bash, zsh, fish)")]
    Completions { shell: clap_complete::Shell },

    #[command(about = "Output the default configuration in YAML format")]
    DefaultConfig,

    /// Enables remote debugging on a deployed application.
    #[command(
        alias = "d",
        about = "Enable remote debugging on a deployed application and forward the debug port"
    )]
    Debug(DebugCommand),
}

impl Default for Cli {
    fn default() -> Self { Self::parse() }
}

impl Cli {
    /// Uses `--config` when given; otherwise the searched default file, or
    /// the built-in defaults if there is none. `--log-level` overrides the
    /// file.
    fn load_config(&self) -> Result<Config, Error> {
        let mut config = match &self.config_file {
            Some(path) => Config::load(path)?,
            None => Config::load_or_default(Config::search_config_file_path())?,
        };

        if let Some(log_level) = self.log_level {
            config.log.level = log_level;
        }

        Ok(config)
    }

    /// Runs the selected command and returns the process exit code.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration, the Kubernetes client or the
    /// runtime cannot be set up, or if the command fails.
    pub fn run(self) -> Result<i32, Error> {
        let client_version = Self::command().get_version().unwrap_or_default().to_string();
        match self.commands {
            Some(Commands::Version { client }) if client => {
                write_stdout(&Self::command().render_long_version())?;
                write_stdout(&format!("Client Version: {client_version}\n"))?;
                return Ok(0);
            }
            Some(Commands::Completions { shell }) => {
                let mut app = Self::command();
                let bin_name = app.get_name().to_string();
                clap_complete::generate(shell, &mut app, bin_name, &mut std::io::stdout());
                return Ok(0);
            }
            Some(Commands::DefaultConfig) => {
                write_stdout(&Config::template_basic()?)?;
                return Ok(0);
            }
            _ => {}
        }

        let config = self.load_config()?;
        config.log.registry();

        let fut = async move {
            let kube_client = kube::Client::try_default().await.context(error::KubeConfigSnafu)?;
            match self.commands {
                Some(Commands::Version { .. }) => {
                    let server_version = kube_client.apiserver_version().await.map_or_else(
                        |_| "unknown".to_string(),
                        |info| format!("{}.{}", info.major, info.minor),
                    );
                    write_stdout(&Self::command().render_long_version())?;
                    write_stdout(&format!(
                        "Client Version: {client_version}\nServer Version: {server_version}\n",
                    ))?;
                    Ok(0)
                }
                Some(Commands::Debug(cmd)) => cmd.run(kube_client, config).await,
                _ => {
                    let help = Self::command().render_long_help().ansi().to_string();
                    std::io::stderr().write_all(help.as_bytes()).context(error::WriteStdoutSnafu)?;
                    Ok(-1)
                }
            }
        };

        Runtime::new().context(error::InitializeTokioRuntimeSnafu)?.block_on(fut)
    }
}

fn write_stdout(content: &str) -> Result<(), Error> {
    std::io::stdout().write_all(content.as_bytes()).context(error::WriteStdoutSnafu)
}
