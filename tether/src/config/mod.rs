mod debug;
mod error;
mod log;

use std::path::{Path, PathBuf};

use resolve_path::PathResolveExt;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

pub use self::{debug::DebugConfig, error::Error, log::LogConfig};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub debug: DebugConfig,
}

impl Config {
    /// The first existing file among the default path and the fallback
    /// directories, or the default path if none exists.
    pub fn search_config_file_path() -> PathBuf {
        std::iter::once(Self::default_path())
            .chain(tether_base::fallback_project_config_directories().into_iter().map(|mut path| {
                path.push(tether_base::CLI_CONFIG_NAME);
                path
            }))
            .find(|path| path.try_exists().unwrap_or(false))
            .unwrap_or_else(Self::default_path)
    }

    #[inline]
    pub fn default_path() -> PathBuf {
        [tether_base::PROJECT_CONFIG_DIR.to_path_buf(), PathBuf::from(tether_base::CLI_CONFIG_NAME)]
            .into_iter()
            .collect()
    }

    /// Loads the configuration at `path`, resolving `~` in file paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = resolve(path.as_ref())?;
        let data = std::fs::read(&path).context(error::OpenConfigSnafu { filename: path.clone() })?;
        let mut config: Self =
            serde_yaml::from_slice(&data).context(error::ParseConfigSnafu { filename: path })?;

        config.log.file_path = config.log.file_path.as_deref().map(resolve).transpose()?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        if path.as_ref().try_exists().unwrap_or(false) {
            Self::load(path)
        } else {
            tracing::debug!("No config file at {}, using defaults", path.as_ref().display());
            Ok(Self::default())
        }
    }

    /// The default configuration rendered as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized.
    pub fn template_basic() -> Result<String, Error> {
        serde_yaml::to_string(&Self::default()).context(error::SerializeConfigSnafu)
    }
}

fn resolve(path: &Path) -> Result<PathBuf, Error> {
    path.try_resolve()
        .map(|path| path.to_path_buf())
        .with_context(|_| error::ResolveFilePathSnafu { file_path: path.to_path_buf() })
}
