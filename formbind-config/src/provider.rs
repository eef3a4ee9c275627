//! Configuration provider using Figment

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use tracing::{debug, trace};

use crate::discovery::{ConfigFile, ConfigFormat, FileDiscovery};
use crate::error::ConfigResult;
use crate::types::FormConfig;

/// Prefix of environment variables read by the provider.
pub const ENV_PREFIX: &str = "FORMBIND_";

/// Loads [`FormConfig`] from defaults, files and the environment.
///
/// Nothing is cached; every `load` reads the sources again.
pub struct ConfigProvider {
    dir: Option<PathBuf>,
}

impl ConfigProvider {
    /// Provider that searches the current directory.
    pub fn new() -> Self {
        Self { dir: None }
    }

    /// Provider that searches `dir` for configuration files.
    pub fn load_from(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Extract and validate the merged configuration.
    pub fn load(&self) -> ConfigResult<FormConfig> {
        let config: FormConfig = self.build_figment().extract()?;
        config.validate()?;
        debug!(?config, "loaded formbind configuration");
        Ok(config)
    }

    /// Sources in precedence order, later ones override earlier ones:
    /// 1. Default values
    /// 2. Discovered configuration files
    /// 3. `FORMBIND_` environment variables
    fn build_figment(&self) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(FormConfig::default()));

        for file in self.discover() {
            trace!("Loading config file: {} ({:?})", file.path.display(), file.format);
            figment = match file.format {
                ConfigFormat::Toml => figment.merge(Toml::file(&file.path)),
                ConfigFormat::Yaml => figment.merge(Yaml::file(&file.path)),
                ConfigFormat::Json => figment.merge(Json::file(&file.path)),
            };
        }

        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    fn discover(&self) -> Vec<ConfigFile> {
        match &self.dir {
            Some(dir) => FileDiscovery::new(dir).discover_all(),
            None => match std::env::current_dir() {
                Ok(dir) => FileDiscovery::new(dir).discover_all(),
                Err(e) => {
                    debug!("current directory unavailable, skipping config files: {}", e);
                    Vec::new()
                }
            },
        }
    }
}

impl Default for ConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}
