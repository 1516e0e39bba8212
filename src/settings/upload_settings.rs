use crate::utils::{get_config_dir, get_data_dir};
use color_eyre::eyre::{self, bail};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "config.toml";
pub const ENV_PREFIX: &str = "UPLOAD_TRACKER";

/// Settings for the local upload driver
///
/// Layered lowest to highest: built-in defaults, `config.toml` in the config
/// directory, an explicitly given file, `UPLOAD_TRACKER__*` variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// Where uploaded blobs are stored
    pub blob_store_dir: PathBuf,
    /// Bytes copied per chunk
    pub chunk_size: usize,
    /// Pause after each chunk, in milliseconds
    pub chunk_delay_ms: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        UploadSettings {
            blob_store_dir: get_data_dir().join("blobs"),
            chunk_size: 64 * 1024,
            chunk_delay_ms: 0,
        }
    }
}

impl UploadSettings {
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    pub fn load(config_file: Option<&Path>) -> eyre::Result<Self> {
        let environment = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true);
        Self::load_from(&get_config_dir().join(CONFIG_FILE), config_file, environment)
    }

    fn load_from(default_file: &Path, config_file: Option<&Path>, environment: Environment) -> eyre::Result<Self> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::from(default_file).required(false));
        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings: UploadSettings = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> eyre::Result<()> {
        if self.chunk_size == 0 {
            bail!("configuration param [chunk_size] must be greater than zero");
        }
        Ok(())
    }
}
