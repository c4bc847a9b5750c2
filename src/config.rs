//! Optional YAML configuration.
//!
//! Lookup order: `--config <path>`, then `SHEET_BATCHER_CONFIG`, then built-in
//! defaults. Command-line flags override whatever the file provides.
//!
//! ```yaml
//! endpoint: http://192.168.0.20:5000
//! timeout_secs: 600
//! downloads_dir: lotes
//! batch_size: 50
//! action: alterar
//! ```

use std::{
    env,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    predict::{BatchSize, DEFAULT_BATCH_SIZE},
    request::Action,
};

pub const CONFIG_ENV_VAR: &str = "SHEET_BATCHER_CONFIG";
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub downloads_dir: PathBuf,
    pub batch_size: i64,
    pub action: Action,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            downloads_dir: PathBuf::from("."),
            batch_size: i64::from(DEFAULT_BATCH_SIZE),
            action: Action::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let mut raw = String::new();
        file.read_to_string(&mut raw)
            .with_context(|| format!("Reading config file {path:?}"))?;
        Self::from_yaml(&raw).with_context(|| format!("Parsing config file {path:?}"))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Loads the explicit path, else the environment path, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let from_env = env::var_os(CONFIG_ENV_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => {
                debug!("Loading configuration from {path:?}");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn with_endpoint(mut self, endpoint: Option<&str>) -> Self {
        if let Some(endpoint) = endpoint {
            self.endpoint = endpoint.trim().to_string();
        }
        self
    }

    pub fn default_batch_size(&self) -> BatchSize {
        BatchSize::clamped(self.batch_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn partial_yaml_keeps_defaults_for_missing_keys() {
        let config = Config::from_yaml("endpoint: http://10.0.0.5:5000\naction: alterar\n")
            .expect("parse");
        assert_eq!(config.endpoint, "http://10.0.0.5:5000");
        assert_eq!(config.action, Action::Update);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.default_batch_size().get(), 100);
    }

    #[test]
    fn empty_file_is_default_config() {
        assert_eq!(Config::from_yaml("  \n").expect("parse"), Config::default());
    }

    #[test]
    fn out_of_range_batch_size_is_clamped_on_use() {
        let config = Config::from_yaml("batch_size: 1000").expect("parse");
        assert_eq!(config.default_batch_size().get(), 100);
    }

    #[test]
    fn explicit_path_is_loaded() {
        let mut file = NamedTempFile::new().expect("temp config");
        writeln!(file, "timeout_secs: 5").expect("write config");
        let config = Config::resolve(Some(file.path())).expect("resolve");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn endpoint_flag_overrides_file() {
        let config = Config::default().with_endpoint(Some(" http://lan:8080 "));
        assert_eq!(config.endpoint, "http://lan:8080");
        assert_eq!(
            Config::default().with_endpoint(None).endpoint,
            DEFAULT_ENDPOINT
        );
    }

    #[test]
    fn unknown_action_is_a_parse_error() {
        assert!(Config::from_yaml("action: archive").is_err());
    }
}
