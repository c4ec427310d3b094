//! CLI configuration with TOML file support.

use std::path::{Path, PathBuf};

use anyhow::Context;
use govlock_utils::LogFormat;
use serde::{Deserialize, Serialize};

/// Settings shared by every `govlock` invocation.
///
/// Loaded from the file given with `--config`; flags and environment
/// variables override individual fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Identity the verbs act as: a `0x` address or a label.
    #[serde(default = "default_actor")]
    pub actor: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Deployment description used by `init`. The built-in preset when unset.
    #[serde(default)]
    pub genesis: Option<PathBuf>,

    /// Snapshots retained behind the latest one.
    #[serde(default = "default_keep_snapshots")]
    pub keep_snapshots: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./govlock_data")
}

fn default_actor() -> String {
    "techops".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_keep_snapshots() -> u64 {
    16
}

impl CliConfig {
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            actor: default_actor(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            genesis: None,
            keep_snapshots: default_keep_snapshots(),
        }
    }
}
