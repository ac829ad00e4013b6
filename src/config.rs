//! User configuration loaded from ~/.motif/config.yaml.
//!
//! Every field is optional in the file. Command-line flags override it.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default seed for `rand()` when neither the file nor the command line sets one.
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// ABC notation
    #[default]
    Abc,
    /// The evaluated value as YAML
    Yaml,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Seed for the `rand()` built-in and the `seed` variable.
    #[serde(default = "Config::default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub format: OutputFormat,
    /// Title used when the program sets none.
    #[serde(default)]
    pub title: Option<String>,
}

impl Config {
    /// Load config from the standard path (~/.motif/config.yaml).
    /// Returns None if the file is missing or unreadable.
    pub fn load() -> Option<Self> {
        let home = dirs::home_dir()?;
        Self::load_from(&home.join(".motif").join("config.yaml"))
    }

    pub fn load_from(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match serde_yaml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("ignoring {}: {e}", path.display());
                None
            }
        }
    }

    fn default_seed() -> u64 {
        DEFAULT_SEED
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            format: OutputFormat::default(),
            title: None,
        }
    }
}
