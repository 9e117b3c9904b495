use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use quarry::{Backend, QuarryConfig};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "quarry.toml";

/// Resolved settings for one CLI invocation.
pub struct CliContext {
    pub config: QuarryConfig,
    pub config_path: Option<PathBuf>,
}

impl CliContext {
    /// Loads `explicit` if given, else `./quarry.toml` if present, else defaults.
    /// A `--backend` flag overrides the configured backend.
    pub fn load(explicit: Option<&Path>, backend: Option<Backend>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
                candidate.is_file().then_some(candidate)
            }
        };

        let mut config = match &config_path {
            Some(path) => QuarryConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))?,
            None => QuarryConfig::default(),
        };
        if let Some(backend) = backend {
            config.quarry.backend = backend;
        }

        Ok(Self { config, config_path })
    }

    pub fn backend(&self) -> Backend {
        self.config.quarry.backend
    }
}
