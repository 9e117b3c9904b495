//! Adapter configuration loaded from `quarry.toml`.
//!
//! ```toml
//! [quarry]
//! backend = "solr"
//! case_sensitive = false
//!
//! [azure]
//! query_type = "full"
//! search_mode = "all"
//!
//! [solr]
//! default_field = "_text_"
//! default_operator = "OR"
//! ```
//!
//! Every section is optional and falls back to the defaults shown above
//! (with `azure` as the default backend).

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::builder::QueryBuilder;
use crate::errors::QueryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Azure,
    Solr,
}

impl Backend {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Backend::Azure => "azure",
            Backend::Solr => "solr",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "azure" => Ok(Backend::Azure),
            "solr" => Ok(Backend::Solr),
            other => Err(QueryError::Config {
                message: format!("unknown backend: {}", other),
            }),
        }
    }
}

/// Configuration stored in `quarry.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuarryConfig {
    #[serde(default)]
    pub quarry: QuarrySettings,
    #[serde(default)]
    pub azure: AzureSettings,
    #[serde(default)]
    pub solr: SolrSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuarrySettings {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AzureSettings {
    #[serde(default = "default_query_type")]
    pub query_type: String,
    #[serde(default = "default_search_mode")]
    pub search_mode: String,
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            query_type: default_query_type(),
            search_mode: default_search_mode(),
        }
    }
}

fn default_query_type() -> String {
    "full".to_string()
}

fn default_search_mode() -> String {
    "all".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolrSettings {
    #[serde(default = "default_solr_field")]
    pub default_field: String,
    #[serde(default = "default_solr_operator")]
    pub default_operator: String,
}

impl Default for SolrSettings {
    fn default() -> Self {
        Self {
            default_field: default_solr_field(),
            default_operator: default_solr_operator(),
        }
    }
}

fn default_solr_field() -> String {
    "_text_".to_string()
}

fn default_solr_operator() -> String {
    "OR".to_string()
}

impl QuarryConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, QueryError> {
        toml::from_str(content).map_err(|err| QueryError::Config {
            message: format!("failed to parse config: {}", err),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, QueryError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| QueryError::Config {
            message: format!("failed to read {}: {}", path.display(), err),
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!("loaded config from {} (backend={})", path.display(), config.quarry.backend);
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, QueryError> {
        toml::to_string_pretty(self).map_err(|err| QueryError::Config {
            message: format!("failed to serialize config: {}", err),
        })
    }

    /// A root builder honoring the configured case sensitivity.
    pub fn query_builder(&self) -> QueryBuilder {
        if self.quarry.case_sensitive {
            QueryBuilder::case_sensitive()
        } else {
            QueryBuilder::new()
        }
    }
}
