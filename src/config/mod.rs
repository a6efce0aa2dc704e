//! Configuration - layered settings
//!
//! Merge order (later wins):
//! 1. built-in defaults
//! 2. `chitrapur.toml` in the working directory, or an explicit file
//! 3. `CHITRAPUR_*` environment variables, `__` separating sections
//!    (e.g. `CHITRAPUR_FUZZY__THRESHOLD=40`)

use std::path::{Path, PathBuf};

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::knowledge::{get_data_dir, KNOWLEDGE_BASE_FILE};
use crate::query::SnippetConfig;
use crate::retriever::{ExactConfig, FuzzyConfig, LexicalConfig, RetrieverKind, VectorConfig};

/// Default configuration file name
pub const CONFIG_FILE: &str = "chitrapur.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "CHITRAPUR_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieversConfig {
    /// Strategies the hybrid retriever runs
    pub enabled: Vec<RetrieverKind>,
}

impl Default for RetrieversConfig {
    fn default() -> Self {
        Self {
            enabled: vec![
                RetrieverKind::Exact,
                RetrieverKind::Fuzzy,
                RetrieverKind::Lexical,
            ],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// JSONL knowledge base; defaults to `knowledge_base.jsonl` in [`get_data_dir`]
    pub knowledge_base: Option<PathBuf>,
    pub retrievers: RetrieversConfig,
    pub exact: ExactConfig,
    pub fuzzy: FuzzyConfig,
    pub lexical: LexicalConfig,
    pub vector: VectorConfig,
    pub snippet: SnippetConfig,
}

impl Settings {
    /// Loads defaults, the config file and the environment.
    ///
    /// A missing config file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(path))
    }

    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))
    }

    pub fn knowledge_base_path(&self) -> PathBuf {
        self.knowledge_base
            .clone()
            .unwrap_or_else(|| get_data_dir().join(KNOWLEDGE_BASE_FILE))
    }
}
