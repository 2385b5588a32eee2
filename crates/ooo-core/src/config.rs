use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use ooo_model::{ModelConfig, ModelError};

use crate::error::{OooError, Result};
use crate::types::SourceKind;

// ---------------------------------------------------------------------------
// OrchestratorConfig
// ---------------------------------------------------------------------------

/// Everything the orchestrator needs, passed explicitly at construction.
/// There is no ambient global lookup inside orchestration logic; the only
/// environment read is the model API key, resolved once in
/// [`OrchestratorConfig::model_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Model name sent to the completions endpoint.
    #[serde(default = "default_model")]
    pub model: String,

    /// Endpoint base URL override; `None` falls back to the environment and
    /// then to the public OpenAI endpoint.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Directory holding the prompt template files.
    #[serde(default = "default_prompts_dir")]
    pub prompts_dir: PathBuf,

    /// Directory for the timestamped report artifacts.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    /// Directory for the identity-keyed report cache.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Directory holding the per-source SQLite databases.
    #[serde(default = "default_database_dir")]
    pub database_dir: PathBuf,

    /// Which source connectors to open. Also defines the key set of the
    /// report's `updates` map.
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceKind>,

    /// Upper bound for each model invocation.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_prompts_dir() -> PathBuf {
    PathBuf::from("prompts")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("reports/cache")
}

fn default_database_dir() -> PathBuf {
    PathBuf::from("data/databases")
}

fn default_sources() -> Vec<SourceKind> {
    SourceKind::ALL.to_vec()
}

fn default_timeout() -> u64 {
    300
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            model: default_model(),
            base_url: None,
            prompts_dir: default_prompts_dir(),
            reports_dir: default_reports_dir(),
            cache_dir: default_cache_dir(),
            database_dir: default_database_dir(),
            sources: default_sources(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl OrchestratorConfig {
    /// Load from a YAML file; a missing file yields the defaults so the
    /// binary works out of the box in a seeded checkout.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(OrchestratorConfig::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config: OrchestratorConfig = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(OooError::Configuration(
                "at least one source connector must be configured".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(OooError::Configuration(
                "timeout_seconds must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the model connection settings, reading the API key from the
    /// environment. Fails with `ConfigurationError` before any session work
    /// if the key is absent.
    pub fn model_config(&self) -> Result<ModelConfig> {
        let mut mc = ModelConfig::from_env(&self.model).map_err(|e| match e {
            ModelError::MissingCredentials => OooError::Configuration(e.to_string()),
            other => OooError::Model(other),
        })?;
        if let Some(base) = &self.base_url {
            mc.base_url = base.clone();
        }
        Ok(mc)
    }

    /// Path of the SQLite database backing `kind`.
    pub fn database_path(&self, kind: SourceKind) -> PathBuf {
        let file = match kind {
            SourceKind::Email => "emails.db",
            SourceKind::Calendar => "calendar.db",
            SourceKind::Chat => "chat.db",
            SourceKind::Task => "tasks.db",
            SourceKind::Repository => "repository.db",
        };
        self.database_dir.join(file)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
