//! Engine configuration: a TOML file overlaid with environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use nova_core::RetentionPolicy;
use nova_store::paths::DATA_DIR_ENV;

pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENROUTER_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Where the database lives. `None` resolves to the store's default.
    pub data_dir: Option<PathBuf>,
    /// Root holding `modes/` and `rituals/`. `None` resolves to `<data_dir>/documents`.
    pub document_dir: Option<PathBuf>,
    pub openai_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub embedding_model: String,
    /// Used when the routed model cannot be served by the configured endpoint.
    pub completion_model: String,
    pub openai_base_url: String,
    pub openrouter_base_url: String,
    /// Sent as `HTTP-Referer` to OpenRouter when set.
    pub openrouter_referer: Option<String>,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    pub recall_limit: usize,
    pub ritual_step_pause_ms: u64,
    pub self_state_tick_secs: u64,
    pub desire_tick_secs: u64,
    pub memory_capacity: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            document_dir: None,
            openai_api_key: None,
            openrouter_api_key: None,
            embedding_model: "text-embedding-3-small".to_string(),
            completion_model: "gpt-4o".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openrouter_base_url: "https://openrouter.ai/api/v1".to_string(),
            openrouter_referer: None,
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
            max_tokens: 1000,
            temperature: 0.7,
            recall_limit: 3,
            ritual_step_pause_ms: nova_core::DEFAULT_STEP_PAUSE_MS,
            self_state_tick_secs: nova_core::self_state::DEFAULT_PASSIVE_INTERVAL_SECS,
            desire_tick_secs: nova_core::desire::DEFAULT_TICK_INTERVAL_SECS,
            memory_capacity: None,
        }
    }
}

impl EngineConfig {
    /// Load from `path` when given, then apply the process environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                Self::from_toml_str(&raw)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let config: EngineConfig = toml::from_str(raw).context("invalid engine config")?;
        Ok(config)
    }

    /// Overlay values from `lookup`. Empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(key) = get(OPENAI_KEY_ENV) {
            self.openai_api_key = Some(key);
        }
        if let Some(key) = get(OPENROUTER_KEY_ENV) {
            self.openrouter_api_key = Some(key);
        }
        if let Some(dir) = get(DATA_DIR_ENV) {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn base_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(nova_store::default_base_dir)
    }

    pub fn document_root(&self) -> PathBuf {
        self.document_dir
            .clone()
            .unwrap_or_else(|| self.base_dir().join("documents"))
    }

    pub fn retention(&self) -> RetentionPolicy {
        match self.memory_capacity {
            Some(limit) => RetentionPolicy::MaxRecords(limit),
            None => RetentionPolicy::Unbounded,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn ritual_step_pause(&self) -> Duration {
        Duration::from_millis(self.ritual_step_pause_ms)
    }

    pub fn self_state_tick(&self) -> Duration {
        Duration::from_secs(self.self_state_tick_secs)
    }

    pub fn desire_tick(&self) -> Duration {
        Duration::from_secs(self.desire_tick_secs)
    }
}
