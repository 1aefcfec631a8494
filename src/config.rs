use eyre::{Context, Result};
use ledgerbot::context::{BusinessRule, DEFAULT_MAX_SNIPPETS, default_rules};
use ledgerbot::llm::OpenAiConfig;
use ledgerbot::llm::openai::{DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL};
use ledgerbot::orchestrator::{DEFAULT_MAX_ROUNDS, OrchestratorConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log filter used when RUST_LOG is not set
    pub log_level: Option<String>,
    pub llm: LlmConfig,
    pub source: SourceConfig,
    pub snapshots: SnapshotConfig,
    pub orchestrator: LoopConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_ms: u64,
    /// Total attempts per completion, including the first
    pub max_retries: u32,
    pub retry_wait_ms: u64,
    pub native_tools: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            max_tokens: 2000,
            temperature: 0.1,
            timeout_ms: 60000,
            max_retries: 3,
            retry_wait_ms: 2000,
            native_tools: true,
        }
    }
}

impl LlmConfig {
    pub fn client_config(&self) -> OpenAiConfig {
        OpenAiConfig {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key_env: self.api_key_env.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: Duration::from_millis(self.timeout_ms),
            max_attempts: self.max_retries.max(1),
            retry_wait: Duration::from_millis(self.retry_wait_ms),
            native_tools: self.native_tools,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Gateway URL that answers data queries
    pub base_url: String,
    pub company: String,
    pub timeout_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000/query".to_string(),
            company: String::new(),
            timeout_ms: 30000,
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub path: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ledgerbot")
                .join("snapshots.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub max_rounds: u32,
    pub staleness_notice: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            staleness_notice: true,
        }
    }
}

impl LoopConfig {
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_rounds: self.max_rounds,
            staleness_notice: self.staleness_notice,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub max_snippets: usize,
    pub rules: Vec<BusinessRule>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_snippets: DEFAULT_MAX_SNIPPETS,
            rules: default_rules(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            llm: LlmConfig::default(),
            source: SourceConfig::default(),
            snapshots: SnapshotConfig::default(),
            orchestrator: LoopConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Config {
    /// env_logger filter for the configured level
    pub fn log_filter(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}
