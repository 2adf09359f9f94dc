//! Runtime configuration.
//!
//! A `ReviewConfig` is built once at process start (defaults, optionally a
//! YAML file, then environment overrides) and passed down explicitly. Nothing
//! below this module reads the environment on its own, except provider
//! credentials.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which language model backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Hosted OpenAI chat completions
    #[default]
    #[serde(rename = "openai")]
    OpenAi,

    /// Ollama-compatible local server
    #[serde(rename = "local", alias = "ollama")]
    Local,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Local => "local",
        }
    }

    /// Model used when none is configured.
    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o",
            ProviderKind::Local => "llama3.2",
        }
    }

    /// Environment variable that overrides the model name.
    fn model_env(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_MODEL",
            ProviderKind::Local => "OLLAMA_MODEL",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "local" | "ollama" => Ok(ProviderKind::Local),
            other => Err(ConfigError::Invalid(format!(
                "Unknown LLM provider '{}': expected 'openai' or 'local'",
                other
            ))),
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: ProviderKind,

    /// Model name understood by the provider
    pub model: String,

    /// Custom API endpoint (uses the provider default when unset)
    pub endpoint: Option<String>,

    /// Per-request timeout
    #[serde(with = "human_duration")]
    pub timeout: Duration,

    /// Maximum tokens to generate per call
    pub max_tokens: u32,

    /// Sampling temperature (0.0 for deterministic)
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: ProviderKind::default().default_model().to_string(),
            endpoint: None,
            timeout: Duration::from_secs(300),
            max_tokens: 4096,
            temperature: 0.0,
        }
    }
}

/// Guideline retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Directory holding the guideline documents
    pub guidelines_dir: PathBuf,

    /// Maximum number of candidate passages per query
    pub similarity_top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            guidelines_dir: PathBuf::from("data/guidelines"),
            similarity_top_k: 20,
        }
    }
}

/// Retry and fan-out policy for the matching stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingPolicy {
    /// Judge attempts per clause, including the first
    pub max_attempts: u32,

    /// Fixed wait between attempts
    #[serde(with = "human_duration")]
    pub backoff: Duration,

    /// Clauses processed at once; 1 is strictly sequential
    pub concurrency: usize,
}

impl Default for MatchingPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
            concurrency: 1,
        }
    }
}

/// How contract text is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoaderKind {
    /// Only the contract file itself
    #[default]
    File,

    /// Every text file in the contract's directory
    Directory,
}

/// Top-level configuration for a review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub llm: LlmSettings,

    pub retrieval: RetrievalSettings,

    pub matching: MatchingPolicy,

    /// Root of the run outputs; the extraction cache lives beneath it
    pub output_dir: PathBuf,

    pub loader: LoaderKind,

    /// Emit progress events
    pub verbose: bool,

    /// Cap on a whole run. Unset means no cap.
    #[serde(with = "human_duration_opt")]
    pub run_timeout: Option<Duration>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            retrieval: RetrievalSettings::default(),
            matching: MatchingPolicy::default(),
            output_dir: PathBuf::from("data_out"),
            loader: LoaderKind::default(),
            verbose: true,
            run_timeout: None,
        }
    }
}

impl ReviewConfig {
    /// Parse a config from YAML. Missing sections take their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: ReviewConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup.
    ///
    /// `LLM_PROVIDER` switches the provider (resetting model and endpoint to
    /// that provider's defaults); `OPENAI_MODEL` / `OLLAMA_MODEL` then set the
    /// model for the selected provider and `OLLAMA_BASE_URL` the local endpoint.
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(provider) = lookup("LLM_PROVIDER") {
            let provider: ProviderKind = provider.parse()?;
            if provider != self.llm.provider {
                self.llm.provider = provider;
                self.llm.model = provider.default_model().to_string();
                self.llm.endpoint = None;
            }
        }

        if let Some(model) = lookup(self.llm.provider.model_env()) {
            self.llm.model = model;
        }

        if self.llm.provider == ProviderKind::Local {
            if let Some(url) = lookup("OLLAMA_BASE_URL") {
                self.llm.endpoint = Some(url);
            }
        }

        self.validate()?;
        Ok(self)
    }

    /// Location of the extraction cache file for this output directory.
    pub fn extraction_cache_path(&self) -> PathBuf {
        self.output_dir
            .join("workflow_output")
            .join("contract_extraction.json")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.matching.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "matching.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.matching.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "matching.concurrency must be at least 1".to_string(),
            ));
        }
        if self.retrieval.similarity_top_k == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.similarity_top_k must be at least 1".to_string(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.model must not be empty".to_string()));
        }
        Ok(())
    }
}

mod human_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

mod human_duration_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|text| humantime::parse_duration(&text).map_err(serde::de::Error::custom))
            .transpose()
    }
}
