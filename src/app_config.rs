use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::ConfigurationError;
use crate::policy::{Locale, PolicyRegistry, TranslatableModel};
use crate::providers::ollama::DEFAULT_SYSTEM_PROMPT;
use crate::providers::{MockTranslator, OllamaTranslator, TranslatorAdapter};

/// Application configuration module
/// This module handles loading, validating and saving the settings of the
/// command line front end, and turns the `models` section into a
/// `PolicyRegistry`.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Where translation rows are stored
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Inline or background dispatch
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Translator backend
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Translatable models and their automatic-translation rules
    #[serde(default)]
    pub models: Vec<ModelConfig>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translator backend type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: Deterministic offline translator
    Mock,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::Mock => "Mock",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::Mock => "mock".to_string(),
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "mock" => Ok(Self::Mock),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Database settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    // @field: SQLite file; the per-user data directory when absent
    #[serde(default)]
    pub path: Option<String>,
}

/// How deferred translations are executed
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispatchModeSetting {
    /// Translate right after the commit, in the committing task
    #[default]
    Inline,
    /// Enqueue a job per translation on the background queue
    Background,
}

/// Dispatch settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DispatchConfig {
    #[serde(default)]
    pub mode: DispatchModeSetting,

    // @field: Jobs the background queue runs at once
    #[serde(default = "default_concurrent_jobs")]
    pub concurrent_jobs: usize,

    // @field: Jobs that can wait in the queue before enqueue blocks
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: DispatchModeSetting::default(),
            concurrent_jobs: default_concurrent_jobs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Translator settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    #[serde(default)]
    pub provider: TranslationProvider,

    // @field: Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,

    // @field: Service URL
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Retries on server and network errors
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    // @field: Base backoff, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    // @field: System prompt with {source_language} and {target_language} placeholders
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            model: default_ollama_model(),
            endpoint: default_ollama_endpoint(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            rate_limit: None,
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
        }
    }
}

/// One translatable model
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelConfig {
    pub name: String,

    // @field: Fields carrying one value per locale
    pub translated_fields: Vec<String>,

    // @field: Automatic-translation rules, applied in order
    #[serde(default)]
    pub auto_translate: Vec<AutoTranslateConfig>,
}

/// One `auto_translate` declaration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AutoTranslateConfig {
    pub fields: Vec<String>,
    pub from: Vec<String>,
    pub to: Vec<String>,
}

/// Log level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_concurrent_jobs() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    256
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // doubled on each retry
}

fn default_temperature() -> f32 {
    0.3
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Config {
    /// Read a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.concurrent_jobs == 0 {
            return Err(anyhow!("dispatch.concurrent_jobs must be at least 1"));
        }
        if self.dispatch.queue_capacity == 0 {
            return Err(anyhow!("dispatch.queue_capacity must be at least 1"));
        }

        if self.translation.provider == TranslationProvider::Ollama {
            url::Url::parse(&self.translation.endpoint).with_context(|| {
                format!("Invalid translation endpoint: {}", self.translation.endpoint)
            })?;
            if self.translation.model.trim().is_empty() {
                return Err(anyhow!("translation.model is required for the Ollama provider"));
            }
        }

        if !(0.0..=2.0).contains(&self.translation.temperature) {
            return Err(anyhow!(
                "translation.temperature must be between 0.0 and 2.0, got {}",
                self.translation.temperature
            ));
        }

        self.build_registry()
            .context("Invalid model configuration")?;
        Ok(())
    }

    /// Build one policy per configured model
    pub fn build_registry(&self) -> Result<PolicyRegistry, ConfigurationError> {
        let mut registry = PolicyRegistry::new();
        for model in &self.models {
            if registry.get(&model.name).is_ok() {
                return Err(ConfigurationError::Invalid(format!(
                    "model '{}' is declared twice",
                    model.name
                )));
            }

            let mut builder = TranslatableModel::new(&model.name).translates(&model.translated_fields);
            for rule in &model.auto_translate {
                let from: Vec<&str> = rule.from.iter().map(String::as_str).collect();
                let to: Vec<&str> = rule.to.iter().map(String::as_str).collect();
                builder = builder.auto_translate(&rule.fields, &from, &to)?;
            }
            registry.register(builder.build());
        }
        Ok(registry)
    }

    /// Translator backend described by the `translation` section
    pub fn build_translator(&self) -> Result<Arc<dyn TranslatorAdapter>> {
        let settings = &self.translation;
        match settings.provider {
            TranslationProvider::Ollama => {
                let translator = OllamaTranslator::new(&settings.endpoint, &settings.model)?
                    .with_timeout(settings.timeout_secs)
                    .with_retries(settings.retry_count, settings.retry_backoff_ms)
                    .with_rate_limit(settings.rate_limit)
                    .with_temperature(settings.temperature)
                    .with_system_prompt(&settings.system_prompt);
                Ok(Arc::new(translator))
            }
            TranslationProvider::Mock => Ok(Arc::new(MockTranslator::working())),
        }
    }

    /// Configured database file, if any
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database.path.as_ref().map(PathBuf::from)
    }

    /// Locales that appear anywhere in the model rules
    pub fn locales(&self) -> Vec<Locale> {
        let mut locales: Vec<Locale> = self
            .models
            .iter()
            .flat_map(|model| &model.auto_translate)
            .flat_map(|rule| rule.from.iter().chain(&rule.to))
            .map(|code| Locale::new(code.as_str()))
            .collect();
        locales.sort();
        locales.dedup();
        locales
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            dispatch: DispatchConfig::default(),
            translation: TranslationConfig::default(),
            models: vec![ModelConfig {
                name: "post".to_string(),
                translated_fields: vec!["title".to_string(), "body".to_string()],
                auto_translate: vec![AutoTranslateConfig {
                    fields: vec!["title".to_string(), "body".to_string()],
                    from: vec!["en".to_string()],
                    to: vec!["en".to_string(), "fr".to_string(), "de".to_string()],
                }],
            }],
            log_level: LogLevel::default(),
        }
    }
}
