use log::{debug, error, warn};
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use url::Url;

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::language_utils;
use crate::policy::Locale;
use crate::providers::TranslatorAdapter;

/// Default system prompt; `{source_language}` and `{target_language}` are
/// replaced with English language names
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional translator. Translate the user's text from {source_language} to {target_language}. Reply with the translation only, keep formatting and placeholders unchanged.";

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    pub model: String,
    /// Generated text
    pub response: String,
    /// Whether the generation is complete
    pub done: bool,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl GenerationRequest {
    /// Create a new non-streaming generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: Some(false),
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options = Some(GenerationOptions {
            temperature: Some(temperature),
        });
        self
    }
}

/// Parse a generate response body.
///
/// Ollama answers with a single JSON object for non-streaming requests, but
/// some proxies force streaming; in that case the body is JSON lines whose
/// `response` parts are concatenated.
pub fn parse_generation_body(body: &str) -> Result<String, ProviderError> {
    if let Ok(parsed) = serde_json::from_str::<GenerationResponse>(body) {
        return Ok(parsed.response);
    }

    let mut full_response = String::new();
    let mut parsed_lines = 0;
    for line in body.lines().filter(|line| !line.trim().is_empty()) {
        let value: serde_json::Value = serde_json::from_str(line).map_err(|e| {
            ProviderError::ParseError(format!("Invalid JSON line in Ollama response: {}", e))
        })?;
        if let Some(part) = value.get("response").and_then(|v| v.as_str()) {
            full_response.push_str(part);
        }
        parsed_lines += 1;
    }

    if parsed_lines == 0 {
        return Err(ProviderError::ParseError(
            "Empty response from Ollama API".to_string(),
        ));
    }

    Ok(full_response)
}

/// Translator backed by an Ollama server
#[derive(Debug)]
pub struct OllamaTranslator {
    /// `/api/generate` endpoint
    generate_url: Url,
    /// Model name
    model: String,
    /// HTTP client for making requests
    client: Client,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
    /// Optional rate limit in requests per minute
    rate_limit: Option<u32>,
    /// Sampling temperature
    temperature: f32,
    /// System prompt template
    system_prompt: String,
    /// Start of the last request, for rate limiting
    last_request: Mutex<Option<Instant>>,
}

impl OllamaTranslator {
    /// Create a translator for the server at `endpoint` (e.g. `http://localhost:11434`)
    pub fn new(endpoint: &str, model: impl Into<String>) -> Result<Self, ProviderError> {
        let base = Url::parse(endpoint).map_err(|e| {
            ProviderError::ConnectionError(format!("Invalid Ollama endpoint '{}': {}", endpoint, e))
        })?;
        let generate_url = base.join("api/generate").map_err(|e| {
            ProviderError::ConnectionError(format!("Invalid Ollama endpoint '{}': {}", endpoint, e))
        })?;

        Ok(Self {
            generate_url,
            model: model.into(),
            client: Self::build_client(Duration::from_secs(120)),
            max_retries: 3,
            backoff_base_ms: 1000,
            rate_limit: None,
            temperature: 0.3,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            last_request: Mutex::new(None),
        })
    }

    fn build_client(timeout: Duration) -> Client {
        Client::builder()
            .timeout(timeout)
            // Ollama uses HTTP/1.1
            .http1_only()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .unwrap_or_default()
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.client = Self::build_client(Duration::from_secs(timeout_secs));
        self
    }

    /// Set retry count and base backoff
    pub fn with_retries(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Limit requests per minute
    pub fn with_rate_limit(mut self, rate_limit: Option<u32>) -> Self {
        self.rate_limit = rate_limit.filter(|limit| *limit > 0);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Replace the system prompt template
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Endpoint requests are posted to
    pub fn generate_url(&self) -> &Url {
        &self.generate_url
    }

    /// System prompt for one language pair
    pub fn system_prompt_for(&self, from: &Locale, to: &Locale) -> String {
        let name = |locale: &Locale| {
            language_utils::get_language_name(locale.as_str())
                .unwrap_or_else(|_| locale.to_string())
        };
        self.system_prompt
            .replace("{source_language}", &name(from))
            .replace("{target_language}", &name(to))
    }

    async fn wait_for_rate_limit(&self) {
        let Some(rate_limit) = self.rate_limit else {
            return;
        };
        let spacing = Duration::from_millis(60_000 / rate_limit as u64);

        let wait = {
            let mut last = self.last_request.lock();
            let now = Instant::now();
            let wait = last
                .map(|previous| spacing.saturating_sub(now.duration_since(previous)))
                .unwrap_or_default();
            *last = Some(now + wait);
            wait
        };

        if !wait.is_zero() {
            debug!("Rate limit: waiting {:?} before next Ollama request", wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Generate text with retry logic
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.max_retries {
            self.wait_for_rate_limit().await;

            match self
                .client
                .post(self.generate_url.clone())
                .json(request)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body = response.text().await.map_err(|e| {
                            ProviderError::ParseError(format!(
                                "Failed to get response text from Ollama API: {}",
                                e
                            ))
                        })?;
                        return parse_generation_body(&body);
                    }

                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to get error response text".to_string());

                    if status.as_u16() == 429 {
                        last_error = Some(ProviderError::RateLimitExceeded(error_text));
                    } else if status.is_server_error() {
                        error!(
                            "Ollama API error ({}): {} - attempt {}/{}",
                            status,
                            error_text,
                            attempt + 1,
                            self.max_retries + 1
                        );
                        last_error = Some(ProviderError::ApiError {
                            status_code: status.as_u16(),
                            message: error_text,
                        });
                    } else {
                        // Client error - don't retry
                        error!("Ollama API error ({}): {}", status, error_text);
                        return Err(ProviderError::ApiError {
                            status_code: status.as_u16(),
                            message: error_text,
                        });
                    }
                }
                Err(e) => {
                    warn!(
                        "Ollama API network error: {} - attempt {}/{}",
                        e,
                        attempt + 1,
                        self.max_retries + 1
                    );
                    last_error = Some(ProviderError::ConnectionError(e.to_string()));
                }
            }

            attempt += 1;

            if attempt <= self.max_retries {
                let backoff_ms = self.backoff_base_ms * (1u64 << (attempt - 1));
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProviderError::RequestFailed(format!(
                "Ollama API request failed after {} attempts",
                self.max_retries + 1
            ))
        }))
    }
}

#[async_trait]
impl TranslatorAdapter for OllamaTranslator {
    async fn translate(
        &self,
        texts: &[String],
        from: &Locale,
        to: &Locale,
    ) -> Result<Vec<String>, ProviderError> {
        let system = self.system_prompt_for(from, to);
        let mut translated = Vec::with_capacity(texts.len());

        for text in texts {
            let request = GenerationRequest::new(&self.model, text.as_str())
                .system(system.as_str())
                .temperature(self.temperature);
            let response = self.generate(&request).await?;
            translated.push(response.trim().to_string());
        }

        debug!(
            "Ollama translated {} text(s) from {} to {}",
            translated.len(),
            from,
            to
        );
        Ok(translated)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
