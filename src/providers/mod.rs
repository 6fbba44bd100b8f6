/*!
 * Translator backends.
 *
 * This module contains the adapters the dispatcher calls to turn source
 * texts into target-locale texts:
 * - Ollama: Local LLM server
 * - Mock: deterministic adapter for tests and dry runs
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;
use crate::policy::Locale;

/// Common trait for all translator backends
///
/// Implementations must return exactly one translated text per input text,
/// in input order. The dispatcher treats any other count as a fatal error
/// for the unit being translated.
#[async_trait]
pub trait TranslatorAdapter: Send + Sync + Debug {
    /// Translate `texts` from `from` into `to`
    ///
    /// # Arguments
    /// * `texts` - Texts to translate, in order
    /// * `from` - Locale the texts are written in
    /// * `to` - Locale to translate into
    ///
    /// # Returns
    /// * `Result<Vec<String>, ProviderError>` - Translated texts or an error
    async fn translate(
        &self,
        texts: &[String],
        from: &Locale,
        to: &Locale,
    ) -> Result<Vec<String>, ProviderError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

pub mod mock;
pub mod ollama;

pub use mock::{MockBehavior, MockTranslator};
pub use ollama::OllamaTranslator;
