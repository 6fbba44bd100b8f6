/*!
 * Mock translator for testing.
 *
 * This module provides a translator that simulates different behaviors:
 * - `MockTranslator::working()` - Always succeeds with `"[<to>] <text>"`
 * - `MockTranslator::intermittent(n)` - Fails every nth call
 * - `MockTranslator::failing()` - Always fails with an error
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::policy::Locale;
use crate::providers::TranslatorAdapter;

/// Behavior mode for the mock translator
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with `"[<to>] <text>"`
    Working,
    /// Fails intermittently (every Nth call)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns one text more than it was given
    WrongCount,
    /// Fails only when translating into this locale
    FailFor { locale: Locale },
    /// Simulates slow response
    Slow { delay_ms: u64 },
}

/// One recorded call to the mock translator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    /// Texts sent for translation
    pub texts: Vec<String>,
    /// Source locale
    pub from: Locale,
    /// Target locale
    pub to: Locale,
}

/// Mock translator recording every call it receives
#[derive(Debug, Clone)]
pub struct MockTranslator {
    /// Behavior mode
    behavior: MockBehavior,
    /// Call counter for intermittent failures, shared by clones
    request_count: Arc<AtomicUsize>,
    /// Calls received so far, shared by clones
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockTranslator {
    /// Create a new mock translator with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a working mock translator
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock translator
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a mock translator that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock translator that breaks the result-count contract
    pub fn wrong_count() -> Self {
        Self::new(MockBehavior::WrongCount)
    }

    /// Create a mock translator failing only for one target locale
    pub fn failing_for(locale: impl Into<Locale>) -> Self {
        Self::new(MockBehavior::FailFor {
            locale: locale.into(),
        })
    }

    /// Create a slow mock translator
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// The text a working mock produces for `text` in `to`
    pub fn expected(text: &str, to: &str) -> String {
        format!("[{}] {}", to, text)
    }

    /// Number of calls received
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Snapshot of every call received
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    fn translate_all(texts: &[String], to: &Locale) -> Vec<String> {
        texts
            .iter()
            .map(|text| Self::expected(text, to.as_str()))
            .collect()
    }
}

#[async_trait]
impl TranslatorAdapter for MockTranslator {
    async fn translate(
        &self,
        texts: &[String],
        from: &Locale,
        to: &Locale,
    ) -> Result<Vec<String>, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(MockCall {
            texts: texts.to_vec(),
            from: from.clone(),
            to: to.clone(),
        });

        match &self.behavior {
            MockBehavior::Working => Ok(Self::translate_all(texts, to)),

            MockBehavior::Intermittent { fail_every } => {
                let fail_every = (*fail_every).max(1);
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(Self::translate_all(texts, to))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated translator failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::WrongCount => {
                let mut translated = Self::translate_all(texts, to);
                translated.push(String::new());
                Ok(translated)
            }

            MockBehavior::FailFor { locale } if locale == to => {
                Err(ProviderError::ConnectionError(format!(
                    "Simulated failure for locale {}",
                    locale
                )))
            }

            MockBehavior::FailFor { .. } => Ok(Self::translate_all(texts, to)),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(*delay_ms)).await;
                Ok(Self::translate_all(texts, to))
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
