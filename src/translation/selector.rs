/*!
 * Choice of the source locale for an explicit translation.
 */

use log::debug;

use crate::errors::{ConfigurationError, TranslationError};
use crate::policy::{FieldLocalePolicy, Locale};

use super::cache::TranslationStateCache;

/// Picks the best current source locale for a field.
///
/// Candidates are the field's source locales in priority order. A candidate
/// whose own value is automatic is skipped, so machine output is never used
/// as a source while a human-written one exists.
#[derive(Debug, Clone, Copy)]
pub struct SourceLocaleSelector<'a> {
    locales: &'a FieldLocalePolicy,
}

impl<'a> SourceLocaleSelector<'a> {
    pub fn new(locales: &'a FieldLocalePolicy) -> Self {
        Self { locales }
    }

    /// First non-automatic source with a non-empty value, else the first
    /// configured source (which may itself be empty)
    pub async fn select(
        &self,
        cache: &TranslationStateCache,
        field: &str,
    ) -> Result<Locale, TranslationError> {
        let sources = self.locales.source_locales(field);
        let Some(fallback) = sources.first() else {
            return Err(ConfigurationError::UnknownField(field.to_string()).into());
        };

        for candidate in sources {
            let record = cache.get(candidate).await?;
            let (automatic, has_value) = {
                let record = record.lock();
                (record.is_automatic(field), !record.value(field).is_empty())
            };

            if automatic == Some(true) {
                debug!("Skipping source {} for '{}': value is automatic", candidate, field);
                continue;
            }
            if has_value {
                return Ok(candidate.clone());
            }
        }

        debug!(
            "No usable source for '{}' on {}, falling back to {}",
            field,
            cache.key(),
            fallback
        );
        Ok(fallback.clone())
    }
}
