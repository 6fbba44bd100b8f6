/*!
 * Reaction to committed host record changes.
 *
 * After a host record's locale row is committed, the orchestrator resolves
 * the cascade, drops requests whose target is pinned, and hands the rest to
 * the dispatcher. It returns as soon as every eligible request has been
 * registered; the translations themselves run when the hooks run.
 */

use std::sync::Arc;

use log::{debug, info};

use crate::errors::{ConfigurationError, TranslationError};
use crate::policy::Locale;
use crate::store::CommitHooks;

use super::cache::TranslationStateCache;
use super::cascade::{CascadeResolver, TranslationRequest};
use super::dispatcher::{DispatchOutcome, TranslationDispatcher};
use super::selector::SourceLocaleSelector;

/// Requests handed to the dispatcher and requests dropped at the pinned gate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadePlan {
    pub dispatched: Vec<TranslationRequest>,
    pub pinned: Vec<TranslationRequest>,
}

#[derive(Debug, Clone)]
pub struct TranslationOrchestrator {
    dispatcher: Arc<TranslationDispatcher>,
}

impl TranslationOrchestrator {
    pub fn new(dispatcher: Arc<TranslationDispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<TranslationDispatcher> {
        &self.dispatcher
    }

    /// Cascade the committed changes of `from` to its target locales
    pub async fn on_host_record_committed<F: AsRef<str>>(
        &self,
        cache: &TranslationStateCache,
        from: &Locale,
        changed_fields: &[F],
        hooks: &mut CommitHooks<DispatchOutcome>,
    ) -> Result<CascadePlan, TranslationError> {
        let policy = cache.policy().clone();
        let source = cache.get(from).await?;

        // The full request set is computed before anything is dispatched
        let (requests, source_texts) = {
            let source = source.lock();
            let requests = CascadeResolver::new(policy.locales()).resolve(&source, changed_fields);
            let texts: Vec<String> = requests
                .iter()
                .map(|request| source.value(&request.field).to_string())
                .collect();
            (requests, texts)
        };

        let mut plan = CascadePlan::default();
        for (request, source_text) in requests.into_iter().zip(source_texts) {
            let target = cache.get(&request.to_locale).await?;
            let pinned = target.lock().is_automatic(&request.field) == Some(false);
            if pinned {
                debug!("{} is pinned on {}, skipping", request, cache.key());
                plan.pinned.push(request);
                continue;
            }

            let queued = self
                .dispatcher
                .dispatch(cache.key(), target, request.clone(), source_text, hooks);
            // A worker will rewrite the stored row; keep this handle from holding a stale copy
            if queued {
                cache.evict(&request.to_locale);
            }
            plan.dispatched.push(request);
        }

        info!(
            "Cascade for {} from {}: {} dispatched, {} pinned",
            cache.key(),
            from,
            plan.dispatched.len(),
            plan.pinned.len()
        );
        Ok(plan)
    }

    /// Register an explicit translation of `field` into `to`.
    ///
    /// Without `from`, the source locale is picked by `SourceLocaleSelector`.
    pub async fn retranslate(
        &self,
        cache: &TranslationStateCache,
        field: &str,
        to: &Locale,
        from: Option<Locale>,
        hooks: &mut CommitHooks<DispatchOutcome>,
    ) -> Result<TranslationRequest, TranslationError> {
        let policy = cache.policy().clone();
        let locales = policy.locales();
        if !locales.is_configured(field) {
            return Err(ConfigurationError::UnknownField(field.to_string()).into());
        }
        if !locales.is_target(field, to) {
            return Err(ConfigurationError::Invalid(format!(
                "{} is not a target locale of '{}'",
                to, field
            ))
            .into());
        }

        let from = match from {
            Some(from) => from,
            None => SourceLocaleSelector::new(locales).select(cache, field).await?,
        };
        if &from == to {
            return Err(ConfigurationError::Invalid(format!(
                "Cannot translate '{}' from {} into itself",
                field, to
            ))
            .into());
        }

        let source_text = cache.get(&from).await?.lock().value(field).to_string();
        let target = cache.get(to).await?;
        let request = TranslationRequest::new(field, from, to.clone());
        if self
            .dispatcher
            .dispatch(cache.key(), target, request.clone(), source_text, hooks)
        {
            cache.evict(to);
        }
        Ok(request)
    }
}
