/*!
 * Translation service facade.
 *
 * `TranslationService` wires the store, the model policies and the
 * translator into a dispatcher and an orchestrator, hands out record handles
 * and commits staged mutations:
 *
 * 1. staged values are written into the record's cached locale row
 * 2. every dirty locale row is saved in one store transaction
 * 3. only after that succeeds, the cascade is resolved and dispatched
 *
 * A failed save leaves no translation job behind.
 */

use std::sync::Arc;

use log::{error, info, warn};
use parking_lot::Mutex;

use crate::errors::{ConfigurationError, TranslationError};
use crate::policy::{Locale, PolicyRegistry};
use crate::providers::TranslatorAdapter;
use crate::store::{CommitHooks, LocalizedRecordStore, RecordKey};

use super::cascade::TranslationRequest;
use super::dispatcher::{DispatchMode, DispatchOutcome, DispatchStatus, TranslationDispatcher};
use super::handle::{Mutation, TranslatedRecord, persist_dirty};
use super::orchestrator::TranslationOrchestrator;
use super::queue::{BackgroundQueue, QueueStats};
use super::worker::TranslationWorker;

/// What one committed mutation set in motion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeReport {
    pub record: RecordKey,
    pub locale: Locale,
    /// Fields whose value actually changed, in staging order
    pub changed_fields: Vec<String>,
    /// Requests dropped because their target is pinned
    pub pinned: Vec<TranslationRequest>,
    pub outcomes: Vec<DispatchOutcome>,
}

impl CascadeReport {
    fn new(record: RecordKey, locale: Locale, changed_fields: Vec<String>) -> Self {
        Self {
            record,
            locale,
            changed_fields,
            pinned: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    /// Number of outcomes with the given status
    pub fn count(&self, status: &DispatchStatus) -> usize {
        self.outcomes.iter().filter(|o| &o.status == status).count()
    }

    pub fn failures(&self) -> Vec<&DispatchOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure()).collect()
    }
}

#[derive(Debug)]
pub struct TranslationService {
    store: Arc<dyn LocalizedRecordStore>,
    registry: Arc<PolicyRegistry>,
    translator: Arc<dyn TranslatorAdapter>,
    orchestrator: TranslationOrchestrator,
    queue: Mutex<Option<Arc<BackgroundQueue>>>,
}

impl TranslationService {
    /// Create a service dispatching inline
    pub fn new(
        store: Arc<dyn LocalizedRecordStore>,
        registry: PolicyRegistry,
        translator: Arc<dyn TranslatorAdapter>,
    ) -> Self {
        let dispatcher = Arc::new(TranslationDispatcher::new(translator.clone(), store.clone()));
        info!(
            "Translation service ready: {} model(s), translator '{}'",
            registry.len(),
            translator.name()
        );
        Self {
            store,
            registry: Arc::new(registry),
            translator,
            orchestrator: TranslationOrchestrator::new(dispatcher),
            queue: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn LocalizedRecordStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &Arc<TranslationDispatcher> {
        self.orchestrator.dispatcher()
    }

    /// Switch to background dispatch, starting the queue if needed
    pub fn start_background(&self, concurrent_jobs: usize, capacity: usize) -> Arc<BackgroundQueue> {
        let mut slot = self.queue.lock();
        if let Some(queue) = slot.as_ref() {
            return queue.clone();
        }

        let worker = TranslationWorker::new(
            self.registry.clone(),
            self.store.clone(),
            self.translator.clone(),
        );
        let queue = BackgroundQueue::start(worker, concurrent_jobs, capacity);
        self.dispatcher()
            .set_mode(DispatchMode::Background(queue.clone()));
        *slot = Some(queue.clone());
        queue
    }

    /// Switch back to inline dispatch, draining the background queue
    pub async fn shutdown(&self) -> Option<QueueStats> {
        let queue = self.queue.lock().take()?;
        self.dispatcher().set_mode(DispatchMode::Inline);
        Some(queue.shutdown().await)
    }

    /// Handle on a host record
    pub fn record(
        &self,
        model: &str,
        host_id: impl Into<String>,
    ) -> Result<TranslatedRecord, ConfigurationError> {
        let policy = self.registry.get(model)?;
        Ok(TranslatedRecord::new(
            RecordKey::new(model, host_id),
            policy,
            self.store.clone(),
        ))
    }

    /// Apply, persist and cascade a staged mutation
    pub async fn commit(&self, mutation: Mutation<'_>) -> Result<CascadeReport, TranslationError> {
        let Mutation {
            record,
            locale,
            changes,
        } = mutation;

        let policy = record.policy().clone();
        if let Some((field, _)) = changes.iter().find(|(field, _)| !policy.translates(field)) {
            return Err(ConfigurationError::UndeclaredField {
                model: policy.name().to_string(),
                field: field.clone(),
            }
            .into());
        }

        let cache = record.cache();
        let target = cache.get(&locale).await?;
        let mut changed_fields: Vec<String> = Vec::new();
        {
            let mut target = target.lock();
            for (field, text) in &changes {
                if target.write(field, text) && !changed_fields.contains(field) {
                    changed_fields.push(field.clone());
                }
            }
        }

        if let Err(e) = persist_dirty(cache).await {
            error!("Commit of {} ({}) failed: {}", cache.key(), locale, e);
            cache.invalidate();
            return Err(e.into());
        }

        let mut report = CascadeReport::new(cache.key().clone(), locale.clone(), changed_fields);
        if report.changed_fields.is_empty() {
            return Ok(report);
        }

        let mut hooks = CommitHooks::new();
        let plan = match self
            .orchestrator
            .on_host_record_committed(cache, &locale, &report.changed_fields, &mut hooks)
            .await
        {
            Ok(plan) => plan,
            Err(e) => {
                warn!("Cascade for {} ({}) not started: {}", cache.key(), locale, e);
                hooks.discard();
                return Err(e);
            }
        };

        report.pinned = plan.pinned;
        report.outcomes = hooks.run().await;
        Ok(report)
    }

    /// Translate `field` of `record` into `to` right away.
    ///
    /// `from` defaults to the best available source locale. A pinned target
    /// is left alone.
    pub async fn retranslate(
        &self,
        record: &TranslatedRecord,
        field: &str,
        to: &Locale,
        from: Option<Locale>,
    ) -> Result<DispatchOutcome, TranslationError> {
        let mut hooks = CommitHooks::new();
        let request = self
            .orchestrator
            .retranslate(record.cache(), field, to, from, &mut hooks)
            .await?;

        let mut outcomes = hooks.run().await;
        Ok(outcomes.pop().unwrap_or_else(|| {
            DispatchOutcome::new(
                request,
                DispatchStatus::Failed("no translation job was registered".to_string()),
            )
        }))
    }
}
