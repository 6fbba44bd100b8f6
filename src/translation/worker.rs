/*!
 * Execution of background translation jobs.
 */

use std::sync::Arc;

use log::{debug, warn};

use crate::errors::{StoreError, TranslationError};
use crate::policy::PolicyRegistry;
use crate::providers::TranslatorAdapter;
use crate::store::LocalizedRecordStore;

use super::cache::TranslationStateCache;
use super::dispatcher::{DispatchStatus, TranslationJob, apply_translation};

/// Performs queued jobs against freshly loaded state.
///
/// Nothing from the dispatching session is reused: the worker builds its own
/// state cache, so the pinned gate is evaluated on what is stored now.
/// Jobs are safe to run more than once; a stale target row is reloaded and
/// the job retried.
#[derive(Debug, Clone)]
pub struct TranslationWorker {
    registry: Arc<PolicyRegistry>,
    store: Arc<dyn LocalizedRecordStore>,
    translator: Arc<dyn TranslatorAdapter>,
}

impl TranslationWorker {
    pub fn new(
        registry: Arc<PolicyRegistry>,
        store: Arc<dyn LocalizedRecordStore>,
        translator: Arc<dyn TranslatorAdapter>,
    ) -> Self {
        Self {
            registry,
            store,
            translator,
        }
    }

    /// Attempts made when the target row changes underneath a job
    const MAX_ATTEMPTS: usize = 3;

    pub async fn perform(&self, job: &TranslationJob) -> Result<DispatchStatus, TranslationError> {
        let mut attempt = 1;
        loop {
            match self.perform_once(job).await {
                Err(TranslationError::Store(StoreError::Conflict { .. }))
                    if attempt < Self::MAX_ATTEMPTS =>
                {
                    debug!(
                        "Job {} on {} hit a stale row, reloading (attempt {}/{})",
                        job.request(),
                        job.key(),
                        attempt,
                        Self::MAX_ATTEMPTS
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn perform_once(&self, job: &TranslationJob) -> Result<DispatchStatus, TranslationError> {
        let policy = self.registry.get(&job.model)?;
        let request = job.request();
        let cache = TranslationStateCache::new(job.key(), policy, self.store.clone());

        let source = cache.get(&job.from_locale).await?;
        let source_text = source.lock().value(&job.field).to_string();
        let target = cache.get(&job.to_locale).await?;

        let status = apply_translation(
            self.translator.as_ref(),
            self.store.as_ref(),
            &target,
            &request,
            &source_text,
        )
        .await;

        match &status {
            Ok(status) => debug!("Job {} on {}: {:?}", request, job.key(), status),
            Err(e) => warn!("Job {} on {} failed: {}", request, job.key(), e),
        }
        status
    }
}
