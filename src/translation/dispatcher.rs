/*!
 * Dispatch of cascade requests.
 *
 * The dispatcher never translates while the triggering write is still open.
 * `dispatch` only registers an after-commit job on the caller's
 * `CommitHooks`; what that job does depends on the current mode:
 *
 * - `Inline`: translate the captured source text and write it into the
 *   target record once the hooks run.
 * - `Background`: hand a `TranslationJob` to a `JobQueue`; a worker later
 *   reloads the record and does the translation.
 */

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::errors::TranslationError;
use crate::policy::Locale;
use crate::providers::TranslatorAdapter;
use crate::store::{CommitHooks, LocalizedRecordStore, RecordKey};

use super::cascade::TranslationRequest;
use super::record::SharedTranslation;

/// What happened to one dispatched request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchStatus {
    /// New text written and persisted
    Translated,
    /// The target already held this text
    Unchanged,
    /// The target was pinned by the time the job ran
    Pinned,
    /// Handed to the background queue
    Queued,
    /// Translation or persistence failed; the target is untouched
    Failed(String),
}

/// Result of one dispatched request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub request: TranslationRequest,
    pub status: DispatchStatus,
}

impl DispatchOutcome {
    pub fn new(request: TranslationRequest, status: DispatchStatus) -> Self {
        Self { request, status }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, DispatchStatus::Failed(_))
    }
}

/// Background translation job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationJob {
    pub model: String,
    pub host_id: String,
    pub field: String,
    pub from_locale: Locale,
    pub to_locale: Locale,
}

impl TranslationJob {
    pub fn new(key: &RecordKey, request: &TranslationRequest) -> Self {
        Self {
            model: key.model.clone(),
            host_id: key.host_id.clone(),
            field: request.field.clone(),
            from_locale: request.from_locale.clone(),
            to_locale: request.to_locale.clone(),
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.model.clone(), self.host_id.clone())
    }

    pub fn request(&self) -> TranslationRequest {
        TranslationRequest::new(
            self.field.clone(),
            self.from_locale.clone(),
            self.to_locale.clone(),
        )
    }
}

/// Queue accepting background translation jobs
#[async_trait]
pub trait JobQueue: Send + Sync + Debug {
    async fn enqueue(&self, job: TranslationJob) -> Result<(), TranslationError>;
}

/// Where after-commit translation work runs
#[derive(Debug, Clone)]
pub enum DispatchMode {
    Inline,
    Background(Arc<dyn JobQueue>),
}

impl DispatchMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Background(_) => "background",
        }
    }
}

/// Translate a single text, enforcing one result per input
pub async fn translate_one(
    translator: &dyn TranslatorAdapter,
    text: &str,
    from: &Locale,
    to: &Locale,
) -> Result<String, TranslationError> {
    let mut translated = translator.translate(&[text.to_string()], from, to).await?;
    if translated.len() != 1 {
        return Err(TranslationError::CountMismatch {
            expected: 1,
            actual: translated.len(),
        });
    }
    Ok(translated.remove(0))
}

/// Translate `source_text` into the target record and persist it.
///
/// The pinned gate is checked again here because the flag may have changed
/// between dispatch and execution. An empty source clears the target without
/// calling the translator.
pub(crate) async fn apply_translation(
    translator: &dyn TranslatorAdapter,
    store: &dyn LocalizedRecordStore,
    target: &SharedTranslation,
    request: &TranslationRequest,
    source_text: &str,
) -> Result<DispatchStatus, TranslationError> {
    let field = request.field.as_str();
    let pinned = target.lock().is_automatic(field) == Some(false);
    if pinned {
        return Ok(DispatchStatus::Pinned);
    }

    let text = if source_text.is_empty() {
        String::new()
    } else {
        translate_one(translator, source_text, &request.from_locale, &request.to_locale).await?
    };

    // The shared record only changes once the store accepted the new text
    let (snapshot, mut staged) = {
        let record = target.lock();
        if record.is_automatic(field) == Some(false) {
            return Ok(DispatchStatus::Pinned);
        }
        let mut staged = record.clone();
        if !staged.write(field, &text) {
            return Ok(DispatchStatus::Unchanged);
        }
        (record.clone(), staged)
    };

    let version = store.save(&staged.to_row()).await?;
    staged.mark_saved(version);

    let mut record = target.lock();
    if *record == snapshot {
        *record = staged;
    } else {
        debug!(
            "{} ({}) changed while {} was saved, keeping the newer state",
            record.key(),
            record.locale(),
            request
        );
    }
    Ok(DispatchStatus::Translated)
}

/// Runs cascade requests after the triggering write commits
#[derive(Debug)]
pub struct TranslationDispatcher {
    translator: Arc<dyn TranslatorAdapter>,
    store: Arc<dyn LocalizedRecordStore>,
    mode: RwLock<DispatchMode>,
}

impl TranslationDispatcher {
    /// Create an inline dispatcher
    pub fn new(translator: Arc<dyn TranslatorAdapter>, store: Arc<dyn LocalizedRecordStore>) -> Self {
        Self {
            translator,
            store,
            mode: RwLock::new(DispatchMode::Inline),
        }
    }

    /// Switch between inline and background execution
    pub fn set_mode(&self, mode: DispatchMode) {
        info!("Translation dispatch mode: {}", mode.name());
        *self.mode.write() = mode;
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode.read().clone()
    }

    pub fn translator(&self) -> &Arc<dyn TranslatorAdapter> {
        &self.translator
    }

    /// Register the after-commit job for one request.
    ///
    /// `source_text` is the source value at dispatch time; inline jobs
    /// translate exactly that text. Nothing happens until `hooks` run, and
    /// a failure only affects this request.
    ///
    /// Returns `true` when the job goes to the background queue, in which
    /// case `target` is never written by this dispatch.
    pub fn dispatch(
        &self,
        key: &RecordKey,
        target: SharedTranslation,
        request: TranslationRequest,
        source_text: String,
        hooks: &mut CommitHooks<DispatchOutcome>,
    ) -> bool {
        debug!("Dispatching {} for {}", request, key);

        match self.mode() {
            DispatchMode::Inline => {
                let translator = self.translator.clone();
                let store = self.store.clone();
                let key = key.clone();
                hooks.after_commit(
                    async move {
                        let status = match apply_translation(
                            translator.as_ref(),
                            store.as_ref(),
                            &target,
                            &request,
                            &source_text,
                        )
                        .await
                        {
                            Ok(status) => {
                                debug!("{} on {}: {:?}", request, key, status);
                                status
                            }
                            Err(e) => {
                                warn!("Translation {} on {} failed: {}", request, key, e);
                                DispatchStatus::Failed(e.to_string())
                            }
                        };
                        DispatchOutcome::new(request, status)
                    }
                    .boxed(),
                );
                false
            }
            DispatchMode::Background(queue) => {
                let job = TranslationJob::new(key, &request);
                hooks.after_commit(
                    async move {
                        let status = match queue.enqueue(job).await {
                            Ok(()) => DispatchStatus::Queued,
                            Err(e) => {
                                warn!("Could not enqueue {}: {}", request, e);
                                DispatchStatus::Failed(e.to_string())
                            }
                        };
                        DispatchOutcome::new(request, status)
                    }
                    .boxed(),
                );
                true
            }
        }
    }
}
