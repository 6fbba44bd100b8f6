/*!
 * Cascading automatic translation.
 *
 * This module contains the translation state engine. It is split into
 * several submodules:
 *
 * - `record`: per-locale translation state of a host record
 * - `cache`: per-record cache of locale records with default flags
 * - `selector`: source locale choice for explicit translations
 * - `cascade`: pure resolution of cascade requests
 * - `orchestrator`: reaction to committed host record changes
 * - `dispatcher`: deferred inline or background execution
 * - `worker` / `queue`: background job execution
 * - `handle` / `service`: host record API and facade
 */

// Re-export main types for easier usage
pub use self::cache::TranslationStateCache;
pub use self::cascade::{CascadeResolver, TranslationRequest};
pub use self::dispatcher::{
    DispatchMode, DispatchOutcome, DispatchStatus, JobQueue, TranslationDispatcher,
    TranslationJob, translate_one,
};
pub use self::handle::{Mutation, TranslatedRecord};
pub use self::orchestrator::{CascadePlan, TranslationOrchestrator};
pub use self::queue::{BackgroundQueue, QueueStats};
pub use self::record::{SharedTranslation, TranslationRecord};
pub use self::selector::SourceLocaleSelector;
pub use self::service::{CascadeReport, TranslationService};
pub use self::worker::TranslationWorker;

// Submodules
pub mod cache;
pub mod cascade;
pub mod dispatcher;
pub mod handle;
pub mod orchestrator;
pub mod queue;
pub mod record;
pub mod selector;
pub mod service;
pub mod worker;
