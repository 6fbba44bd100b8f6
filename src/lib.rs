/*!
 * # locale-cascade
 *
 * A Rust library that keeps per-locale variants of record fields in sync by
 * machine translation.
 *
 * ## Features
 *
 * - Declare, per model and field, which locales are edited by humans
 *   (sources) and which are maintained automatically (targets)
 * - Per field and locale `automatic` flag: clearing it pins a human-edited
 *   translation so later source edits never overwrite it
 * - Cascading: a committed edit of a source locale is translated into every
 *   automatic target of the changed fields
 * - Deferred execution: translations run only after the edit is durably
 *   stored, either inline or through a background job queue
 * - SQLite persistence with optimistic locking
 * - Translator backends: Ollama (local LLM) and a deterministic mock
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `policy`: Locales, field/locale rules and the model registry
 * - `store`: Storage trait, in-memory store and commit hooks
 * - `database`: SQLite-backed store
 * - `translation`: The translation state engine:
 *   - `translation::cache`: Per-record cache of locale rows
 *   - `translation::selector`: Source locale choice
 *   - `translation::cascade`: Cascade resolution
 *   - `translation::orchestrator`: Reaction to committed edits
 *   - `translation::dispatcher`: Inline and background execution
 *   - `translation::service`: Facade used by applications
 * - `language_utils`: ISO language code utilities
 * - `providers`: Translator backends
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod database;
pub mod errors;
pub mod language_utils;
pub mod policy;
pub mod providers;
pub mod store;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use database::SqliteStore;
pub use errors::{AppError, ConfigurationError, ProviderError, StoreError, TranslationError};
pub use language_utils::{get_language_name, normalize_to_part2t, validate_locale};
pub use policy::{FieldLocalePolicy, Locale, ModelPolicy, PolicyRegistry, TranslatableModel};
pub use providers::{MockTranslator, OllamaTranslator, TranslatorAdapter};
pub use store::{CommitHooks, LocalizedRecordStore, MemoryStore, RecordKey, TranslationRow};
pub use translation::{
    CascadeReport, DispatchMode, DispatchOutcome, DispatchStatus, TranslatedRecord,
    TranslationService,
};
