/*!
 * Common test utilities for the locale-cascade test suite
 */

use std::sync::{Arc, Once};

use anyhow::Result;
use tempfile::TempDir;

use locale_cascade::database::{DatabaseConnection, SqliteStore};
use locale_cascade::{
    LocalizedRecordStore, MemoryStore, MockTranslator, PolicyRegistry, TranslatableModel,
    TranslationService,
};

static LOGGER: Once = Once::new();

/// Route library logs to the test output; set RUST_LOG to see them
pub fn init_logging() {
    LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// `post` with a translated `title` and `body`; `title` is written in
/// English and kept in sync in French and German
pub fn scenario_a_registry() -> PolicyRegistry {
    let mut registry = PolicyRegistry::new();
    registry.register(
        TranslatableModel::new("post")
            .translates(&["title", "body"])
            .auto_translate(&["title", "body"], &["en"], &["en", "fr", "de"])
            .unwrap()
            .build(),
    );
    registry
}

/// `post` whose `title` is written in English and French, each the target of the other
pub fn scenario_b_registry() -> PolicyRegistry {
    let mut registry = PolicyRegistry::new();
    registry.register(
        TranslatableModel::new("post")
            .translates(&["title"])
            .auto_translate(&["title"], &["en", "fr"], &["en", "fr"])
            .unwrap()
            .build(),
    );
    registry
}

/// Service over an in-memory store
pub fn memory_service(
    registry: PolicyRegistry,
    translator: &MockTranslator,
) -> (TranslationService, Arc<MemoryStore>) {
    init_logging();
    let store = Arc::new(MemoryStore::new());
    let service = TranslationService::new(store.clone(), registry, Arc::new(translator.clone()));
    (service, store)
}

/// Service over a SQLite file inside `dir`
pub fn sqlite_service(
    dir: &TempDir,
    registry: PolicyRegistry,
    translator: &MockTranslator,
) -> Result<(TranslationService, Arc<SqliteStore>)> {
    init_logging();
    let db = DatabaseConnection::new(dir.path().join("translations.db"))?;
    let store = Arc::new(SqliteStore::new(db));
    let dyn_store: Arc<dyn LocalizedRecordStore> = store.clone();
    let service = TranslationService::new(dyn_store, registry, Arc::new(translator.clone()));
    Ok((service, store))
}
