/*!
 * Storage boundary for per-locale translation rows.
 *
 * The cascade engine never talks to a database directly. It goes through the
 * `LocalizedRecordStore` trait, which holds one row per (model, host record,
 * locale). `MemoryStore` is an in-process implementation; the SQLite-backed
 * one lives in `crate::database`.
 *
 * This module also provides `CommitHooks`, the after-commit callback list a
 * storage transaction hands to whoever needs work to happen only once the
 * write is durable.
 */

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::future::BoxFuture;
use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;
use crate::policy::Locale;

/// Identity of a host record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    /// Model (host record type) name
    pub model: String,
    /// Host record id
    pub host_id: String,
}

impl RecordKey {
    pub fn new(model: impl Into<String>, host_id: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            host_id: host_id.into(),
        }
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.model, self.host_id)
    }
}

/// Persisted state of one host record in one locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRow {
    /// Model name
    pub model: String,
    /// Host record id
    pub host_id: String,
    /// Locale of this row
    pub locale: Locale,
    /// Field values in this locale
    pub fields: BTreeMap<String, String>,
    /// Automatic flags in this locale
    pub automatic_flags: BTreeMap<String, bool>,
    /// Optimistic lock version, 0 when never persisted
    pub lock_version: i64,
    /// RFC 3339 time of the last save
    pub updated_at: Option<String>,
}

impl TranslationRow {
    pub fn new(key: &RecordKey, locale: Locale) -> Self {
        Self {
            model: key.model.clone(),
            host_id: key.host_id.clone(),
            locale,
            fields: BTreeMap::new(),
            automatic_flags: BTreeMap::new(),
            lock_version: 0,
            updated_at: None,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.model.clone(), self.host_id.clone())
    }

    pub(crate) fn conflict(&self) -> StoreError {
        StoreError::Conflict {
            model: self.model.clone(),
            host_id: self.host_id.clone(),
            locale: self.locale.to_string(),
        }
    }
}

/// Storage of per-locale translation rows.
///
/// `save` and `save_all` implement optimistic locking: the row's
/// `lock_version` must equal the stored version (0 for a new row), and the
/// returned value is the new version.
#[async_trait]
pub trait LocalizedRecordStore: Send + Sync + Debug {
    /// Load the row of a record in one locale
    async fn load(&self, key: &RecordKey, locale: &Locale) -> Result<Option<TranslationRow>, StoreError>;

    /// Load every locale row of a record, ordered by locale
    async fn load_all(&self, key: &RecordKey) -> Result<Vec<TranslationRow>, StoreError>;

    /// Insert or update one row
    async fn save(&self, row: &TranslationRow) -> Result<i64, StoreError>;

    /// Insert or update several rows in one transaction
    async fn save_all(&self, rows: &[TranslationRow]) -> Result<Vec<i64>, StoreError>;

    /// Remove every locale row of a record
    async fn delete_record(&self, key: &RecordKey) -> Result<usize, StoreError>;
}

type RowKey = (String, String, Locale);

fn row_key(row: &TranslationRow) -> RowKey {
    (row.model.clone(), row.host_id.clone(), row.locale.clone())
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<RowKey, TranslationRow>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows written so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of rows currently stored
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    fn check_version(
        rows: &HashMap<RowKey, TranslationRow>,
        row: &TranslationRow,
    ) -> Result<(), StoreError> {
        let stored = rows.get(&row_key(row)).map(|r| r.lock_version).unwrap_or(0);
        if stored != row.lock_version {
            return Err(row.conflict());
        }
        Ok(())
    }

    fn write(rows: &mut HashMap<RowKey, TranslationRow>, row: &TranslationRow) -> i64 {
        let mut stored = row.clone();
        stored.lock_version = row.lock_version + 1;
        stored.updated_at = Some(chrono::Utc::now().to_rfc3339());
        let version = stored.lock_version;
        rows.insert(row_key(row), stored);
        version
    }
}

#[async_trait]
impl LocalizedRecordStore for MemoryStore {
    async fn load(&self, key: &RecordKey, locale: &Locale) -> Result<Option<TranslationRow>, StoreError> {
        let lookup = (key.model.clone(), key.host_id.clone(), locale.clone());
        Ok(self.rows.read().get(&lookup).cloned())
    }

    async fn load_all(&self, key: &RecordKey) -> Result<Vec<TranslationRow>, StoreError> {
        let mut rows: Vec<TranslationRow> = self
            .rows
            .read()
            .values()
            .filter(|row| row.model == key.model && row.host_id == key.host_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.locale.cmp(&b.locale));
        Ok(rows)
    }

    async fn save(&self, row: &TranslationRow) -> Result<i64, StoreError> {
        let mut rows = self.rows.write();
        Self::check_version(&rows, row)?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(Self::write(&mut rows, row))
    }

    async fn save_all(&self, batch: &[TranslationRow]) -> Result<Vec<i64>, StoreError> {
        let mut rows = self.rows.write();
        for row in batch {
            Self::check_version(&rows, row)?;
        }
        self.saves.fetch_add(batch.len(), Ordering::SeqCst);
        Ok(batch.iter().map(|row| Self::write(&mut rows, row)).collect())
    }

    async fn delete_record(&self, key: &RecordKey) -> Result<usize, StoreError> {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|(model, host_id, _), _| !(model == &key.model && host_id == &key.host_id));
        Ok(before - rows.len())
    }
}

/// Work to run once a storage transaction has committed.
///
/// Jobs are lazy futures: registering one does nothing until `run` is called,
/// and `discard` (or dropping the hooks) means they never execute.
#[must_use = "registered jobs only execute when the hooks are run"]
pub struct CommitHooks<T> {
    jobs: Vec<BoxFuture<'static, T>>,
}

impl<T> CommitHooks<T> {
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    /// Register a job to execute after commit
    pub fn after_commit(&mut self, job: BoxFuture<'static, T>) {
        self.jobs.push(job);
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Execute every job in registration order
    pub async fn run(self) -> Vec<T> {
        let mut results = Vec::with_capacity(self.jobs.len());
        for job in self.jobs {
            results.push(job.await);
        }
        results
    }

    /// Drop every job without executing it
    pub fn discard(self) {
        debug!("Discarding {} after-commit job(s)", self.jobs.len());
    }
}

impl<T> Default for CommitHooks<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for CommitHooks<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitHooks")
            .field("jobs", &self.jobs.len())
            .finish()
    }
}
