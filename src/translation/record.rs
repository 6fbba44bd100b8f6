/*!
 * In-memory translation state of one host record in one locale.
 */

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::policy::Locale;
use crate::store::{RecordKey, TranslationRow};

/// Translation record shared between the state cache and pending dispatches
pub type SharedTranslation = Arc<Mutex<TranslationRecord>>;

/// Field values and automatic flags of a host record in one locale.
///
/// A flag of `true` means the value is machine-maintained and may be
/// overwritten by a cascade; `false` means it is pinned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRecord {
    key: RecordKey,
    locale: Locale,
    fields: BTreeMap<String, String>,
    automatic_flags: BTreeMap<String, bool>,
    lock_version: i64,
    dirty: bool,
}

impl TranslationRecord {
    /// A record that has never been persisted
    pub fn new(key: RecordKey, locale: Locale) -> Self {
        Self {
            key,
            locale,
            fields: BTreeMap::new(),
            automatic_flags: BTreeMap::new(),
            lock_version: 0,
            dirty: false,
        }
    }

    pub fn from_row(row: TranslationRow) -> Self {
        Self {
            key: RecordKey::new(row.model, row.host_id),
            locale: row.locale,
            fields: row.fields,
            automatic_flags: row.automatic_flags,
            lock_version: row.lock_version,
            dirty: false,
        }
    }

    /// Snapshot for the store
    pub fn to_row(&self) -> TranslationRow {
        TranslationRow {
            model: self.key.model.clone(),
            host_id: self.key.host_id.clone(),
            locale: self.locale.clone(),
            fields: self.fields.clone(),
            automatic_flags: self.automatic_flags.clone(),
            lock_version: self.lock_version,
            updated_at: None,
        }
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Value of a field, `None` when never written
    pub fn read(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Value of a field, empty when never written
    pub fn value(&self, field: &str) -> &str {
        self.read(field).unwrap_or_default()
    }

    /// Write a field value; returns whether the stored value changed
    pub fn write(&mut self, field: &str, text: &str) -> bool {
        if self.value(field) == text && (self.fields.contains_key(field) || text.is_empty()) {
            return false;
        }
        self.fields.insert(field.to_string(), text.to_string());
        self.dirty = true;
        true
    }

    /// Automatic flag of a field, `None` when the field is not targeted here
    pub fn is_automatic(&self, field: &str) -> Option<bool> {
        self.automatic_flags.get(field).copied()
    }

    /// Set an automatic flag; returns whether it changed
    pub fn set_automatic(&mut self, field: &str, automatic: bool) -> bool {
        if self.automatic_flags.get(field) == Some(&automatic) {
            return false;
        }
        self.automatic_flags.insert(field.to_string(), automatic);
        self.dirty = true;
        true
    }

    /// Fill in default flags for fields without a stored flag
    pub(crate) fn apply_default_flags(&mut self, defaults: BTreeMap<String, bool>) {
        for (field, automatic) in defaults {
            self.automatic_flags.entry(field).or_insert(automatic);
        }
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn automatic_flags(&self) -> &BTreeMap<String, bool> {
        &self.automatic_flags
    }

    pub fn lock_version(&self) -> i64 {
        self.lock_version
    }

    pub fn is_persisted(&self) -> bool {
        self.lock_version > 0
    }

    /// Whether there are changes not yet saved
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record a successful save at `lock_version`
    pub(crate) fn mark_saved(&mut self, lock_version: i64) {
        self.lock_version = lock_version;
        self.dirty = false;
    }

    pub(crate) fn into_shared(self) -> SharedTranslation {
        Arc::new(Mutex::new(self))
    }
}
