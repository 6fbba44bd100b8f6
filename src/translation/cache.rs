/*!
 * Per-record cache of translation state.
 *
 * A `TranslationStateCache` belongs to exactly one host record handle and
 * holds at most one `TranslationRecord` per locale. Records are loaded from
 * the store on first use and get their default automatic flags at that
 * point; later lookups return the same shared instance, so flag toggles made
 * through one lookup are seen by every other.
 */

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::errors::StoreError;
use crate::policy::{Locale, ModelPolicy};
use crate::store::{LocalizedRecordStore, RecordKey};

use super::record::{SharedTranslation, TranslationRecord};

/// Session-scoped translation state of one host record
#[derive(Debug)]
pub struct TranslationStateCache {
    key: RecordKey,
    policy: Arc<ModelPolicy>,
    store: Arc<dyn LocalizedRecordStore>,
    by_locale: Mutex<BTreeMap<Locale, SharedTranslation>>,
    /// Flag values copied in from another record, applied when the locale loads
    pending_flags: Mutex<BTreeMap<(String, Locale), bool>>,
}

impl TranslationStateCache {
    pub fn new(
        key: RecordKey,
        policy: Arc<ModelPolicy>,
        store: Arc<dyn LocalizedRecordStore>,
    ) -> Self {
        Self {
            key,
            policy,
            store,
            by_locale: Mutex::new(BTreeMap::new()),
            pending_flags: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    pub fn policy(&self) -> &Arc<ModelPolicy> {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn LocalizedRecordStore> {
        &self.store
    }

    /// Translation record of `locale`, loading it on first use
    pub async fn get(&self, locale: &Locale) -> Result<SharedTranslation, StoreError> {
        if let Some(record) = self.cached(locale) {
            return Ok(record);
        }

        let mut record = match self.store.load(&self.key, locale).await? {
            Some(row) => {
                debug!("Loaded {} ({}) at version {}", self.key, locale, row.lock_version);
                TranslationRecord::from_row(row)
            }
            None => {
                debug!("No stored row for {} ({}), starting empty", self.key, locale);
                TranslationRecord::new(self.key.clone(), locale.clone())
            }
        };

        {
            let mut pending = self.pending_flags.lock();
            let copied: Vec<(String, bool)> = pending
                .iter()
                .filter(|((_, pending_locale), _)| pending_locale == locale)
                .map(|((field, _), automatic)| (field.clone(), *automatic))
                .collect();
            for (field, automatic) in copied {
                record.set_automatic(&field, automatic);
                pending.remove(&(field, locale.clone()));
            }
        }
        record.apply_default_flags(self.policy.locales().default_flags(locale));

        // A concurrent lookup may have won the race; keep its instance
        let mut by_locale = self.by_locale.lock();
        Ok(by_locale
            .entry(locale.clone())
            .or_insert_with(|| record.into_shared())
            .clone())
    }

    /// Translation record of `locale` if it is already loaded
    pub fn cached(&self, locale: &Locale) -> Option<SharedTranslation> {
        self.by_locale.lock().get(locale).cloned()
    }

    /// Locales currently loaded
    pub fn loaded_locales(&self) -> Vec<Locale> {
        self.by_locale.lock().keys().cloned().collect()
    }

    /// Resolved automatic flag of a field in a locale
    pub async fn is_automatic(&self, field: &str, locale: &Locale) -> Result<Option<bool>, StoreError> {
        let record = self.get(locale).await?;
        let automatic = record.lock().is_automatic(field);
        Ok(automatic)
    }

    /// Loaded records with unsaved changes, ordered by locale
    pub fn dirty_records(&self) -> Vec<SharedTranslation> {
        self.by_locale
            .lock()
            .values()
            .filter(|record| record.lock().is_dirty())
            .cloned()
            .collect()
    }

    /// Drop the loaded record of `locale` unless it holds unsaved changes.
    ///
    /// Returns whether a record was dropped.
    pub fn evict(&self, locale: &Locale) -> bool {
        let mut by_locale = self.by_locale.lock();
        let clean = by_locale
            .get(locale)
            .is_some_and(|record| !record.lock().is_dirty());
        if clean {
            by_locale.remove(locale);
            debug!("Evicted {} ({}) from the state cache", self.key, locale);
        }
        clean
    }

    /// Drop every loaded record so the next lookup re-reads the store.
    ///
    /// Flags copied in by `copy_flags_into` are kept: they are not in the
    /// store yet and still apply when their locale is next loaded.
    pub fn invalidate(&self) {
        let mut by_locale = self.by_locale.lock();
        debug!("Invalidating {} cached locale(s) of {}", by_locale.len(), self.key);
        by_locale.clear();
    }

    /// Copy resolved flag values of `fields` into another record's cache.
    ///
    /// Only flags are copied, and they land as pending values: `other` gets
    /// no translation records until it loads the locales itself.
    pub async fn copy_flags_into<F: AsRef<str>>(
        &self,
        other: &TranslationStateCache,
        fields: &[F],
    ) -> Result<usize, StoreError> {
        let mut copied = 0;
        for field in fields {
            let field = field.as_ref();
            for locale in self.policy.locales().target_locales(field).to_vec() {
                if let Some(automatic) = self.is_automatic(field, &locale).await? {
                    other
                        .pending_flags
                        .lock()
                        .insert((field.to_string(), locale), automatic);
                    copied += 1;
                }
            }
        }
        debug!("Copied {} flag(s) from {} to {}", copied, self.key, other.key);
        Ok(copied)
    }

    /// Locales with copied flags that have not been loaded yet
    pub fn pending_locales(&self) -> Vec<Locale> {
        let locales: BTreeSet<Locale> = self
            .pending_flags
            .lock()
            .keys()
            .map(|(_, locale)| locale.clone())
            .collect();
        locales.into_iter().collect()
    }

    /// Flag copied in by `copy_flags_into` and not yet applied
    pub fn pending_flag(&self, field: &str, locale: &Locale) -> Option<bool> {
        self.pending_flags
            .lock()
            .get(&(field.to_string(), locale.clone()))
            .copied()
    }
}
