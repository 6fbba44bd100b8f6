/*!
 * Host record handle.
 *
 * `TranslatedRecord` is what application code holds for one host record: it
 * reads field values per locale, exposes the `<field>_<locale>_automatic`
 * switches, and stages edits as a `Mutation` that `TranslationService::commit`
 * turns into a persisted change plus its cascade.
 */

use std::sync::Arc;

use log::{debug, info};

use crate::errors::{ConfigurationError, StoreError, TranslationError};
use crate::policy::{FieldLocalePolicy, Locale, ModelPolicy};
use crate::store::{LocalizedRecordStore, RecordKey};

use super::cache::TranslationStateCache;

/// Handle on one host record and its per-locale translation state
#[derive(Debug)]
pub struct TranslatedRecord {
    cache: TranslationStateCache,
}

impl TranslatedRecord {
    pub fn new(key: RecordKey, policy: Arc<ModelPolicy>, store: Arc<dyn LocalizedRecordStore>) -> Self {
        Self {
            cache: TranslationStateCache::new(key, policy, store),
        }
    }

    pub fn key(&self) -> &RecordKey {
        self.cache.key()
    }

    pub fn policy(&self) -> &Arc<ModelPolicy> {
        self.cache.policy()
    }

    pub fn cache(&self) -> &TranslationStateCache {
        &self.cache
    }

    fn check_translated(&self, field: &str) -> Result<(), ConfigurationError> {
        if !self.policy().translates(field) {
            return Err(ConfigurationError::UndeclaredField {
                model: self.key().model.clone(),
                field: field.to_string(),
            });
        }
        Ok(())
    }

    fn check_target(&self, field: &str, locale: &Locale) -> Result<(), ConfigurationError> {
        if !self.policy().locales().is_target(field, locale) {
            return Err(ConfigurationError::UnknownAccessor(
                FieldLocalePolicy::accessor_name(field, locale),
            ));
        }
        Ok(())
    }

    /// Value of `field` in `locale`, `None` when never written
    pub async fn read(&self, field: &str, locale: &Locale) -> Result<Option<String>, TranslationError> {
        self.check_translated(field)?;
        let record = self.cache.get(locale).await?;
        let value = record.lock().read(field).map(str::to_string);
        Ok(value)
    }

    /// Whether `field` in `locale` is machine-maintained
    pub async fn is_automatic(&self, field: &str, locale: &Locale) -> Result<bool, TranslationError> {
        self.check_target(field, locale)?;
        let automatic = self.cache.is_automatic(field, locale).await?;
        Ok(automatic.unwrap_or_else(|| !self.policy().locales().is_source(field, locale)))
    }

    /// Pin (`false`) or release (`true`) `field` in `locale`; saved by `save` or the next commit
    pub async fn set_automatic(
        &self,
        field: &str,
        locale: &Locale,
        automatic: bool,
    ) -> Result<(), TranslationError> {
        self.check_target(field, locale)?;
        let record = self.cache.get(locale).await?;
        if record.lock().set_automatic(field, automatic) {
            debug!(
                "{} set {} to {}",
                self.key(),
                FieldLocalePolicy::accessor_name(field, locale),
                automatic
            );
        }
        Ok(())
    }

    /// Names of every `<field>_<locale>_automatic` accessor of this record
    pub fn accessor_names(&self) -> Vec<String> {
        self.policy()
            .locales()
            .automatic_pairs()
            .map(|(field, locale)| FieldLocalePolicy::accessor_name(field, locale))
            .collect()
    }

    /// Read an accessor such as `title_fr_automatic`
    pub async fn accessor(&self, name: &str) -> Result<bool, TranslationError> {
        let policy = self.policy().clone();
        let (field, locale) = policy.locales().resolve_accessor(name)?;
        self.is_automatic(field, locale).await
    }

    /// Write an accessor such as `title_fr_automatic`
    pub async fn set_accessor(&self, name: &str, automatic: bool) -> Result<(), TranslationError> {
        let policy = self.policy().clone();
        let (field, locale) = policy.locales().resolve_accessor(name)?;
        self.set_automatic(field, locale, automatic).await
    }

    /// Start staging changes to the `locale` variant
    pub fn edit(&mut self, locale: impl Into<Locale>) -> Mutation<'_> {
        Mutation {
            record: self,
            locale: locale.into(),
            changes: Vec::new(),
        }
    }

    /// Forget everything loaded so the next read goes to the store
    pub fn reload(&self) {
        self.cache.invalidate();
    }

    /// Handle on a copy of this record under `new_host_id`.
    ///
    /// The copy starts with an empty cache; only the automatic flags are
    /// carried over.
    pub async fn duplicate(&self, new_host_id: impl Into<String>) -> Result<TranslatedRecord, TranslationError> {
        let key = RecordKey::new(self.key().model.clone(), new_host_id);
        let copy = TranslatedRecord::new(key, self.policy().clone(), self.cache.store().clone());

        let fields: Vec<String> = self.policy().locales().fields().map(str::to_string).collect();
        self.cache.copy_flags_into(&copy.cache, &fields).await?;
        Ok(copy)
    }

    /// Persist pending flag changes without cascading
    pub async fn save(&self) -> Result<usize, TranslationError> {
        for locale in self.cache.pending_locales() {
            self.cache.get(&locale).await?;
        }
        Ok(persist_dirty(&self.cache).await?)
    }
}

/// Save every dirty record of `cache` in one store transaction
pub(crate) async fn persist_dirty(cache: &TranslationStateCache) -> Result<usize, StoreError> {
    let dirty = cache.dirty_records();
    if dirty.is_empty() {
        return Ok(0);
    }

    let rows: Vec<_> = dirty.iter().map(|record| record.lock().to_row()).collect();
    let versions = cache.store().save_all(&rows).await?;
    for (record, version) in dirty.iter().zip(versions) {
        record.lock().mark_saved(version);
    }

    info!("Saved {} locale row(s) of {}", rows.len(), cache.key());
    Ok(rows.len())
}

/// Changes staged against one locale of a host record.
///
/// Nothing is applied until the mutation is committed; dropping it discards
/// the staged values.
#[derive(Debug)]
#[must_use = "a mutation does nothing until it is committed"]
pub struct Mutation<'a> {
    pub(crate) record: &'a mut TranslatedRecord,
    pub(crate) locale: Locale,
    pub(crate) changes: Vec<(String, String)>,
}

impl Mutation<'_> {
    /// Stage a new value for `field`
    pub fn set(mut self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.changes.push((field.into(), text.into()));
        self
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
