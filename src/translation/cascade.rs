/*!
 * Cascade resolution.
 *
 * Given the record that changed and the names of the fields that changed in
 * it, decide which (field, target locale) pairs need a new translation. The
 * resolver is pure: it reads the policy and the source record's flags and
 * never touches storage or target records.
 */

use std::collections::HashSet;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::policy::{FieldLocalePolicy, Locale};

use super::record::TranslationRecord;

/// One unit of cascade work
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub from_locale: Locale,
    pub field: String,
    pub to_locale: Locale,
}

impl TranslationRequest {
    pub fn new(field: impl Into<String>, from_locale: Locale, to_locale: Locale) -> Self {
        Self {
            from_locale,
            field: field.into(),
            to_locale,
        }
    }
}

impl fmt::Display for TranslationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.field, self.from_locale, self.to_locale)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CascadeResolver<'a> {
    locales: &'a FieldLocalePolicy,
}

impl<'a> CascadeResolver<'a> {
    pub fn new(locales: &'a FieldLocalePolicy) -> Self {
        Self { locales }
    }

    /// Requests triggered by `changed_fields` in `source`.
    ///
    /// Fields keep caller order and targets keep configuration order. A
    /// field is skipped when the source locale is not one of its sources or
    /// when the source value is itself automatic, which stops translated
    /// output from feeding back into the cascade.
    pub fn resolve<F: AsRef<str>>(
        &self,
        source: &TranslationRecord,
        changed_fields: &[F],
    ) -> Vec<TranslationRequest> {
        let from = source.locale();
        let mut seen = HashSet::new();
        let mut requests = Vec::new();

        for field in changed_fields {
            let field = field.as_ref();
            if !seen.insert(field) {
                continue;
            }
            if !self.locales.is_source(field, from) {
                continue;
            }
            if source.is_automatic(field) == Some(true) {
                debug!("'{}' in {} is automatic, not cascading", field, from);
                continue;
            }

            requests.extend(
                self.locales
                    .target_locales(field)
                    .iter()
                    .filter(|to| *to != from)
                    .map(|to| TranslationRequest::new(field, from.clone(), to.clone())),
            );
        }

        debug!(
            "Resolved {} request(s) from {} for {:?}",
            requests.len(),
            from,
            changed_fields.iter().map(|f| f.as_ref()).collect::<Vec<_>>()
        );
        requests
    }
}
