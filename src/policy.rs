/*!
 * Locale policies for automatically translated fields.
 *
 * A `FieldLocalePolicy` records, for every translatable field, the ordered
 * list of locales trusted as translation sources and the ordered list of
 * locales kept in sync automatically. Policies are assembled once per model
 * with `TranslatableModel` and shared read-only afterwards.
 */

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigurationError;
use crate::language_utils;

/// Locale tag under which one variant of a field is stored
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    /// Wrap a locale tag without validating it
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Parse and validate a locale tag
    pub fn parse(code: &str) -> Result<Self, ConfigurationError> {
        let code = code.trim();
        language_utils::validate_locale(code)
            .map_err(|_| ConfigurationError::InvalidLocale(code.to_string()))?;
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Form used inside accessor names: `pt-BR` -> `pt_br`
    pub fn accessor_form(&self) -> String {
        self.0.replace('-', "_").to_lowercase()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locale {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for Locale {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl AsRef<str> for Locale {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Source and target locales of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleRule {
    /// Trusted source locales, highest priority first
    pub sources: Vec<Locale>,
    /// Locales kept in sync, in declaration order
    pub targets: Vec<Locale>,
}

/// Per-model map from field name to its locale rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldLocalePolicy {
    rules: BTreeMap<String, LocaleRule>,
}

impl FieldLocalePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `from` as sources and `to` as targets for every field.
    ///
    /// Either set being empty rejects the whole call and leaves the policy
    /// untouched. A later call for the same field replaces its rule.
    pub fn configure<F: AsRef<str>>(
        &mut self,
        fields: &[F],
        from: &[Locale],
        to: &[Locale],
    ) -> Result<(), ConfigurationError> {
        let field_list = fields
            .iter()
            .map(|f| f.as_ref())
            .collect::<Vec<_>>()
            .join(", ");

        if fields.is_empty() {
            return Err(ConfigurationError::EmptyFieldSet);
        }
        if from.is_empty() {
            return Err(ConfigurationError::EmptySourceLocales { fields: field_list });
        }
        if to.is_empty() {
            return Err(ConfigurationError::EmptyTargetLocales { fields: field_list });
        }

        let rule = LocaleRule {
            sources: dedup_in_order(from),
            targets: dedup_in_order(to),
        };

        let mut rules = self.rules.clone();
        for field in fields {
            rules.insert(field.as_ref().to_string(), rule.clone());
        }
        check_accessor_names(&rules)?;

        for field in fields {
            debug!(
                "Configuring automatic translation for '{}': from {:?} to {:?}",
                field.as_ref(),
                rule.sources,
                rule.targets
            );
        }
        self.rules = rules;

        Ok(())
    }

    pub fn is_source(&self, field: &str, locale: &Locale) -> bool {
        self.rules
            .get(field)
            .is_some_and(|rule| rule.sources.contains(locale))
    }

    pub fn is_target(&self, field: &str, locale: &Locale) -> bool {
        self.rules
            .get(field)
            .is_some_and(|rule| rule.targets.contains(locale))
    }

    /// Source locales of a field, highest priority first
    pub fn source_locales(&self, field: &str) -> &[Locale] {
        self.rules
            .get(field)
            .map(|rule| rule.sources.as_slice())
            .unwrap_or(&[])
    }

    pub fn target_locales(&self, field: &str) -> &[Locale] {
        self.rules
            .get(field)
            .map(|rule| rule.targets.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_configured(&self, field: &str) -> bool {
        self.rules.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Initial automatic flags for a freshly created record in `locale`.
    ///
    /// Only fields targeting `locale` get an entry; the flag is on unless the
    /// locale is also a trusted source for that field.
    pub fn default_flags(&self, locale: &Locale) -> BTreeMap<String, bool> {
        self.rules
            .iter()
            .filter(|(_, rule)| rule.targets.contains(locale))
            .map(|(field, rule)| (field.clone(), !rule.sources.contains(locale)))
            .collect()
    }

    /// Every (field, locale) pair that exposes an automatic flag
    pub fn automatic_pairs(&self) -> impl Iterator<Item = (&str, &Locale)> {
        self.rules.iter().flat_map(|(field, rule)| {
            rule.targets
                .iter()
                .map(move |locale| (field.as_str(), locale))
        })
    }

    /// Name of the flag accessor for a pair: `<field>_<locale>_automatic`
    pub fn accessor_name(field: &str, locale: &Locale) -> String {
        format!("{}_{}_automatic", field, locale.accessor_form())
    }

    /// Resolve an accessor name back to its configured (field, locale) pair
    pub fn resolve_accessor(&self, name: &str) -> Result<(&str, &Locale), ConfigurationError> {
        self.automatic_pairs()
            .find(|(field, locale)| Self::accessor_name(field, locale) == name)
            .ok_or_else(|| ConfigurationError::UnknownAccessor(name.to_string()))
    }
}

/// Accessor names are matched after locale folding, so distinct pairs may
/// collide (`title_pt` + `br` and `title` + `pt-BR`)
fn check_accessor_names(rules: &BTreeMap<String, LocaleRule>) -> Result<(), ConfigurationError> {
    let mut seen = BTreeSet::new();
    for (field, rule) in rules {
        for locale in &rule.targets {
            let name = FieldLocalePolicy::accessor_name(field, locale);
            if !seen.insert(name.clone()) {
                return Err(ConfigurationError::AmbiguousAccessor(name));
            }
        }
    }
    Ok(())
}

fn dedup_in_order(locales: &[Locale]) -> Vec<Locale> {
    let mut seen = BTreeSet::new();
    locales
        .iter()
        .filter(|locale| seen.insert((*locale).clone()))
        .cloned()
        .collect()
}

/// Translatable fields of a model together with their locale policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPolicy {
    name: String,
    translated_fields: BTreeSet<String>,
    locales: FieldLocalePolicy,
}

impl ModelPolicy {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn translates(&self, field: &str) -> bool {
        self.translated_fields.contains(field)
    }

    pub fn translated_fields(&self) -> impl Iterator<Item = &str> {
        self.translated_fields.iter().map(String::as_str)
    }

    pub fn locales(&self) -> &FieldLocalePolicy {
        &self.locales
    }
}

/// Builder composing a model's translatable-field declaration with its
/// automatic-translation rules.
///
/// ```
/// use locale_cascade::policy::{Locale, TranslatableModel};
///
/// let post = TranslatableModel::new("post")
///     .translates(&["title", "body"])
///     .auto_translate(&["title"], &["en"], &["en", "fr", "de"])
///     .unwrap()
///     .build();
///
/// assert!(post.locales().is_target("title", &Locale::new("fr")));
/// assert!(!post.locales().is_configured("body"));
/// ```
#[derive(Debug, Clone)]
pub struct TranslatableModel {
    name: String,
    translated_fields: BTreeSet<String>,
    locales: FieldLocalePolicy,
}

impl TranslatableModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            translated_fields: BTreeSet::new(),
            locales: FieldLocalePolicy::new(),
        }
    }

    /// Declare fields that carry one value per locale
    pub fn translates<F: AsRef<str>>(mut self, fields: &[F]) -> Self {
        self.translated_fields
            .extend(fields.iter().map(|f| f.as_ref().to_string()));
        self
    }

    /// Add an automatic-translation rule; can be called several times
    pub fn auto_translate<F: AsRef<str>>(
        mut self,
        fields: &[F],
        from: &[&str],
        to: &[&str],
    ) -> Result<Self, ConfigurationError> {
        for field in fields {
            if !self.translated_fields.contains(field.as_ref()) {
                return Err(ConfigurationError::UndeclaredField {
                    model: self.name.clone(),
                    field: field.as_ref().to_string(),
                });
            }
        }

        let from = parse_locales(from)?;
        let to = parse_locales(to)?;
        self.locales.configure(fields, &from, &to)?;
        Ok(self)
    }

    pub fn build(self) -> Arc<ModelPolicy> {
        Arc::new(ModelPolicy {
            name: self.name,
            translated_fields: self.translated_fields,
            locales: self.locales,
        })
    }
}

fn parse_locales(codes: &[&str]) -> Result<Vec<Locale>, ConfigurationError> {
    codes.iter().map(|code| Locale::parse(code)).collect()
}

/// Lookup of model policies by model name
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    models: HashMap<String, Arc<ModelPolicy>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, model: Arc<ModelPolicy>) {
        self.models.insert(model.name().to_string(), model);
    }

    pub fn get(&self, model: &str) -> Result<Arc<ModelPolicy>, ConfigurationError> {
        self.models
            .get(model)
            .cloned()
            .ok_or_else(|| ConfigurationError::UnknownModel(model.to_string()))
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
