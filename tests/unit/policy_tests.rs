/*!
 * Tests for field/locale policies and the model registry
 */

use locale_cascade::{ConfigurationError, FieldLocalePolicy, Locale, PolicyRegistry, TranslatableModel};

fn locales(codes: &[&str]) -> Vec<Locale> {
    codes.iter().map(|code| Locale::new(*code)).collect()
}

/// Default flags follow "target and not source"
#[test]
fn test_defaultFlags_withScenarioA_shouldPinOnlyTheSourceLocale() {
    let mut policy = FieldLocalePolicy::new();
    policy
        .configure(&["title"], &locales(&["en"]), &locales(&["en", "fr", "de"]))
        .unwrap();

    assert_eq!(policy.default_flags(&Locale::new("en")).get("title"), Some(&false));
    assert_eq!(policy.default_flags(&Locale::new("fr")).get("title"), Some(&true));
    assert_eq!(policy.default_flags(&Locale::new("de")).get("title"), Some(&true));
    assert!(policy.default_flags(&Locale::new("it")).is_empty());
}

#[test]
fn test_defaultFlags_withMutualSources_shouldAllBePinned() {
    let mut policy = FieldLocalePolicy::new();
    policy
        .configure(&["title"], &locales(&["en", "fr"]), &locales(&["en", "fr"]))
        .unwrap();

    assert_eq!(policy.default_flags(&Locale::new("en")).get("title"), Some(&false));
    assert_eq!(policy.default_flags(&Locale::new("fr")).get("title"), Some(&false));
}

#[test]
fn test_defaultFlags_forSourceOnlyLocale_shouldBeAbsent() {
    let mut policy = FieldLocalePolicy::new();
    policy
        .configure(&["title"], &locales(&["en", "es"]), &locales(&["fr"]))
        .unwrap();

    assert!(policy.is_source("title", &Locale::new("es")));
    assert!(!policy.is_target("title", &Locale::new("es")));
    assert!(policy.default_flags(&Locale::new("es")).is_empty());
}

#[test]
fn test_configure_withEmptyLocaleSets_shouldFailFast() {
    let mut policy = FieldLocalePolicy::new();

    let no_from = policy.configure(&["title"], &[], &locales(&["fr"]));
    let no_to = policy.configure(&["title"], &locales(&["en"]), &[]);

    assert!(matches!(no_from, Err(ConfigurationError::EmptySourceLocales { .. })));
    assert!(matches!(no_to, Err(ConfigurationError::EmptyTargetLocales { .. })));
    assert!(!policy.is_configured("title"));
}

#[test]
fn test_builder_withSeveralRules_shouldConfigureEachField() {
    let post = TranslatableModel::new("post")
        .translates(&["title", "body", "slug"])
        .auto_translate(&["title"], &["en"], &["fr"])
        .unwrap()
        .auto_translate(&["body"], &["de"], &["en"])
        .unwrap()
        .build();

    assert!(post.translates("slug"));
    assert!(!post.locales().is_configured("slug"));
    assert_eq!(post.locales().source_locales("body"), &[Locale::new("de")]);
    assert_eq!(post.locales().target_locales("title"), &[Locale::new("fr")]);
}

#[test]
fn test_accessorName_shouldNormalizeRegion() {
    assert_eq!(
        FieldLocalePolicy::accessor_name("meta_title", &Locale::new("pt-BR")),
        "meta_title_pt_br_automatic"
    );
}

#[test]
fn test_registry_shouldLookUpByName() {
    let mut registry = PolicyRegistry::new();
    assert!(registry.is_empty());

    registry.register(TranslatableModel::new("page").translates(&["title"]).build());

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get("page").unwrap().name(), "page");
    assert_eq!(
        registry.get("post").unwrap_err(),
        ConfigurationError::UnknownModel("post".to_string())
    );
}
