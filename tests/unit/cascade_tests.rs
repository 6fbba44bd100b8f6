/*!
 * Tests for cascade resolution and source locale selection
 */

use std::sync::Arc;

use locale_cascade::translation::{
    CascadeResolver, SourceLocaleSelector, TranslationRecord, TranslationRequest,
    TranslationStateCache,
};
use locale_cascade::{Locale, MemoryStore, RecordKey, TranslatableModel};

fn request(field: &str, from: &str, to: &str) -> TranslationRequest {
    TranslationRequest::new(field, Locale::new(from), Locale::new(to))
}

fn record(locale: &str, automatic: bool) -> TranslationRecord {
    let mut record = TranslationRecord::new(RecordKey::new("post", "1"), Locale::new(locale));
    record.set_automatic("title", automatic);
    record.set_automatic("body", automatic);
    record
}

#[test]
fn test_resolve_withPinnedSource_shouldTargetEveryOtherLocale() {
    let post = TranslatableModel::new("post")
        .translates(&["title"])
        .auto_translate(&["title"], &["en"], &["en", "fr", "de"])
        .unwrap()
        .build();
    let resolver = CascadeResolver::new(post.locales());

    let requests = resolver.resolve(&record("en", false), &["title"]);

    assert_eq!(requests, vec![request("title", "en", "fr"), request("title", "en", "de")]);
}

#[test]
fn test_resolve_withAutomaticSource_shouldProduceNothing() {
    let post = TranslatableModel::new("post")
        .translates(&["title"])
        .auto_translate(&["title"], &["en", "fr"], &["en", "fr"])
        .unwrap()
        .build();
    let resolver = CascadeResolver::new(post.locales());

    assert!(resolver.resolve(&record("fr", true), &["title"]).is_empty());
}

#[test]
fn test_resolve_shouldKeepFieldOrderAndSkipNonSources() {
    let post = TranslatableModel::new("post")
        .translates(&["title", "body", "slug"])
        .auto_translate(&["title"], &["en"], &["fr"])
        .unwrap()
        .auto_translate(&["body"], &["en"], &["de", "fr"])
        .unwrap()
        .build();
    let resolver = CascadeResolver::new(post.locales());

    let requests = resolver.resolve(&record("en", false), &["body", "slug", "title", "body"]);

    assert_eq!(
        requests,
        vec![
            request("body", "en", "de"),
            request("body", "en", "fr"),
            request("title", "en", "fr"),
        ]
    );
    assert!(resolver.resolve(&record("fr", false), &["title"]).is_empty());
}

#[tokio::test]
async fn test_select_shouldPreferFirstPinnedSourceWithValue() {
    let post = TranslatableModel::new("post")
        .translates(&["title"])
        .auto_translate(&["title"], &["en", "fr", "es"], &["de"])
        .unwrap()
        .build();
    let cache = TranslationStateCache::new(
        RecordKey::new("post", "1"),
        post.clone(),
        Arc::new(MemoryStore::new()),
    );
    cache.get(&Locale::new("fr")).await.unwrap().lock().write("title", "Bonjour");
    cache.get(&Locale::new("es")).await.unwrap().lock().write("title", "Hola");

    let selector = SourceLocaleSelector::new(post.locales());
    assert_eq!(selector.select(&cache, "title").await.unwrap(), Locale::new("fr"));

    cache.get(&Locale::new("fr")).await.unwrap().lock().set_automatic("title", true);
    assert_eq!(selector.select(&cache, "title").await.unwrap(), Locale::new("es"));
}

#[tokio::test]
async fn test_select_withoutAnyValue_shouldFallBackToFirstSource() {
    let post = TranslatableModel::new("post")
        .translates(&["title"])
        .auto_translate(&["title"], &["en", "fr"], &["de"])
        .unwrap()
        .build();
    let cache = TranslationStateCache::new(
        RecordKey::new("post", "1"),
        post.clone(),
        Arc::new(MemoryStore::new()),
    );

    let selected = SourceLocaleSelector::new(post.locales())
        .select(&cache, "title")
        .await
        .unwrap();

    assert_eq!(selected, Locale::new("en"));
}
