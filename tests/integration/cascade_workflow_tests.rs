/*!
 * Edit, pin and cascade scenarios through the service facade
 */

use locale_cascade::translation::TranslationRequest;
use locale_cascade::{CascadeReport, DispatchStatus, Locale, MockTranslator, TranslationError};

use crate::common;

fn request(field: &str, from: &str, to: &str) -> TranslationRequest {
    TranslationRequest::new(field, Locale::new(from), Locale::new(to))
}

fn dispatched(report: &CascadeReport) -> Vec<TranslationRequest> {
    report.outcomes.iter().map(|o| o.request.clone()).collect()
}

#[tokio::test]
async fn test_scenarioA_editThenPin_shouldStopCascadingToPinnedLocale() {
    let translator = MockTranslator::working();
    let (service, _) = common::memory_service(common::scenario_a_registry(), &translator);
    let mut post = service.record("post", "1").unwrap();

    let first = service
        .commit(post.edit("en").set("title", "Hello"))
        .await
        .unwrap();
    assert_eq!(
        dispatched(&first),
        vec![request("title", "en", "fr"), request("title", "en", "de")]
    );
    assert_eq!(first.count(&DispatchStatus::Translated), 2);

    // A human polishes the French title and pins it
    post.set_accessor("title_fr_automatic", false).await.unwrap();
    let polish = service
        .commit(post.edit("fr").set("title", "Bonjour !"))
        .await
        .unwrap();
    assert!(polish.outcomes.is_empty());

    let second = service
        .commit(post.edit("en").set("title", "Hello again"))
        .await
        .unwrap();
    assert_eq!(dispatched(&second), vec![request("title", "en", "de")]);
    assert_eq!(second.pinned, vec![request("title", "en", "fr")]);

    let fr = Locale::new("fr");
    let de = Locale::new("de");
    assert_eq!(post.read("title", &fr).await.unwrap().as_deref(), Some("Bonjour !"));
    assert_eq!(post.read("title", &de).await.unwrap().as_deref(), Some("[de] Hello again"));
    assert!(!post.is_automatic("title", &fr).await.unwrap());
    assert!(post.is_automatic("title", &de).await.unwrap());
}

#[tokio::test]
async fn test_scenarioB_mutualSources_shouldNeverOverwriteEachOther() {
    let translator = MockTranslator::working();
    let (service, _) = common::memory_service(common::scenario_b_registry(), &translator);
    let mut post = service.record("post", "1").unwrap();

    let report = service
        .commit(post.edit("fr").set("title", "Bonjour"))
        .await
        .unwrap();

    assert_eq!(report.pinned, vec![request("title", "fr", "en")]);
    assert!(report.outcomes.is_empty());
    assert_eq!(translator.call_count(), 0);

    post.set_accessor("title_fr_automatic", true).await.unwrap();
    let report = service
        .commit(post.edit("fr").set("title", "Salut"))
        .await
        .unwrap();

    assert!(report.pinned.is_empty());
    assert!(report.outcomes.is_empty());
    assert_eq!(post.read("title", &Locale::new("en")).await.unwrap(), None);
}

#[tokio::test]
async fn test_commit_withFailingLocale_shouldIsolateTheFailure() {
    let translator = MockTranslator::failing_for("fr");
    let (service, store) = common::memory_service(common::scenario_a_registry(), &translator);
    let mut post = service.record("post", "1").unwrap();

    let report = service
        .commit(post.edit("en").set("title", "Hello"))
        .await
        .unwrap();

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].request, request("title", "en", "fr"));
    assert_eq!(report.count(&DispatchStatus::Translated), 1);

    // The edit itself stays committed
    post.reload();
    assert_eq!(post.read("title", &Locale::new("en")).await.unwrap().as_deref(), Some("Hello"));
    assert_eq!(post.read("title", &Locale::new("fr")).await.unwrap(), None);
    assert!(post.is_automatic("title", &Locale::new("fr")).await.unwrap());
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_commit_withStaleTarget_shouldFailUnitAndKeepHandleUsable() {
    let translator = MockTranslator::working();
    let (service, _) = common::memory_service(common::scenario_a_registry(), &translator);
    let mut first = service.record("post", "1").unwrap();
    service.commit(first.edit("en").set("title", "Hello")).await.unwrap();

    // Another handle edits French behind the first handle's back
    let mut second = service.record("post", "1").unwrap();
    service.commit(second.edit("fr").set("title", "Salut")).await.unwrap();

    let report = service
        .commit(first.edit("en").set("title", "Hello again"))
        .await
        .unwrap();
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].request, request("title", "en", "fr"));
    assert_eq!(report.count(&DispatchStatus::Translated), 1);

    // The failed unit left the prior value in place and nothing unsaved behind
    assert_eq!(first.read("title", &Locale::new("fr")).await.unwrap().as_deref(), Some("[fr] Hello"));
    assert_eq!(first.save().await.unwrap(), 0);
    let report = service.commit(first.edit("en").set("title", "Third")).await;
    assert!(report.is_ok());

    first.reload();
    assert_eq!(first.read("title", &Locale::new("fr")).await.unwrap().as_deref(), Some("Salut"));
    assert_eq!(first.read("title", &Locale::new("de")).await.unwrap().as_deref(), Some("[de] Third"));
}

#[tokio::test]
async fn test_commit_withWrongCountTranslator_shouldFailEveryTarget() {
    let translator = MockTranslator::wrong_count();
    let (service, _) = common::memory_service(common::scenario_a_registry(), &translator);
    let mut post = service.record("post", "1").unwrap();

    let report = service
        .commit(post.edit("en").set("title", "Hello"))
        .await
        .unwrap();

    assert_eq!(report.failures().len(), 2);
    assert_eq!(post.read("title", &Locale::new("de")).await.unwrap(), None);
}

#[tokio::test]
async fn test_commit_withSeveralFields_shouldCascadeEachChangedField() {
    let translator = MockTranslator::working();
    let (service, _) = common::memory_service(common::scenario_a_registry(), &translator);
    let mut post = service.record("post", "1").unwrap();
    service
        .commit(post.edit("en").set("title", "Hello").set("body", "Text"))
        .await
        .unwrap();

    let report = service
        .commit(post.edit("en").set("title", "Hello").set("body", "New text"))
        .await
        .unwrap();

    assert_eq!(report.changed_fields, vec!["body"]);
    assert_eq!(
        dispatched(&report),
        vec![request("body", "en", "fr"), request("body", "en", "de")]
    );
    assert_eq!(translator.call_count(), 6);
}

#[tokio::test]
async fn test_commit_withClearedSource_shouldClearTargetsWithoutTranslating() {
    let translator = MockTranslator::working();
    let (service, _) = common::memory_service(common::scenario_a_registry(), &translator);
    let mut post = service.record("post", "1").unwrap();
    service.commit(post.edit("en").set("title", "Hello")).await.unwrap();

    let report = service.commit(post.edit("en").set("title", "")).await.unwrap();

    assert_eq!(report.count(&DispatchStatus::Translated), 2);
    assert_eq!(translator.call_count(), 2);
    assert_eq!(post.read("title", &Locale::new("fr")).await.unwrap().as_deref(), Some(""));
}

#[tokio::test]
async fn test_retranslate_ofPinnedTarget_shouldLeaveItAlone() {
    let translator = MockTranslator::working();
    let (service, _) = common::memory_service(common::scenario_a_registry(), &translator);
    let mut post = service.record("post", "1").unwrap();
    service.commit(post.edit("en").set("title", "Hello")).await.unwrap();
    post.set_automatic("title", &Locale::new("de"), false).await.unwrap();

    let outcome = service
        .retranslate(&post, "title", &Locale::new("de"), None)
        .await
        .unwrap();

    assert_eq!(outcome.status, DispatchStatus::Pinned);
    assert_eq!(translator.call_count(), 2);
}

#[tokio::test]
async fn test_retranslate_withExplicitSource_shouldUseIt() {
    let mut registry = locale_cascade::PolicyRegistry::new();
    registry.register(
        locale_cascade::TranslatableModel::new("post")
            .translates(&["title"])
            .auto_translate(&["title"], &["en", "es"], &["de"])
            .unwrap()
            .build(),
    );
    let translator = MockTranslator::working();
    let (service, _) = common::memory_service(registry, &translator);
    let mut post = service.record("post", "1").unwrap();
    service.commit(post.edit("en").set("title", "Hello")).await.unwrap();
    service.commit(post.edit("es").set("title", "Hola")).await.unwrap();

    let outcome = service
        .retranslate(&post, "title", &Locale::new("de"), Some(Locale::new("es")))
        .await
        .unwrap();

    assert_eq!(outcome.request, request("title", "es", "de"));
    assert_eq!(post.read("title", &Locale::new("de")).await.unwrap().as_deref(), Some("[de] Hola"));
}

#[tokio::test]
async fn test_retranslate_ofUnconfiguredField_shouldError() {
    let translator = MockTranslator::working();
    let mut registry = locale_cascade::PolicyRegistry::new();
    registry.register(
        locale_cascade::TranslatableModel::new("post")
            .translates(&["title", "slug"])
            .auto_translate(&["title"], &["en"], &["fr"])
            .unwrap()
            .build(),
    );
    let (service, _) = common::memory_service(registry, &translator);
    let post = service.record("post", "1").unwrap();

    let result = service.retranslate(&post, "slug", &Locale::new("fr"), None).await;

    assert!(matches!(result, Err(TranslationError::Configuration(_))));
}

#[tokio::test]
async fn test_duplicate_shouldKeepPinsButStartWithoutValues() {
    let translator = MockTranslator::working();
    let (service, store) = common::memory_service(common::scenario_a_registry(), &translator);
    let mut post = service.record("post", "1").unwrap();
    service.commit(post.edit("en").set("title", "Hello")).await.unwrap();
    post.set_accessor("title_de_automatic", false).await.unwrap();
    post.save().await.unwrap();

    let mut copy = post.duplicate("2").await.unwrap();
    copy.save().await.unwrap();

    assert!(!copy.accessor("title_de_automatic").await.unwrap());
    assert!(copy.accessor("title_fr_automatic").await.unwrap());
    assert_eq!(copy.read("title", &Locale::new("de")).await.unwrap(), None);

    // The copy cascades on its own and still respects the copied pin
    let report = service
        .commit(copy.edit("en").set("title", "Copy"))
        .await
        .unwrap();
    assert_eq!(dispatched(&report), vec![request("title", "en", "fr")]);
    assert_eq!(report.pinned, vec![request("title", "en", "de")]);
    assert!(store.len() >= 5);
}

#[tokio::test]
async fn test_reload_shouldDropUnsavedFlagToggles() {
    let translator = MockTranslator::working();
    let (service, _) = common::memory_service(common::scenario_a_registry(), &translator);
    let post = service.record("post", "1").unwrap();

    post.set_accessor("title_fr_automatic", false).await.unwrap();
    assert!(!post.accessor("title_fr_automatic").await.unwrap());

    post.reload();
    assert!(post.accessor("title_fr_automatic").await.unwrap());
}
