/*!
 * Background dispatch through the job queue
 */

use locale_cascade::{DispatchMode, DispatchStatus, Locale, MockTranslator};

use crate::common;

#[tokio::test]
async fn test_backgroundCommit_shouldQueueThenTranslateAfterDrain() {
    let dir = common::create_temp_dir().unwrap();
    let translator = MockTranslator::slow(20);
    let (service, _) =
        common::sqlite_service(&dir, common::scenario_a_registry(), &translator).unwrap();
    service.start_background(2, 16);
    assert_eq!(service.dispatcher().mode().name(), "background");

    let mut post = service.record("post", "1").unwrap();
    let report = service
        .commit(post.edit("en").set("title", "Hello").set("body", "Text"))
        .await
        .unwrap();
    assert_eq!(report.count(&DispatchStatus::Queued), 4);

    let stats = service.shutdown().await.unwrap();
    assert_eq!(stats.enqueued, 4);
    assert_eq!(stats.completed, 4);
    assert_eq!(stats.failed, 0);
    assert!(matches!(service.dispatcher().mode(), DispatchMode::Inline));

    post.reload();
    assert_eq!(post.read("title", &Locale::new("fr")).await.unwrap().as_deref(), Some("[fr] Hello"));
    assert_eq!(post.read("body", &Locale::new("de")).await.unwrap().as_deref(), Some("[de] Text"));
    assert!(post.accessor("body_de_automatic").await.unwrap());
}

#[tokio::test]
async fn test_backgroundCommit_withFailingLocale_shouldCountFailure() {
    let translator = MockTranslator::failing_for("de");
    let (service, store) = common::memory_service(common::scenario_a_registry(), &translator);
    service.start_background(4, 16);

    let mut post = service.record("post", "1").unwrap();
    service
        .commit(post.edit("en").set("title", "Hello"))
        .await
        .unwrap();
    let stats = service.shutdown().await.unwrap();

    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_backgroundCommit_withPinnedTarget_shouldOnlyQueueOthers() {
    let translator = MockTranslator::working();
    let (service, _) = common::memory_service(common::scenario_a_registry(), &translator);
    let mut post = service.record("post", "1").unwrap();
    service.commit(post.edit("en").set("title", "Hello")).await.unwrap();

    // Pin French in storage, then queue a new cascade
    post.set_accessor("title_fr_automatic", false).await.unwrap();
    post.save().await.unwrap();
    service.start_background(1, 4);
    let report = service
        .commit(post.edit("en").set("title", "Hello again"))
        .await
        .unwrap();
    assert_eq!(report.pinned.len(), 1);

    let stats = service.shutdown().await.unwrap();
    assert_eq!(stats.completed, 1);

    post.reload();
    assert_eq!(post.read("title", &Locale::new("fr")).await.unwrap().as_deref(), Some("[fr] Hello"));
    assert_eq!(
        post.read("title", &Locale::new("de")).await.unwrap().as_deref(),
        Some("[de] Hello again")
    );
}

#[tokio::test]
async fn test_scenarioA_inBackground_pinAfterCascadeLanded_shouldKeepPinAndEdit() {
    let translator = MockTranslator::working();
    let (service, store) = common::memory_service(common::scenario_a_registry(), &translator);
    let queue = service.start_background(2, 16);
    let mut post = service.record("post", "1").unwrap();

    service.commit(post.edit("en").set("title", "Hello")).await.unwrap();
    queue.wait_idle().await;
    assert_eq!(post.read("title", &Locale::new("fr")).await.unwrap().as_deref(), Some("[fr] Hello"));

    // Same handle, no reload: pin French, then edit English again
    post.set_accessor("title_fr_automatic", false).await.unwrap();
    let report = service
        .commit(post.edit("en").set("title", "Hello again"))
        .await
        .unwrap();
    assert_eq!(report.pinned.len(), 1);
    assert_eq!(report.pinned[0].to_locale, Locale::new("fr"));
    assert_eq!(report.count(&DispatchStatus::Queued), 1);

    let stats = queue.wait_idle().await;
    assert_eq!(stats.failed, 0);
    assert!(!post.accessor("title_fr_automatic").await.unwrap());
    assert_eq!(post.read("title", &Locale::new("fr")).await.unwrap().as_deref(), Some("[fr] Hello"));
    assert_eq!(
        post.read("title", &Locale::new("de")).await.unwrap().as_deref(),
        Some("[de] Hello again")
    );
    assert_eq!(post.save().await.unwrap(), 0);

    let fresh = service.record("post", "1").unwrap();
    assert!(!fresh.accessor("title_fr_automatic").await.unwrap());
    assert_eq!(fresh.read("title", &Locale::new("en")).await.unwrap().as_deref(), Some("Hello again"));
    assert_eq!(store.len(), 3);
    service.shutdown().await;
}

#[tokio::test]
async fn test_scenarioB_inBackground_repinAfterCascadeLanded_shouldStopCascading() {
    let translator = MockTranslator::working();
    let (service, _) = common::memory_service(common::scenario_b_registry(), &translator);
    let queue = service.start_background(1, 8);
    let mut post = service.record("post", "1").unwrap();

    // French starts pinned because it is also a source
    let report = service.commit(post.edit("en").set("title", "Hello")).await.unwrap();
    assert_eq!(report.pinned.len(), 1);

    post.set_accessor("title_fr_automatic", true).await.unwrap();
    let report = service
        .commit(post.edit("en").set("title", "Hello again"))
        .await
        .unwrap();
    assert_eq!(report.count(&DispatchStatus::Queued), 1);
    queue.wait_idle().await;
    assert_eq!(
        post.read("title", &Locale::new("fr")).await.unwrap().as_deref(),
        Some("[fr] Hello again")
    );

    post.set_accessor("title_fr_automatic", false).await.unwrap();
    let report = service.commit(post.edit("en").set("title", "Bye")).await.unwrap();
    assert_eq!(report.pinned.len(), 1);
    assert!(report.outcomes.is_empty());

    let stats = service.shutdown().await.unwrap();
    assert_eq!(stats.enqueued, 1);
    assert_eq!(stats.failed, 0);
    assert!(!post.accessor("title_fr_automatic").await.unwrap());
    assert_eq!(
        post.read("title", &Locale::new("fr")).await.unwrap().as_deref(),
        Some("[fr] Hello again")
    );
}

#[tokio::test]
async fn test_shutdown_withoutBackgroundQueue_shouldReturnNone() {
    let translator = MockTranslator::working();
    let (service, _) = common::memory_service(common::scenario_a_registry(), &translator);

    assert!(service.shutdown().await.is_none());
}
