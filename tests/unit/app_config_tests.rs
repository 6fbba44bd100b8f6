/*!
 * Tests for application configuration functionality
 */

use locale_cascade::app_config::{
    AutoTranslateConfig, Config, DispatchModeSetting, LogLevel, ModelConfig, TranslationProvider,
};
use locale_cascade::Locale;

use crate::common;

/// Test default configuration values
#[test]
fn test_defaultConfig_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
    assert_eq!(config.translation.timeout_secs, 30);
    assert_eq!(config.translation.retry_count, 3);
    assert_eq!(config.dispatch.mode, DispatchModeSetting::Inline);
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.models[0].name, "post");
}

#[test]
fn test_configFile_withPartialJson_shouldFillDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{
            "dispatch": { "mode": "background" },
            "translation": { "provider": "mock" },
            "models": [
                {
                    "name": "article",
                    "translated_fields": ["headline"],
                    "auto_translate": [
                        { "fields": ["headline"], "from": ["en", "fr"], "to": ["en", "fr", "it"] }
                    ]
                }
            ],
            "log_level": "debug"
        }"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    config.validate().unwrap();

    assert_eq!(config.dispatch.mode, DispatchModeSetting::Background);
    assert_eq!(config.dispatch.queue_capacity, 256);
    assert_eq!(config.translation.provider, TranslationProvider::Mock);
    assert_eq!(config.log_level, LogLevel::Debug);

    let registry = config.build_registry().unwrap();
    let article = registry.get("article").unwrap();
    assert!(article.locales().is_target("headline", &Locale::new("it")));
    assert!(article.locales().is_source("headline", &Locale::new("fr")));
}

#[test]
fn test_configFile_withUnknownProvider_shouldFailToParse() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, r#"{ "translation": { "provider": "openai" } }"#).unwrap();

    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_validate_withUndeclaredRuleField_shouldFail() {
    let mut config = Config::default();
    config.models.push(ModelConfig {
        name: "page".to_string(),
        translated_fields: vec!["title".to_string()],
        auto_translate: vec![AutoTranslateConfig {
            fields: vec!["summary".to_string()],
            from: vec!["en".to_string()],
            to: vec!["fr".to_string()],
        }],
    });

    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withZeroConcurrency_shouldFail() {
    let mut config = Config::default();
    config.dispatch.concurrent_jobs = 0;

    assert!(config.validate().is_err());
}

#[tokio::test]
async fn test_buildTranslator_shouldFollowProvider() {
    let mut config = Config::default();
    assert_eq!(config.build_translator().unwrap().name(), "ollama");

    config.translation.provider = TranslationProvider::Mock;
    let translator = config.build_translator().unwrap();
    let texts = translator
        .translate(&["Hello".to_string()], &Locale::new("en"), &Locale::new("fr"))
        .await
        .unwrap();
    assert_eq!(texts, vec!["[fr] Hello"]);
}
