/*!
 * Tests for locale code utilities
 */

use locale_cascade::language_utils::{
    LanguageCodeType, get_language_name, normalize_to_part2t, primary_language,
    validate_language_code, validate_locale,
};
use locale_cascade::{ConfigurationError, Locale};

#[test]
fn test_validateLanguageCode_withKnownCodes_shouldReturnType() {
    assert_eq!(validate_language_code("en").unwrap(), LanguageCodeType::Part1);
    assert_eq!(validate_language_code("deu").unwrap(), LanguageCodeType::Part2T);
    assert_eq!(validate_language_code("ger").unwrap(), LanguageCodeType::Part2B);
    assert!(validate_language_code("zz").is_err());
}

#[test]
fn test_normalizeToPart2t_shouldMapAllForms() {
    assert_eq!(normalize_to_part2t("fr").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(normalize_to_part2t(" FRA ").unwrap(), "fra");
}

#[test]
fn test_validateLocale_shouldCheckPrimaryLanguageAndSubtags() {
    assert!(validate_locale("pt-BR").is_ok());
    assert!(validate_locale("zh_Hans").is_ok());
    assert!(validate_locale("en-").is_err());
    assert!(validate_locale("").is_err());
    assert_eq!(primary_language("sr-Latn-RS"), "sr");
}

#[test]
fn test_getLanguageName_shouldReturnEnglishName() {
    assert_eq!(get_language_name("de").unwrap(), "German");
    assert_eq!(get_language_name("pt-BR").unwrap(), "Portuguese");
}

#[test]
fn test_localeParse_shouldTrimAndReject() {
    assert_eq!(Locale::parse(" fr ").unwrap(), Locale::new("fr"));
    assert_eq!(
        Locale::parse("klingon").unwrap_err(),
        ConfigurationError::InvalidLocale("klingon".to_string())
    );
}
