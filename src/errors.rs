/*!
 * Error types for the locale-cascade library.
 *
 * Each layer has its own error enum, defined with the thiserror crate:
 * configuration (set-up time), providers (translator backends), translation
 * (dispatch of a single cascade unit), and storage. `AppError` wraps them all
 * for the command line front end.
 */

use thiserror::Error;

/// Errors raised while declaring or resolving automatic-translation policies
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// `auto_translate` was called without any field
    #[error("Automatic translation needs at least one field")]
    EmptyFieldSet,

    /// The `from` locale set was empty
    #[error("Automatic translation for [{fields}] needs at least one source locale")]
    EmptySourceLocales {
        /// Comma separated field names of the rejected call
        fields: String,
    },

    /// The `to` locale set was empty
    #[error("Automatic translation for [{fields}] needs at least one target locale")]
    EmptyTargetLocales {
        /// Comma separated field names of the rejected call
        fields: String,
    },

    /// A locale code that is not a valid ISO 639 language tag
    #[error("Invalid locale: {0}")]
    InvalidLocale(String),

    /// `auto_translate` referenced a field the model does not translate
    #[error("Field '{field}' is not declared as translatable on model '{model}'")]
    UndeclaredField {
        /// Model name
        model: String,
        /// Offending field
        field: String,
    },

    /// No policy is registered for the model
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// The field has no automatic-translation configuration
    #[error("Field '{0}' is not configured for automatic translation")]
    UnknownField(String),

    /// A `<field>_<locale>_automatic` name that matches no configured pair
    #[error("Unknown automatic accessor: {0}")]
    UnknownAccessor(String),

    /// Two configured (field, locale) pairs share one accessor name
    #[error("Accessor '{0}' would name more than one field/locale pair")]
    AmbiguousAccessor(String),

    /// Any other invalid setting
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that can occur when talking to a translator backend
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
}

/// Errors that can occur while performing one translation unit
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// Error from the translator backend
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The adapter broke the one-result-per-input contract
    #[error("Translator returned {actual} result(s) for {expected} input(s)")]
    CountMismatch {
        /// Number of texts sent
        expected: usize,
        /// Number of texts received
        actual: usize,
    },

    /// The background queue refused or lost the job
    #[error("Queue error: {0}")]
    Queue(String),

    /// Loading or persisting the target failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Policy lookup failed while performing a queued job
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// Errors raised by a localized record store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(String),

    /// Field or flag maps could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Optimistic lock failure: the row changed since it was loaded
    #[error("Stale translation row for {model}#{host_id} ({locale})")]
    Conflict {
        /// Model name
        model: String,
        /// Host record id
        host_id: String,
        /// Locale of the row
        locale: String,
    },

    /// A blocking storage task failed to complete
    #[error("Storage task failed: {0}")]
    Task(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Database(error.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from configuration
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from the store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
