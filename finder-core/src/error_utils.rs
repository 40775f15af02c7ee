use crate::error::*;
use std::time::Duration;
use tracing::{debug, error, Level};

/// Classification shared by every error in the crate family.
pub trait ErrorExt {
    /// Whether the same request can succeed on a later sweep.
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn error_code(&self) -> &'static str;
}

impl ErrorExt for CoreError {
    fn is_retryable(&self) -> bool {
        match self {
            CoreError::RedditApi(e) => e.is_retryable(),
            CoreError::Database(e) => e.is_retryable(),
            CoreError::Network(_) => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::RedditApi(e) => e.retry_after(),
            CoreError::Database(e) => e.retry_after(),
            CoreError::Network(_) => Some(Duration::from_secs(5)),
            _ => None,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            CoreError::RedditApi(_) => "REDDIT_API",
            CoreError::Database(_) => "DATABASE",
            CoreError::Config(_) => "CONFIG",
            CoreError::Io(_) => "IO",
            CoreError::Network(_) => "NETWORK",
            CoreError::NotFound { .. } => "NOT_FOUND",
        }
    }
}

impl ErrorExt for RedditApiError {
    fn is_retryable(&self) -> bool {
        match self {
            RedditApiError::RateLimitExceeded { .. }
            | RedditApiError::RequestTimeout
            | RedditApiError::InvalidToken => true,
            RedditApiError::ServerError { status_code } => *status_code >= 500,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            RedditApiError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => self.is_retryable().then(|| Duration::from_secs(30)),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            RedditApiError::AuthenticationFailed { .. } => "REDDIT_AUTH_FAILED",
            RedditApiError::RateLimitExceeded { .. } => "REDDIT_RATE_LIMIT",
            RedditApiError::Forbidden { .. } => "REDDIT_FORBIDDEN",
            RedditApiError::UserNotFound { .. } => "REDDIT_USER_NOT_FOUND",
            RedditApiError::ThingNotFound { .. } => "REDDIT_THING_NOT_FOUND",
            RedditApiError::InvalidToken => "REDDIT_INVALID_TOKEN",
            RedditApiError::RequestTimeout => "REDDIT_TIMEOUT",
            RedditApiError::InvalidResponse { .. } => "REDDIT_INVALID_RESPONSE",
            RedditApiError::ServerError { .. } => "REDDIT_SERVER_ERROR",
        }
    }
}

impl ErrorExt for DatabaseError {
    fn is_retryable(&self) -> bool {
        // Only a lock clears on its own.
        matches!(self, DatabaseError::DatabaseLocked)
    }

    fn retry_after(&self) -> Option<Duration> {
        self.is_retryable().then(|| Duration::from_millis(100))
    }

    fn error_code(&self) -> &'static str {
        match self {
            DatabaseError::ConnectionFailed { .. } => "LEDGER_UNAVAILABLE",
            DatabaseError::MigrationFailed { .. } => "LEDGER_SCHEMA",
            DatabaseError::ConstraintViolation { .. } => "LEDGER_DUPLICATE",
            DatabaseError::DatabaseLocked => "LEDGER_LOCKED",
            DatabaseError::Sql(_) => "LEDGER_SQL",
        }
    }
}

impl ErrorExt for ConfigError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND",
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD",
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
            ConfigError::ValidationFailed { .. } => "CONFIG_INVALID",
            ConfigError::Parse(_) => "CONFIG_PARSE",
        }
    }
}

/// Routes failures seen at the poll-loop boundary to the right log level.
///
/// Transient platform trouble is expected between sweeps and only shows up at debug, and
/// can be silenced entirely. Anything else is logged once as an error with its code.
pub struct ErrorReporter {
    report_transient: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            report_transient: true,
        }
    }

    pub fn with_transient_reporting(mut self, enabled: bool) -> Self {
        self.report_transient = enabled;
        self
    }

    /// The level `error` is logged at, or `None` when it is not logged at all.
    pub fn level(&self, error: &CoreError) -> Option<Level> {
        if !error.is_retryable() {
            Some(Level::ERROR)
        } else if self.report_transient {
            Some(Level::DEBUG)
        } else {
            None
        }
    }

    pub fn report(&self, context: &str, error: &CoreError) {
        match self.level(error) {
            Some(level) if level == Level::ERROR => {
                error!("{}: {} [{}]", context, error, error.error_code());
            }
            Some(_) => debug!(
                "{}: transient failure ({}), retrying next sweep after {:?}",
                context,
                error,
                error.retry_after()
            ),
            None => {}
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
