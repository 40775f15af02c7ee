use thiserror::Error;

/// Everything that can go wrong while answering a request or running the bot.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("reddit: {0}")]
    RedditApi(#[from] RedditApiError),

    #[error("ledger: {0}")]
    Database(#[from] DatabaseError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport: {0}")]
    Network(#[from] reqwest::Error),

    /// An endpoint answered 404. Callers that know what they asked for narrow this down.
    #[error("{resource} does not exist")]
    NotFound { resource: String },
}

#[derive(Error, Debug, Clone)]
pub enum RedditApiError {
    #[error("token exchange rejected ({reason})")]
    AuthenticationFailed { reason: String },

    #[error("rate limited for {retry_after}s")]
    RateLimitExceeded { retry_after: u64 },

    #[error("access to {resource} refused")]
    Forbidden { resource: String },

    #[error("no such user {username}")]
    UserNotFound { username: String },

    #[error("{fullname} is gone")]
    ThingNotFound { fullname: String },

    #[error("access token expired or revoked")]
    InvalidToken,

    #[error("timed out")]
    RequestTimeout,

    #[error("unexpected response: {details}")]
    InvalidResponse { details: String },

    #[error("server answered {status_code}")]
    ServerError { status_code: u16 },
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("cannot open ledger: {reason}")]
    ConnectionFailed { reason: String },

    #[error("schema setup failed: {migration}")]
    MigrationFailed { migration: String },

    #[error("{constraint} already recorded")]
    ConstraintViolation { constraint: String },

    #[error("ledger is locked")]
    DatabaseLocked,

    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{path} does not exist")]
    FileNotFound { path: String },

    #[error("{field} is required")]
    MissingField { field: String },

    #[error("{field} = {value:?} is not allowed")]
    InvalidValue { field: String, value: String },

    #[error("{reason}")]
    ValidationFailed { reason: String },

    #[error(transparent)]
    Parse(#[from] toml::de::Error),
}
