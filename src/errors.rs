use thiserror::Error;

#[derive(Error, Debug)]
pub enum JokeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Joke not found: id {0}")]
    NotFound(i64),

    #[error("Joke already exists: id {0}")]
    DuplicateId(i64),

    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("Config loading error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl JokeError {
    /// Whether the caller may retry the operation after a backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::DependencyUnavailable(_) | Self::Http(_) => true,
            Self::Database(e) => is_transient_sqlx(e),
            _ => false,
        }
    }

    /// Whether the error is a client-side validation or lookup failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::NotFound(_) | Self::DuplicateId(_)
        )
    }
}

fn is_transient_sqlx(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
    )
}

pub type Result<T> = std::result::Result<T, JokeError>;
