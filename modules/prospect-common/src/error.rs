use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProspectError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limit exceeded for {action}: max {limit} per hour")]
    RateLimitExceeded { action: String, limit: u32 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl ProspectError {
    /// Errors the caller caused; the batch never started.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ProspectError::InvalidRequest(_) | ProspectError::Unauthorized(_)
        )
    }
}
