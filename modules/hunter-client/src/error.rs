use thiserror::Error;

pub type Result<T> = std::result::Result<T, HunterError>;

#[derive(Debug, Error)]
pub enum HunterError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for HunterError {
    fn from(err: reqwest::Error) -> Self {
        HunterError::Network(err.to_string())
    }
}
