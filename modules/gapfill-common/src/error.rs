use thiserror::Error;

#[derive(Error, Debug)]
pub enum GapFillError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid Cypher identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
