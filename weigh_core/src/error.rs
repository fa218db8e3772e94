use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum CoreError {
    #[error("link error: {0}")]
    Link(String),
    #[error("link read timed out")]
    Timeout,
    #[error("storage error: {0}")]
    Storage(String),
    #[error("configuration '{name}' not found for operator '{operator}'")]
    ConfigNotFound { operator: String, name: String },
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing transport")]
    MissingTransport,
    #[error("missing weighing store")]
    MissingStore,
    #[error("missing operator")]
    MissingOperator,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
