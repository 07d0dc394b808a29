use thiserror::Error;

pub type Result<T> = std::result::Result<T, FilterError>;

#[derive(Debug, Clone, Error)]
pub enum FilterError {
    #[error("false positive rate must be within (0, 1), got {0}")]
    InvalidFalsePositiveRate(f64),
    #[error("filter initialization failed: {0}")]
    Initialization(String),
}
