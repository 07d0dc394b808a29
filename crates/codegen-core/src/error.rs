use thiserror::Error;

/// Reasons a [`GenerationRequest`](crate::GenerationRequest) is rejected
/// before any worker starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("prefix length should be between {min} and {max} characters, got {actual}")]
    PrefixLength { min: usize, max: usize, actual: usize },
    #[error("prefix must contain only ASCII alphanumeric characters: '{0}'")]
    PrefixCharacters(String),
    #[error("code length should be between {min} and {max} digits, got {actual}")]
    CodeLength { min: usize, max: usize, actual: usize },
    #[error("number of codes should be between 1 and {max}, got {actual}")]
    Count { max: u64, actual: u64 },
    #[error("maximum {possible} codes can be created with a length of {digit_length}")]
    KeyspaceExceeded { possible: u64, digit_length: usize },
}

/// Errors raised while parsing a [`Code`](crate::Code) from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    #[error("code '{0}' does not start with the expected prefix")]
    Prefix(String),
    #[error("code '{code}' should have {expected} digits")]
    DigitCount { code: String, expected: usize },
    #[error("code '{0}' contains characters outside the digit alphabet")]
    Alphabet(String),
}
