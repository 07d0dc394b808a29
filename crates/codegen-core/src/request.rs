use crate::error::RequestError;
use crate::{MAX_CODE_LENGTH, MAX_NUM_CODES, MAX_PREFIX_LENGTH, MIN_CODE_LENGTH, MIN_PREFIX_LENGTH};
use typed_builder::TypedBuilder;

/// Number of distinct digit sequences of `digit_length` characters.
///
/// Saturates at `u64::MAX`, which is far above [`MAX_NUM_CODES`].
pub fn possible_outcomes(digit_length: usize) -> u64 {
    u32::try_from(digit_length)
        .ok()
        .and_then(|exp| 10_u64.checked_pow(exp))
        .unwrap_or(u64::MAX)
}

/// What the caller asked for: how many codes, and what they look like.
///
/// Read-only once the pipeline starts.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct GenerationRequest {
    /// Text placed before the separator. May be empty.
    #[builder(default, setter(into))]
    pub prefix: String,
    /// Number of digits after the separator.
    #[builder(default = 6)]
    pub digit_length: usize,
    /// Number of unique codes to produce.
    #[builder(default = 1)]
    pub target_count: u64,
    /// Whether output lines are numbered (`"<index>: <code>"`).
    #[builder(default = false)]
    pub line_numbers: bool,
}

impl GenerationRequest {
    /// Checks every bound the pipeline relies on.
    ///
    /// A request that passes is guaranteed to be satisfiable with an
    /// exact duplicate filter.
    pub fn validate(&self) -> Result<(), RequestError> {
        self.validate_prefix()?;

        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&self.digit_length) {
            return Err(RequestError::CodeLength {
                min: MIN_CODE_LENGTH,
                max: MAX_CODE_LENGTH,
                actual: self.digit_length,
            });
        }

        if self.target_count == 0 || self.target_count > MAX_NUM_CODES {
            return Err(RequestError::Count {
                max: MAX_NUM_CODES,
                actual: self.target_count,
            });
        }

        let possible = self.possible_outcomes();
        if self.target_count > possible {
            return Err(RequestError::KeyspaceExceeded {
                possible,
                digit_length: self.digit_length,
            });
        }

        Ok(())
    }

    fn validate_prefix(&self) -> Result<(), RequestError> {
        if self.prefix.is_empty() {
            return Ok(());
        }

        let len = self.prefix.chars().count();
        if !(MIN_PREFIX_LENGTH..=MAX_PREFIX_LENGTH).contains(&len) {
            return Err(RequestError::PrefixLength {
                min: MIN_PREFIX_LENGTH,
                max: MAX_PREFIX_LENGTH,
                actual: len,
            });
        }

        if !self.prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(RequestError::PrefixCharacters(self.prefix.clone()));
        }

        Ok(())
    }

    pub fn possible_outcomes(&self) -> u64 {
        possible_outcomes(self.digit_length)
    }

    /// True when every possible code has to be found. Generation still
    /// terminates but the last codes take many retries each.
    pub fn is_full_keyspace(&self) -> bool {
        self.target_count == self.possible_outcomes()
    }
}
