use crate::error::CodeError;
use crate::{ALPHABET, SEPARATOR};
use std::borrow::Borrow;
use std::fmt::Display;
use std::sync::Arc;

/// A generated code of the form `<prefix>-<digits>`.
///
/// Codes are immutable once built. The text is reference counted so the
/// same code can sit in a duplicate filter and travel to the consumer
/// without being copied twice.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Code(Arc<str>);

impl Code {
    /// Creates a `Code` without validation.
    ///
    /// Use this only for text produced by trusted generators that already
    /// follow the `<prefix>-<digits>` layout.
    pub fn new_unchecked(code: impl Into<Arc<str>>) -> Self {
        Self(code.into())
    }

    /// Parses `code`, checking it carries `prefix`, the separator and
    /// exactly `digit_length` characters from [`ALPHABET`].
    pub fn parse(code: &str, prefix: &str, digit_length: usize) -> Result<Self, CodeError> {
        let digits = code
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix(SEPARATOR))
            .ok_or_else(|| CodeError::Prefix(code.to_owned()))?;

        if digits.len() != digit_length {
            return Err(CodeError::DigitCount {
                code: code.to_owned(),
                expected: digit_length,
            });
        }

        if !digits.bytes().all(|b| ALPHABET.contains(&b)) {
            return Err(CodeError::Alphabet(code.to_owned()));
        }

        Ok(Self::new_unchecked(code))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the digit portion following the separator.
    pub fn digits(&self) -> &str {
        let text = self.as_str();
        text.rsplit_once(SEPARATOR)
            .map_or(text, |(_, digits)| digits)
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Code {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

// Hash and Eq both delegate to the text, so sets of codes can be queried
// with a plain `&str`.
impl Borrow<str> for Code {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_well_formed_codes() {
        let code = Code::parse("FT-0421", "FT", 4).unwrap();
        assert_eq!(code.as_str(), "FT-0421");
        assert_eq!(code.digits(), "0421");
    }

    #[test]
    fn parse_accepts_empty_prefix() {
        let code = Code::parse("-123456", "", 6).unwrap();
        assert_eq!(code.digits(), "123456");
    }

    #[test]
    fn parse_rejects_wrong_prefix() {
        assert_eq!(
            Code::parse("AB-1234", "FT", 4),
            Err(CodeError::Prefix("AB-1234".into()))
        );
        assert!(Code::parse("FT1234", "FT", 4).is_err());
    }

    #[test]
    fn parse_rejects_wrong_digit_count() {
        assert!(matches!(
            Code::parse("FT-123", "FT", 4),
            Err(CodeError::DigitCount { expected: 4, .. })
        ));
        assert!(Code::parse("FT-12345", "FT", 4).is_err());
    }

    #[test]
    fn parse_rejects_foreign_characters() {
        assert_eq!(
            Code::parse("FT-12a4", "FT", 4),
            Err(CodeError::Alphabet("FT-12a4".into()))
        );
    }

    #[test]
    fn display_matches_text() {
        let code = Code::new_unchecked("WH-99887766");
        assert_eq!(code.to_string(), "WH-99887766");
    }

    #[test]
    fn clones_share_equality_and_hash() {
        use std::collections::HashSet;

        let code = Code::new_unchecked("FT-0001");
        let mut set = HashSet::new();
        set.insert(code.clone());
        assert!(set.contains(&Code::new_unchecked("FT-0001")));
    }

    #[test]
    fn sets_of_codes_answer_str_lookups() {
        use std::collections::HashSet;

        let set: HashSet<Code> = [Code::new_unchecked("FT-0001")].into();
        assert!(set.contains("FT-0001"));
        assert!(!set.contains("FT-0002"));
    }
}
