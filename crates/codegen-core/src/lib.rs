//! Core types for the unique code generator.
//!
//! This crate holds the pieces shared by the generator, the duplicate
//! filters and the generation pipeline: the [`Code`] value, the validated
//! [`GenerationRequest`] and the text layout of the output artifact.

pub mod code;
pub mod error;
pub mod format;
pub mod request;

pub use code::Code;
pub use error::{CodeError, RequestError};
pub use format::{format_remaining, format_thousands, write_code_line, Header};
pub use request::{possible_outcomes, GenerationRequest};

/// Characters a code's digit portion is drawn from.
pub const ALPHABET: &[u8] = b"0123456789";

/// Character placed between the prefix and the digits.
pub const SEPARATOR: char = '-';

pub const MIN_PREFIX_LENGTH: usize = 2;
pub const MAX_PREFIX_LENGTH: usize = 6;
pub const MIN_CODE_LENGTH: usize = 4;
pub const MAX_CODE_LENGTH: usize = 16;
pub const MAX_NUM_CODES: u64 = 100_000_000;
