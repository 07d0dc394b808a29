use crate::Generator;
use codegen_core::{Code, GenerationRequest, ALPHABET, SEPARATOR};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Generates `<prefix>-<digits>` candidates with uniformly sampled digits.
///
/// The randomness is not cryptographic; codes are not secrets. Every
/// instance seeds its own [`SmallRng`] from the thread RNG, so two
/// workers never replay the same sequence.
#[derive(Debug)]
pub struct RandomCodeGenerator<R = SmallRng> {
    prefix_len: usize,
    digit_length: usize,
    scratch: String,
    rng: R,
}

impl RandomCodeGenerator<SmallRng> {
    pub fn new(prefix: &str, digit_length: usize) -> Self {
        Self::with_rng(prefix, digit_length, SmallRng::from_rng(&mut rand::rng()))
    }

    pub fn for_request(request: &GenerationRequest) -> Self {
        Self::new(&request.prefix, request.digit_length)
    }
}

impl<R: Rng> RandomCodeGenerator<R> {
    /// Creates a generator drawing from `rng`, mainly for seeded tests.
    pub fn with_rng(prefix: &str, digit_length: usize, rng: R) -> Self {
        let mut scratch = String::with_capacity(prefix.len() + 1 + digit_length);
        scratch.push_str(prefix);
        scratch.push(SEPARATOR);
        Self {
            prefix_len: prefix.len(),
            digit_length,
            scratch,
            rng,
        }
    }

    /// Builds the next candidate in the scratch buffer.
    fn fill(&mut self) -> &str {
        // prefix and separator stay in place between calls
        self.scratch.truncate(self.prefix_len + 1);
        for _ in 0..self.digit_length {
            let idx = self.rng.random_range(0..ALPHABET.len());
            self.scratch.push(char::from(ALPHABET[idx]));
        }
        &self.scratch
    }

    /// Builds the next candidate and copies it out as an owned [`Code`].
    pub fn next_code(&mut self) -> Code {
        Code::new_unchecked(self.fill())
    }
}

impl<R: Rng + Send + 'static> Generator for RandomCodeGenerator<R> {
    fn generate(&mut self) -> &str {
        self.fill()
    }
}
