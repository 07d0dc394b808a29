pub mod random;

pub use random::RandomCodeGenerator;

use codegen_core::Code;

/// Trait for producing candidate codes.
///
/// Implementations are pure producers that know nothing about
/// uniqueness: the duplicate filter decides whether a candidate is kept.
///
/// Each worker owns its generator, so `generate` takes `&mut self` and
/// can reuse scratch space and a private RNG without synchronization.
/// The candidate is lent out rather than allocated; only candidates that
/// survive the filter become a [`Code`].
pub trait Generator: Send + 'static {
    /// Produces the next candidate, valid until the following call.
    fn generate(&mut self) -> &str;
}

/// Generator backed by a closure, see [`from_fn`].
pub struct FromFn<F> {
    f: F,
    current: Code,
}

/// Wraps a closure returning owned codes as a [`Generator`].
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: FnMut() -> Code + Send + 'static,
{
    FromFn {
        f,
        current: Code::new_unchecked(""),
    }
}

impl<F> Generator for FromFn<F>
where
    F: FnMut() -> Code + Send + 'static,
{
    fn generate(&mut self) -> &str {
        self.current = (self.f)();
        self.current.as_str()
    }
}
