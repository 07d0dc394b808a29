//! First-occurrence detection shared by every generation worker.
//!
//! A [`DuplicateFilter`] answers "has this code been emitted before?" and
//! records it in the same step. Two strategies are provided:
//!
//! - [`ExactFilter`]: a concurrent set. No false positives, memory grows
//!   with every code emitted.
//! - [`BloomFilter`]: a sharded Bloom filter. Bounded memory, but a code
//!   never seen before is occasionally reported as a duplicate. That only
//!   costs the worker a retry.
//!
//! Which one runs is a configuration choice ([`FilterKind`]); callers only
//! ever see `Arc<dyn DuplicateFilter>`.

pub mod bloom;
pub mod error;
pub mod exact;

pub use bloom::{BloomFilter, BloomFilterConfig};
pub use error::{FilterError, Result};
pub use exact::ExactFilter;

use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Concurrency-safe membership test with insertion.
pub trait DuplicateFilter: Send + Sync + 'static {
    /// Inserts `candidate` and returns `true` only if this call was its
    /// first insertion.
    ///
    /// Concurrent callers racing on the same text see exactly one `true`.
    /// Takes the borrowed text so rejected candidates never allocate.
    fn test_and_insert(&self, candidate: &str) -> bool;

    /// Number of codes accepted so far.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a fresh code may be rejected as a duplicate.
    fn is_probabilistic(&self) -> bool;
}

/// Selects the duplicate filter strategy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FilterKind {
    #[default]
    Exact,
    Bloom { false_positive_rate: f64 },
}

impl Display for FilterKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterKind::Exact => write!(f, "exact"),
            FilterKind::Bloom {
                false_positive_rate,
            } => write!(f, "bloom(fp={false_positive_rate})"),
        }
    }
}

/// Builds the filter selected by `kind`, sized for `expected_items` codes.
pub fn build_filter(kind: FilterKind, expected_items: u64) -> Result<Arc<dyn DuplicateFilter>> {
    let expected_items = usize::try_from(expected_items).unwrap_or(usize::MAX);
    match kind {
        FilterKind::Exact => Ok(Arc::new(ExactFilter::with_capacity(expected_items))),
        FilterKind::Bloom {
            false_positive_rate,
        } => {
            let config = BloomFilterConfig::builder()
                .expected_items(expected_items)
                .false_positive_rate(false_positive_rate)
                .build();
            Ok(Arc::new(BloomFilter::new(config)?))
        }
    }
}
