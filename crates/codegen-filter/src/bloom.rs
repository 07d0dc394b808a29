//! Sharded Bloom filter for very large generation runs.
//!
//! An exact set needs memory for every emitted code. For hundreds of
//! millions of codes a Bloom filter keeps memory bounded at the cost of a
//! configurable false positive rate.
//!
//! # Sharding
//!
//! A single lock around one filter would serialize every worker. The
//! filter is split into independent shards, each behind its own
//! [`parking_lot::Mutex`]; a code always hashes to the same shard, so the
//! shard lock makes `check_and_set` an atomic test-and-insert for it.
//!
//! # Guarantees
//!
//! - A code that was inserted is always reported as a duplicate afterwards
//!   (no false negatives).
//! - A code never inserted is reported as a duplicate with roughly the
//!   configured probability. The worker discards it and draws again.

use crate::error::{FilterError, Result};
use crate::DuplicateFilter;
use parking_lot::Mutex;
use std::hash::{BuildHasher, RandomState};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;
use typed_builder::TypedBuilder;

/// Configuration for the Bloom filter.
#[derive(Debug, TypedBuilder)]
pub struct BloomFilterConfig {
    /// Number of codes the run is expected to accept.
    ///
    /// Setting this too low raises the effective false positive rate.
    pub expected_items: usize,

    /// Desired false positive rate as a probability in `(0, 1)`.
    pub false_positive_rate: f64,

    /// Number of independently locked shards.
    #[builder(default = 64)]
    pub shards: usize,
}

pub struct BloomFilter {
    shards: Box<[Mutex<bloomfilter::Bloom<str>>]>,
    router: RandomState,
    accepted: AtomicUsize,
}

impl BloomFilter {
    /// Creates a filter sized for `config.expected_items`.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::InvalidFalsePositiveRate` for a rate outside
    /// `(0, 1)` and `FilterError::Initialization` if a shard cannot be
    /// allocated.
    pub fn new(config: BloomFilterConfig) -> Result<Self> {
        let rate = config.false_positive_rate;
        if !(rate > 0.0 && rate < 1.0) {
            return Err(FilterError::InvalidFalsePositiveRate(rate));
        }

        let shard_count = config.shards.max(1);
        let per_shard = config.expected_items.div_ceil(shard_count).max(1);

        let shards = (0..shard_count)
            .map(|_| {
                bloomfilter::Bloom::new_for_fp_rate(per_shard, rate)
                    .map(Mutex::new)
                    .map_err(|e| FilterError::Initialization(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?
            .into_boxed_slice();

        debug!(
            shards = shard_count,
            items_per_shard = per_shard,
            false_positive_rate = rate,
            "bloom filter allocated"
        );

        Ok(Self {
            shards,
            router: RandomState::new(),
            accepted: AtomicUsize::new(0),
        })
    }

    fn shard_for(&self, code: &str) -> &Mutex<bloomfilter::Bloom<str>> {
        let idx = (self.router.hash_one(code) % self.shards.len() as u64) as usize;
        &self.shards[idx]
    }

    /// Reports whether `code` might have been inserted, without inserting it.
    pub fn might_contain(&self, code: &str) -> bool {
        self.shard_for(code).lock().check(code)
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

impl DuplicateFilter for BloomFilter {
    fn test_and_insert(&self, candidate: &str) -> bool {
        let was_present = self.shard_for(candidate).lock().check_and_set(candidate);
        if !was_present {
            self.accepted.fetch_add(1, Ordering::Relaxed);
        }
        !was_present
    }

    fn len(&self) -> usize {
        self.accepted.load(Ordering::Relaxed)
    }

    fn is_probabilistic(&self) -> bool {
        true
    }
}
