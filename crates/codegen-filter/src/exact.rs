use crate::DuplicateFilter;
use codegen_core::Code;
use dashmap::DashSet;

/// Exact duplicate filter backed by a [`DashSet`].
///
/// DashSet shards its locks, so workers inserting different codes rarely
/// contend. `insert` holds the shard lock across the check and the write,
/// which makes it a linearizable test-and-insert.
#[derive(Debug, Default)]
pub struct ExactFilter {
    seen: DashSet<Code>,
}

impl ExactFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-sizes the set so it does not rehash while workers are racing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: DashSet::with_capacity(capacity),
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.seen.contains(code)
    }
}

impl DuplicateFilter for ExactFilter {
    fn test_and_insert(&self, candidate: &str) -> bool {
        // most rejected candidates stop here without allocating
        if self.seen.contains(candidate) {
            return false;
        }
        self.seen.insert(Code::new_unchecked(candidate))
    }

    fn len(&self) -> usize {
        self.seen.len()
    }

    fn is_probabilistic(&self) -> bool {
        false
    }
}
