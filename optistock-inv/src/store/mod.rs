//! Storage collaborator
//!
//! The store exclusively owns persisted lens records. Engine code borrows a
//! record for one operation and writes it back through one of the atomic
//! methods below; nothing holds a record across operations.

use async_trait::async_trait;
use optistock_common::lens::LensFilter;
use optistock_common::{LensEdit, LensRecord, NewLens, Result, SpecKey};
use std::collections::BTreeSet;
use uuid::Uuid;

mod memory;
mod sqlite;

pub use memory::MemoryLensStore;
pub use sqlite::SqliteLensStore;

/// Threshold comparison on `quantity`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityPredicate {
    /// Every record
    Any,
    /// `quantity == n`
    Equals(u32),
    /// `quantity < n`
    Below(u32),
    /// `above < quantity < below`
    Between { above: u32, below: u32 },
}

impl QuantityPredicate {
    pub fn matches(self, quantity: u32) -> bool {
        match self {
            Self::Any => true,
            Self::Equals(n) => quantity == n,
            Self::Below(n) => quantity < n,
            Self::Between { above, below } => quantity > above && quantity < below,
        }
    }
}

/// Result of a conditional quantity write
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome {
    /// The stored quantity matched and was replaced
    Swapped(LensRecord),
    /// Another writer got there first; `current` is what is stored now
    Stale { current: u32 },
    /// No record with that id
    Missing,
}

/// Persistence operations the inventory engine relies on.
///
/// Filters are exact matches. Each method is atomic on its own; callers
/// compose them into read-modify-write sequences.
#[async_trait]
pub trait LensStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<LensRecord>>;

    /// Oldest record whose key equals `key` on all five fields
    async fn find_one(&self, key: &SpecKey) -> Result<Option<LensRecord>>;

    /// Records matching a partial key, newest first
    async fn find_many(&self, filter: &LensFilter) -> Result<Vec<LensRecord>>;

    /// Records whose quantity satisfies `predicate`, lowest quantity first
    async fn find_by_quantity(&self, predicate: QuantityPredicate) -> Result<Vec<LensRecord>>;

    /// Persist a new record; the store assigns id and timestamps
    async fn insert(&self, lens: &NewLens) -> Result<LensRecord>;

    /// Apply an explicit edit in a single write.
    ///
    /// Optical fields are overwritten; box number and quantity are written
    /// only when the edit carries them, so a concurrent quantity change is
    /// never clobbered by an edit that did not touch quantity. Returns `None`
    /// when the record no longer exists.
    async fn apply_edit(&self, id: Uuid, edit: &LensEdit) -> Result<Option<LensRecord>>;

    /// Returns `false` when there was nothing to delete
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Set `quantity` to `new` only if it is still `expected`
    async fn compare_and_set_quantity(
        &self,
        id: Uuid,
        expected: u32,
        new: u32,
    ) -> Result<CasOutcome>;

    async fn count_where(&self, predicate: QuantityPredicate) -> Result<u64>;

    async fn distinct_box_numbers(&self) -> Result<BTreeSet<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_predicates() {
        assert!(QuantityPredicate::Any.matches(0));
        assert!(QuantityPredicate::Equals(0).matches(0));
        assert!(!QuantityPredicate::Equals(0).matches(1));
        assert!(QuantityPredicate::Below(4).matches(3));
        assert!(QuantityPredicate::Below(4).matches(0));
        assert!(!QuantityPredicate::Below(4).matches(4));

        let low = QuantityPredicate::Between { above: 0, below: 4 };
        assert!(!low.matches(0));
        assert!(low.matches(1));
        assert!(low.matches(3));
        assert!(!low.matches(4));
    }
}
