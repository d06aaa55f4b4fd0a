//! In-memory lens store
//!
//! Same contract as the SQLite store, kept in a vector in insertion order.
//! Used for engine tests and throwaway instances.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use optistock_common::lens::LensFilter;
use optistock_common::{LensEdit, LensRecord, NewLens, Result, SpecKey};
use std::collections::BTreeSet;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CasOutcome, LensStore, QuantityPredicate};

#[derive(Debug, Default)]
pub struct MemoryLensStore {
    records: RwLock<Vec<LensRecord>>,
}

impl MemoryLensStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[async_trait]
impl LensStore for MemoryLensStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<LensRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn find_one(&self, key: &SpecKey) -> Result<Option<LensRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| &r.key == key).cloned())
    }

    async fn find_many(&self, filter: &LensFilter) -> Result<Vec<LensRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|r| filter.matches(&r.key))
            .cloned()
            .collect())
    }

    async fn find_by_quantity(&self, predicate: QuantityPredicate) -> Result<Vec<LensRecord>> {
        let records = self.records.read().await;
        let mut found: Vec<LensRecord> = records
            .iter()
            .rev()
            .filter(|r| predicate.matches(r.quantity))
            .cloned()
            .collect();
        // Stable sort keeps newest-first among equal quantities
        found.sort_by_key(|r| r.quantity);
        Ok(found)
    }

    async fn insert(&self, lens: &NewLens) -> Result<LensRecord> {
        let now = now();
        let record = LensRecord {
            id: Uuid::new_v4(),
            key: lens.key.clone(),
            quantity: lens.quantity,
            created_at: now,
            updated_at: now,
        };
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn apply_edit(&self, id: Uuid, edit: &LensEdit) -> Result<Option<LensRecord>> {
        let mut records = self.records.write().await;
        let Some(slot) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        edit.apply_to(slot);
        slot.updated_at = now();
        Ok(Some(slot.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }

    async fn compare_and_set_quantity(
        &self,
        id: Uuid,
        expected: u32,
        new: u32,
    ) -> Result<CasOutcome> {
        let mut records = self.records.write().await;
        let Some(slot) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(CasOutcome::Missing);
        };
        if slot.quantity != expected {
            return Ok(CasOutcome::Stale {
                current: slot.quantity,
            });
        }
        slot.quantity = new;
        slot.updated_at = now();
        Ok(CasOutcome::Swapped(slot.clone()))
    }

    async fn count_where(&self, predicate: QuantityPredicate) -> Result<u64> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| predicate.matches(r.quantity)).count() as u64)
    }

    async fn distinct_box_numbers(&self) -> Result<BTreeSet<String>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .map(|r| r.key.box_number.as_str().to_string())
            .collect())
    }
}
