//! Inventory engine
//!
//! `Inventory` is the boundary the HTTP layer calls into. Each operation is a
//! self-contained read-modify-write against the store:
//! - consolidation: create a record or merge into an identical one
//! - adjustment: bounded +/- quantity steps with a low-stock advisory
//! - import: consolidation over an ordered batch with per-row isolation
//! - stats: dashboard counters recomputed on every call

use optistock_common::db::RuntimeSettings;
use optistock_common::lens::RawLensFields;
use optistock_common::LensRecord;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{InventoryError, InventoryResult};
use crate::store::{CasOutcome, LensStore};

mod adjustment;
mod consolidation;
mod import;
mod stats;

pub use adjustment::{Adjustment, LowStockAdvisory, QuantityDelta};
pub use consolidation::Consolidation;
pub use import::{ImportReport, ImportRow, ImportRowError};
pub use stats::{BoxSummary, InventoryStats};

/// Lens inventory operations over a shared store
#[derive(Clone)]
pub struct Inventory {
    store: Arc<dyn LensStore>,
    settings: RuntimeSettings,
}

impl Inventory {
    pub fn new(store: Arc<dyn LensStore>, settings: RuntimeSettings) -> Self {
        Self { store, settings }
    }

    /// Parse a client-supplied identifier. Malformed ids are simply not found.
    pub fn parse_id(raw: &str) -> InventoryResult<Uuid> {
        Uuid::parse_str(raw.trim()).map_err(|_| InventoryError::NotFound(raw.to_string()))
    }

    pub async fn get_lens(&self, id: Uuid) -> InventoryResult<LensRecord> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| InventoryError::NotFound(id.to_string()))
    }

    /// Explicit edit of every field.
    ///
    /// This is a plain overwrite: it does not look for another record with the
    /// resulting key, so an edit can leave two records with identical keys.
    /// Quantity is only written when the edit supplies one.
    pub async fn update_lens(
        &self,
        id: Uuid,
        fields: &RawLensFields,
    ) -> InventoryResult<LensRecord> {
        let edit = fields.validate_edit()?;
        let saved = self
            .store
            .apply_edit(id, &edit)
            .await?
            .ok_or_else(|| InventoryError::NotFound(id.to_string()))?;
        info!("Updated lens {} ({}), quantity {}", saved.id, saved.key, saved.quantity);
        Ok(saved)
    }

    pub async fn delete_lens(&self, id: Uuid) -> InventoryResult<()> {
        if !self.store.delete(id).await? {
            return Err(InventoryError::NotFound(id.to_string()));
        }
        info!("Deleted lens {}", id);
        Ok(())
    }

    /// Records matching the given search fields, newest first
    pub async fn list_filtered(&self, fields: &RawLensFields) -> InventoryResult<Vec<LensRecord>> {
        let filter = fields.to_filter()?;
        Ok(self.store.find_many(&filter).await?)
    }

    /// Replace a record's quantity with `compute(current)` using compare-and-swap.
    ///
    /// `compute` is re-evaluated against the freshly stored value after every
    /// lost race, so bounds checks never act on a stale quantity.
    async fn swap_quantity<F>(&self, mut record: LensRecord, compute: F) -> InventoryResult<LensRecord>
    where
        F: Fn(u32) -> InventoryResult<u32> + Send + Sync,
    {
        for attempt in 1..=self.settings.cas_max_retries {
            let new_quantity = compute(record.quantity)?;
            match self
                .store
                .compare_and_set_quantity(record.id, record.quantity, new_quantity)
                .await?
            {
                CasOutcome::Swapped(updated) => return Ok(updated),
                CasOutcome::Stale { current } => {
                    debug!(
                        "Quantity of lens {} changed underneath us ({} -> {}), attempt {}",
                        record.id, record.quantity, current, attempt
                    );
                    record.quantity = current;
                }
                CasOutcome::Missing => return Err(InventoryError::NotFound(record.id.to_string())),
            }
        }

        warn!(
            "Giving up on lens {} after {} contended quantity writes",
            record.id, self.settings.cas_max_retries
        );
        Err(InventoryError::Conflict(record.id))
    }
}
