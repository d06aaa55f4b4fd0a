//! Consolidation: create a lens, or merge it into the record with the same key

use optistock_common::lens::{RawLensFields, ValidationErrors};
use optistock_common::{LensRecord, NewLens};
use tracing::info;

use super::Inventory;
use crate::error::{InventoryError, InventoryResult};

/// What happened to an incoming lens
#[derive(Debug, Clone, PartialEq)]
pub enum Consolidation {
    /// No record had this key; a new one was stored
    Created(LensRecord),
    /// An existing record absorbed the incoming quantity
    Merged { record: LensRecord, added: u32 },
}

impl Consolidation {
    pub fn record(&self) -> &LensRecord {
        match self {
            Self::Created(record) | Self::Merged { record, .. } => record,
        }
    }

    pub fn into_record(self) -> LensRecord {
        match self {
            Self::Created(record) | Self::Merged { record, .. } => record,
        }
    }

    pub fn was_merged(&self) -> bool {
        matches!(self, Self::Merged { .. })
    }

    /// Human-readable note for merges
    pub fn note(&self) -> Option<String> {
        match self {
            Self::Created(_) => None,
            Self::Merged { added, .. } => Some(format!(
                "Quantity updated. Added {} to existing stock.",
                added
            )),
        }
    }
}

impl Inventory {
    /// Validate the fields, then create or merge
    pub async fn create_or_merge(&self, fields: &RawLensFields) -> InventoryResult<Consolidation> {
        let lens = fields.validate_new()?;
        self.consolidate(&lens).await
    }

    /// Merge into the oldest record with an identical key, or insert.
    ///
    /// A zero quantity still counts as a merge when the key exists.
    pub(crate) async fn consolidate(&self, lens: &NewLens) -> InventoryResult<Consolidation> {
        let Some(existing) = self.store.find_one(&lens.key).await? else {
            let record = self.store.insert(lens).await?;
            info!("Created lens {} ({}), quantity {}", record.id, record.key, record.quantity);
            return Ok(Consolidation::Created(record));
        };

        let added = lens.quantity;
        let record = self
            .swap_quantity(existing, |current| {
                current.checked_add(added).ok_or_else(|| {
                    InventoryError::Validation(ValidationErrors::general("Quantity exceeds maximum"))
                })
            })
            .await?;

        info!(
            "Merged {} into lens {} ({}), quantity now {}",
            added, record.id, record.key, record.quantity
        );
        Ok(Consolidation::Merged { record, added })
    }
}
