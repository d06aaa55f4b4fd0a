//! Lens records and validated inputs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::key::{Axis, BoxNumber, Diopters, SpecKey};

/// A persisted stock item.
///
/// `quantity` is the only field that changes in normal operation; the key
/// changes only through an explicit edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LensRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub key: SpecKey,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LensRecord {
    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }

    pub fn is_low_stock(&self) -> bool {
        super::is_low_stock(self.quantity)
    }
}

/// Validated input for creating (or merging into) a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLens {
    pub key: SpecKey,
    pub quantity: u32,
}

/// Validated explicit edit of an existing record.
///
/// Optical fields are always overwritten (absent clears them). Box number and
/// quantity keep their current values when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LensEdit {
    pub sph: Option<Diopters>,
    pub cyl: Option<Diopters>,
    pub axis: Option<Axis>,
    pub addition: Option<Diopters>,
    pub box_number: Option<BoxNumber>,
    pub quantity: Option<u32>,
}

impl LensEdit {
    /// Apply the edit to a record in place. Timestamps are left to the store.
    pub fn apply_to(&self, record: &mut LensRecord) {
        record.key.sph = self.sph;
        record.key.cyl = self.cyl;
        record.key.axis = self.axis;
        record.key.addition = self.addition;
        if let Some(box_number) = &self.box_number {
            record.key.box_number = box_number.clone();
        }
        if let Some(quantity) = self.quantity {
            record.quantity = quantity;
        }
    }
}
