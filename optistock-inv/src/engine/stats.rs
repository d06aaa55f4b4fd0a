//! Statistics: dashboard counters, recomputed from the store on every call

use optistock_common::lens::{RawLensFields, LOW_STOCK_THRESHOLD};
use optistock_common::LensRecord;
use serde::Serialize;
use std::collections::BTreeMap;

use super::Inventory;
use crate::error::InventoryResult;
use crate::store::QuantityPredicate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStats {
    pub total_lenses: u64,
    pub total_boxes: u64,
    /// `0 < quantity < 4`; out-of-stock records are counted separately
    pub low_stock: u64,
    pub out_of_stock: u64,
    pub has_low_stock: bool,
}

/// Contents of one storage box
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxSummary {
    pub box_number: String,
    pub lens_count: u64,
    pub total_quantity: u64,
}

impl Inventory {
    pub async fn stats(&self) -> InventoryResult<InventoryStats> {
        let total_lenses = self.store.count_where(QuantityPredicate::Any).await?;
        let low_stock = self
            .store
            .count_where(QuantityPredicate::Between {
                above: 0,
                below: LOW_STOCK_THRESHOLD,
            })
            .await?;
        let out_of_stock = self.store.count_where(QuantityPredicate::Equals(0)).await?;
        let total_boxes = self.store.distinct_box_numbers().await?.len() as u64;

        Ok(InventoryStats {
            total_lenses,
            total_boxes,
            low_stock,
            out_of_stock,
            has_low_stock: low_stock + out_of_stock > 0,
        })
    }

    /// Everything below the threshold, zero included, lowest quantity first
    pub async fn list_low_stock(&self) -> InventoryResult<Vec<LensRecord>> {
        Ok(self
            .store
            .find_by_quantity(QuantityPredicate::Below(LOW_STOCK_THRESHOLD))
            .await?)
    }

    /// Per-box totals among records matching the search fields, by box number
    pub async fn list_boxes(&self, fields: &RawLensFields) -> InventoryResult<Vec<BoxSummary>> {
        let records = self.list_filtered(fields).await?;

        let mut boxes: BTreeMap<String, BoxSummary> = BTreeMap::new();
        for record in records {
            let name = record.key.box_number.as_str();
            let summary = boxes.entry(name.to_string()).or_insert_with(|| BoxSummary {
                box_number: name.to_string(),
                lens_count: 0,
                total_quantity: 0,
            });
            summary.lens_count += 1;
            summary.total_quantity += u64::from(record.quantity);
        }

        Ok(boxes.into_values().collect())
    }
}
