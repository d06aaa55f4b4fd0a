//! Quantity Adjustment: bounded +/- steps with a low-stock advisory

use optistock_common::lens::{is_low_stock, LOW_STOCK_THRESHOLD};
use optistock_common::LensRecord;
use serde_json::Value;
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

use super::Inventory;
use crate::error::{InventoryError, InventoryResult};

/// The only stock movements a single adjustment may make
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityDelta {
    RemoveTwo,
    RemoveOne,
    AddOne,
    AddTwo,
}

impl QuantityDelta {
    pub fn value(self) -> i64 {
        match self {
            Self::RemoveTwo => -2,
            Self::RemoveOne => -1,
            Self::AddOne => 1,
            Self::AddTwo => 2,
        }
    }

    /// Parse the `adjustment` field of a request body.
    ///
    /// Accepts integers, whole-number floats and numeric strings.
    pub fn from_json(value: Option<&Value>) -> InventoryResult<Self> {
        let invalid = || {
            InventoryError::InvalidAdjustment(
                value.map_or_else(|| "null".to_string(), |v| v.to_string()),
            )
        };

        let number = match value {
            Some(Value::Number(n)) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() <= 2.0)
                    .map(|f| f as i64)
            }),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        };

        number.ok_or_else(invalid).and_then(Self::try_from)
    }

    /// Resulting quantity, or `None` when it would go negative
    pub fn apply(self, quantity: u32) -> Option<u32> {
        match self {
            Self::RemoveTwo => quantity.checked_sub(2),
            Self::RemoveOne => quantity.checked_sub(1),
            Self::AddOne => quantity.checked_add(1),
            Self::AddTwo => quantity.checked_add(2),
        }
    }
}

impl TryFrom<i64> for QuantityDelta {
    type Error = InventoryError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -2 => Ok(Self::RemoveTwo),
            -1 => Ok(Self::RemoveOne),
            1 => Ok(Self::AddOne),
            2 => Ok(Self::AddTwo),
            other => Err(InventoryError::InvalidAdjustment(other.to_string())),
        }
    }
}

impl fmt::Display for QuantityDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.value())
    }
}

/// Non-fatal signal that stock is running out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowStockAdvisory {
    pub quantity: u32,
    pub threshold: u32,
}

impl fmt::Display for LowStockAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Low stock warning: quantity is below {}", self.threshold)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    pub record: LensRecord,
    pub advisory: Option<LowStockAdvisory>,
}

impl Inventory {
    /// Move a record's quantity by one bounded step.
    ///
    /// Underflow leaves the record untouched. The advisory is attached when
    /// the resulting quantity is below the low-stock threshold.
    pub async fn adjust_quantity(&self, id: Uuid, delta: QuantityDelta) -> InventoryResult<Adjustment> {
        let record = self.get_lens(id).await?;

        let record = self
            .swap_quantity(record, |current| {
                delta.apply(current).ok_or(InventoryError::QuantityUnderflow {
                    current,
                    delta: delta.value(),
                })
            })
            .await?;

        let advisory = is_low_stock(record.quantity).then_some(LowStockAdvisory {
            quantity: record.quantity,
            threshold: LOW_STOCK_THRESHOLD,
        });

        if advisory.is_some() {
            warn!("Lens {} ({}) is low on stock: {}", record.id, record.key, record.quantity);
        } else {
            info!("Adjusted lens {} by {}, quantity now {}", record.id, delta, record.quantity);
        }

        Ok(Adjustment { record, advisory })
    }
}
