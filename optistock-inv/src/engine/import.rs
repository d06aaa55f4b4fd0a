//! Bulk Import: consolidation over an ordered batch, one row at a time
//!
//! Rows are processed strictly in order so a later row can merge into a
//! record an earlier row of the same batch created. A failing row is recorded
//! and skipped; it never aborts the batch and never leaves a partial write.
//! That includes rows that are not objects at all: each element of the batch
//! is read on its own.

use optistock_common::lens::{RawLensFields, ValidationErrors};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{Consolidation, Inventory};
use crate::error::{InventoryError, InventoryResult};

/// One candidate row of an import batch
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    /// Row number in the source sheet, when the client knows it.
    /// Numeric strings are accepted; anything unusable falls back to the position.
    #[serde(default, deserialize_with = "lenient_row_number")]
    pub row_number: Option<u32>,
    #[serde(flatten)]
    pub fields: RawLensFields,
}

impl ImportRow {
    /// Read one element of a batch
    pub fn from_value(value: Value) -> Result<Self, ValidationErrors> {
        if !value.is_object() {
            return Err(ValidationErrors::general("Row must be an object"));
        }
        serde_json::from_value(value)
            .map_err(|e| ValidationErrors::general(format!("Invalid row: {}", e)))
    }
}

fn lenient_row_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRowError {
    pub row: u32,
    pub reasons: Vec<String>,
    pub error: String,
}

/// Accumulated outcome of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub total: usize,
    pub success: usize,
    pub created: usize,
    pub merged: usize,
    pub errors: Vec<ImportRowError>,
}

impl ImportReport {
    /// Fold one row's outcome into the report
    pub fn record(&mut self, row: u32, outcome: InventoryResult<Consolidation>) {
        self.total += 1;
        match outcome {
            Ok(consolidation) => {
                self.success += 1;
                if consolidation.was_merged() {
                    self.merged += 1;
                } else {
                    self.created += 1;
                }
            }
            Err(err) => {
                let reasons = match &err {
                    InventoryError::Validation(errors) => errors.reasons(),
                    InventoryError::Storage(e) => {
                        warn!("Import row {} failed in storage: {}", row, e);
                        vec!["Server error".to_string()]
                    }
                    other => vec![other.to_string()],
                };
                self.errors.push(ImportRowError {
                    row,
                    error: reasons.join(", "),
                    reasons,
                });
            }
        }
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    pub fn message(&self) -> String {
        format!("Imported {} lenses successfully", self.success)
    }
}

impl Inventory {
    /// Validate and consolidate every row of a batch, in order
    pub async fn import_batch(&self, rows: Vec<Value>) -> InventoryResult<ImportReport> {
        if rows.is_empty() {
            return Err(ValidationErrors::general("No valid lenses to import").into());
        }
        let max_rows = self.settings.import_max_rows;
        if rows.len() > max_rows {
            return Err(ValidationErrors::general(format!(
                "Import is limited to {} rows per batch",
                max_rows
            ))
            .into());
        }

        info!("Importing {} lens rows", rows.len());
        let mut report = ImportReport::default();

        for (index, value) in rows.into_iter().enumerate() {
            let position = u32::try_from(index + 1).unwrap_or(u32::MAX);

            let (row_number, outcome) = match ImportRow::from_value(value) {
                Ok(row) => {
                    let outcome = match row.fields.validate_new() {
                        Ok(lens) => self.consolidate(&lens).await,
                        Err(errors) => Err(errors.into()),
                    };
                    (row.row_number.unwrap_or(position), outcome)
                }
                Err(errors) => (position, Err(errors.into())),
            };
            if let Err(err) = &outcome {
                debug!("Import row {} rejected: {}", row_number, err);
            }
            report.record(row_number, outcome);
        }

        info!(
            "Import finished: {} of {} rows ({} created, {} merged, {} failed)",
            report.success,
            report.total,
            report.created,
            report.merged,
            report.failed()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{fields, inventory};
    use super::*;
    use optistock_common::db::RuntimeSettings;
    use serde_json::json;
    use std::sync::Arc;

    fn rows(value: Value) -> Vec<Value> {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_row_is_isolated() {
        let inv = inventory();
        let report = inv
            .import_batch(rows(json!([
                { "boxNumber": "A1", "sph": -1.0, "quantity": 2 },
                { "boxNumber": "A1", "sph": -1.5, "quantity": -1 },
                { "boxNumber": "A2", "sph": -1.0, "quantity": 4 }
            ])))
            .await
            .unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.success, 2);
        assert_eq!(report.created, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row, 2);
        assert_eq!(report.errors[0].reasons, vec!["Quantity cannot be negative"]);
        assert_eq!(report.message(), "Imported 2 lenses successfully");

        assert_eq!(inv.list_filtered(&fields(json!({}))).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_later_rows_merge_into_earlier_rows() {
        let inv = inventory();
        let report = inv
            .import_batch(rows(json!([
                { "boxNumber": "B1", "cyl": -0.5, "axis": 180, "quantity": 3 },
                { "boxNumber": "B1", "cyl": "-0.50", "axis": "180", "quantity": "2" },
                { "boxNumber": "B1", "cyl": -0.5, "axis": 180 }
            ])))
            .await
            .unwrap();

        assert_eq!(report.success, 3);
        assert_eq!(report.created, 1);
        assert_eq!(report.merged, 2);

        let all = inv.list_filtered(&fields(json!({}))).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_rows_merge_into_existing_stock() {
        let inv = inventory();
        let existing = inv
            .create_or_merge(&fields(json!({ "boxNumber": "C3", "addition": 2.0, "quantity": 1 })))
            .await
            .unwrap()
            .into_record();

        let report = inv
            .import_batch(rows(json!([{ "boxNumber": "C3", "addition": "+2.00", "quantity": 6 }])))
            .await
            .unwrap();

        assert_eq!(report.merged, 1);
        assert_eq!(inv.get_lens(existing.id).await.unwrap().quantity, 7);
    }

    #[tokio::test]
    async fn test_explicit_row_numbers_are_reported() {
        let inv = inventory();
        let report = inv
            .import_batch(rows(json!([
                { "rowNumber": 14, "boxNumber": "", "quantity": 1 },
                { "rowNumber": 15, "boxNumber": "D4", "sph": "x" }
            ])))
            .await
            .unwrap();

        assert_eq!(report.success, 0);
        let rows: Vec<u32> = report.errors.iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![14, 15]);
        assert_eq!(report.errors[0].error, "Box number is required");
        assert_eq!(report.errors[1].error, "SPH must be a number");
    }

    #[tokio::test]
    async fn test_malformed_rows_do_not_sink_the_batch() {
        let inv = inventory();
        let report = inv
            .import_batch(rows(json!([
                { "boxNumber": "G1", "sph": 0.5, "quantity": 1 },
                null,
                { "rowNumber": "7", "boxNumber": "G1", "sph": 0.5, "quantity": 2 },
                "G2,-1.00,3",
                { "rowNumber": "11", "boxNumber": "G2", "quantity": -4 },
                { "boxNumber": "G3", "quantity": 1 }
            ])))
            .await
            .unwrap();

        assert_eq!(report.total, 6);
        assert_eq!(report.success, 3);
        assert_eq!(report.created, 2);
        assert_eq!(report.merged, 1);

        let failures: Vec<(u32, &str)> = report
            .errors
            .iter()
            .map(|e| (e.row, e.error.as_str()))
            .collect();
        assert_eq!(
            failures,
            vec![
                (2, "Row must be an object"),
                (4, "Row must be an object"),
                (11, "Quantity cannot be negative"),
            ]
        );

        let g1 = inv
            .list_filtered(&fields(json!({ "boxNumber": "G1" })))
            .await
            .unwrap();
        assert_eq!(g1.len(), 1);
        assert_eq!(g1[0].quantity, 3);
    }

    #[test]
    fn test_row_number_accepts_numeric_strings() {
        let row = ImportRow::from_value(json!({ "rowNumber": " 12 ", "boxNumber": "A1" })).unwrap();
        assert_eq!(row.row_number, Some(12));

        for odd in [json!(-1), json!(2.5), json!(null), json!("x"), json!([3])] {
            let row = ImportRow::from_value(json!({ "rowNumber": odd, "boxNumber": "A1" })).unwrap();
            assert_eq!(row.row_number, None);
        }

        let errors = ImportRow::from_value(json!(42)).unwrap_err();
        assert_eq!(errors.reasons(), vec!["Row must be an object"]);
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let inv = inventory();
        let err = inv.import_batch(Vec::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "No valid lenses to import");
    }

    #[tokio::test]
    async fn test_oversized_batch_is_rejected() {
        let settings = RuntimeSettings {
            import_max_rows: 2,
            ..RuntimeSettings::default()
        };
        let inv = Inventory::new(Arc::new(crate::store::MemoryLensStore::new()), settings);

        let batch = vec![json!({}), json!({}), json!({})];
        assert!(matches!(
            inv.import_batch(batch).await,
            Err(InventoryError::Validation(_))
        ));
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let mut report = ImportReport::default();
        report.record(
            1,
            Err(InventoryError::Validation(ValidationErrors::general("bad row"))),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["success"], 0);
        assert_eq!(json["errors"][0]["row"], 1);
        assert_eq!(json["errors"][0]["reasons"][0], "bad row");
    }
}
