//! SQLite-backed lens store

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use optistock_common::lens::LensFilter;
use optistock_common::{
    Axis, BoxNumber, Diopters, Error, LensEdit, LensRecord, NewLens, Result, SpecKey,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::{CasOutcome, LensStore, QuantityPredicate};

const COLUMNS: &str =
    "guid, sph, cyl, axis, addition, box_number, quantity, created_at, updated_at";

/// Lens store over the `lenses` table
#[derive(Debug, Clone)]
pub struct SqliteLensStore {
    pool: SqlitePool,
}

impl SqliteLensStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Current time at the precision stored in the table
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so text ordering matches time ordering
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Corrupt(format!("invalid timestamp '{}': {}", raw, e)))
}

fn diopters(row: &SqliteRow, column: &str) -> Result<Option<Diopters>> {
    let value: Option<i64> = row.try_get(column)?;
    value
        .map(|v| {
            i32::try_from(v)
                .map(Diopters::from_hundredths)
                .map_err(|_| Error::Corrupt(format!("{} out of range: {}", column, v)))
        })
        .transpose()
}

fn row_to_record(row: &SqliteRow) -> Result<LensRecord> {
    let guid: String = row.try_get("guid")?;
    let id = Uuid::parse_str(&guid)
        .map_err(|e| Error::Corrupt(format!("invalid guid '{}': {}", guid, e)))?;

    let axis = match row.try_get::<Option<i64>, _>("axis")? {
        Some(degrees) => Some(
            u16::try_from(degrees)
                .ok()
                .and_then(Axis::new)
                .ok_or_else(|| Error::Corrupt(format!("axis out of range: {}", degrees)))?,
        ),
        None => None,
    };

    let box_raw: String = row.try_get("box_number")?;
    let box_number = BoxNumber::parse(&box_raw)
        .ok_or_else(|| Error::Corrupt(format!("empty box number on {}", id)))?;

    let quantity_raw: i64 = row.try_get("quantity")?;
    let quantity = u32::try_from(quantity_raw)
        .map_err(|_| Error::Corrupt(format!("quantity out of range: {}", quantity_raw)))?;

    let created_raw: String = row.try_get("created_at")?;
    let updated_raw: String = row.try_get("updated_at")?;

    Ok(LensRecord {
        id,
        key: SpecKey {
            sph: diopters(row, "sph")?,
            cyl: diopters(row, "cyl")?,
            axis,
            addition: diopters(row, "addition")?,
            box_number,
        },
        quantity,
        created_at: parse_timestamp(&created_raw)?,
        updated_at: parse_timestamp(&updated_raw)?,
    })
}

fn push_predicate(builder: &mut QueryBuilder<'_, Sqlite>, predicate: QuantityPredicate) {
    match predicate {
        QuantityPredicate::Any => {}
        QuantityPredicate::Equals(n) => {
            builder.push(" AND quantity = ").push_bind(i64::from(n));
        }
        QuantityPredicate::Below(n) => {
            builder.push(" AND quantity < ").push_bind(i64::from(n));
        }
        QuantityPredicate::Between { above, below } => {
            builder
                .push(" AND quantity > ")
                .push_bind(i64::from(above))
                .push(" AND quantity < ")
                .push_bind(i64::from(below));
        }
    }
}

fn hundredths(value: Option<Diopters>) -> Option<i64> {
    value.map(|d| i64::from(d.hundredths()))
}

fn degrees(value: Option<Axis>) -> Option<i64> {
    value.map(|a| i64::from(a.degrees()))
}

#[async_trait]
impl LensStore for SqliteLensStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<LensRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM lenses WHERE guid = ?", COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn find_one(&self, key: &SpecKey) -> Result<Option<LensRecord>> {
        // IS compares NULL with NULL as equal, which is the identity rule
        let row = sqlx::query(&format!(
            "SELECT {} FROM lenses
             WHERE sph IS ? AND cyl IS ? AND axis IS ? AND addition IS ? AND box_number = ?
             ORDER BY created_at ASC, rowid ASC
             LIMIT 1",
            COLUMNS
        ))
        .bind(hundredths(key.sph))
        .bind(hundredths(key.cyl))
        .bind(degrees(key.axis))
        .bind(hundredths(key.addition))
        .bind(key.box_number.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn find_many(&self, filter: &LensFilter) -> Result<Vec<LensRecord>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM lenses WHERE 1 = 1", COLUMNS));

        if let Some(sph) = hundredths(filter.sph) {
            builder.push(" AND sph = ").push_bind(sph);
        }
        if let Some(cyl) = hundredths(filter.cyl) {
            builder.push(" AND cyl = ").push_bind(cyl);
        }
        if let Some(axis) = degrees(filter.axis) {
            builder.push(" AND axis = ").push_bind(axis);
        }
        if let Some(addition) = hundredths(filter.addition) {
            builder.push(" AND addition = ").push_bind(addition);
        }
        if let Some(box_number) = &filter.box_number {
            builder
                .push(" AND box_number = ")
                .push_bind(box_number.as_str().to_string());
        }
        builder.push(" ORDER BY created_at DESC, rowid DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn find_by_quantity(&self, predicate: QuantityPredicate) -> Result<Vec<LensRecord>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM lenses WHERE 1 = 1", COLUMNS));
        push_predicate(&mut builder, predicate);
        builder.push(" ORDER BY quantity ASC, created_at DESC, rowid DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
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

        sqlx::query(
            r#"
            INSERT INTO lenses (guid, sph, cyl, axis, addition, box_number, quantity, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(hundredths(record.key.sph))
        .bind(hundredths(record.key.cyl))
        .bind(degrees(record.key.axis))
        .bind(hundredths(record.key.addition))
        .bind(record.key.box_number.as_str())
        .bind(i64::from(record.quantity))
        .bind(format_timestamp(&record.created_at))
        .bind(format_timestamp(&record.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn apply_edit(&self, id: Uuid, edit: &LensEdit) -> Result<Option<LensRecord>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE lenses
            SET sph = ?, cyl = ?, axis = ?, addition = ?,
                box_number = COALESCE(?, box_number),
                quantity = COALESCE(?, quantity),
                updated_at = ?
            WHERE guid = ?
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(hundredths(edit.sph))
        .bind(hundredths(edit.cyl))
        .bind(degrees(edit.axis))
        .bind(hundredths(edit.addition))
        .bind(edit.box_number.as_ref().map(|b| b.as_str().to_string()))
        .bind(edit.quantity.map(i64::from))
        .bind(format_timestamp(&now()))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM lenses WHERE guid = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn compare_and_set_quantity(
        &self,
        id: Uuid,
        expected: u32,
        new: u32,
    ) -> Result<CasOutcome> {
        // RETURNING hands back the row as written by this statement
        let swapped = sqlx::query(&format!(
            "UPDATE lenses SET quantity = ?, updated_at = ? WHERE guid = ? AND quantity = ? RETURNING {}",
            COLUMNS
        ))
        .bind(i64::from(new))
        .bind(format_timestamp(&now()))
        .bind(id.to_string())
        .bind(i64::from(expected))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = swapped {
            return Ok(CasOutcome::Swapped(row_to_record(&row)?));
        }

        let current: Option<i64> = sqlx::query_scalar("SELECT quantity FROM lenses WHERE guid = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match current {
            Some(current) => {
                let current = u32::try_from(current)
                    .map_err(|_| Error::Corrupt(format!("quantity out of range: {}", current)))?;
                Ok(CasOutcome::Stale { current })
            }
            None => Ok(CasOutcome::Missing),
        }
    }

    async fn count_where(&self, predicate: QuantityPredicate) -> Result<u64> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM lenses WHERE 1 = 1");
        push_predicate(&mut builder, predicate);

        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn distinct_box_numbers(&self) -> Result<BTreeSet<String>> {
        let boxes: Vec<String> = sqlx::query_scalar("SELECT DISTINCT box_number FROM lenses")
            .fetch_all(&self.pool)
            .await?;
        Ok(boxes.into_iter().collect())
    }
}
