//! Baseline Store
//!
//! Append-only log of daily received volume. Several entries for the same
//! date (one per shift, late corrections) are all kept and summed on read.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::db::{DailyActual, DateRange, MAX_QUANTITY};
use crate::{Error, Result};

/// New baseline entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewDailyActual {
    pub receiving_date: Option<NaiveDate>,
    pub orders_received: i64,
    pub estimated_units: i64,
    pub author_name: String,
    pub notes: String,
}

/// Same-date baseline entries collapsed into one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyVolume {
    pub date: NaiveDate,
    pub orders_received: i64,
    pub total_units: i64,
}

#[derive(Debug, Clone)]
pub struct BaselineStore {
    db: SqlitePool,
}

impl BaselineStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append one entry; returns its id
    pub async fn record(
        &self,
        date: NaiveDate,
        orders_received: i64,
        estimated_units: i64,
        author: &str,
        notes: &str,
    ) -> Result<i64> {
        if orders_received < 0 || estimated_units < 0 {
            return Err(Error::invalid(
                "Orders received and estimated units cannot be negative.",
            ));
        }
        if orders_received > MAX_QUANTITY || estimated_units > MAX_QUANTITY {
            return Err(Error::invalid(
                "Orders received and estimated units are too large.",
            ));
        }

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO daily_actuals (
                receiving_date, orders_received, estimated_units, author_name, notes, date_entered
            )
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(date)
        .bind(orders_received)
        .bind(estimated_units)
        .bind(author.trim())
        .bind(notes.trim())
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;

        info!(id, %date, orders_received, estimated_units, "Recorded daily actual");
        Ok(id)
    }

    /// `record` from a deserialized request body
    pub async fn record_entry(&self, entry: &NewDailyActual) -> Result<i64> {
        let date = entry
            .receiving_date
            .ok_or_else(|| Error::invalid("Receiving date is required."))?;
        self.record(
            date,
            entry.orders_received,
            entry.estimated_units,
            &entry.author_name,
            &entry.notes,
        )
        .await
    }

    /// Every active entry in range, oldest date first, insertion order within a date
    pub async fn fetch_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyActual>> {
        let rows = sqlx::query(
            r#"
            SELECT id, receiving_date, orders_received, estimated_units,
                   author_name, notes, date_entered
            FROM daily_actuals
            WHERE active = 1 AND receiving_date BETWEEN ? AND ?
            ORDER BY receiving_date ASC, id ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(daily_actual_from_row).collect()
    }

    /// Per-date totals for `range`; dates without entries are absent
    pub async fn daily_totals(&self, range: &DateRange) -> Result<Vec<DailyVolume>> {
        let entries = self.fetch_range(range.start, range.end).await?;
        Ok(collapse_by_date(&entries))
    }
}

fn daily_actual_from_row(row: &SqliteRow) -> Result<DailyActual> {
    Ok(DailyActual {
        id: row.try_get("id")?,
        receiving_date: row.try_get("receiving_date")?,
        orders_received: row.try_get("orders_received")?,
        estimated_units: row.try_get("estimated_units")?,
        author_name: row.try_get("author_name")?,
        notes: row.try_get("notes")?,
        date_entered: row.try_get("date_entered")?,
    })
}

/// Sum same-date entries (saturating), preserving ascending date order
pub fn collapse_by_date(entries: &[DailyActual]) -> Vec<DailyVolume> {
    let mut totals: Vec<DailyVolume> = Vec::new();
    for entry in entries {
        match totals.last_mut() {
            Some(last) if last.date == entry.receiving_date => {
                last.orders_received = last.orders_received.saturating_add(entry.orders_received);
                last.total_units = last.total_units.saturating_add(entry.estimated_units);
            }
            _ => totals.push(DailyVolume {
                date: entry.receiving_date,
                orders_received: entry.orders_received,
                total_units: entry.estimated_units,
            }),
        }
    }
    totals
}
