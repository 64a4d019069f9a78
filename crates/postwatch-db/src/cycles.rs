//! Database operations for the `ingestion_cycles` journal.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `ingestion_cycles` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IngestionCycleRow {
    pub id: i64,
    pub public_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub accounts_processed: i32,
    pub accounts_failed: i32,
    pub posts_persisted: i64,
    pub cancelled: bool,
    pub created_at: DateTime<Utc>,
}

/// Summary of one finished scheduler cycle, ready to be journaled.
#[derive(Debug, Clone)]
pub struct NewIngestionCycle {
    pub public_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub accounts_processed: u64,
    pub accounts_failed: u64,
    pub posts_persisted: u64,
    pub cancelled: bool,
}

/// Writes a cycle summary and returns its generated id.
///
/// # Errors
///
/// Returns [`DbError::OutOfRange`] if a counter does not fit its column, or
/// [`DbError::Sqlx`] if the insert fails.
pub async fn insert_ingestion_cycle(
    pool: &PgPool,
    cycle: &NewIngestionCycle,
) -> Result<i64, DbError> {
    let accounts_processed = to_i32("accounts_processed", cycle.accounts_processed)?;
    let accounts_failed = to_i32("accounts_failed", cycle.accounts_failed)?;
    let posts_persisted = i64::try_from(cycle.posts_persisted).map_err(|_| DbError::OutOfRange {
        column: "posts_persisted",
        value: cycle.posts_persisted,
    })?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO ingestion_cycles \
             (public_id, started_at, completed_at, accounts_processed, accounts_failed, \
              posts_persisted, cancelled) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id",
    )
    .bind(cycle.public_id)
    .bind(cycle.started_at)
    .bind(cycle.completed_at)
    .bind(accounts_processed)
    .bind(accounts_failed)
    .bind(posts_persisted)
    .bind(cycle.cancelled)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Lists the most recent cycles, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_ingestion_cycles(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<IngestionCycleRow>, DbError> {
    let rows = sqlx::query_as::<_, IngestionCycleRow>(
        "SELECT id, public_id, started_at, completed_at, accounts_processed, accounts_failed, \
                posts_persisted, cancelled, created_at \
         FROM ingestion_cycles \
         ORDER BY started_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

fn to_i32(column: &'static str, value: u64) -> Result<i32, DbError> {
    i32::try_from(value).map_err(|_| DbError::OutOfRange { column, value })
}
