//! Database operations for the `tracked_accounts` table.
//!
//! Account management lives outside the ingestion pipeline; the pipeline
//! only reads this table. [`insert_tracked_account`] exists for seeding.

use chrono::{DateTime, Utc};
use postwatch_core::TrackedAccount;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `tracked_accounts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrackedAccountRow {
    pub id: i64,
    pub external_id: String,
    pub display_name: String,
    pub handle: String,
    pub created_at: DateTime<Utc>,
}

impl From<TrackedAccountRow> for TrackedAccount {
    fn from(row: TrackedAccountRow) -> Self {
        Self {
            id: row.id,
            external_id: row.external_id,
            display_name: row.display_name,
            handle: row.handle,
        }
    }
}

/// Returns every tracked account in stable `id` order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_tracked_accounts(pool: &PgPool) -> Result<Vec<TrackedAccountRow>, DbError> {
    let rows = sqlx::query_as::<_, TrackedAccountRow>(
        "SELECT id, external_id, display_name, handle, created_at \
         FROM tracked_accounts \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Inserts a tracked account and returns the new row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including when
/// `external_id` is already tracked.
pub async fn insert_tracked_account(
    pool: &PgPool,
    external_id: &str,
    display_name: &str,
    handle: &str,
) -> Result<TrackedAccountRow, DbError> {
    let row = sqlx::query_as::<_, TrackedAccountRow>(
        "INSERT INTO tracked_accounts (external_id, display_name, handle) \
         VALUES ($1, $2, $3) \
         RETURNING id, external_id, display_name, handle, created_at",
    )
    .bind(external_id)
    .bind(display_name)
    .bind(handle)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
