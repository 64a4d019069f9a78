//! Storage seams used by the pipeline and scheduler, plus their Postgres
//! implementation.

use std::collections::HashSet;
use std::future::Future;

use postwatch_core::{NormalizedPost, TrackedAccount};
use postwatch_db::NewIngestionCycle;
use sqlx::PgPool;

use crate::error::IngestError;
use crate::scheduler::CycleSummary;

/// Read-only view of the tracked-account registry.
pub trait AccountRegistry: Send + Sync {
    /// All tracked accounts, in a stable order.
    fn list_tracked_accounts(
        &self,
    ) -> impl Future<Output = Result<Vec<TrackedAccount>, IngestError>> + Send;
}

/// Persisted posts, keyed by `(account_id, external_post_id)`.
pub trait PostStore: Send + Sync {
    /// External post IDs already stored for `account_id`.
    fn known_post_ids(
        &self,
        account_id: i64,
    ) -> impl Future<Output = Result<HashSet<String>, IngestError>> + Send;

    /// Writes `posts` for `account_id` as one unit: either every post is
    /// stored or none is. Returns the number of rows written.
    fn insert_posts(
        &self,
        account_id: i64,
        posts: &[NormalizedPost],
    ) -> impl Future<Output = Result<u64, IngestError>> + Send;
}

/// Append-only record of completed cycles.
pub trait CycleJournal: Send + Sync {
    fn record_cycle(
        &self,
        summary: &CycleSummary,
    ) -> impl Future<Output = Result<(), IngestError>> + Send;
}

/// Postgres-backed implementation of every storage seam.
#[derive(Debug, Clone)]
pub struct PgIngestStore {
    pool: PgPool,
}

impl PgIngestStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl AccountRegistry for PgIngestStore {
    async fn list_tracked_accounts(&self) -> Result<Vec<TrackedAccount>, IngestError> {
        let rows = postwatch_db::list_tracked_accounts(&self.pool).await?;
        Ok(rows.into_iter().map(TrackedAccount::from).collect())
    }
}

impl PostStore for PgIngestStore {
    async fn known_post_ids(&self, account_id: i64) -> Result<HashSet<String>, IngestError> {
        let ids = postwatch_db::list_external_post_ids(&self.pool, account_id).await?;
        Ok(ids.into_iter().collect())
    }

    async fn insert_posts(
        &self,
        account_id: i64,
        posts: &[NormalizedPost],
    ) -> Result<u64, IngestError> {
        Ok(postwatch_db::insert_posts(&self.pool, account_id, posts).await?)
    }
}

impl CycleJournal for PgIngestStore {
    async fn record_cycle(&self, summary: &CycleSummary) -> Result<(), IngestError> {
        let cycle = NewIngestionCycle {
            public_id: summary.cycle_id,
            started_at: summary.started_at,
            completed_at: summary.completed_at,
            accounts_processed: summary.accounts_processed,
            accounts_failed: summary.accounts_failed,
            posts_persisted: summary.posts_persisted,
            cancelled: summary.cancelled,
        };
        postwatch_db::insert_ingestion_cycle(&self.pool, &cycle).await?;
        Ok(())
    }
}
