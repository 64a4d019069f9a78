//! Database operations for the `ingested_posts` table.

use chrono::{DateTime, Utc};
use postwatch_core::NormalizedPost;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `ingested_posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: i64,
    pub account_id: i64,
    pub external_post_id: String,
    pub text: String,
    pub media_url: Option<String>,
    pub link_url: Option<String>,
    pub like_count: i64,
    pub share_count: i64,
    pub reply_count: i64,
    pub posted_at: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns every external post ID already stored for `account_id`.
///
/// One query per call regardless of how many posts the account has.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_external_post_ids(pool: &PgPool, account_id: i64) -> Result<Vec<String>, DbError> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT external_post_id FROM ingested_posts WHERE account_id = $1",
    )
    .bind(account_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Inserts `posts` for `account_id` as one grouped statement.
///
/// Uses a single `INSERT … SELECT $1, * FROM UNNEST(…)` so the whole batch
/// is one round-trip. There is no `ON CONFLICT` clause: a unique-key
/// violation on `(account_id, external_post_id)` fails the statement and no
/// post from the group is written. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_posts(
    pool: &PgPool,
    account_id: i64,
    posts: &[NormalizedPost],
) -> Result<u64, DbError> {
    if posts.is_empty() {
        return Ok(0);
    }

    // Collect each column into a parallel Vec for UNNEST binding.
    let mut external_ids: Vec<String> = Vec::with_capacity(posts.len());
    let mut texts: Vec<String> = Vec::with_capacity(posts.len());
    let mut media_urls: Vec<Option<String>> = Vec::with_capacity(posts.len());
    let mut link_urls: Vec<Option<String>> = Vec::with_capacity(posts.len());
    let mut like_counts: Vec<i64> = Vec::with_capacity(posts.len());
    let mut share_counts: Vec<i64> = Vec::with_capacity(posts.len());
    let mut reply_counts: Vec<i64> = Vec::with_capacity(posts.len());
    let mut posted_ats: Vec<DateTime<Utc>> = Vec::with_capacity(posts.len());

    for post in posts {
        external_ids.push(post.external_post_id.clone());
        texts.push(post.text.clone());
        media_urls.push(post.media_url.clone());
        link_urls.push(post.link_url.clone());
        like_counts.push(post.like_count);
        share_counts.push(post.share_count);
        reply_counts.push(post.reply_count);
        posted_ats.push(post.posted_at);
    }

    let result = sqlx::query(
        "INSERT INTO ingested_posts \
             (account_id, external_post_id, text, media_url, link_url, \
              like_count, share_count, reply_count, posted_at) \
         SELECT $1, * FROM UNNEST(\
              $2::text[], $3::text[], $4::text[], $5::text[], \
              $6::int8[], $7::int8[], $8::int8[], $9::timestamptz[])",
    )
    .bind(account_id)
    .bind(&external_ids)
    .bind(&texts)
    .bind(&media_urls)
    .bind(&link_urls)
    .bind(&like_counts)
    .bind(&share_counts)
    .bind(&reply_counts)
    .bind(&posted_ats)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Lists stored posts for an account, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_posts_for_account(
    pool: &PgPool,
    account_id: i64,
    limit: i64,
) -> Result<Vec<PostRow>, DbError> {
    let rows = sqlx::query_as::<_, PostRow>(
        "SELECT id, account_id, external_post_id, text, media_url, link_url, \
                like_count, share_count, reply_count, posted_at, ingested_at \
         FROM ingested_posts \
         WHERE account_id = $1 \
         ORDER BY posted_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(account_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Counts stored posts for an account.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_posts_for_account(pool: &PgPool, account_id: i64) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM ingested_posts WHERE account_id = $1",
    )
    .bind(account_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
