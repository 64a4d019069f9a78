//! Grouped write of an account's new posts.

use postwatch_core::NormalizedPost;

use crate::error::IngestError;
use crate::store::PostStore;

/// Stores `posts` for `account_id` in one all-or-nothing write.
///
/// An empty batch performs no write and returns `Ok(0)`.
///
/// # Errors
///
/// Propagates the store's write error; in that case nothing was stored.
pub async fn persist_posts<S: PostStore>(
    store: &S,
    account_id: i64,
    posts: &[NormalizedPost],
) -> Result<u64, IngestError> {
    if posts.is_empty() {
        return Ok(0);
    }
    store.insert_posts(account_id, posts).await
}
