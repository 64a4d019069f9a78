//! Drops candidate posts that are already stored for an account.

use std::collections::HashSet;

use postwatch_core::NormalizedPost;

use crate::error::IngestError;
use crate::store::PostStore;

/// Keeps candidates whose ID is neither in `known` nor repeated earlier in
/// the batch. Relative order is preserved; the first occurrence of a
/// repeated ID wins.
#[must_use]
pub fn filter_new_posts(
    candidates: Vec<NormalizedPost>,
    known: &HashSet<String>,
) -> Vec<NormalizedPost> {
    let mut seen: HashSet<String> = HashSet::with_capacity(candidates.len());
    candidates
        .into_iter()
        .filter(|post| {
            !known.contains(&post.external_post_id) && seen.insert(post.external_post_id.clone())
        })
        .collect()
}

/// Returns the subset of `candidates` not yet stored for `account_id`.
///
/// Known IDs are loaded with a single lookup; an empty batch skips it.
///
/// # Errors
///
/// Propagates the store's lookup error.
pub async fn dedup_candidates<S: PostStore>(
    store: &S,
    account_id: i64,
    candidates: Vec<NormalizedPost>,
) -> Result<Vec<NormalizedPost>, IngestError> {
    if candidates.is_empty() {
        return Ok(candidates);
    }
    let known = store.known_post_ids(account_id).await?;
    Ok(filter_new_posts(candidates, &known))
}
