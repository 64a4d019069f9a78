use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post fetched from the platform, normalized for storage.
///
/// The pair `(owning account, external_post_id)` is the deduplication key;
/// the owning account is supplied by the caller at persist time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedPost {
    /// Platform post ID, kept as a string to avoid precision loss.
    pub external_post_id: String,
    /// Display text with platform short links and entity escapes removed.
    pub text: String,
    /// Attached media URL, or a page-preview image filled in by enrichment.
    pub media_url: Option<String>,
    /// First outbound link referenced by the post, if any.
    pub link_url: Option<String>,
    pub like_count: i64,
    /// Reposts of this post (the platform's `retweet_count`).
    pub share_count: i64,
    pub reply_count: i64,
    /// Creation time reported by the platform, or ingestion time when absent.
    pub posted_at: DateTime<Utc>,
}

impl NormalizedPost {
    /// Returns `true` if the post has no media and is a candidate for
    /// page-preview enrichment.
    #[must_use]
    pub fn needs_media(&self) -> bool {
        self.media_url.is_none()
    }
}
