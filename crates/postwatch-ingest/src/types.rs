//! Wire types for the platform's "recent posts by account" endpoint.
//!
//! Every field the pipeline does not strictly need is optional so that a
//! sparse or partially redacted payload still deserializes.

use serde::Deserialize;

/// Top-level response body of `GET /2/users/{id}/tweets`.
#[derive(Debug, Default, Deserialize)]
pub struct TimelineResponse {
    #[serde(default)]
    pub data: Option<Vec<ApiPost>>,
    #[serde(default)]
    pub includes: Option<Includes>,
    /// Partial errors reported alongside (or instead of) `data`.
    #[serde(default)]
    pub errors: Vec<ApiProblem>,
}

#[derive(Debug, Deserialize)]
pub struct ApiPost {
    pub id: String,
    #[serde(default)]
    pub text: String,
    /// RFC 3339 timestamp, e.g. `"2026-03-01T12:00:00.000Z"`.
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub entities: Option<Entities>,
    #[serde(default)]
    pub attachments: Option<Attachments>,
    #[serde(default)]
    pub public_metrics: Option<PublicMetrics>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub urls: Vec<UrlEntity>,
}

/// A link the platform rewrote into a short link inside the post text.
#[derive(Debug, Deserialize)]
pub struct UrlEntity {
    /// The short link as it appears in the text.
    pub url: String,
    #[serde(default)]
    pub expanded_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Attachments {
    #[serde(default)]
    pub media_keys: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PublicMetrics {
    #[serde(default)]
    pub like_count: Option<u64>,
    #[serde(default)]
    pub retweet_count: Option<u64>,
    #[serde(default)]
    pub reply_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Includes {
    #[serde(default)]
    pub media: Vec<ApiMedia>,
}

/// An attached-media descriptor, referenced from posts by `media_key`.
#[derive(Debug, Deserialize)]
pub struct ApiMedia {
    pub media_key: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Full-resolution URL; present for photos.
    #[serde(default)]
    pub url: Option<String>,
    /// Still preview; present for videos and GIFs.
    #[serde(default)]
    pub preview_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiProblem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ApiProblem {
    /// Returns `true` if this problem reports that the requested resource
    /// (the account) does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind
            .as_deref()
            .is_some_and(|k| k.ends_with("resource-not-found"))
            || self.title.as_deref() == Some("Not Found Error")
    }
}
