//! HTTP client for the platform's "recent posts by account" endpoint.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};

use crate::error::IngestError;
use crate::normalize::{normalize_timeline, Timeline};
use crate::retry::retry_with_backoff;
use crate::types::TimelineResponse;

const DEFAULT_BASE_URL: &str = "https://api.twitter.com";

/// The endpoint rejects `max_results` outside this range.
const API_MIN_RESULTS: u32 = 5;
const API_MAX_RESULTS: u32 = 100;

const TWEET_FIELDS: &str = "created_at,entities,attachments,public_metrics";
const EXPANSIONS: &str = "attachments.media_keys";
const MEDIA_FIELDS: &str = "url,preview_image_url,type";

/// Source of an account's recent posts.
pub trait TimelineSource: Send + Sync {
    /// Fetches and normalizes at most `max_results` recent posts for the
    /// account with platform identifier `external_id`.
    fn fetch_recent_posts(
        &self,
        external_id: &str,
        max_results: u32,
    ) -> impl Future<Output = Result<Timeline, IngestError>> + Send;
}

/// Client for the platform API.
///
/// Use [`PlatformClient::new`] for production or
/// [`PlatformClient::with_base_url`] to point at a mock server in tests.
pub struct PlatformClient {
    client: Client,
    bearer_token: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl std::fmt::Debug for PlatformClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformClient")
            .field("base_url", &self.base_url.as_str())
            .field("bearer_token", &"[redacted]")
            .field("max_retries", &self.max_retries)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .finish_non_exhaustive()
    }
}

impl PlatformClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(bearer_token: &str, timeout_secs: u64) -> Result<Self, IngestError> {
        Self::with_base_url(bearer_token, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`IngestError::InvalidRequest`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(
        bearer_token: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, IngestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("postwatch/0.1 (post-ingestion)")
            .build()?;

        // Ensure exactly one trailing slash so path segments append under the
        // base rather than replacing its last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| {
            IngestError::InvalidRequest(format!("invalid base URL '{base_url}': {e}"))
        })?;

        Ok(Self {
            client,
            bearer_token: bearer_token.to_owned(),
            base_url,
            max_retries: 0,
            backoff_base_ms: 0,
        })
    }

    /// Builds a client from application config, including its retry policy.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::with_base_url`].
    pub fn from_app_config(config: &postwatch_core::AppConfig) -> Result<Self, IngestError> {
        Ok(Self::with_base_url(
            &config.platform_bearer_token,
            config.request_timeout_secs,
            &config.platform_api_base_url,
        )?
        .with_retry_policy(config.fetch_max_retries, config.fetch_retry_backoff_base_ms))
    }

    /// Sets how many extra attempts transient failures get. `0` disables retries.
    #[must_use]
    pub fn with_retry_policy(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Fetches the most recent posts for one account and normalizes them.
    ///
    /// The endpoint only accepts page sizes in `5..=100`; a smaller
    /// `max_results` is requested as 5 and the result truncated.
    ///
    /// # Errors
    ///
    /// - [`IngestError::InvalidRequest`] if `external_id` is empty or `max_results` is 0.
    /// - [`IngestError::RateLimited`] on HTTP 429 (never retried).
    /// - [`IngestError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`IngestError::Http`] on network failure or timeout.
    /// - [`IngestError::Deserialize`] if the body is not the expected JSON.
    pub async fn fetch_timeline(
        &self,
        external_id: &str,
        max_results: u32,
    ) -> Result<Timeline, IngestError> {
        if external_id.trim().is_empty() {
            return Err(IngestError::InvalidRequest(
                "account external id must not be empty".to_owned(),
            ));
        }
        if max_results == 0 {
            return Err(IngestError::InvalidRequest(
                "max_results must be positive".to_owned(),
            ));
        }

        let url = self.timeline_url(external_id, max_results)?;
        let response = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.request_timeline(&url)
        })
        .await?;

        let mut timeline = normalize_timeline(response, Utc::now());
        timeline.posts.truncate(max_results as usize);
        Ok(timeline)
    }

    /// Builds `{base}/2/users/{external_id}/tweets` with field selectors.
    fn timeline_url(&self, external_id: &str, max_results: u32) -> Result<Url, IngestError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                IngestError::InvalidRequest(format!("base URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["2", "users", external_id, "tweets"]);

        let page_size = max_results.clamp(API_MIN_RESULTS, API_MAX_RESULTS);
        url.query_pairs_mut()
            .append_pair("max_results", &page_size.to_string())
            .append_pair("tweet.fields", TWEET_FIELDS)
            .append_pair("expansions", EXPANSIONS)
            .append_pair("media.fields", MEDIA_FIELDS);
        Ok(url)
    }

    async fn request_timeline(&self, url: &Url) -> Result<TimelineResponse, IngestError> {
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.bearer_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(IngestError::RateLimited {
                retry_after_secs: retry_after_secs(response.headers()),
            });
        }
        if !status.is_success() {
            return Err(IngestError::UnexpectedStatus {
                status: status.as_u16(),
                url: redact_query(url),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| IngestError::Deserialize {
            context: redact_query(url),
            source: e,
        })
    }
}

impl TimelineSource for PlatformClient {
    async fn fetch_recent_posts(
        &self,
        external_id: &str,
        max_results: u32,
    ) -> Result<Timeline, IngestError> {
        self.fetch_timeline(external_id, max_results).await
    }
}

/// Seconds until the rate-limit window resets, from `retry-after` or the
/// platform's `x-rate-limit-reset` epoch header. `0` when neither is usable.
fn retry_after_secs(headers: &HeaderMap) -> u64 {
    let header_u64 = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    };

    if let Some(secs) = header_u64(RETRY_AFTER.as_str()) {
        return secs;
    }
    header_u64("x-rate-limit-reset").map_or(0, |reset_epoch| {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        reset_epoch.saturating_sub(now)
    })
}

/// Path-only form of a request URL for logs and error messages.
fn redact_query(url: &Url) -> String {
    let mut redacted = url.clone();
    redacted.set_query(None);
    redacted.to_string()
}
