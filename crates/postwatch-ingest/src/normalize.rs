//! Converts a raw timeline response into [`NormalizedPost`]s.
//!
//! Pure functions only; the ingestion timestamp is passed in so results are
//! deterministic under test.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use postwatch_core::NormalizedPost;
use regex::Regex;
use reqwest::Url;

use crate::types::{ApiMedia, ApiPost, TimelineResponse};

static SHORT_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?://t\.co/[A-Za-z0-9]+").expect("valid regex"));
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)https?://[^\s<>"']+"#).expect("valid regex"));
static INLINE_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("valid regex"));
static LINE_END_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+\n").expect("valid regex"));

/// Hosts whose links point back at the platform itself (quoted posts,
/// profile links) and never carry a useful page preview.
const PLATFORM_HOSTS: &[&str] = &["twitter.com", "x.com"];

/// Normalized result of one timeline fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    pub posts: Vec<NormalizedPost>,
    /// The platform reported that the requested account does not exist.
    pub account_missing: bool,
}

/// Normalizes every post in `response`.
///
/// Posts keep the order the platform returned them in.
#[must_use]
pub fn normalize_timeline(response: TimelineResponse, ingested_at: DateTime<Utc>) -> Timeline {
    let media: Vec<ApiMedia> = response.includes.map(|i| i.media).unwrap_or_default();
    let media_index: HashMap<&str, &ApiMedia> =
        media.iter().map(|m| (m.media_key.as_str(), m)).collect();

    let posts: Vec<NormalizedPost> = response
        .data
        .unwrap_or_default()
        .into_iter()
        .map(|post| normalize_post(post, &media_index, ingested_at))
        .collect();

    let account_missing = posts.is_empty() && response.errors.iter().any(|e| e.is_not_found());

    Timeline {
        posts,
        account_missing,
    }
}

fn normalize_post(
    post: ApiPost,
    media_index: &HashMap<&str, &ApiMedia>,
    ingested_at: DateTime<Utc>,
) -> NormalizedPost {
    let media_url = resolve_media_url(&post, media_index);
    let link_url = first_outbound_link(&post);
    let metrics = post.public_metrics.unwrap_or_default();

    NormalizedPost {
        text: clean_text(&post.text),
        media_url,
        link_url,
        like_count: count(metrics.like_count),
        share_count: count(metrics.retweet_count),
        reply_count: count(metrics.reply_count),
        posted_at: parse_created_at(post.created_at.as_deref(), ingested_at),
        external_post_id: post.id,
    }
}

/// Strips platform short links and entity escapes from post text.
#[must_use]
pub fn clean_text(raw: &str) -> String {
    let stripped = SHORT_LINK_RE.replace_all(raw, "");
    let collapsed = INLINE_SPACE_RE.replace_all(&stripped, " ");
    let trimmed_lines = LINE_END_SPACE_RE.replace_all(&collapsed, "\n");
    decode_entities(trimmed_lines.trim())
}

fn decode_entities(text: &str) -> String {
    // `&amp;` last so that an escaped escape (`&amp;lt;`) decodes only once.
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// First attached media URL that resolves, preferring full resolution.
fn resolve_media_url(post: &ApiPost, media_index: &HashMap<&str, &ApiMedia>) -> Option<String> {
    let keys = &post.attachments.as_ref()?.media_keys;
    keys.iter()
        .filter_map(|key| media_index.get(key.as_str()))
        .find_map(|media| {
            media
                .url
                .as_deref()
                .or(media.preview_image_url.as_deref())
                .filter(|u| !u.is_empty())
                .map(str::to_string)
        })
}

/// First outbound link in the post's URL entities, or in its raw text when
/// the platform sent no entities.
fn first_outbound_link(post: &ApiPost) -> Option<String> {
    match post.entities.as_ref() {
        Some(entities) if !entities.urls.is_empty() => entities.urls.iter().find_map(|entity| {
            let candidate = entity
                .expanded_url
                .as_deref()
                .filter(|u| !u.is_empty())
                .unwrap_or(&entity.url);
            is_outbound(candidate).then(|| candidate.to_string())
        }),
        _ => URL_RE
            .find_iter(&post.text)
            .map(|m| m.as_str())
            .find(|candidate| is_outbound(candidate))
            .map(str::to_string),
    }
}

fn is_outbound(candidate: &str) -> bool {
    let Ok(url) = Url::parse(candidate) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    !PLATFORM_HOSTS
        .iter()
        .any(|p| host == *p || host.ends_with(&format!(".{p}")))
}

fn parse_created_at(raw: Option<&str>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map_or(fallback, |dt| dt.with_timezone(&Utc))
}

fn count(value: Option<u64>) -> i64 {
    value.map_or(0, |v| i64::try_from(v).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ingested_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
    }

    fn parse(json: &str) -> Timeline {
        let response: TimelineResponse = serde_json::from_str(json).unwrap();
        normalize_timeline(response, ingested_at())
    }

    #[test]
    fn strips_trailing_short_link() {
        assert_eq!(clean_text("hello https://t.co/abc"), "hello");
    }

    #[test]
    fn strips_inline_short_link_and_collapses_space() {
        assert_eq!(
            clean_text("read https://t.co/Xy12 now https://t.co/zz"),
            "read now"
        );
    }

    #[test]
    fn keeps_other_urls_and_newlines() {
        assert_eq!(
            clean_text("line one\nsee https://example.com/a"),
            "line one\nsee https://example.com/a"
        );
    }

    #[test]
    fn short_link_at_line_end_leaves_no_trailing_space() {
        assert_eq!(clean_text("a https://t.co/x\nb"), "a\nb");
        assert_eq!(clean_text("one https://t.co/q1  \ntwo"), "one\ntwo");
    }

    #[test]
    fn decodes_entity_escapes_once() {
        assert_eq!(clean_text("a &amp; b &lt;3 &amp;lt;"), "a & b <3 &lt;");
    }

    #[test]
    fn scenario_posts_normalize() {
        let timeline = parse(
            r#"{ "data": [
                { "id": "t1", "text": "hello https://t.co/abc" },
                { "id": "t2", "text": "world" }
            ] }"#,
        );
        assert!(!timeline.account_missing);
        assert_eq!(timeline.posts.len(), 2);
        assert_eq!(timeline.posts[0].external_post_id, "t1");
        assert_eq!(timeline.posts[0].text, "hello");
        assert_eq!(timeline.posts[1].text, "world");
        assert!(timeline.posts[1].media_url.is_none());
        assert!(timeline.posts[1].link_url.is_none());
    }

    #[test]
    fn missing_metrics_default_to_zero() {
        let timeline = parse(r#"{ "data": [{ "id": "1", "text": "x" }] }"#);
        let post = &timeline.posts[0];
        assert_eq!(post.like_count, 0);
        assert_eq!(post.share_count, 0);
        assert_eq!(post.reply_count, 0);
    }

    #[test]
    fn metrics_map_retweets_to_shares() {
        let timeline = parse(
            r#"{ "data": [{ "id": "1", "text": "x",
                 "public_metrics": { "like_count": 10, "retweet_count": 3, "reply_count": 2 } }] }"#,
        );
        let post = &timeline.posts[0];
        assert_eq!(post.like_count, 10);
        assert_eq!(post.share_count, 3);
        assert_eq!(post.reply_count, 2);
    }

    #[test]
    fn created_at_parsed_or_falls_back_to_ingestion_time() {
        let timeline = parse(
            r#"{ "data": [
                { "id": "1", "text": "x", "created_at": "2026-03-01T12:30:00.000Z" },
                { "id": "2", "text": "y", "created_at": "yesterday" },
                { "id": "3", "text": "z" }
            ] }"#,
        );
        assert_eq!(
            timeline.posts[0].posted_at,
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap()
        );
        assert_eq!(timeline.posts[1].posted_at, ingested_at());
        assert_eq!(timeline.posts[2].posted_at, ingested_at());
    }

    #[test]
    fn media_prefers_full_resolution_then_preview() {
        let timeline = parse(
            r#"{
                "data": [
                    { "id": "1", "text": "photo", "attachments": { "media_keys": ["3_1"] } },
                    { "id": "2", "text": "video", "attachments": { "media_keys": ["7_2"] } },
                    { "id": "3", "text": "dangling", "attachments": { "media_keys": ["missing", "3_1"] } }
                ],
                "includes": { "media": [
                    { "media_key": "3_1", "type": "photo", "url": "https://pbs.example.com/full.jpg",
                      "preview_image_url": "https://pbs.example.com/small.jpg" },
                    { "media_key": "7_2", "type": "video", "preview_image_url": "https://pbs.example.com/v.jpg" }
                ] }
            }"#,
        );
        assert_eq!(
            timeline.posts[0].media_url.as_deref(),
            Some("https://pbs.example.com/full.jpg")
        );
        assert_eq!(
            timeline.posts[1].media_url.as_deref(),
            Some("https://pbs.example.com/v.jpg")
        );
        assert_eq!(
            timeline.posts[2].media_url.as_deref(),
            Some("https://pbs.example.com/full.jpg")
        );
    }

    #[test]
    fn media_key_without_include_leaves_media_empty() {
        let timeline = parse(
            r#"{ "data": [{ "id": "1", "text": "x", "attachments": { "media_keys": ["3_9"] } }] }"#,
        );
        assert!(timeline.posts[0].media_url.is_none());
    }

    #[test]
    fn outbound_link_prefers_expanded_url_and_skips_platform_links() {
        let timeline = parse(
            r#"{ "data": [{ "id": "1", "text": "quote https://t.co/q and https://t.co/a",
                 "entities": { "urls": [
                    { "url": "https://t.co/q", "expanded_url": "https://x.com/someone/status/5" },
                    { "url": "https://t.co/a", "expanded_url": "https://news.example.com/story" }
                 ] } }] }"#,
        );
        assert_eq!(
            timeline.posts[0].link_url.as_deref(),
            Some("https://news.example.com/story")
        );
        assert_eq!(timeline.posts[0].text, "quote and");
    }

    #[test]
    fn outbound_link_falls_back_to_text_without_entities() {
        let timeline = parse(r#"{ "data": [{ "id": "1", "text": "hello https://t.co/abc" }] }"#);
        assert_eq!(
            timeline.posts[0].link_url.as_deref(),
            Some("https://t.co/abc")
        );
    }

    #[test]
    fn account_missing_from_not_found_problem() {
        let timeline = parse(
            r#"{ "errors": [{
                "title": "Not Found Error",
                "type": "https://api.twitter.com/2/problems/resource-not-found",
                "detail": "Could not find user with id: [123]."
            }] }"#,
        );
        assert!(timeline.account_missing);
        assert!(timeline.posts.is_empty());
    }

    #[test]
    fn empty_timeline_is_not_missing_account() {
        let timeline = parse(r#"{ "meta": { "result_count": 0 } }"#);
        assert!(!timeline.account_missing);
        assert!(timeline.posts.is_empty());
    }
}
