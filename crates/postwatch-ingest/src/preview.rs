//! Link-preview image lookup used to enrich posts without attached media.

use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Url};

use crate::error::IngestError;

static META_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid regex"));
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\b([a-z][a-z0-9:_-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

/// Meta tags consulted in order; the first with usable content wins.
const PREVIEW_META_KEYS: &[(&str, &str)] = &[
    ("property", "og:image"),
    ("property", "og:image:url"),
    ("property", "og:image:secure_url"),
    ("name", "twitter:image"),
];

/// Resolves a representative preview image for an outbound link.
pub trait PreviewResolver: Send + Sync {
    /// Returns the preview image URL for `url`, or `None` when the page has
    /// none or cannot be fetched. Never fails.
    fn resolve_preview_image(&self, url: &str) -> impl Future<Output = Option<String>> + Send;
}

/// Fetches a page and reads its Open Graph / Twitter card image.
#[derive(Debug, Clone)]
pub struct PreviewFetcher {
    client: Client,
    user_agent: String,
}

impl PreviewFetcher {
    /// # Errors
    ///
    /// Returns [`IngestError::Http`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, IngestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            user_agent: user_agent.to_owned(),
        })
    }

    /// Builds a fetcher from application config.
    ///
    /// # Errors
    ///
    /// See [`PreviewFetcher::new`].
    pub fn from_app_config(config: &postwatch_core::AppConfig) -> Result<Self, IngestError> {
        Self::new(config.request_timeout_secs, &config.preview_user_agent)
    }

    /// Fetches `url` and extracts its preview image.
    ///
    /// Non-success statuses and non-HTML bodies yield `Ok(None)`. Relative
    /// image URLs are resolved against the final URL after redirects.
    ///
    /// # Errors
    ///
    /// - [`IngestError::InvalidRequest`] if `url` is not an absolute http(s) URL.
    /// - [`IngestError::Http`] on network failure or timeout.
    pub async fn fetch_preview_image(&self, url: &str) -> Result<Option<String>, IngestError> {
        let parsed = Url::parse(url)
            .map_err(|e| IngestError::InvalidRequest(format!("invalid link '{url}': {e}")))?;
        if !is_http(&parsed) {
            return Err(IngestError::InvalidRequest(format!(
                "unsupported link scheme '{}'",
                parsed.scheme()
            )));
        }

        let response = self
            .client
            .get(parsed)
            .header(USER_AGENT, self.user_agent.as_str())
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!(url, status = response.status().as_u16(), "preview page unavailable");
            return Ok(None);
        }

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| {
                let ct = ct.to_ascii_lowercase();
                ct.contains("text/html") || ct.contains("application/xhtml")
            });
        if !is_html {
            return Ok(None);
        }

        let final_url = response.url().clone();
        let body = response.text().await?;
        Ok(extract_preview_image(&final_url, &body))
    }
}

impl PreviewResolver for PreviewFetcher {
    async fn resolve_preview_image(&self, url: &str) -> Option<String> {
        match self.fetch_preview_image(url).await {
            Ok(image) => image,
            Err(e) => {
                tracing::debug!(url, error = %e, "preview lookup failed");
                None
            }
        }
    }
}

/// First preview image declared in `html`, absolutized against `base`.
#[must_use]
pub fn extract_preview_image(base: &Url, html: &str) -> Option<String> {
    PREVIEW_META_KEYS.iter().find_map(|(key_attr, key_value)| {
        find_meta_content(html, key_attr, key_value).and_then(|raw| absolutize_url(base, &raw))
    })
}

fn find_meta_content(html: &str, key_attr: &str, key_value: &str) -> Option<String> {
    META_TAG_RE.find_iter(html).find_map(|m| {
        let tag = m.as_str();
        let key = extract_attr(tag, key_attr)?;
        if key.eq_ignore_ascii_case(key_value) {
            extract_attr(tag, "content").filter(|c| !c.is_empty())
        } else {
            None
        }
    })
}

fn extract_attr(tag: &str, attr: &str) -> Option<String> {
    ATTR_RE.captures_iter(tag).find_map(|caps| {
        let name = caps.get(1)?.as_str();
        if !name.eq_ignore_ascii_case(attr) {
            return None;
        }
        caps.get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().trim().to_string())
    })
}

fn absolutize_url(base: &Url, candidate: &str) -> Option<String> {
    let candidate = candidate.replace("&amp;", "&");
    let joined = base.join(&candidate).ok()?;
    is_http(&joined).then(|| joined.to_string())
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://news.example.com/articles/42").unwrap()
    }

    #[test]
    fn extracts_og_image() {
        let html = r#"<head><meta property="og:image" content="https://cdn.example.com/hero.jpg"></head>"#;
        assert_eq!(
            extract_preview_image(&base(), html).as_deref(),
            Some("https://cdn.example.com/hero.jpg")
        );
    }

    #[test]
    fn resolves_relative_image_against_page() {
        let html = r#"<meta content="/img/cover.png" property="og:image">"#;
        assert_eq!(
            extract_preview_image(&base(), html).as_deref(),
            Some("https://news.example.com/img/cover.png")
        );
    }

    #[test]
    fn og_image_wins_over_twitter_image_regardless_of_position() {
        let html = r#"
            <meta name="twitter:image" content="https://cdn.example.com/card.jpg">
            <meta property="og:image" content="https://cdn.example.com/og.jpg">
        "#;
        assert_eq!(
            extract_preview_image(&base(), html).as_deref(),
            Some("https://cdn.example.com/og.jpg")
        );
    }

    #[test]
    fn falls_back_to_twitter_image() {
        let html = r#"<meta name='twitter:image' content='https://cdn.example.com/card.jpg'>"#;
        assert_eq!(
            extract_preview_image(&base(), html).as_deref(),
            Some("https://cdn.example.com/card.jpg")
        );
    }

    #[test]
    fn unescapes_ampersands_in_content() {
        let html = r#"<meta property="og:image" content="https://cdn.example.com/i?a=1&amp;b=2">"#;
        assert_eq!(
            extract_preview_image(&base(), html).as_deref(),
            Some("https://cdn.example.com/i?a=1&b=2")
        );
    }

    #[test]
    fn ignores_empty_and_non_http_content() {
        let html = r#"
            <meta property="og:image" content="">
            <meta property="og:image:url" content="javascript:alert(1)">
        "#;
        assert!(extract_preview_image(&base(), html).is_none());
    }

    #[test]
    fn page_without_meta_has_no_preview() {
        assert!(extract_preview_image(&base(), "<html><body>hi</body></html>").is_none());
    }

    #[test]
    fn does_not_confuse_og_image_width_with_image() {
        let html = r#"<meta property="og:image:width" content="1200">"#;
        assert!(extract_preview_image(&base(), html).is_none());
    }
}
