//! Fills missing media from the outbound link's page preview.

use postwatch_core::NormalizedPost;

use crate::preview::PreviewResolver;

/// Looks up a preview image for every post that has no media but does have
/// an outbound link. Lookups run one at a time; a failed or empty lookup
/// leaves the post unchanged.
///
/// Returns the number of posts that gained media.
pub async fn enrich_missing_media<R: PreviewResolver>(
    resolver: &R,
    posts: &mut [NormalizedPost],
) -> usize {
    let mut enriched = 0;
    for post in posts.iter_mut().filter(|p| p.needs_media()) {
        let Some(link) = post.link_url.as_deref() else {
            continue;
        };
        if let Some(image) = resolver.resolve_preview_image(link).await {
            tracing::debug!(
                post_id = %post.external_post_id,
                link,
                image = %image,
                "media filled from link preview"
            );
            post.media_url = Some(image);
            enriched += 1;
        }
    }
    enriched
}
