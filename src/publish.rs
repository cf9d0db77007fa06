// src/publish.rs
//! Publish a previously saved article. No generation calls are made, so no
//! rate budget is spent.

use std::path::Path;

use tracing::{info, warn};

use crate::article::ArticlePayload;
use crate::collab::{FeaturedMedia, PublishResponse, Publisher};
use crate::error::Result;
use crate::images::{image_filename, inject_hero_image, ImageResolver, ResolvedMedia};
use crate::pipeline::publish_article;
use crate::prompts::hero_image_prompt;
use crate::store::ArticleStore;

/// Optional featured-image step for [`publish_saved`].
pub struct HeroImage<'a> {
    pub resolver: &'a dyn ImageResolver,
    pub featured: &'a dyn FeaturedMedia,
}

pub async fn publish_saved(
    path: &Path,
    publisher: &dyn Publisher,
    hero: Option<HeroImage<'_>>,
) -> Result<PublishResponse> {
    let mut article = ArticleStore::load(path)?;
    info!(target: "publish", path = %path.display(), slug = %article.slug, "publishing saved article");

    let media = match &hero {
        Some(h) => resolve_hero(&mut article, h.resolver).await,
        None => None,
    };

    let resp = publish_article(publisher, &article).await?;
    info!(target: "publish", post_id = resp.id, link = %resp.link, "saved article published");

    if let (Some(h), Some(media_id)) = (&hero, media.and_then(|m| m.media_id)) {
        if let Err(e) = h.featured.set_featured_media(resp.id, media_id).await {
            warn!(target: "publish", post_id = resp.id, media_id, error = %e, "setting featured image failed");
        }
    }
    Ok(resp)
}

/// Generate, upload and inline the hero image. Failures leave the article as is.
async fn resolve_hero(article: &mut ArticlePayload, resolver: &dyn ImageResolver) -> Option<ResolvedMedia> {
    let prompt = hero_image_prompt(&article.title);
    let filename = image_filename(&article.slug, "hero");
    match resolver.resolve(&prompt, &filename).await {
        Ok(media) => {
            article.content_html = inject_hero_image(&article.content_html, &media.url, &article.title);
            Some(media)
        }
        Err(e) => {
            warn!(target: "publish", error = %e, "hero image failed, publishing without it");
            None
        }
    }
}
