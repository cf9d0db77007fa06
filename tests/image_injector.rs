// tests/image_injector.rs
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::{general_purpose::STANDARD, Engine};
use blog_pipeline::collab::{ImageGenerator, MediaUploader, UploadedMedia};
use blog_pipeline::events::{PipelineEvent, PipelineObserver, Stage};
use blog_pipeline::images::{
    find_placeholders, inject_hero_image, inject_images, GeneratingResolver, ImagePrompt,
    ImageResolver, ResolvedMedia,
};
use blog_pipeline::{PipelineError, Result};

/// Resolves `n`-th call to `https://x/{n}.png`; calls listed in `fail_on` error out.
#[derive(Default)]
struct CountingResolver {
    fail_on: Vec<usize>,
    seen: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ImageResolver for CountingResolver {
    async fn resolve(&self, prompt: &str, filename: &str) -> Result<ResolvedMedia> {
        let mut seen = self.seen.lock().unwrap();
        seen.push((prompt.to_string(), filename.to_string()));
        let n = seen.len();
        if self.fail_on.contains(&n) {
            return Err(PipelineError::UploadIncomplete {
                filename: filename.to_string(),
            });
        }
        Ok(ResolvedMedia {
            url: format!("https://x/{n}.png"),
            media_id: Some(n as u64),
        })
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<PipelineEvent>>);

impl PipelineObserver for Recorder {
    fn on_event(&self, event: &PipelineEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

const MARKER: &str = "<!-- IMAGE:";

#[tokio::test]
async fn zero_placeholders_is_unchanged() {
    let html = "<h1>T</h1><p>No images here.</p>";
    let resolver = CountingResolver::default();
    let out = inject_images(html, "t", &[], &resolver, &Recorder::default()).await;
    assert_eq!(out.content_html, html);
    assert!(out.resolved.is_empty() && out.skipped.is_empty());
    assert!(resolver.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn single_placeholder_scenario() {
    let html = "<h2>A</h2><!-- IMAGE: flow diagram --><p>...</p>";
    let out = inject_images(html, "a", &[], &CountingResolver::default(), &Recorder::default()).await;
    assert!(out.content_html.contains("https://x/1.png"));
    assert!(out.content_html.contains("<figure"));
    assert!(out.content_html.contains("alt=\"flow diagram\""));
    assert!(!out.content_html.contains(MARKER));
    assert!(out.content_html.starts_with("<h2>A</h2>") && out.content_html.ends_with("<p>...</p>"));
}

#[tokio::test]
async fn all_successes_leave_no_markers() {
    let html = "<!-- IMAGE: one --><p>a</p><!-- IMAGE: two --><p>b</p><!-- IMAGE: three -->";
    let out = inject_images(html, "s", &[], &CountingResolver::default(), &Recorder::default()).await;
    assert_eq!(out.resolved.len(), 3);
    assert!(!out.content_html.contains(MARKER));
    let p1 = out.content_html.find("https://x/1.png").unwrap();
    let p3 = out.content_html.find("https://x/3.png").unwrap();
    assert!(p1 < p3);
}

#[tokio::test]
async fn mth_failure_leaves_exactly_that_marker() {
    let html = "<!-- IMAGE: one --><p>a</p><!-- IMAGE: two --><p>b</p><!-- IMAGE: three -->";
    let resolver = CountingResolver {
        fail_on: vec![2],
        ..Default::default()
    };
    let recorder = Recorder::default();
    let out = inject_images(html, "s", &[], &resolver, &recorder).await;

    assert_eq!(out.content_html.matches(MARKER).count(), 1);
    assert!(out.content_html.contains("<!-- IMAGE: two -->"));
    assert_eq!(out.resolved.len(), 2);
    assert_eq!(out.skipped.len(), 1);
    assert_eq!(out.skipped[0].description, "two");

    let events = recorder.0.lock().unwrap();
    assert!(matches!(
        &events[..],
        [PipelineEvent::ItemSkipped { stage: Stage::ImageResolution, item, .. }] if item == "two"
    ));
}

#[tokio::test]
async fn repeated_descriptions_map_one_to_one() {
    let html = "<!-- IMAGE: chart --><p>x</p><!-- IMAGE: chart -->";
    let resolver = CountingResolver {
        fail_on: vec![1],
        ..Default::default()
    };
    let out = inject_images(html, "s", &[], &resolver, &Recorder::default()).await;
    // First stays, second is resolved.
    assert!(out.content_html.starts_with("<!-- IMAGE: chart --><p>x</p><figure"));
    assert!(out.content_html.contains("https://x/2.png"));
}

#[tokio::test]
async fn generated_prompts_are_used_when_present() {
    let html = "<!-- IMAGE: Flow Diagram --><!-- IMAGE: other -->";
    let resolver = CountingResolver::default();
    let prompts = vec![ImagePrompt {
        description: "flow diagram".into(),
        prompt: "isometric flow chart".into(),
    }];
    inject_images(html, "slug", &prompts, &resolver, &Recorder::default()).await;
    let seen = resolver.seen.lock().unwrap();
    assert_eq!(seen[0].0, "isometric flow chart");
    assert!(seen[1].0.contains("other"));
    assert!(seen[0].1.starts_with("slug-") && seen[0].1.ends_with(".png"));
}

struct FixedImage;

#[async_trait]
impl ImageGenerator for FixedImage {
    async fn generate_image(&self, _prompt: &str) -> Result<String> {
        Ok(STANDARD.encode(b"png-bytes"))
    }
}

struct Uploader {
    url: Option<String>,
    bytes: Mutex<Vec<u8>>,
}

#[async_trait]
impl MediaUploader for Uploader {
    async fn upload(&self, image_bytes: Vec<u8>, _filename: &str) -> Result<UploadedMedia> {
        *self.bytes.lock().unwrap() = image_bytes;
        Ok(UploadedMedia {
            id: Some(9),
            url: self.url.clone(),
        })
    }
}

#[tokio::test]
async fn generating_resolver_decodes_and_uploads() {
    let uploader = Arc::new(Uploader {
        url: Some("https://cdn/9.png".into()),
        bytes: Mutex::new(Vec::new()),
    });
    let resolver = GeneratingResolver::new(Arc::new(FixedImage), uploader.clone());
    let media = resolver.resolve("p", "f.png").await.unwrap();
    assert_eq!(media.url, "https://cdn/9.png");
    assert_eq!(media.media_id, Some(9));
    assert_eq!(*uploader.bytes.lock().unwrap(), b"png-bytes".to_vec());
}

#[tokio::test]
async fn missing_upload_url_skips_only_that_image() {
    let resolver = GeneratingResolver::new(
        Arc::new(FixedImage),
        Arc::new(Uploader {
            url: None,
            bytes: Mutex::new(Vec::new()),
        }),
    );
    let err = resolver.resolve("p", "f.png").await.unwrap_err();
    assert!(matches!(err, PipelineError::UploadIncomplete { ref filename } if filename == "f.png"));

    let html = "<p>a</p><!-- IMAGE: diagram -->";
    let out = inject_images(html, "s", &[], &resolver, &Recorder::default()).await;
    assert_eq!(out.content_html, html);
    assert_eq!(find_placeholders(&out.content_html).len(), 1);
}

#[test]
fn hero_without_h1_is_prepended() {
    let out = inject_hero_image("<p>body</p>", "https://x/h.png", "Title");
    assert!(out.trim_start().starts_with("<p><img src=\"https://x/h.png\""));
}
