// src/prompts.rs
//! Role contexts and stage instructions sent to the text generator.

use std::fmt::Write as _;

use chrono::NaiveDate;

use crate::collab::{RoleContext, SearchHit};
use crate::config::{BrandConfig, InternalLink};
use crate::topic::TopicSelection;

/// Marker syntax the draft is asked to use and the injector looks for.
pub const IMAGE_MARKER_EXAMPLE: &str = "<!-- IMAGE: short description of the diagram -->";

const MAX_SEARCH_SNIPPET: usize = 400;

pub fn topic_scout() -> RoleContext {
    RoleContext {
        role: "Salesforce Topic Scout",
        goal: "Discover high-impact, SEO-worthy blog topics about Salesforce, balancing latest releases with evergreen fundamentals.",
        backstory: "You are a senior Salesforce content strategist. You understand core clouds \
(Sales, Service, Experience, Health), platform features (Apex, LWC, Flows, SOQL) and new \
innovations (Agentforce, Data Cloud, Einstein, OmniStudio)."
            .into(),
    }
}

pub fn content_planner() -> RoleContext {
    RoleContext {
        role: "Content Planner",
        goal: "Turn a chosen topic and fresh research into a detailed blog outline.",
        backstory: "You analyze Salesforce ecosystem trends, web searches and FAQs to propose \
well-structured outlines."
            .into(),
    }
}

pub fn seo_writer(brand: &BrandConfig) -> RoleContext {
    RoleContext {
        role: "SEO Blog Writer",
        goal: "Transform outlines into SEO-optimized, human-like HTML articles.",
        backstory: format!(
            "You are an award-winning technical writer. Always refer to the company as \"{}\". \
For any contact email always use {} and never invent another one.",
            brand.name, brand.contact_email
        ),
    }
}

pub fn visual_artist() -> RoleContext {
    RoleContext {
        role: "Visual Artist",
        goal: "Write precise prompts for clean, professional blog illustrations and diagrams.",
        backstory: "You design minimal, flat technical illustrations.".into(),
    }
}

pub fn topic_instructions(today: NaiveDate) -> String {
    format!(
        "Today is {today}. Pick ONE blog topic for today.\n\
Prefer a news topic when there is a notable recent release, otherwise an evergreen topic.\n\
Return ONLY a JSON object with this structure:\n\
{{\"topic\": \"...\", \"main_keyword\": \"...\", \"content_mode\": \"news\" | \"evergreen\", \
\"target_audience\": \"...\", \"reason\": \"...\", \"outline_seed\": [\"...\", \"...\"]}}"
    )
}

pub fn outline_instructions(topic: &TopicSelection, hits: &[SearchHit]) -> String {
    let mut out = format!(
        "Prepare a detailed blog outline for: '{}'.\nMain keyword: '{}'.\n",
        topic.topic, topic.main_keyword
    );
    if !topic.target_audience.is_empty() {
        let _ = writeln!(out, "Audience: {}.", topic.target_audience);
    }
    if !topic.outline_seed.is_empty() {
        let _ = writeln!(out, "Seed points to cover:");
        for seed in &topic.outline_seed {
            let _ = writeln!(out, "- {seed}");
        }
    }
    if !hits.is_empty() {
        let _ = writeln!(out, "\nResearch (ranked):");
        for (i, h) in hits.iter().enumerate() {
            let snippet: String = h.content.chars().take(MAX_SEARCH_SNIPPET).collect();
            let _ = writeln!(out, "{}. {} ({})\n   {}", i + 1, h.title, h.url, snippet.trim());
        }
    }
    out.push_str("\nPropose an H2/H3 structure with bullet points of key points under each heading.");
    out
}

pub fn draft_instructions(
    topic: &TopicSelection,
    outline: &str,
    brand: &BrandConfig,
    links: &[InternalLink],
) -> String {
    let mut out = format!(
        "Write a full SEO-optimized blog article in clean HTML using this outline:\n\n{outline}\n\n\
TOPIC: {}\n\
MAIN KEYWORD: '{}' must appear in the title, the introduction paragraph and at least one <h2>.\n\n\
HTML STRUCTURE RULES:\n\
- Start with a single <h1>.\n\
- Use <h2> for major sections and <h3> for subsections.\n\
- Use <p>, <ul>, <ol> and <strong> where appropriate.\n\
- End with an FAQ section of 4-6 Q&A items.\n\
- Where a diagram would help, insert a marker exactly like {IMAGE_MARKER_EXAMPLE}.\n\n\
BRAND RULES:\n\
- Use the brand name \"{}\" when referring to the company.\n\
- For contact, always use {}; never invent companies, emails or domains.\n",
        topic.topic, topic.main_keyword, brand.name, brand.contact_email
    );
    if !links.is_empty() {
        out.push_str(
            "\nINTERNAL LINKS: include 2-3 of these naturally in the body as \
<a href=\"URL\" target=\"_blank\" rel=\"noopener noreferrer\">anchor</a>:\n",
        );
        for l in links {
            let _ = writeln!(out, "- {} | {} | {}", l.title, l.url, l.anchor);
        }
        out.push_str("Do not include external links.\n");
    }
    out.push_str(
        "\nOUTPUT FORMAT (STRICT): output ONLY one JSON object:\n\
{\"title\": \"<title>\", \"slug\": \"<seo-friendly-slug>\", \
\"meta_description\": \"<155-character description>\", \
\"content_html\": \"<FULL HTML AS A SINGLE STRING>\"}\n\
No explanations or chat text outside the JSON.",
    );
    out
}

pub fn image_prompt_instructions(draft_json: &str, descriptions: &[String]) -> String {
    let mut out = String::from(
        "Below is a finished article as JSON. Do NOT rewrite it.\n\
For each image placeholder description listed, write one image-generation prompt \
for a clean, minimal, flat technical illustration (16:9, no text clutter).\n\nPlaceholders:\n",
    );
    for (i, d) in descriptions.iter().enumerate() {
        let _ = writeln!(out, "{}. {d}", i + 1);
    }
    let _ = write!(
        out,
        "\nReturn ONLY JSON: {{\"images\": [\"<prompt for placeholder 1>\", \"<prompt for placeholder 2>\"]}} \
with exactly one prompt per placeholder, in the same order. \
Return {{\"images\": []}} if there is nothing to illustrate.\n\n\
ARTICLE:\n{draft_json}"
    );
    out
}

/// Used when no generated prompt exists for a placeholder.
pub fn derive_image_prompt(description: &str) -> String {
    format!(
        "Minimal flat technical illustration for a blog article: {}. Clean, modern, 16:9, no text.",
        description.trim()
    )
}

pub fn hero_image_prompt(title: &str) -> String {
    format!(
        "Featured image for blog article titled '{title}'. Minimal, flat tech illustration, \
Salesforce automation theme, 16:9 aspect ratio."
    )
}
