//! blog-pipeline: binary entrypoint.
//! Loads config and secrets, wires the HTTP collaborators, and runs one
//! subcommand.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use blog_pipeline::collab::local::LocalImageGenerator;
use blog_pipeline::collab::openai::{OpenAiGenerator, OpenAiImageGenerator};
use blog_pipeline::collab::tavily::TavilySearch;
use blog_pipeline::collab::wordpress::WordPressClient;
use blog_pipeline::collab::{ImageGenerator, NoSearch, Publisher, TextGenerator, WebSearch};
use blog_pipeline::config::{PipelineConfig, Secrets};
use blog_pipeline::generation::GenerationGate;
use blog_pipeline::images::{GeneratingResolver, ImageResolver};
use blog_pipeline::publish::{publish_saved, HeroImage};
use blog_pipeline::{Collaborators, PipelineOrchestrator, RunError, TopicSelection, TopicSelector};

#[derive(Parser, Debug)]
#[command(name = "blog-pipeline", version, about = "Topic → outline → draft → images → publish")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Select a topic, generate the article and publish it.
    Run(TopicArgs),
    /// Generate and save the article without publishing.
    Generate(TopicArgs),
    /// Publish a saved article JSON file.
    Publish {
        path: PathBuf,
        /// Skip the featured image even when enabled in config.
        #[arg(long)]
        no_hero: bool,
    },
    /// Run topic selection only and print the result.
    Topic,
}

#[derive(Args, Debug)]
struct TopicArgs {
    /// Use this topic instead of asking the model.
    #[arg(long)]
    topic: Option<String>,
    #[arg(long, requires = "topic")]
    keyword: Option<String>,
}

/// Compact logs by default; `PIPELINE_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("blog_pipeline=info,warn"));
    let json = std::env::var("PIPELINE_LOG_JSON").is_ok_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn text_generator(cfg: &PipelineConfig, secrets: &Secrets) -> Result<Arc<dyn TextGenerator>> {
    let mut client = OpenAiGenerator::new(secrets.openai()?, cfg.models.text.clone())?;
    if let Some(base) = &cfg.models.api_base {
        client = client.with_base_url(base.clone());
    }
    Ok(Arc::new(client))
}

fn web_search(secrets: &Secrets) -> Result<Arc<dyn WebSearch>> {
    match &secrets.tavily_api_key {
        Some(key) => Ok(Arc::new(TavilySearch::new(key.clone())?)),
        None => {
            warn!("TAVILY_API_KEY not set, outlines will be written without research");
            Ok(Arc::new(NoSearch))
        }
    }
}

fn wordpress(cfg: &PipelineConfig, secrets: &Secrets) -> Result<Arc<WordPressClient>> {
    let (base, user, pass) = secrets.wordpress()?;
    Ok(Arc::new(WordPressClient::new(base, user, pass, &cfg.wordpress)?))
}

fn image_resolver(
    cfg: &PipelineConfig,
    secrets: &Secrets,
    wp: Arc<WordPressClient>,
) -> Result<Arc<dyn ImageResolver>> {
    let images: Arc<dyn ImageGenerator> = if cfg.images.mock {
        info!(path = %cfg.images.mock_image_path.display(), "image mock mode enabled");
        Arc::new(LocalImageGenerator::new(cfg.images.mock_image_path.clone()))
    } else {
        let mut client = OpenAiImageGenerator::new(
            secrets.openai()?,
            cfg.models.image.clone(),
            cfg.models.image_size.clone(),
        )?;
        if let Some(base) = &cfg.models.api_base {
            client = client.with_base_url(base.clone());
        }
        Arc::new(client)
    };
    Ok(Arc::new(GeneratingResolver::new(images, wp)))
}

fn orchestrator(cfg: &PipelineConfig, secrets: &Secrets) -> Result<PipelineOrchestrator> {
    let wp = wordpress(cfg, secrets)?;
    let publisher: Arc<dyn Publisher> = wp.clone();
    let collab = Collaborators {
        generator: text_generator(cfg, secrets)?,
        search: web_search(secrets)?,
        resolver: image_resolver(cfg, secrets, wp)?,
        publisher,
    };
    Ok(PipelineOrchestrator::new(collab, cfg.rate_limit.build(), cfg))
}

async fn topic_for(orch: &PipelineOrchestrator, args: &TopicArgs) -> TopicSelection {
    match &args.topic {
        Some(t) => TopicSelection::manual(t, args.keyword.as_deref()),
        None => orch.select_topic(Local::now().date_naive()).await,
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("serializing output")?);
    Ok(())
}

fn report_run_error(err: &RunError) {
    match err {
        RunError::Aborted { stage, error } => {
            error!(%stage, error = %error, "run aborted");
        }
        RunError::PublishFailed { article, error } => {
            error!(slug = %article.article.slug, error = %error, "publish failed");
            match &article.saved_to {
                Some(path) => eprintln!(
                    "Article saved to {}. Retry with: blog-pipeline publish {}",
                    path.display(),
                    path.display()
                ),
                None => eprintln!("Article was not saved; enable [output] dir to keep it."),
            }
        }
    }
}

async fn execute(cli: Cli) -> Result<ExitCode> {
    let cfg = PipelineConfig::load_default()?;
    let secrets = Secrets::from_env();
    info!(?secrets, "configuration loaded");

    match cli.command {
        Command::Run(args) => {
            let orch = orchestrator(&cfg, &secrets)?;
            let topic = topic_for(&orch, &args).await;
            match orch.run(&topic).await {
                Ok(report) => {
                    info!(post_id = report.published.id, llm_calls = report.llm_calls, "run finished");
                    print_json(&report.published)?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    report_run_error(&e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Generate(args) => {
            let orch = orchestrator(&cfg, &secrets)?;
            let topic = topic_for(&orch, &args).await;
            match orch.generate(&topic).await {
                Ok(generated) => {
                    info!(llm_calls = orch.llm_calls(), "generation finished");
                    print_json(&generated)?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    report_run_error(&e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Publish { path, no_hero } => {
            let wp = wordpress(&cfg, &secrets)?;
            let resolver = if cfg.images.hero && !no_hero {
                Some(image_resolver(&cfg, &secrets, wp.clone())?)
            } else {
                None
            };
            let hero = resolver.as_deref().map(|resolver| HeroImage {
                resolver,
                featured: wp.as_ref(),
            });
            match publish_saved(&path, wp.as_ref(), hero).await {
                Ok(resp) => {
                    print_json(&resp)?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "publish failed");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Topic => {
            let gate = GenerationGate::new(text_generator(&cfg, &secrets)?, cfg.rate_limit.build());
            let topic = TopicSelector::new(&gate, &cfg.fallback_topic)
                .select(Local::now().date_naive())
                .await;
            print_json(&topic)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    match execute(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = ?e, "blog-pipeline failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
