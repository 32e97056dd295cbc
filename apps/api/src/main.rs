mod config;
mod errors;
mod extraction;
mod llm_client;
mod routes;
mod screening;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::{Parser, Subcommand};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::extraction::extract_resume_text;
use crate::llm_client::{LlmClient, LlmSettings};
use crate::routes::build_router;
use crate::screening::handlers::to_screening_result;
use crate::screening::pipeline::ScreeningPipeline;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "screener", version, about = "LLM-backed resume screening service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Screen a single resume file and print the outcome.
    Screen {
        /// Path to a .pdf, .docx or .doc resume.
        #[arg(long)]
        resume: PathBuf,
        /// Job description text to screen against.
        #[arg(long)]
        job_description: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pipeline = build_pipeline(&config)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, pipeline).await,
        Command::Screen {
            resume,
            job_description,
        } => screen_file(&pipeline, resume, job_description).await,
    }
}

fn build_pipeline(config: &Config) -> Result<ScreeningPipeline> {
    let llm = LlmClient::new(LlmSettings {
        api_url: config.llm_api_url.clone(),
        api_key: config.groq_api_key.clone(),
        model: config.llm_model.clone(),
        timeout: Duration::from_secs(config.llm_timeout_secs),
        max_retries: config.llm_max_retries,
        backoff: Duration::from_millis(config.llm_backoff_ms),
    })
    .context("Failed to build LLM client")?;
    info!("LLM client initialized (model: {})", llm.model());

    Ok(ScreeningPipeline::new(Arc::new(llm), config.label_matching))
}

async fn serve(config: &Config, pipeline: ScreeningPipeline) -> Result<()> {
    info!("Starting screener API v{}", env!("CARGO_PKG_VERSION"));

    let app = build_router(AppState {
        pipeline,
        max_upload_bytes: config.max_upload_bytes,
    })
    .layer(TraceLayer::new_for_http())
    .layer(cors_layer(&config.frontend_origin)?);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// CORS limited to the configured frontend, with credentials.
/// Requests from any other origin get no allow-origin header.
fn cors_layer(frontend_origin: &str) -> Result<CorsLayer> {
    let origin: HeaderValue = frontend_origin
        .parse()
        .with_context(|| format!("FRONTEND_ORIGIN '{frontend_origin}' is not a valid origin"))?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list([origin]))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

async fn screen_file(
    pipeline: &ScreeningPipeline,
    resume: PathBuf,
    job_description: String,
) -> Result<()> {
    let resume_text = tokio::task::spawn_blocking(move || extract_resume_text(&resume))
        .await
        .context("Resume extraction task failed")??;

    let state = pipeline.run(resume_text, job_description).await?;
    let response = state.response.clone().unwrap_or_default();
    let result = to_screening_result(state, pipeline.label_matching());

    println!("\nScreening Results:");
    println!(
        "Email: {}",
        result.candidate_email.as_deref().unwrap_or("None")
    );
    println!(
        "Experience Level: {}",
        result.experience_level.as_deref().unwrap_or_default()
    );
    println!("Skill Match: {}", result.skill_match);
    println!("Decision: {:?} ({response})", result.decision);

    Ok(())
}
