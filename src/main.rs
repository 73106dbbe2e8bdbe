// studyboard - bootstrap runner for the relay service and the analysis
// batch jobs.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use studyboard::app_state::AppState;
use studyboard::assistant_client::AssistantClient;
use studyboard::chat_log::ChatLog;
use studyboard::cli::{AnalyzeJob, Cli, Commands};
use studyboard::config_loader::{load_config, resolve_api_key, StudyConfig};
use studyboard::relay_web::build_router;
use studyboard::survey::{self, Instrument};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { port } => serve(port).await,
        Commands::Analyze { job } => analyze(job),
    }
}

async fn serve(port_override: Option<u16>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_config().context("failed to load configuration")?;
    let api_key = resolve_api_key()?;
    if config.assistant.assistant_id.trim().is_empty() {
        bail!("assistant_id must be set ([assistant] in studyboard.toml or STUDYBOARD_ASSISTANT__ASSISTANT_ID)");
    }

    let client = AssistantClient::new(&config.assistant, api_key)
        .context("failed to build assistant client")?;
    let state = Arc::new(AppState::new(
        Arc::new(client),
        ChatLog::new(&config.relay.chat_log_path),
    ));
    let app = build_router(state, &config.relay.allowed_origins);

    let port = port_override.unwrap_or(config.relay.port);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "relay listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn analyze(job: AnalyzeJob) -> Result<()> {
    let config = load_config().context("failed to load configuration")?;

    let figure = match job {
        AnalyzeJob::Ues {
            input,
            participant_col,
            condition_col,
            instrument_file,
            out_dir,
        } => {
            let instrument = match instrument_file {
                Some(path) => Instrument::from_toml_path(path)?,
                None => Instrument::ues(),
            };
            survey::analyze_instrument(
                &input,
                &instrument,
                &participant_col,
                &condition_col,
                resolve_out_dir(&config, out_dir)?,
            )?
        }
        AnalyzeJob::Sus {
            input,
            condition_col,
            out_dir,
        } => survey::analyze_sus(&input, &condition_col, resolve_out_dir(&config, out_dir)?)?,
        AnalyzeJob::Items {
            input,
            items,
            condition_col,
            tag,
            out_dir,
        } => {
            if items.is_empty() {
                bail!("--items requires at least one column name");
            }
            survey::analyze_items(
                &input,
                &items,
                &condition_col,
                &tag,
                resolve_out_dir(&config, out_dir)?,
            )?
        }
    };

    println!("✅ Figure written: {}", figure.display());
    Ok(())
}

fn resolve_out_dir(config: &StudyConfig, override_dir: Option<String>) -> Result<PathBuf> {
    let dir = PathBuf::from(override_dir.unwrap_or_else(|| config.analysis.out_dir.clone()));
    if !dir.is_dir() {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    }
    Ok(dir)
}
