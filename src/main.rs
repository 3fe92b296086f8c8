mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod parser;
mod services;
mod workflow;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::extract::{self, ExtractArgs};
use crate::cmd::report::{self, ReportArgs};
use crate::config::{ExtractorConfig, StoredConfig};
use crate::context::AppContext;
use crate::error::AppResult;
use crate::infra::bulk_export::BulkExportStrategy;
use crate::infra::dom::DomStrategy;
use crate::infra::http::ReqwestGateway;
use crate::infra::openai::OpenAiClient;
use crate::infra::query_api::QueryApiStrategy;
use crate::infra::store::FileStore;
use crate::parser::identifier::TicketIdMatcher;
use crate::services::{ExtractionStrategy, HttpGateway};

#[derive(Parser)]
#[command(name = "sn-triage", author, version, about = "Ticket list extraction and triage CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract tickets from a list page and store the result.
    Extract(ExtractArgs),
    /// Print the state breakdown of the stored result.
    Report(ReportArgs),
    /// Draft a status email from the stored result.
    Analyze(ReportArgs),
    /// Manage CLI configuration.
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config(args) => config_cmd::run(args.command),
        Commands::Report(args) => report::run_report(args),
        Commands::Extract(args) => {
            let stored = StoredConfig::load()?;
            let ctx = build_context(&stored)?;
            extract::run(&ctx, &stored, args).await
        }
        Commands::Analyze(args) => {
            let stored = StoredConfig::load()?;
            let ctx = build_context(&stored)?;
            report::run_analyze(&ctx, &stored, args).await
        }
    }
}

fn build_context(stored: &StoredConfig) -> AppResult<AppContext> {
    let config = ExtractorConfig::default();

    if stored.credentials().is_none() {
        eprintln!(
            "Warning: instance credentials not configured; authenticated endpoints may reject requests."
        );
    }

    let http: Arc<dyn HttpGateway> = Arc::new(ReqwestGateway::new(stored.credentials()));
    let matcher = TicketIdMatcher::new(&config.ticket_prefixes)?;

    let strategies: Vec<Arc<dyn ExtractionStrategy>> = vec![
        Arc::new(BulkExportStrategy::new(
            http.clone(),
            config.field_aliases.clone(),
            matcher.clone(),
            config.retry_attempts,
            config.retry_base_delay,
        )),
        Arc::new(QueryApiStrategy::new(
            http.clone(),
            matcher.clone(),
            config.supported_tables.clone(),
            config.api_limit,
        )),
        Arc::new(DomStrategy::new(
            http,
            config.field_aliases.clone(),
            matcher,
        )),
    ];

    let publisher = Arc::new(FileStore::open()?);
    let analysis = Arc::new(OpenAiClient::new(stored.openai_api_key.clone())?);

    Ok(AppContext::new(config, strategies, publisher, analysis))
}
