use clap::Args;

use crate::config::StoredConfig;
use crate::context::AppContext;
use crate::domain::payload::ResultPayload;
use crate::domain::report::{build_analysis_prompt, render_report};
use crate::error::{AppError, AppResult};
use crate::infra::store::{FileStore, context_id};

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Page URL whose stored result to report on. Defaults to the most
    /// recently published payload.
    pub url: Option<String>,
}

/// Renders the state breakdown for the stored extraction result.
pub fn run_report(args: ReportArgs) -> AppResult<()> {
    let payload = load_payload(args.url.as_deref())?;
    match payload {
        ResultPayload::Success(success) => {
            println!("{}", render_report(&success.tickets));
        }
        ResultPayload::Failure(failure) => print_failure(&failure),
    }
    Ok(())
}

/// Sends the stored tickets to the analysis collaborator and prints the
/// drafted status email.
pub async fn run_analyze(
    ctx: &AppContext,
    stored: &StoredConfig,
    args: ReportArgs,
) -> AppResult<()> {
    let payload = load_payload(args.url.as_deref())?;
    let success = match payload {
        ResultPayload::Success(success) => success,
        ResultPayload::Failure(failure) => {
            print_failure(&failure);
            return Err(AppError::Analysis(
                "stored result is a failure; nothing to analyze".to_string(),
            ));
        }
    };
    if success.tickets.is_empty() {
        return Err(AppError::Analysis(
            "stored result has no tickets; run an extraction first".to_string(),
        ));
    }

    let prompt = build_analysis_prompt(&success.tickets);
    let privacy_filter = stored.privacy_filter.unwrap_or(true);
    let draft = ctx.analysis.analyze(&prompt, privacy_filter).await?;
    println!("{draft}");
    Ok(())
}

fn load_payload(url: Option<&str>) -> AppResult<ResultPayload> {
    let store = FileStore::open()?;
    let context = url.map(context_id);
    store
        .read_latest(context.as_deref())?
        .ok_or_else(|| {
            AppError::Storage("no stored result; run `sn-triage extract` first".to_string())
        })
}

fn print_failure(failure: &crate::domain::payload::FailurePayload) {
    println!("Last run failed at {}:", failure.timestamp);
    if let Some(critical) = &failure.critical_error {
        println!("  critical: {}", critical.message);
    }
    for (strategy, message) in &failure.errors {
        println!("  {strategy}: {message}");
    }
}
