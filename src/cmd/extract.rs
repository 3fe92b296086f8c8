use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::config::StoredConfig;
use crate::context::AppContext;
use crate::domain::page::ListPage;
use crate::domain::payload::ResultPayload;
use crate::error::{AppError, AppResult};
use crate::workflow::extract::run_extraction;

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Ticket list page URL. Falls back to the configured default.
    pub url: Option<String>,
    /// Keep the process alive and re-run on every newline from stdin.
    #[arg(short, long)]
    pub watch: bool,
}

pub async fn run(ctx: &AppContext, stored: &StoredConfig, args: ExtractArgs) -> AppResult<()> {
    let page_url = args
        .url
        .or_else(|| stored.default_page_url.clone())
        .ok_or_else(|| {
            AppError::Configuration(
                "no page URL given and no default configured; run `sn-triage config init`"
                    .to_string(),
            )
        })?;
    let page = ListPage::resolve(&page_url)?;
    info!(page = %page.page_url(), list = %page.list_url(), "resolved list page");

    let payload = run_extraction(ctx, &page).await?;
    print_summary(&payload);

    if args.watch {
        println!("Watching; press Enter to refresh, Ctrl-D to stop.");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while lines.next_line().await?.is_some() {
            let payload = run_extraction(ctx, &page).await?;
            print_summary(&payload);
        }
    }

    Ok(())
}

fn print_summary(payload: &ResultPayload) {
    match payload {
        ResultPayload::Success(success) => {
            println!(
                "Extracted {} tickets via {} from {}",
                success.count,
                success.method.as_str(),
                success.resolved_list_url
            );
        }
        ResultPayload::Failure(failure) => {
            if let Some(critical) = &failure.critical_error {
                println!("Extraction failed: {}", critical.message);
                return;
            }
            println!("All strategies failed:");
            for (strategy, message) in &failure.errors {
                println!("  {strategy}: {message}");
            }
        }
    }
}
