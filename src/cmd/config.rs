use std::io::{self, Write};

use clap::{Args, Subcommand};

use crate::config::{StoredConfig, config_file_path};
use crate::error::AppResult;
use crate::infra::openai::validate_api_key;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Run the interactive configuration wizard.
    Init,
    /// Show the stored configuration (secrets masked).
    Show,
}

pub fn run(command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Init => run_init(),
        ConfigCommand::Show => run_show(),
    }
}

fn run_init() -> AppResult<()> {
    let mut cfg = StoredConfig::load()?;

    println!("Configuring sn-triage.");
    println!("Press Enter to keep the current value, '-' to clear it.");
    println!("Secrets are stored in the local config file; protect your filesystem accordingly.");
    println!();

    apply_prompt("Instance username", &mut cfg.instance_user, false)?;
    apply_prompt("Instance token or password", &mut cfg.instance_token, true)?;
    apply_prompt("OpenAI API key", &mut cfg.openai_api_key, true)?;
    if let Some(key) = &cfg.openai_api_key {
        if let Err(err) = validate_api_key(key) {
            println!("Warning: {err}");
        }
    }
    apply_bool_prompt("Privacy filter for analysis (y/n)", &mut cfg.privacy_filter)?;
    apply_prompt(
        "Default ticket list page URL",
        &mut cfg.default_page_url,
        false,
    )?;

    cfg.save()?;

    let path = config_file_path()?;
    println!("\nConfiguration saved to {}", path.display());
    Ok(())
}

fn run_show() -> AppResult<()> {
    let cfg = StoredConfig::load()?;
    let path = config_file_path()?;

    println!("Configuration file: {}", path.display());
    println!("Instance username: {}", display_value(&cfg.instance_user));
    println!("Instance token: {}", mask_secret(&cfg.instance_token));
    println!("OpenAI API key: {}", mask_secret(&cfg.openai_api_key));
    println!(
        "Privacy filter: {}",
        cfg.privacy_filter
            .map(|enabled| enabled.to_string())
            .unwrap_or_else(|| "<not set, defaults to true>".to_string())
    );
    println!(
        "Default page URL: {}",
        display_value(&cfg.default_page_url)
    );

    Ok(())
}

fn apply_prompt(field: &str, target: &mut Option<String>, secret: bool) -> AppResult<()> {
    match prompt(field, target.as_deref(), secret)? {
        PromptAction::Keep => {}
        PromptAction::Clear => *target = None,
        PromptAction::Set(value) => *target = Some(value),
    }
    Ok(())
}

fn apply_bool_prompt(field: &str, target: &mut Option<bool>) -> AppResult<()> {
    let current = target.map(|enabled| if enabled { "y" } else { "n" }.to_string());
    let mut text = current.clone();
    apply_prompt(field, &mut text, false)?;
    *target = match text.as_deref().map(str::to_lowercase).as_deref() {
        Some("y") | Some("yes") | Some("true") => Some(true),
        Some("n") | Some("no") | Some("false") => Some(false),
        _ => None,
    };
    Ok(())
}

fn prompt(field: &str, current: Option<&str>, secret: bool) -> AppResult<PromptAction> {
    let mut stdout = io::stdout();

    match (current, secret) {
        (Some(_), true) => write!(stdout, "{field} [****] (Enter to keep, '-' to clear): ")?,
        (Some(value), false) => {
            write!(stdout, "{field} [{value}] (Enter to keep, '-' to clear): ")?
        }
        (None, _) => write!(stdout, "{field} (Enter to skip): ")?,
    }
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let trimmed = input.trim();

    if trimmed.is_empty() {
        Ok(PromptAction::Keep)
    } else if trimmed == "-" {
        Ok(PromptAction::Clear)
    } else {
        Ok(PromptAction::Set(trimmed.to_string()))
    }
}

fn display_value(value: &Option<String>) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<not set>".to_string())
}

fn mask_secret(value: &Option<String>) -> String {
    match value {
        Some(token) if token.len() > 6 => {
            let prefix = &token[..3];
            let suffix = &token[token.len() - 3..];
            format!("{prefix}***{suffix}")
        }
        Some(token) if !token.is_empty() => "***".to_string(),
        _ => "<not set>".to_string(),
    }
}

enum PromptAction {
    Keep,
    Clear,
    Set(String),
}
