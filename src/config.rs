use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::parser::mapper::FieldDictionary;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const CONFIG_FILE_NAME: &str = "config.json";

/// Engine tuning and dictionaries, injected into the strategies at
/// construction. Immutable for the lifetime of a process.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub retry_attempts: u32,
    pub retry_base_delay: Duration,
    pub api_limit: usize,
    pub supported_tables: Vec<String>,
    pub ticket_prefixes: Vec<String>,
    pub field_aliases: FieldDictionary,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        fn list(values: &[&str]) -> Vec<String> {
            values.iter().map(|v| v.to_string()).collect()
        }
        Self {
            retry_attempts: 3,
            retry_base_delay: Duration::from_millis(1000),
            api_limit: 200,
            supported_tables: list(&[
                "issue",
                "incident",
                "problem",
                "change_request",
                "sc_req_item",
                "sc_task",
            ]),
            ticket_prefixes: list(&["ISU", "INC", "PRB", "CHG", "RITM", "SCTASK"]),
            field_aliases: FieldDictionary::default(),
        }
    }
}

/// User settings persisted in the config file. All optional; commands warn
/// about whichever missing value they need.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StoredConfig {
    pub instance_user: Option<String>,
    pub instance_token: Option<String>,
    pub openai_api_key: Option<String>,
    pub privacy_filter: Option<bool>,
    pub default_page_url: Option<String>,
}

impl StoredConfig {
    pub fn load() -> AppResult<Self> {
        let path = config_file_path()?;
        match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|err| AppError::Configuration(format!("invalid config file: {err}"))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    pub fn save(&self) -> AppResult<()> {
        let path = config_file_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|err| AppError::Configuration(format!("failed to write config: {err}")))?;
        fs::write(&path, data)?;
        Ok(())
    }

    /// Basic-auth credentials for the instance, when both halves are set.
    pub fn credentials(&self) -> Option<(String, String)> {
        match (&self.instance_user, &self.instance_token) {
            (Some(user), Some(token)) if !user.is_empty() && !token.is_empty() => {
                Some((user.clone(), token.clone()))
            }
            _ => None,
        }
    }
}

pub fn config_directory() -> AppResult<PathBuf> {
    if let Ok(dir) = env::var("SN_TRIAGE_CONFIG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = env::var("HOME")
        .map_err(|_| AppError::Configuration("HOME is not set".to_string()))?;
    Ok(PathBuf::from(home).join(".config").join("sn-triage"))
}

pub fn config_file_path() -> AppResult<PathBuf> {
    Ok(config_directory()?.join(CONFIG_FILE_NAME))
}
