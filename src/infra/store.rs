use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::config::config_directory;
use crate::domain::payload::ResultPayload;
use crate::error::{AppError, AppResult};
use crate::services::publisher::{ChangeNotifier, PublisherService};

const STORE_FILE_NAME: &str = "results.json";

/// Key every consumer historically reads; always mirrors the latest payload.
pub const LEGACY_RESULT_KEY: &str = "SN_COPILOT_RESULTS";
pub const SAVED_AT_KEY: &str = "SN_COPILOT_SAVED_AT";
pub const LAST_ACTIVE_KEY: &str = "SN_LAST_ACTIVE_CONTEXT";

pub fn context_key(context_id: &str) -> String {
    format!("SN_DATA_{context_id}")
}

/// Stable short id for one list page, used to disambiguate the per-context
/// storage key.
pub fn context_id(page_url: &str) -> String {
    blake3::hash(page_url.as_bytes()).to_hex()[..8].to_string()
}

/// JSON-file result store. Each publish overwrites whole payloads under the
/// well-known keys; last writer wins, there is no finer-grained merging.
pub struct FileStore {
    file_path: PathBuf,
    notifier: Option<Arc<dyn ChangeNotifier>>,
}

impl FileStore {
    pub fn open() -> AppResult<Self> {
        Ok(Self::at(config_directory()?.join(STORE_FILE_NAME)))
    }

    pub fn at(file_path: PathBuf) -> Self {
        Self {
            file_path,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    fn load_map(&self) -> AppResult<Map<String, Value>> {
        match fs::read_to_string(&self.file_path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|err| AppError::Storage(format!("invalid result store: {err}"))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    pub fn read(&self, key: &str) -> AppResult<Option<ResultPayload>> {
        let map = self.load_map()?;
        match map.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|err| AppError::Storage(format!("invalid payload under {key}: {err}"))),
            None => Ok(None),
        }
    }

    /// Latest payload: the per-context entry if given, otherwise the legacy
    /// shared key.
    pub fn read_latest(&self, context_id: Option<&str>) -> AppResult<Option<ResultPayload>> {
        match context_id {
            Some(id) => self.read(&context_key(id)),
            None => self.read(LEGACY_RESULT_KEY),
        }
    }
}

#[async_trait]
impl PublisherService for FileStore {
    async fn publish(&self, context_id: &str, payload: &ResultPayload) -> AppResult<()> {
        let mut map = self.load_map()?;
        let value = serde_json::to_value(payload)
            .map_err(|err| AppError::Storage(format!("unserializable payload: {err}")))?;

        map.insert(context_key(context_id), value.clone());
        map.insert(LEGACY_RESULT_KEY.to_string(), value);
        map.insert(SAVED_AT_KEY.to_string(), json!(payload.timestamp()));
        map.insert(LAST_ACTIVE_KEY.to_string(), json!(context_id));

        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|err| AppError::Storage(format!("failed to encode result store: {err}")))?;
        fs::write(&self.file_path, data)?;

        if let Some(notifier) = &self.notifier {
            // A missing listener is normal; the stored payload remains the
            // source of truth for anyone polling later.
            if let Err(err) = notifier.notify(payload) {
                warn!(error = %err, "result notification failed");
            }
        }

        Ok(())
    }
}
