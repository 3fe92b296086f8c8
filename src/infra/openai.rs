use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::services::analysis::AnalysisService;

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODEL: &str = "gpt-4o-mini";
const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(45);

/// Chat-completion client for the analysis collaborator. One bounded request
/// per call; the request is cancelled when the timeout expires.
pub struct OpenAiClient {
    http: Client,
    api_key: Option<String>,
    scrubber: PromptScrubber,
}

impl OpenAiClient {
    pub fn new(api_key: Option<String>) -> AppResult<Self> {
        Ok(Self {
            http: Client::new(),
            api_key,
            scrubber: PromptScrubber::new()?,
        })
    }
}

/// Rejects obviously malformed keys before any request is made.
pub fn validate_api_key(key: &str) -> AppResult<String> {
    let key = key.trim();
    if !key.starts_with("sk-") {
        return Err(AppError::Configuration(
            "API key must start with \"sk-\"".to_string(),
        ));
    }
    if key.len() < 20 {
        return Err(AppError::Configuration("API key is too short".to_string()));
    }
    Ok(key.to_string())
}

#[async_trait]
impl AnalysisService for OpenAiClient {
    async fn analyze(&self, prompt: &str, privacy_filter: bool) -> AppResult<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Configuration("OpenAI API key not configured".to_string()))?;
        let key = validate_api_key(key)?;

        let prompt = if privacy_filter {
            info!("privacy filter enabled, scrubbing prompt");
            self.scrubber.scrub(prompt)
        } else {
            prompt.to_string()
        };

        debug!(chars = prompt.len(), "sending analysis request");
        let response = self
            .http
            .post(COMPLETIONS_URL)
            .bearer_auth(&key)
            .timeout(ANALYSIS_TIMEOUT)
            .json(&ChatRequest {
                model: MODEL,
                messages: vec![ChatMessage {
                    role: "user",
                    content: &prompt,
                }],
                temperature: 0.7,
                max_tokens: 2000,
            })
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AppError::Analysis(
                        "request timed out after 45 seconds; retry with fewer tickets or the privacy filter enabled"
                            .to_string(),
                    )
                } else {
                    AppError::Analysis(format!("request failed: {err}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Analysis(translate_status(status, response).await));
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|err| AppError::Analysis(format!("unreadable response: {err}")))?;

        payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                AppError::Analysis(
                    "empty response from the model; retry or reduce the amount of data".to_string(),
                )
            })
    }
}

/// Maps common API statuses to actionable messages; anything else falls back
/// to the error body.
async fn translate_status(status: StatusCode, response: reqwest::Response) -> String {
    match status.as_u16() {
        400 => "invalid request; check the data format".to_string(),
        401 => "API key invalid or expired; check your configuration".to_string(),
        404 => format!("model not found; check that {MODEL} is available"),
        413 => "too much data; reduce the ticket count or enable the privacy filter".to_string(),
        429 => "request limit exceeded; wait a few minutes and retry".to_string(),
        500 => "provider server error; retry in a few seconds".to_string(),
        503 => "service temporarily unavailable; retry in a moment".to_string(),
        code => {
            let body: Option<ApiErrorBody> = response.json().await.ok();
            body.and_then(|body| body.error)
                .map(|error| error.message)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| format!("error {code}"))
        }
    }
}

/// Replaces sensitive fragments with placeholders before the prompt leaves
/// the process.
struct PromptScrubber {
    email: Regex,
    ip: Regex,
    url: Regex,
    phone: Regex,
    token: Regex,
}

impl PromptScrubber {
    fn new() -> AppResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|err| AppError::Configuration(format!("invalid scrub pattern: {err}")))
        };
        Ok(Self {
            email: compile(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}")?,
            ip: compile(r"\b(?:\d{1,3}\.){3}\d{1,3}\b")?,
            url: compile(r"https?://\S+")?,
            phone: compile(
                r"\+?\d{1,4}?[-.\s]?\(?\d{1,3}?\)?[-.\s]?\d{1,4}[-.\s]?\d{1,4}[-.\s]?\d{1,9}",
            )?,
            token: compile(r"\b[a-zA-Z0-9]{32,}\b")?,
        })
    }

    // Tokens are masked before phone numbers so a digit run inside a long
    // token is not mistaken for one.
    fn scrub(&self, prompt: &str) -> String {
        let scrubbed = self.email.replace_all(prompt, "[EMAIL]");
        let scrubbed = self.url.replace_all(&scrubbed, "[URL]");
        let scrubbed = self.ip.replace_all(&scrubbed, "[IP]");
        let scrubbed = self.token.replace_all(&scrubbed, "[TOKEN]");
        self.phone.replace_all(&scrubbed, "[PHONE]").into_owned()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}
