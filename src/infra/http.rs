use async_trait::async_trait;
use base64::prelude::{BASE64_STANDARD, Engine as _};
use reqwest::{
    Client,
    header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE},
};

use crate::error::{AppError, AppResult};
use crate::services::http::{HttpGateway, TextResponse};

/// reqwest-backed transport. Credentials are optional: a session-cookie or
/// proxy setup can work unauthenticated, otherwise instance basic auth is
/// attached to every request.
pub struct ReqwestGateway {
    http: Client,
    authorization: Option<String>,
}

impl ReqwestGateway {
    pub fn new(credentials: Option<(String, String)>) -> Self {
        Self {
            http: Client::new(),
            authorization: credentials
                .map(|(user, token)| Self::auth_header(&user, &token)),
        }
    }

    fn auth_header(user: &str, token: &str) -> String {
        let credentials = format!("{user}:{token}");
        let encoded = BASE64_STANDARD.encode(credentials);
        format!("Basic {encoded}")
    }

    fn request(&self, url: &str, accept: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .get(url)
            .header(ACCEPT, accept)
            .header(CACHE_CONTROL, "no-cache");
        if let Some(authorization) = &self.authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        builder
    }
}

#[async_trait]
impl HttpGateway for ReqwestGateway {
    async fn get_text(&self, url: &str, accept: &str) -> AppResult<TextResponse> {
        let response = self
            .request(url, accept)
            .send()
            .await
            .map_err(|err| AppError::Http(format!("request to {url} failed: {err}")))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|err| AppError::Http(format!("failed to read body from {url}: {err}")))?;

        Ok(TextResponse {
            status,
            content_type,
            body,
            final_url,
        })
    }

    async fn get_json(&self, url: &str) -> AppResult<serde_json::Value> {
        let response = self
            .request(url, "application/json")
            .send()
            .await
            .map_err(|err| AppError::Http(format!("request to {url} failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Http(format!(
                "{} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("error")
            )));
        }

        response
            .json()
            .await
            .map_err(|err| AppError::Http(format!("failed to parse JSON from {url}: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_header_encodes_basic_credentials() {
        let header = ReqwestGateway::auth_header("triage.bot", "s3cret");
        assert_eq!(header, format!("Basic {}", BASE64_STANDARD.encode("triage.bot:s3cret")));
    }
}
