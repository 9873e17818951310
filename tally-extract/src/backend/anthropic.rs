use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tally_core::AnalysisError;
use tracing::debug;

use super::{BackendConfig, ExtractionBackend, read_success_body};

const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API.
pub struct AnthropicBackend {
    config: BackendConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Msg<'a>>,
}

#[derive(Deserialize)]
struct Resp {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    t: String,
    text: Option<String>,
}

impl AnthropicBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn headers(&self) -> Result<HeaderMap, AnalysisError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.config.api_key).map_err(|_| {
            AnalysisError::BackendUnavailable("anthropic api key is not a valid header value".to_string())
        })?;
        headers.insert("x-api-key", key);
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

/// Concatenate the text blocks of a Messages API response body.
pub(crate) fn parse_response(body: &str) -> Result<String, AnalysisError> {
    let out: Resp = serde_json::from_str(body)
        .map_err(|e| AnalysisError::BackendUnavailable(format!("parse anthropic response: {e}")))?;

    let mut s = String::new();
    let mut saw_text = false;
    for b in out.content {
        if b.t == "text" {
            if let Some(t) = b.text {
                saw_text = true;
                s.push_str(&t);
            }
        }
    }

    if !saw_text {
        return Err(AnalysisError::ExtractionFormat(
            "anthropic returned no usable text".to_string(),
        ));
    }
    Ok(s.trim().to_string())
}

#[async_trait]
impl ExtractionBackend for AnthropicBackend {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AnalysisError> {
        let body = Req {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: 0.0,
            system,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.config.model, prompt_chars = prompt.len(), "anthropic request");

        let resp = self
            .client
            .post(self.config.endpoint("/v1/messages"))
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::BackendUnavailable(format!("anthropic request: {e}")))?;

        let txt = read_success_body("anthropic", resp).await?;
        parse_response(&txt)
    }
}
