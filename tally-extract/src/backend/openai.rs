use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tally_core::AnalysisError;
use tracing::debug;

use super::{BackendConfig, ExtractionBackend, read_success_body};

/// OpenAI-compatible chat completions API.
pub struct OpenAiBackend {
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
    messages: Vec<Msg<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MsgOut,
}

#[derive(Deserialize)]
struct MsgOut {
    content: Option<String>,
}

impl OpenAiBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

/// Accept OpenClaw-style `openai-codex/<model>` aliases.
fn normalize_model(model: &str) -> &str {
    model.strip_prefix("openai-codex/").unwrap_or(model)
}

pub(crate) fn parse_response(body: &str) -> Result<String, AnalysisError> {
    let out: Resp = serde_json::from_str(body)
        .map_err(|e| AnalysisError::BackendUnavailable(format!("parse openai response: {e}")))?;

    out.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AnalysisError::ExtractionFormat("openai returned no usable text".to_string()))
}

#[async_trait]
impl ExtractionBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AnalysisError> {
        let body = Req {
            model: normalize_model(&self.config.model),
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: 0.0,
        };

        debug!(model = %self.config.model, prompt_chars = prompt.len(), "openai request");

        let resp = self
            .client
            .post(self.config.endpoint("/v1/chat/completions"))
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::BackendUnavailable(format!("openai request: {e}")))?;

        let txt = read_success_body("openai", resp).await?;
        parse_response(&txt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_model() {
        assert_eq!(normalize_model("openai-codex/gpt-5.1"), "gpt-5.1");
        assert_eq!(normalize_model("gpt-4o-mini"), "gpt-4o-mini");
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  {\"x\": 1} "}}]}"#;
        assert_eq!(parse_response(body).unwrap(), "{\"x\": 1}");
    }

    #[test]
    fn test_parse_response_empty_choices() {
        let err = parse_response(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::ExtractionFormat(_)));

        let err = parse_response(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::ExtractionFormat(_)));
    }
}
