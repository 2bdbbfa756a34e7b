//! Message fetcher: one blocking POST to an OpenAI-style chat-completions endpoint.
//!
//! Every failure path (status, transport, timeout, malformed envelope) becomes
//! [`FetchOutcome::Failure`]; nothing escapes as an error or panic-by-design.
//! Callers must check [`Config::is_complete`] first; the fetcher never does.

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::constants::{
    ERROR_BODY_LOG_CHARS, FALLBACK_MESSAGES, HTTP_CONNECT_TIMEOUT_SECS, HTTP_READ_TIMEOUT_SECS,
    SYSTEM_PROMPT, USER_PROMPT,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(String),
    Failure(FetchFailure),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("endpoint returned HTTP {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

pub trait MessageFetcher: Send + Sync {
    fn fetch(&self, config: &Config) -> FetchOutcome;
}

// ─── Wire format ───

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Request body: fixed persona instruction, fixed user turn, configured model.
pub fn build_request_body(config: &Config) -> serde_json::Value {
    let request = ChatRequest {
        model: config.effective_model(),
        messages: vec![
            ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT,
            },
            ChatMessage {
                role: "user",
                content: USER_PROMPT,
            },
        ],
    };
    serde_json::to_value(&request).unwrap_or(serde_json::Value::Null)
}

/// Extract `choices[0].message.content`, trimmed. Blank content counts as malformed.
pub fn parse_completion(body: &str) -> Result<String, FetchFailure> {
    let completion: ChatCompletion =
        serde_json::from_str(body).map_err(|e| FetchFailure::Malformed(e.to_string()))?;
    let content = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| FetchFailure::Malformed("empty choices array".into()))?
        .message
        .content
        .ok_or_else(|| FetchFailure::Malformed("missing message content".into()))?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(FetchFailure::Malformed("blank message content".into()));
    }
    Ok(trimmed.to_string())
}

/// One of the pre-written liveness lines used when the endpoint fails.
pub fn pick_fallback<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    FALLBACK_MESSAGES
        .choose(rng)
        .copied()
        .unwrap_or(FALLBACK_MESSAGES[0])
}

pub fn is_fallback(content: &str) -> bool {
    FALLBACK_MESSAGES.contains(&content)
}

/// Fetcher backed by a `ureq` agent with bounded connect/read timeouts.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_timeouts(
            Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS),
            Duration::from_secs(HTTP_READ_TIMEOUT_SECS),
        )
    }

    pub fn with_timeouts(connect: Duration, read: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_connect(Some(connect))
            .timeout_recv_response(Some(read))
            .timeout_recv_body(Some(read))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }

    fn send(&self, config: &Config) -> Result<String, FetchFailure> {
        let url = config.api_url.as_deref().unwrap_or_default();
        let key = config.api_key.as_deref().unwrap_or_default();
        let body = serde_json::to_vec(&build_request_body(config))
            .map_err(|e| FetchFailure::Malformed(e.to_string()))?;

        let mut response = self
            .agent
            .post(url)
            .header("Authorization", &format!("Bearer {}", key))
            .header("Content-Type", "application/json")
            .send(body.as_slice())
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(map_transport_error)?;

        tracing::debug!(status, "Chat endpoint responded");

        if status != 200 {
            let body: String = text.chars().take(ERROR_BODY_LOG_CHARS).collect();
            return Err(FetchFailure::Remote { status, body });
        }
        parse_completion(&text)
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageFetcher for HttpFetcher {
    fn fetch(&self, config: &Config) -> FetchOutcome {
        tracing::info!(model = %config.effective_model(), "Fetching proactive message");
        match self.send(config) {
            Ok(content) => {
                tracing::info!(content_len = content.len(), "Proactive message fetched");
                FetchOutcome::Success(content)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Proactive fetch failed");
                FetchOutcome::Failure(e)
            }
        }
    }
}

fn map_transport_error(err: ureq::Error) -> FetchFailure {
    match err {
        ureq::Error::Timeout(_) => FetchFailure::Timeout(err.to_string()),
        other => FetchFailure::Network(other.to_string()),
    }
}
