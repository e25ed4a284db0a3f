use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::category::Category;
use crate::error::{Error, Result};

/// Which response template a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Compact ten-section review for the category tree.
    Quick,
    /// Verbose scored review for the exportable report.
    Report,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Quick => write!(f, "quick"),
            Mode::Report => write!(f, "report"),
        }
    }
}

pub trait CompletionProvider {
    /// Send a prompt and return the model's text.
    fn complete(
        &self,
        prompt: &str,
        mode: Mode,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// Race a completion against `deadline`. An elapsed deadline is reported as
/// `Error::Timeout`, distinct from provider failures.
pub async fn complete_with_timeout<P: CompletionProvider>(
    provider: &P,
    prompt: &str,
    mode: Mode,
    deadline: Duration,
) -> Result<String> {
    match tokio::time::timeout(deadline, provider.complete(prompt, mode)).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(deadline)),
    }
}

/// Canned response used when the model does not answer in time. Parses like a
/// real response of the same mode.
pub fn timeout_fallback(mode: Mode) -> String {
    match mode {
        Mode::Quick => Category::ALL
            .iter()
            .map(|category| match category {
                Category::OtherFeedback => format!(
                    "#### {}\n- The review request timed out before the model answered. Try again, or review a smaller file.\n",
                    category.label()
                ),
                _ => format!("#### {}\nNo issues found.\n", category.label()),
            })
            .collect(),
        Mode::Report => "# Code Review Report\n\n\
## Executive Summary\n\n\
The review request timed out before the model produced a report. \
No findings are available for this file.\n\n\
## Recommendations\n\n\
- Run the report again.\n\
- Split very large files before requesting a report.\n"
            .to_string(),
    }
}

const SYSTEM_PROMPT: &str =
    "You are an experienced code reviewer. Follow the requested output format exactly.";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client. The API key is read from the
/// environment when a request is made.
#[derive(Debug, Clone)]
pub struct HttpCompletionProvider {
    api_url: String,
    api_key_env: String,
    model: String,
}

impl HttpCompletionProvider {
    pub fn new(api_url: String, api_key_env: String, model: String) -> Self {
        Self {
            api_url,
            api_key_env,
            model,
        }
    }

    fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::Completion(format!("API key not found in ${}", self.api_key_env))
            })
    }

    pub fn request_body(&self, prompt: &str, mode: Mode) -> serde_json::Value {
        let max_tokens = match mode {
            Mode::Quick => 2048,
            Mode::Report => 8192,
        };
        serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        })
    }

    fn send(&self, api_key: &str, body: serde_json::Value) -> Result<String> {
        let response = ureq::post(&self.api_url)
            .set("Authorization", &format!("Bearer {api_key}"))
            .set("Content-Type", "application/json")
            .send_json(&body)
            .map_err(|e| match e {
                ureq::Error::Status(code, response) => {
                    let detail = response.into_string().unwrap_or_default();
                    Error::Completion(format!("API returned {code}: {detail}"))
                }
                ureq::Error::Transport(t) => Error::Completion(format!("request failed: {t}")),
            })?;

        let parsed: ChatResponse = response
            .into_json()
            .map_err(|e| Error::Completion(format!("failed to parse API response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Completion("API response had no content".to_string()))
    }
}

impl CompletionProvider for HttpCompletionProvider {
    async fn complete(&self, prompt: &str, mode: Mode) -> Result<String> {
        let api_key = self.api_key()?;
        let body = self.request_body(prompt, mode);
        let client = self.clone();
        info!(%mode, model = %self.model, "requesting completion");

        let text = tokio::task::spawn_blocking(move || client.send(&api_key, body))
            .await
            .map_err(|e| Error::Completion(format!("request task failed: {e}")))??;

        debug!(%mode, chars = text.len(), "completion received");
        if text.trim().is_empty() {
            warn!(%mode, "completion was empty");
        }
        Ok(text)
    }
}
