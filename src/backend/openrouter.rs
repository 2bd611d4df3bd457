//! OpenRouter-backed implementation of [`GenerativeBackend`] (BYOK mode).

use super::{clamp_temperature, BackendError, GenerateRequest, GenerativeBackend};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// OpenRouter chat completions endpoint.
const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

const MAX_RETRIES: u32 = 2;

/// Maximum length for error content surfaced in messages.
const MAX_ERROR_CONTENT_LEN: usize = 200;

fn truncate_str(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let prefix: String = s.chars().take(max).collect();
        format!("{}...", prefix)
    }
}

/// Sanitize API response content for error messages to prevent credential leakage.
fn sanitize_api_response(content: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &["api_key", "apikey", "secret", "password", "bearer", "sk-"];

    let truncated = truncate_str(content, MAX_ERROR_CONTENT_LEN);
    let lower = truncated.to_lowercase();
    for pattern in SECRET_PATTERNS {
        if lower.contains(pattern) {
            return "(response details redacted - may contain sensitive data)".to_string();
        }
    }
    truncated
}

fn backoff_secs(retry: u32) -> u64 {
    2u64.saturating_pow(retry)
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

/// Production backend talking to OpenRouter with the caller's own key.
pub struct OpenRouterBackend {
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenRouterBackend {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            max_tokens: 8192,
        }
    }

    fn create_http_client(timeout_ms: u64) -> Result<reqwest::Client, BackendError> {
        reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to create HTTP client: {}", e)))
    }

    async fn send_with_retry(
        &self,
        client: &reqwest::Client,
        request_body: &ChatRequest,
        timeout_ms: u64,
    ) -> Result<String, BackendError> {
        let mut retry_count = 0;

        loop {
            let response = match client
                .post(OPENROUTER_URL)
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(request_body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    if err.is_timeout() {
                        return Err(BackendError::Timeout {
                            waited_ms: timeout_ms,
                        });
                    }
                    if err.is_connect() && retry_count < MAX_RETRIES {
                        retry_count += 1;
                        tokio::time::sleep(Duration::from_secs(backoff_secs(retry_count))).await;
                        continue;
                    }
                    return Err(BackendError::Transport(err.to_string()));
                }
            };

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|err| BackendError::Transport(err.to_string()))?;

            if status.is_success() {
                return Ok(text);
            }

            // Rate limits and server errors back off and retry
            if (status.as_u16() == 429 || status.is_server_error()) && retry_count < MAX_RETRIES {
                retry_count += 1;
                tokio::time::sleep(Duration::from_secs(backoff_secs(retry_count))).await;
                continue;
            }

            let message = match status.as_u16() {
                401 => "invalid API key (run with --setup to update it)".to_string(),
                429 => format!("rate limited after {} retries", retry_count),
                _ => format!("API error {}: {}", status, sanitize_api_response(&text)),
            };
            return Err(BackendError::Transport(message));
        }
    }
}

impl GenerativeBackend for OpenRouterBackend {
    fn generate<'a>(
        &'a self,
        request: GenerateRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, BackendError>> + Send + 'a>> {
        Box::pin(async move {
            let client = Self::create_http_client(request.timeout_ms)?;

            let body = ChatRequest {
                model: self.model.clone(),
                messages: vec![
                    Message {
                        role: "system".to_string(),
                        content: request.system_prompt.to_string(),
                    },
                    Message {
                        role: "user".to_string(),
                        content: request.user_prompt.to_string(),
                    },
                ],
                temperature: clamp_temperature(request.temperature),
                max_tokens: self.max_tokens,
                stream: false,
            };

            let text = self
                .send_with_retry(&client, &body, request.timeout_ms)
                .await?;

            let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
                BackendError::Transport(format!(
                    "failed to parse response: {} ({})",
                    e,
                    sanitize_api_response(&text)
                ))
            })?;

            let content = parsed
                .choices
                .first()
                .and_then(|choice| choice.message.content.clone())
                .unwrap_or_default();

            if content.is_empty() {
                return Err(BackendError::Transport(
                    "API returned an empty response".to_string(),
                ));
            }

            Ok(content)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_redacts_secret_material() {
        let leaked = r#"{"error": "bad key sk-or-v1-abcdef"}"#;
        assert_eq!(
            sanitize_api_response(leaked),
            "(response details redacted - may contain sensitive data)"
        );
        assert_eq!(sanitize_api_response("plain error"), "plain error");
    }

    #[test]
    fn test_backoff_grows() {
        assert_eq!(backoff_secs(1), 2);
        assert_eq!(backoff_secs(2), 4);
    }

    #[test]
    fn test_chat_request_serializes_messages_in_order() {
        let body = ChatRequest {
            model: "test-model".to_string(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: "s".to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: "u".to_string(),
                },
            ],
            temperature: 0.2,
            max_tokens: 64,
            stream: false,
        };
        let json = serde_json::to_string(&body).unwrap();
        let system_idx = json.find("system").unwrap();
        let user_idx = json.find("user").unwrap();
        assert!(system_idx < user_idx);
    }
}
