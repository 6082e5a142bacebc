//! Groq API client (primary provider, fastest inference)
//!
//! Talks to Groq's OpenAI-compatible chat completions endpoint.
//! Uses a long-lived reqwest::Client for connection pooling.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::error;

use crate::error::{AdvisorError, Result};
use crate::llm::LlmProvider;

const GROQ_MODEL: &str = "llama-3.1-8b-instant";

pub struct GroqClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GroqClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for GroqClient {
    fn name(&self) -> &'static str {
        "groq"
    }

    async fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(AdvisorError::Generation(
                "GROQ_API_KEY not configured".to_string(),
            ));
        }

        let request = ChatRequest {
            model: GROQ_MODEL.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature,
            max_tokens,
            top_p: 0.6,
        };

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Groq API request failed: {}", e);
                AdvisorError::Generation(format!("Groq API error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Groq API error response: {}", error_text);
            return Err(AdvisorError::Generation(format!(
                "Groq API error: {}",
                error_text
            )));
        }

        let completion: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Groq response: {}", e);
            AdvisorError::Generation(format!("Groq parse error: {}", e))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AdvisorError::Generation("Empty response from Groq".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: GROQ_MODEL.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "What is Section 80C?".to_string(),
            }],
            temperature: 0.1,
            max_tokens: 200,
            top_p: 0.6,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("What is Section 80C?"));
        assert!(json.contains("llama-3.1-8b-instant"));
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  80C caps at 1.5 lakh. "}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.trim(),
            "80C caps at 1.5 lakh."
        );
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = GroqClient::new(String::new());
        let result = client.complete("what is 80C?", 100, 0.1).await;
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .to_lowercase()
            .contains("api"));
    }
}
