//! LLM provider abstraction and fallback chain
//!
//! Providers implement a single `complete` contract; the chain tries them
//! in priority order with a per-call timeout and short-circuits on the
//! first success. All provider-specific failures normalize to
//! `AdvisorError::Generation`.

pub mod gemini;
pub mod groq;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{AdvisorError, Result};

pub use gemini::GeminiClient;
pub use groq::GroqClient;

/// A single text-generation backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String>;
}

/// Prioritized list of providers. The first one that answers within the
/// timeout wins.
pub struct ProviderChain {
    providers: Vec<Arc<dyn LlmProvider>>,
    timeout: Duration,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Returns the generated text and the name of the provider that
    /// produced it.
    pub async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<(String, &'static str)> {
        for provider in &self.providers {
            let attempt = tokio::time::timeout(
                self.timeout,
                provider.complete(prompt, max_tokens, temperature),
            )
            .await;

            match attempt {
                Ok(Ok(text)) => {
                    info!("Generation served by {}", provider.name());
                    return Ok((text, provider.name()));
                }
                Ok(Err(e)) => {
                    warn!("{} failed: {} - trying next provider", provider.name(), e);
                }
                Err(_) => {
                    warn!(
                        "{} timed out after {:?} - trying next provider",
                        provider.name(),
                        self.timeout
                    );
                }
            }
        }

        Err(AdvisorError::Generation(
            "All LLM providers failed".to_string(),
        ))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Scripted provider for chain tests.
    pub struct StaticProvider {
        pub provider_name: &'static str,
        pub reply: Option<String>,
    }

    #[async_trait]
    impl LlmProvider for StaticProvider {
        fn name(&self) -> &'static str {
            self.provider_name
        }

        async fn complete(
            &self,
            _prompt: &str,
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<String> {
            match &self.reply {
                Some(text) => Ok(text.clone()),
                None => Err(AdvisorError::Generation(format!(
                    "{} is down",
                    self.provider_name
                ))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StaticProvider;
    use super::*;

    #[tokio::test]
    async fn test_first_provider_wins() {
        let chain = ProviderChain::new(
            vec![
                Arc::new(StaticProvider {
                    provider_name: "primary",
                    reply: Some("from primary".to_string()),
                }),
                Arc::new(StaticProvider {
                    provider_name: "secondary",
                    reply: Some("from secondary".to_string()),
                }),
            ],
            Duration::from_secs(1),
        );

        let (text, provider) = chain.complete("q", 100, 0.1).await.unwrap();
        assert_eq!(text, "from primary");
        assert_eq!(provider, "primary");
    }

    #[tokio::test]
    async fn test_falls_back_on_failure() {
        let chain = ProviderChain::new(
            vec![
                Arc::new(StaticProvider {
                    provider_name: "primary",
                    reply: None,
                }),
                Arc::new(StaticProvider {
                    provider_name: "secondary",
                    reply: Some("from secondary".to_string()),
                }),
            ],
            Duration::from_secs(1),
        );

        let (text, provider) = chain.complete("q", 100, 0.1).await.unwrap();
        assert_eq!(text, "from secondary");
        assert_eq!(provider, "secondary");
    }

    #[tokio::test]
    async fn test_all_failed() {
        let chain = ProviderChain::new(
            vec![Arc::new(StaticProvider {
                provider_name: "primary",
                reply: None,
            })],
            Duration::from_secs(1),
        );

        let result = chain.complete("q", 100, 0.1).await;
        assert!(matches!(result, Err(AdvisorError::Generation(_))));
    }

    #[tokio::test]
    async fn test_empty_chain_fails() {
        let chain = ProviderChain::new(vec![], Duration::from_secs(1));
        assert!(chain.complete("q", 100, 0.1).await.is_err());
    }
}
