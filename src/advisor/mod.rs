//! Conversational advisor: the RAG answer pipeline and turn loop
//!
//! classify → retrieve → assemble bounded context → generate (provider
//! chain) → fact-check → follow-up determination. Retrieval and
//! generation failures degrade to lower-confidence answers; only invalid
//! input is surfaced to the caller as an error. All collaborators are
//! injected at construction, nothing is global.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::classifier::QueryTopic;
use crate::config::AdvisorConfig;
use crate::dialogue::{next_follow_up, ConversationSession, SessionStore};
use crate::error::{AdvisorError, Result};
use crate::knowledge::{DocumentStore, KnowledgeBase};
use crate::llm::{GeminiClient, GroqClient, LlmProvider, ProviderChain};
use crate::models::{AnswerConfidence, ChatAnswer, DocumentMetadata, KnowledgeDocument};

const FAREWELL_KEYWORDS: &[&str] = &["goodbye", "end call", "thank you"];

const FAREWELL_RESPONSE: &str = "Thank you for calling. Have a great day! Goodbye.";

/// Output of one pass through the answer pipeline.
struct ComposedAnswer {
    text: String,
    follow_up: Option<String>,
    sources_used: usize,
    generated: bool,
}

/// Build the Groq-first, Gemini-fallback provider chain from configured
/// API keys. Missing keys simply shorten the chain.
pub fn default_provider_chain(config: &AdvisorConfig) -> ProviderChain {
    let mut providers: Vec<Arc<dyn LlmProvider>> = Vec::new();

    if let Some(key) = &config.groq_api_key {
        providers.push(Arc::new(GroqClient::new(key.clone())));
    }
    if let Some(key) = &config.gemini_api_key {
        providers.push(Arc::new(GeminiClient::new(key.clone())));
    }

    ProviderChain::new(providers, config.llm_timeout)
}

pub struct Advisor {
    knowledge: KnowledgeBase,
    llm: ProviderChain,
    sessions: SessionStore,
    config: AdvisorConfig,
}

impl Advisor {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        llm: ProviderChain,
        config: AdvisorConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            knowledge: KnowledgeBase::new(store, config.retrieval()),
            sessions: SessionStore::new(config.session_capacity, config.session_ttl),
            llm,
            config,
        })
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Process one conversational turn for a session. Empty input is the
    /// only hard failure; everything downstream degrades.
    pub async fn handle_turn(&self, session_id: &str, utterance: &str) -> Result<ChatAnswer> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Err(AdvisorError::InvalidInput("Empty query".to_string()));
        }

        let lowered = utterance.to_lowercase();
        if FAREWELL_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            self.sessions.end(session_id);
            return Ok(ChatAnswer {
                answer: FAREWELL_RESPONSE.to_string(),
                sources_used: 0,
                confidence: AnswerConfidence::High,
                follow_up: None,
            });
        }

        let handle = self.sessions.get_or_create(session_id);
        let mut session = handle.lock().await;

        if let Some(pending) = session.pending_follow_up.clone() {
            if pending.kind.try_fill(&mut session.profile, utterance) {
                info!(slot = ?pending.kind, "Slot filled, regenerating answer");
                session.clear_pending();

                // Re-answer the question that opened the slot with the
                // richer profile; may chain into the next missing slot.
                let query = session
                    .last_query
                    .clone()
                    .unwrap_or_else(|| utterance.to_string());
                let composed = self.answer(&query, &mut session).await;

                return Ok(ChatAnswer {
                    answer: format!("Noted. {}", composed.text),
                    sources_used: composed.sources_used,
                    confidence: confidence_for(&composed),
                    follow_up: composed.follow_up,
                });
            }

            // Unparseable answer: clarify and stay in the same state.
            info!(slot = ?pending.kind, "Slot extraction failed, re-prompting");
            return Ok(ChatAnswer {
                answer: pending.kind.reprompt().to_string(),
                sources_used: 0,
                confidence: AnswerConfidence::Low,
                follow_up: Some(pending.question),
            });
        }

        let composed = self.answer(utterance, &mut session).await;
        Ok(ChatAnswer {
            answer: composed.text.clone(),
            sources_used: composed.sources_used,
            confidence: confidence_for(&composed),
            follow_up: composed.follow_up,
        })
    }

    /// Append a completed turn to the user-queries collection so future
    /// ingestion/analytics can learn from it. Best-effort maintenance.
    pub async fn record_interaction(&self, query: &str, response: &str) -> Result<()> {
        let document = KnowledgeDocument::new(
            format!("Query: {}\nResponse: {}", query, response),
            DocumentMetadata {
                category: Some("user_queries".to_string()),
                source: Some("user_interaction".to_string()),
                confidence: None,
                timestamp: Some(Utc::now()),
            },
        );
        self.knowledge.add_documents("user_queries", vec![document]).await
    }

    /// One pass through the retrieval-augmented pipeline. Updates the
    /// session's last query/response and pending follow-up.
    async fn answer(&self, query: &str, session: &mut ConversationSession) -> ComposedAnswer {
        let topic = QueryTopic::classify(query);
        info!(topic = %topic, "Answering query");

        let passages = self.knowledge.retrieve(query, topic).await;
        let sources_used = passages.iter().filter(|p| p.is_informative()).count();

        let context = truncate_chars(
            &passages
                .iter()
                .map(|p| p.content.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            self.config.max_context_chars,
        );

        let prompt = build_prompt(query, &context, session);

        let (mut text, generated) = match self
            .llm
            .complete(&prompt, self.config.llm_max_tokens, self.config.llm_temperature)
            .await
        {
            Ok((text, provider)) => {
                info!("Answer generated by {}", provider);
                (text, true)
            }
            Err(e) => {
                warn!("All providers failed ({}), using rule-based response", e);
                (rule_based_response(query), false)
            }
        };

        apply_fact_checks(query, &mut text);

        let follow_up = next_follow_up(topic, query, &session.profile);

        session.last_query = Some(query.to_string());
        session.last_response = Some(text.clone());
        session.pending_follow_up = follow_up.clone();

        ComposedAnswer {
            text,
            follow_up: follow_up.map(|f| f.question),
            sources_used,
            generated,
        }
    }
}

fn confidence_for(composed: &ComposedAnswer) -> AnswerConfidence {
    if !composed.generated {
        AnswerConfidence::Low
    } else if composed.sources_used > 0 {
        AnswerConfidence::High
    } else {
        AnswerConfidence::Medium
    }
}

/// Structured prompt: role instructions, profile snapshot, retrieved
/// context, then the query.
fn build_prompt(query: &str, context: &str, session: &ConversationSession) -> String {
    format!(
        "You are a professional Indian Chartered Accountant. Provide accurate, concise \
         financial advice based strictly on Indian laws and the provided context. Do not \
         speculate. If information is missing, say so and ask for clarification. Keep \
         responses under 75 words unless details are requested.\n\n\
         User Profile: {}\n\n\
         Context from Knowledge Base:\n{}\n\n\
         Current Query: {}",
        session.profile.prompt_block(),
        context,
        query
    )
}

/// Truncate on a character boundary to bound prompt size.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

/// Static templated responses for when every provider is down. Keyed by
/// keyword presence, mirroring the retrieval topics.
fn rule_based_response(query: &str) -> String {
    let query_lower = query.to_lowercase();

    if query_lower.contains("retirement") {
        "For retirement planning, consider a mix of NPS and PPF for tax benefits and stable \
         returns. A corpus of 25-30x your annual expenses is ideal. What is your target \
         retirement age?"
            .to_string()
    } else if query_lower.contains("investment") || query_lower.contains("sip") {
        "For investments, start with diversified equity mutual funds via SIPs for long-term \
         growth. ELSS funds offer tax benefits under Section 80C. What is your investment \
         horizon?"
            .to_string()
    } else if query_lower.contains("tax") || query_lower.contains("80c") {
        "You can save up to ₹1.5 lakh under Section 80C via ELSS, PPF, or NSC. The new tax \
         regime may suit high earners. Which regime are you using?"
            .to_string()
    } else if query_lower.contains("stock") {
        "Diversify across large-cap and mid-cap stocks to balance risk. Monitor NIFTY 50 \
         trends and P/E ratios. Which sector interests you?"
            .to_string()
    } else if query_lower.contains("budget") || query_lower.contains("literacy") {
        "Financial literacy basics: track expenses, save 20% of income, and build an \
         emergency fund before investing. What's your specific question?"
            .to_string()
    } else {
        "Could you clarify your financial query? For example, ask about taxes, investments, \
         or retirement planning."
            .to_string()
    }
}

/// Post-hoc guardrails for well-known statutory numbers the answer must
/// not omit.
fn apply_fact_checks(query: &str, answer: &mut String) {
    let query_lower = query.to_lowercase();
    if query_lower.contains("80c")
        && !answer.contains("1.5 lakh")
        && !answer.contains("150000")
        && !answer.contains("1,50,000")
    {
        answer.push_str(" Note: Section 80C allows deductions up to ₹1.5 lakh.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::{PendingFollowUp, SlotKind};
    use crate::knowledge::{seed_default_documents, InMemoryDocumentStore, ScoredDocument};
    use crate::llm::testing::StaticProvider;
    use crate::models::KnowledgeDocument;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Store whose every call fails, for degradation tests.
    struct FailingStore;

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn query(
            &self,
            _collection: &str,
            _text: &str,
            _top_k: usize,
        ) -> Result<Vec<ScoredDocument>> {
            Err(AdvisorError::Retrieval("store is down".to_string()))
        }

        async fn add(&self, _collection: &str, _documents: Vec<KnowledgeDocument>) -> Result<()> {
            Err(AdvisorError::Retrieval("store is down".to_string()))
        }

        async fn update(&self, _collection: &str, _document: KnowledgeDocument) -> Result<()> {
            Err(AdvisorError::Retrieval("store is down".to_string()))
        }

        async fn delete(&self, _collection: &str, _id: &str) -> Result<()> {
            Err(AdvisorError::Retrieval("store is down".to_string()))
        }
    }

    fn chain_with_reply(reply: Option<&str>) -> ProviderChain {
        ProviderChain::new(
            vec![Arc::new(StaticProvider {
                provider_name: "static",
                reply: reply.map(|s| s.to_string()),
            })],
            Duration::from_secs(1),
        )
    }

    fn no_providers() -> ProviderChain {
        ProviderChain::new(vec![], Duration::from_secs(1))
    }

    async fn seeded_advisor(llm: ProviderChain) -> Advisor {
        let store = Arc::new(InMemoryDocumentStore::new());
        seed_default_documents(&store).await.unwrap();
        Advisor::new(store, llm, AdvisorConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let advisor = seeded_advisor(no_providers()).await;
        let result = advisor.handle_turn("call-1", "   ").await;
        assert!(matches!(result, Err(AdvisorError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_retrieval_degradation() {
        let advisor =
            Advisor::new(Arc::new(FailingStore), no_providers(), AdvisorConfig::default())
                .unwrap();

        let reply = advisor
            .handle_turn("call-1", "how do I save tax?")
            .await
            .unwrap();
        assert!(!reply.answer.is_empty());
        assert_eq!(reply.sources_used, 0);
        assert_eq!(reply.confidence, AnswerConfidence::Low);
    }

    #[tokio::test]
    async fn test_sources_counted_from_seeded_store() {
        let advisor = seeded_advisor(chain_with_reply(Some(
            "Section 80C allows up to ₹1.5 lakh across ELSS and PPF.",
        )))
        .await;

        let reply = advisor
            .handle_turn("call-1", "What is the 80C deduction limit?")
            .await
            .unwrap();
        assert!(reply.sources_used > 0);
        assert_eq!(reply.confidence, AnswerConfidence::High);
    }

    #[tokio::test]
    async fn test_fact_check_appends_statutory_limit() {
        let advisor = seeded_advisor(chain_with_reply(Some("ELSS is a fine option."))).await;

        let reply = advisor
            .handle_turn("call-1", "Tell me about 80C options")
            .await
            .unwrap();
        assert!(reply.answer.contains("1.5 lakh"));
    }

    #[tokio::test]
    async fn test_slot_round_trip() {
        let advisor = seeded_advisor(no_providers()).await;

        // Arrange a session already awaiting the income slot.
        {
            let handle = advisor.sessions().get_or_create("call-1");
            let mut session = handle.lock().await;
            session.pending_follow_up = Some(PendingFollowUp {
                question: SlotKind::TotalIncome.question().to_string(),
                kind: SlotKind::TotalIncome,
            });
        }

        let reply = advisor.handle_turn("call-1", "ten lakhs").await.unwrap();
        assert!(reply.answer.starts_with("Noted."));

        let handle = advisor.sessions().get_or_create("call-1");
        let session = handle.lock().await;
        assert_eq!(session.profile.total_income, Some(1_000_000.0));
        assert!(!session.is_awaiting_slot());
    }

    #[tokio::test]
    async fn test_failed_extraction_keeps_slot() {
        let advisor = seeded_advisor(no_providers()).await;

        {
            let handle = advisor.sessions().get_or_create("call-1");
            let mut session = handle.lock().await;
            session.pending_follow_up = Some(PendingFollowUp {
                question: SlotKind::TaxRegime.question().to_string(),
                kind: SlotKind::TaxRegime,
            });
            session.last_query = Some("how should I file?".to_string());
        }

        let reply = advisor
            .handle_turn("call-1", "whichever works")
            .await
            .unwrap();
        assert!(reply.answer.contains("'old' or 'new'"));
        assert_eq!(reply.confidence, AnswerConfidence::Low);

        let handle = advisor.sessions().get_or_create("call-1");
        let session = handle.lock().await;
        assert!(session.is_awaiting_slot());
        assert_eq!(session.last_query.as_deref(), Some("how should I file?"));
    }

    #[tokio::test]
    async fn test_follow_up_emitted_for_missing_slot() {
        let advisor = seeded_advisor(chain_with_reply(Some("Deductions depend on your regime."))).await;

        let reply = advisor
            .handle_turn("call-1", "How do tax deductions work?")
            .await
            .unwrap();
        assert!(reply.follow_up.is_some());
        assert!(reply.follow_up.unwrap().contains("regime"));

        let handle = advisor.sessions().get_or_create("call-1");
        let session = handle.lock().await;
        assert!(session.is_awaiting_slot());
    }

    #[tokio::test]
    async fn test_chained_slot_filling() {
        let advisor = seeded_advisor(chain_with_reply(Some("Here is some filing advice."))).await;

        // Opens the regime slot.
        let first = advisor
            .handle_turn("call-1", "help me with tax filing")
            .await
            .unwrap();
        assert!(first.follow_up.unwrap().contains("regime"));

        // Filling the regime slot regenerates and chains into the next
        // missing slot for a filing query (income source).
        let second = advisor.handle_turn("call-1", "the old one").await.unwrap();
        assert!(second.answer.starts_with("Noted."));
        assert!(second.follow_up.unwrap().contains("salary or business"));

        let third = advisor.handle_turn("call-1", "salary").await.unwrap();
        assert!(third.follow_up.unwrap().contains("annual income"));

        let fourth = advisor.handle_turn("call-1", "ten lakhs").await.unwrap();
        assert!(fourth.follow_up.is_none());

        let handle = advisor.sessions().get_or_create("call-1");
        let session = handle.lock().await;
        assert_eq!(session.profile.total_income, Some(1_000_000.0));
        assert!(!session.is_awaiting_slot());
    }

    #[tokio::test]
    async fn test_farewell_ends_session() {
        let advisor = seeded_advisor(no_providers()).await;
        advisor.handle_turn("call-1", "what about tax?").await.unwrap();
        assert_eq!(advisor.sessions().len(), 1);

        let reply = advisor.handle_turn("call-1", "goodbye").await.unwrap();
        assert!(reply.answer.contains("Goodbye"));
        assert!(advisor.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let advisor = seeded_advisor(no_providers()).await;
        advisor
            .handle_turn("call-1", "How do tax deductions work?")
            .await
            .unwrap();
        advisor
            .handle_turn("call-2", "Is the nifty overvalued?")
            .await
            .unwrap();

        let one = advisor.sessions().get_or_create("call-1");
        let two = advisor.sessions().get_or_create("call-2");
        assert!(one.lock().await.is_awaiting_slot());
        assert!(!two.lock().await.is_awaiting_slot());
    }

    #[tokio::test]
    async fn test_record_interaction_appends_to_store() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let advisor =
            Advisor::new(Arc::clone(&store) as Arc<dyn DocumentStore>, no_providers(), AdvisorConfig::default())
                .unwrap();

        advisor
            .record_interaction("what is 80C?", "A deduction section capped at ₹1.5 lakh.")
            .await
            .unwrap();

        let results = store.query("user_queries", "80C", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].document.content.contains("what is 80C?"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multi-byte rupee signs must not split.
        assert_eq!(truncate_chars("₹₹₹₹", 2), "₹₹");
    }

    #[test]
    fn test_rule_based_fallback_keys() {
        assert!(rule_based_response("tell me about retirement").contains("NPS"));
        assert!(rule_based_response("sip advice please").contains("SIP"));
        assert!(rule_based_response("tax saving").contains("80C"));
        assert!(rule_based_response("anything else").contains("clarify"));
    }
}
