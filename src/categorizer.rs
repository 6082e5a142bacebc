//! LLM-assisted transaction categorization
//!
//! Asks the provider chain for a structured JSON verdict per
//! transaction. The response is validated against the fixed category
//! enum (unknown labels coerce to the sentinel) and ANY provider or
//! parse failure degrades to the deterministic keyword classifier, so
//! categorization can never fail outright.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::classifier::TransactionCategory;
use crate::llm::ProviderChain;
use crate::models::Transaction;

const CATEGORIZE_MAX_TOKENS: u32 = 300;
const CATEGORIZE_TEMPERATURE: f32 = 0.1;

/// One categorization verdict, from either path.
#[derive(Debug, Clone)]
pub struct CategoryAssessment {
    pub category: TransactionCategory,
    pub subcategory: Option<String>,
    /// 0-100.
    pub confidence_score: u8,
    pub is_recurring: bool,
}

/// Raw JSON shape requested from the model.
#[derive(Debug, Deserialize)]
struct LlmVerdict {
    category: String,
    #[serde(default)]
    subcategory: Option<String>,
    #[serde(default)]
    confidence_score: Option<f64>,
    #[serde(default)]
    is_recurring: Option<bool>,
}

pub struct LlmCategorizer<'a> {
    llm: &'a ProviderChain,
}

impl<'a> LlmCategorizer<'a> {
    pub fn new(llm: &'a ProviderChain) -> Self {
        Self { llm }
    }

    /// Categorize one transaction, degrading to keyword rules on any
    /// provider or parse error.
    pub async fn categorize(&self, description: &str, amount: f64) -> CategoryAssessment {
        if !self.llm.is_empty() {
            let prompt = build_prompt(description, amount);
            match self
                .llm
                .complete(&prompt, CATEGORIZE_MAX_TOKENS, CATEGORIZE_TEMPERATURE)
                .await
            {
                Ok((text, _)) => {
                    if let Some(assessment) = parse_verdict(&text) {
                        return assessment;
                    }
                    warn!("Unparseable categorization response, using keyword rules");
                }
                Err(e) => {
                    warn!("LLM categorization failed: {} - using keyword rules", e);
                }
            }
        }

        fallback_assessment(description)
    }

    /// Categorize a batch in place. Each transaction is independent, so
    /// failures are per-item and the batch always completes.
    pub async fn categorize_all(&self, transactions: &mut [Transaction]) {
        for txn in transactions.iter_mut() {
            let assessment = self.categorize(&txn.description, txn.amount).await;
            debug!(
                "Categorized '{}' as {}",
                txn.description, assessment.category
            );
            txn.category = Some(assessment.category);
            txn.subcategory = assessment.subcategory;
            txn.confidence_score = assessment.confidence_score;
            txn.is_recurring = assessment.is_recurring;
        }
    }
}

/// Deterministic path: keyword classification with rule-derived
/// recurring/confidence hints.
pub fn fallback_assessment(description: &str) -> CategoryAssessment {
    let category = TransactionCategory::classify(description);
    let lowered = description.to_lowercase();

    let (confidence_score, is_recurring, subcategory) = match category {
        TransactionCategory::Income => (
            80,
            lowered.contains("salary"),
            lowered.contains("salary").then(|| "salary".to_string()),
        ),
        TransactionCategory::Emi => (
            85,
            true,
            lowered.contains("home").then(|| "home_loan".to_string()),
        ),
        TransactionCategory::Sip => (
            85,
            true,
            lowered.contains("elss").then(|| "elss".to_string()),
        ),
        TransactionCategory::Uncategorized => (30, false, None),
        _ => (70, false, None),
    };

    CategoryAssessment {
        category,
        subcategory,
        confidence_score,
        is_recurring,
    }
}

fn build_prompt(description: &str, amount: f64) -> String {
    format!(
        r#"You are an expert Indian financial transaction categorizer.

Transaction:
- Description: "{}"
- Amount: ₹{:.2}

Categories: income, emi, sip, rent, insurance, utilities, food, transport, entertainment, shopping, medical, education, other_expense, other_income.

Recognize Indian bank names, payment methods, and common transaction patterns.

Respond with JSON only:
{{"category": "...", "subcategory": "... or null", "confidence_score": 0-100, "is_recurring": true/false}}"#,
        description, amount
    )
}

/// Parse and validate the model's JSON, tolerating surrounding prose or
/// code fences. Unknown category labels coerce to the sentinel.
fn parse_verdict(text: &str) -> Option<CategoryAssessment> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    let verdict: LlmVerdict = serde_json::from_str(&text[start..=end]).ok()?;
    let confidence = verdict
        .confidence_score
        .unwrap_or(50.0)
        .clamp(0.0, 100.0) as u8;

    Some(CategoryAssessment {
        category: TransactionCategory::from_label(&verdict.category),
        subcategory: verdict.subcategory.filter(|s| !s.is_empty() && s != "null"),
        confidence_score: confidence,
        is_recurring: verdict.is_recurring.unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::StaticProvider;
    use std::sync::Arc;
    use std::time::Duration;

    fn chain_with_reply(reply: Option<&str>) -> ProviderChain {
        ProviderChain::new(
            vec![Arc::new(StaticProvider {
                provider_name: "static",
                reply: reply.map(|s| s.to_string()),
            })],
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_structured_output_validated() {
        let chain = chain_with_reply(Some(
            r#"Here you go: {"category": "sip", "subcategory": "elss", "confidence_score": 92, "is_recurring": true}"#,
        ));
        let categorizer = LlmCategorizer::new(&chain);

        let assessment = categorizer.categorize("SIP ELSS AXIS", 5_000.0).await;
        assert_eq!(assessment.category, TransactionCategory::Sip);
        assert_eq!(assessment.subcategory.as_deref(), Some("elss"));
        assert_eq!(assessment.confidence_score, 92);
        assert!(assessment.is_recurring);
    }

    #[tokio::test]
    async fn test_unknown_label_coerced() {
        let chain = chain_with_reply(Some(
            r#"{"category": "space_travel", "confidence_score": 400}"#,
        ));
        let categorizer = LlmCategorizer::new(&chain);

        let assessment = categorizer.categorize("ISRO TICKET", 100.0).await;
        assert_eq!(assessment.category, TransactionCategory::Uncategorized);
        assert_eq!(assessment.confidence_score, 100);
    }

    #[tokio::test]
    async fn test_provider_failure_degrades_to_rules() {
        let chain = chain_with_reply(None);
        let categorizer = LlmCategorizer::new(&chain);

        let assessment = categorizer
            .categorize("SIP MUTUAL FUND - AXIS BLUECHIP", 5_000.0)
            .await;
        assert_eq!(assessment.category, TransactionCategory::Sip);
        assert!(assessment.is_recurring);
    }

    #[tokio::test]
    async fn test_garbage_response_degrades_to_rules() {
        let chain = chain_with_reply(Some("sorry, I cannot help with that"));
        let categorizer = LlmCategorizer::new(&chain);

        let assessment = categorizer.categorize("HDFC HOME LOAN EMI", 20_000.0).await;
        assert_eq!(assessment.category, TransactionCategory::Emi);
        assert_eq!(assessment.subcategory.as_deref(), Some("home_loan"));
    }

    #[tokio::test]
    async fn test_batch_updates_in_place() {
        let chain = chain_with_reply(None);
        let categorizer = LlmCategorizer::new(&chain);

        let mut txns = vec![
            Transaction::new(
                chrono::Utc::now(),
                "SALARY CREDIT ACME",
                85_000.0,
                crate::models::TransactionKind::Credit,
            ),
            Transaction::new(
                chrono::Utc::now(),
                "SWIGGY FOOD ORDER",
                450.0,
                crate::models::TransactionKind::Debit,
            ),
        ];

        categorizer.categorize_all(&mut txns).await;
        assert_eq!(txns[0].category, Some(TransactionCategory::Income));
        assert_eq!(txns[1].category, Some(TransactionCategory::Food));
        assert!(txns.iter().all(|t| t.confidence_score > 0));
    }
}
