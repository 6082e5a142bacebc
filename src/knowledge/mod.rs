//! Knowledge retrieval layer
//!
//! `DocumentStore` is the boundary to the external vector/document
//! collections; `InMemoryDocumentStore` is the development/test
//! implementation behind the same trait. `KnowledgeBase` wraps a store
//! with topic→collection routing and relevance filtering, and converts
//! every retrieval failure into a sentinel passage so the answer
//! pipeline never aborts on a missing or broken store.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::classifier::QueryTopic;
use crate::error::{AdvisorError, Result};
use crate::models::{DocumentMetadata, KnowledgeDocument};

/// A document paired with its similarity distance (lower = closer).
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: KnowledgeDocument,
    pub distance: f32,
}

/// Boundary to the backing document collections. Implementations must be
/// stateless per call and return results in ascending distance order.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn query(
        &self,
        collection: &str,
        text: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>>;

    async fn add(&self, collection: &str, documents: Vec<KnowledgeDocument>) -> Result<()>;

    async fn update(&self, collection: &str, document: KnowledgeDocument) -> Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

//
// ================= In-memory store =================
//

/// Token-overlap document store for development and tests.
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<KnowledgeDocument>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create_collection(&self, name: &str) {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_default();
    }

    fn tokenize(text: &str) -> HashSet<String> {
        const STOPWORDS: &[&str] = &[
            "a", "an", "the", "is", "are", "was", "what", "which", "how", "do", "does", "i",
            "my", "me", "of", "to", "in", "on", "for", "and", "or", "with", "up", "can",
            "should",
        ];

        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty() && !STOPWORDS.contains(t))
            .map(|t| t.to_string())
            .collect()
    }

    /// Fraction of query tokens absent from the document. 0.0 means every
    /// query token appears; 1.0 means no overlap at all.
    fn distance(query_tokens: &HashSet<String>, content: &str) -> f32 {
        if query_tokens.is_empty() {
            return 1.0;
        }
        let doc_tokens = Self::tokenize(content);
        let shared = query_tokens.iter().filter(|t| doc_tokens.contains(*t)).count();
        1.0 - (shared as f32 / query_tokens.len() as f32)
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn query(
        &self,
        collection: &str,
        text: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let collections = self.collections.read().await;
        let documents = collections.get(collection).ok_or_else(|| {
            AdvisorError::Retrieval(format!("Collection {} not found", collection))
        })?;

        let query_tokens = Self::tokenize(text);
        let mut scored: Vec<ScoredDocument> = documents
            .iter()
            .map(|doc| ScoredDocument {
                document: doc.clone(),
                distance: Self::distance(&query_tokens, &doc.content),
            })
            .collect();

        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn add(&self, collection: &str, documents: Vec<KnowledgeDocument>) -> Result<()> {
        let mut collections = self.collections.write().await;
        let entry = collections.entry(collection.to_string()).or_default();

        for doc in documents {
            // Upsert on id so re-ingestion replaces instead of duplicating.
            entry.retain(|existing| existing.id != doc.id);
            entry.push(doc);
        }
        Ok(())
    }

    async fn update(&self, collection: &str, document: KnowledgeDocument) -> Result<()> {
        self.add(collection, vec![document]).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        let entry = collections.get_mut(collection).ok_or_else(|| {
            AdvisorError::Retrieval(format!("Collection {} not found", collection))
        })?;
        entry.retain(|doc| doc.id != id);
        Ok(())
    }
}

//
// ================= Retrieval adapter =================
//

const NO_RELEVANT_INFORMATION: &str = "No relevant information found.";

/// A retrieved passage ready for prompt assembly. Sentinel passages carry
/// no distance and do not count as sources.
#[derive(Debug, Clone)]
pub struct RetrievedPassage {
    pub content: String,
    pub category: Option<String>,
    pub source: Option<String>,
    pub distance: Option<f32>,
}

impl RetrievedPassage {
    pub fn none_found() -> Self {
        Self {
            content: NO_RELEVANT_INFORMATION.to_string(),
            category: None,
            source: None,
            distance: None,
        }
    }

    /// True when the passage came from the store rather than the
    /// no-results sentinel.
    pub fn is_informative(&self) -> bool {
        self.distance.is_some()
    }
}

/// Relevance filtering knobs. The distance cutoff is deliberately a
/// tunable rather than a constant.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub distance_cutoff: f32,
    pub min_confidence: f32,
    pub timeout: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            distance_cutoff: 0.5,
            min_confidence: 0.8,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Map a semantic query topic onto the physical collection that backs
/// it. Several topics alias to the general collection.
pub fn collection_for(topic: QueryTopic) -> &'static str {
    match topic {
        QueryTopic::RetirementPlanning => "financial_knowledge",
        QueryTopic::InvestmentAdvice => "investment_advice",
        QueryTopic::TaxRules => "tax_rules",
        QueryTopic::StockAnalysis => "stock_analysis",
        QueryTopic::FinancialKnowledge => "financial_knowledge",
    }
}

/// Store wrapper that the answer composer talks to.
pub struct KnowledgeBase {
    store: Arc<dyn DocumentStore>,
    config: RetrievalConfig,
}

impl KnowledgeBase {
    pub fn new(store: Arc<dyn DocumentStore>, config: RetrievalConfig) -> Self {
        Self { store, config }
    }

    /// Query the collection routed for `topic` and filter by relevance.
    /// Store errors, timeouts, and empty result sets all degrade to the
    /// sentinel passage; this never returns an error.
    pub async fn retrieve(&self, query: &str, topic: QueryTopic) -> Vec<RetrievedPassage> {
        let collection = collection_for(topic);

        let outcome = tokio::time::timeout(
            self.config.timeout,
            self.store.query(collection, query, self.config.top_k),
        )
        .await;

        let scored = match outcome {
            Ok(Ok(scored)) => scored,
            Ok(Err(e)) => {
                warn!("Knowledge query failed for {}: {}", collection, e);
                return vec![RetrievedPassage::none_found()];
            }
            Err(_) => {
                warn!(
                    "Knowledge query timed out for {} after {:?}",
                    collection, self.config.timeout
                );
                return vec![RetrievedPassage::none_found()];
            }
        };

        let passages: Vec<RetrievedPassage> = scored
            .into_iter()
            .filter(|s| s.distance < self.config.distance_cutoff)
            .filter(|s| {
                s.document
                    .metadata
                    .confidence
                    .map_or(true, |c| c >= self.config.min_confidence)
            })
            .map(|s| RetrievedPassage {
                content: s.document.content,
                category: s.document.metadata.category,
                source: s.document.metadata.source,
                distance: Some(s.distance),
            })
            .collect();

        if passages.is_empty() {
            vec![RetrievedPassage::none_found()]
        } else {
            info!(
                "Retrieved {} passages from {} for topic {}",
                passages.len(),
                collection,
                topic
            );
            passages
        }
    }

    /// Maintenance primitive: upsert documents into a collection.
    pub async fn add_documents(
        &self,
        collection: &str,
        documents: Vec<KnowledgeDocument>,
    ) -> Result<()> {
        self.store.add(collection, documents).await
    }

    /// Maintenance primitive: delete one document by id.
    pub async fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        self.store.delete(collection, id).await
    }
}

/// Seed the base financial facts the assistant should always know.
pub async fn seed_default_documents(store: &InMemoryDocumentStore) -> Result<()> {
    let seed = |content: &str, category: &str| {
        KnowledgeDocument::from_content(
            content,
            DocumentMetadata {
                category: Some(category.to_string()),
                source: Some("seed".to_string()),
                confidence: Some(1.0),
                timestamp: Some(Utc::now()),
            },
        )
    };

    store
        .add(
            "tax_rules",
            vec![
                seed(
                    "Section 80C allows deduction up to ₹1.5 lakh for investments in PPF, ELSS, life insurance, and tax-saving FDs.",
                    "tax_deduction",
                ),
                seed(
                    "Home loan interest deduction under section 24(b) allows up to ₹2 lakh deduction for self-occupied property.",
                    "tax_deduction",
                ),
                seed(
                    "The new tax regime has lower slab rates but does not allow most itemized deductions such as 80C and 80D.",
                    "tax_regime",
                ),
            ],
        )
        .await?;

    store
        .add(
            "financial_knowledge",
            vec![seed(
                "CIBIL score above 750 is considered good. Credit utilization should be below 30% for optimal score.",
                "cibil",
            )],
        )
        .await?;

    store.create_collection("investment_advice").await;
    store.create_collection("stock_analysis").await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str, confidence: Option<f32>) -> KnowledgeDocument {
        KnowledgeDocument::from_content(
            content,
            DocumentMetadata {
                category: Some("test".to_string()),
                source: None,
                confidence,
                timestamp: None,
            },
        )
    }

    #[tokio::test]
    async fn test_query_orders_by_distance() {
        let store = InMemoryDocumentStore::new();
        store
            .add(
                "tax_rules",
                vec![
                    doc("Section 80C deduction limit is 1.5 lakh", None),
                    doc("Completely unrelated cooking recipe", None),
                ],
            )
            .await
            .unwrap();

        let results = store.query("tax_rules", "80C deduction limit", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].distance <= results[1].distance);
        assert!(results[0].document.content.contains("80C"));
    }

    #[tokio::test]
    async fn test_missing_collection_degrades_to_sentinel() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let kb = KnowledgeBase::new(store, RetrievalConfig::default());

        let passages = kb.retrieve("anything about tax", QueryTopic::TaxRules).await;
        assert_eq!(passages.len(), 1);
        assert!(!passages[0].is_informative());
        assert_eq!(passages[0].content, NO_RELEVANT_INFORMATION);
    }

    #[tokio::test]
    async fn test_distance_cutoff_filters_far_results() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store
            .add("tax_rules", vec![doc("gardening tips for monsoon", None)])
            .await
            .unwrap();

        let kb = KnowledgeBase::new(store, RetrievalConfig::default());
        let passages = kb
            .retrieve("80C deduction limit rupees", QueryTopic::TaxRules)
            .await;
        assert_eq!(passages.len(), 1);
        assert!(!passages[0].is_informative());
    }

    #[tokio::test]
    async fn test_low_confidence_metadata_filtered() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store
            .add(
                "tax_rules",
                vec![
                    doc("80C deduction limit is 1.5 lakh rupees", Some(0.3)),
                    doc("80C deduction limit applies to ELSS too", Some(0.9)),
                ],
            )
            .await
            .unwrap();

        let kb = KnowledgeBase::new(store, RetrievalConfig::default());
        let passages = kb.retrieve("80C deduction limit", QueryTopic::TaxRules).await;
        assert_eq!(passages.len(), 1);
        assert!(passages[0].content.contains("ELSS"));
    }

    #[tokio::test]
    async fn test_topic_aliasing_to_shared_collection() {
        assert_eq!(
            collection_for(QueryTopic::RetirementPlanning),
            collection_for(QueryTopic::FinancialKnowledge)
        );
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = InMemoryDocumentStore::new();
        let original = doc("original body", None);
        let mut updated = original.clone();
        updated.content = "updated body".to_string();

        store.add("tax_rules", vec![original]).await.unwrap();
        store.update("tax_rules", updated).await.unwrap();

        let results = store.query("tax_rules", "body", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.content, "updated body");
    }
}
