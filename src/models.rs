//! Core data models for the finance advisor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

use crate::classifier::TransactionCategory;
use crate::error::AdvisorError;

//
// ================= Transactions =================
//

/// Direction of a statement entry. Amounts are stored unsigned; the kind
/// discriminator carries the sign convention.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Credit,
    Debit,
}

/// A single parsed statement entry. Produced by the external statement
/// parsing layer; the category fields are filled in by classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub date: DateTime<Utc>,
    pub description: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub category: Option<TransactionCategory>,
    pub subcategory: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    /// Categorization confidence, 0-100.
    #[serde(default)]
    pub confidence_score: u8,
}

impl Transaction {
    pub fn new(
        date: DateTime<Utc>,
        description: impl Into<String>,
        amount: f64,
        kind: TransactionKind,
    ) -> Self {
        Self {
            date,
            description: description.into(),
            amount,
            kind,
            category: None,
            subcategory: None,
            is_recurring: false,
            confidence_score: 0,
        }
    }

    /// Reject malformed amounts before they reach the tax pipeline.
    pub fn validate(&self) -> Result<(), AdvisorError> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(AdvisorError::InvalidInput(format!(
                "Malformed transaction amount {} for '{}'",
                self.amount, self.description
            )));
        }
        Ok(())
    }

    pub fn is_credit(&self) -> bool {
        self.kind == TransactionKind::Credit
    }

    pub fn is_debit(&self) -> bool {
        self.kind == TransactionKind::Debit
    }
}

//
// ================= Knowledge =================
//

/// Metadata attached to a knowledge document at ingestion time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub category: Option<String>,
    pub source: Option<String>,
    /// Ingestion-declared confidence in [0, 1], when the scraper provides one.
    pub confidence: Option<f32>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A document in the knowledge base. Read-only to the answer pipeline;
/// maintenance operations may upsert or delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: String,
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl KnowledgeDocument {
    /// Build a document with a fresh random id.
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            metadata,
        }
    }

    /// Build a document with a stable content-derived id, so repeated
    /// ingestion of the same passage upserts instead of duplicating.
    pub fn from_content(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        let content = content.into();
        let hash = Sha256::digest(content.as_bytes());
        Self {
            id: hex::encode(&hash[..16]),
            content,
            metadata,
        }
    }
}

//
// ================= Chat Answers =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnswerConfidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for AnswerConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnswerConfidence::Low => "low",
            AnswerConfidence::Medium => "medium",
            AnswerConfidence::High => "high",
        };
        write!(f, "{}", s)
    }
}

/// Reply shape handed to the chat transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
    /// Number of knowledge passages that informed the answer. Zero when
    /// retrieval degraded or only the fallback fired.
    pub sources_used: usize,
    pub confidence: AnswerConfidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
}
