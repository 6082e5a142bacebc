//! TaxWise Advisor
//!
//! A personal-finance assistant core for Indian users that:
//! - Categorizes bank/credit-card transactions (keyword rules, with an
//!   optional LLM-assisted path that degrades to the rules)
//! - Computes income tax under both statutory regimes and recommends one
//! - Extracts capped per-section deductions from transaction histories
//! - Answers financial questions via retrieval-augmented generation with
//!   topic-routed knowledge collections
//! - Runs slot-filling dialogue state across conversation turns
//! - Analyzes credit-report text for score and utilization insights
//!
//! PIPELINE:
//! QUERY → CLASSIFY → RETRIEVE → COMPOSE → GENERATE → FOLLOW-UP
//!
//! Transport (HTTP/voice), persistence, and OCR are external
//! collaborators; the crate's boundary is plain in-process data.

pub mod advisor;
pub mod categorizer;
pub mod classifier;
pub mod config;
pub mod credit;
pub mod dialogue;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod models;
pub mod tax;

pub use error::Result;

// Re-export common types
pub use advisor::{default_provider_chain, Advisor};
pub use classifier::{QueryTopic, TransactionCategory};
pub use config::AdvisorConfig;
pub use models::*;
pub use tax::{TaxComputationResult, TaxPlanner, TaxRegime};
