use std::sync::Arc;

use chrono::Utc;
use taxwise_advisor::{
    advisor::{default_provider_chain, Advisor},
    categorizer::LlmCategorizer,
    config::AdvisorConfig,
    knowledge::{seed_default_documents, InMemoryDocumentStore},
    models::{Transaction, TransactionKind},
    tax::TaxPlanner,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("TaxWise Advisor starting");

    // Configuration fails fast before anything is served.
    let config = AdvisorConfig::from_env()?;

    let store = Arc::new(InMemoryDocumentStore::new());
    seed_default_documents(&store).await?;

    let llm = default_provider_chain(&config);
    let categorizer_chain = default_provider_chain(&config);
    let advisor = Advisor::new(store, llm, config)?;

    // Sample statement: categorize, then compute a tax recommendation.
    let mut transactions = vec![
        Transaction::new(Utc::now(), "SALARY CREDIT ACME CORP", 100_000.0, TransactionKind::Credit),
        Transaction::new(Utc::now(), "SIP ELSS AXIS LONG TERM", 12_500.0, TransactionKind::Debit),
        Transaction::new(Utc::now(), "HOME LOAN EMI HDFC", 35_000.0, TransactionKind::Debit),
        Transaction::new(Utc::now(), "HEALTH INSURANCE PREMIUM", 18_000.0, TransactionKind::Debit),
        Transaction::new(Utc::now(), "SWIGGY FOOD ORDER", 640.0, TransactionKind::Debit),
    ];

    let categorizer = LlmCategorizer::new(&categorizer_chain);
    categorizer.categorize_all(&mut transactions).await;

    println!("\n=== CATEGORIZED TRANSACTIONS ===");
    for txn in &transactions {
        println!(
            "  {:<32} ₹{:>10.2}  {}",
            txn.description,
            txn.amount,
            txn.category.map(|c| c.as_str()).unwrap_or("-")
        );
    }

    let annual_income = 1_200_000.0;
    let result = TaxPlanner::recommend(annual_income, &transactions)?;

    println!("\n=== TAX COMPUTATION ===");
    println!("Total income:     ₹{:.2}", result.total_income);
    println!("Taxable income:   ₹{:.2}", result.taxable_income);
    println!("Old regime tax:   ₹{:.2}", result.old_regime_tax);
    println!("New regime tax:   ₹{:.2}", result.new_regime_tax);
    println!("Recommended:      {} regime", result.recommended_regime);
    println!("\nDeductions:");
    for (section, amount) in result.deductions.entries() {
        if amount > 0.0 {
            println!("  {:<6} ₹{:.2}", section.as_str(), amount);
        }
    }
    println!("\nRecommendations:");
    for (i, recommendation) in result.recommendations.iter().enumerate() {
        println!("  {}: {}", i + 1, recommendation);
    }

    // Credit-report analysis over text the OCR layer would hand us.
    let report_text = "CIBIL Score: 712\nCredit Utilization: 41%\nHard Inquiries: 4\n";
    let credit = taxwise_advisor::credit::analyze_credit_report(report_text);

    println!("\n=== CREDIT REPORT ===");
    println!(
        "Score: {:?} ({:?}), utilization: {:?}%",
        credit.data.credit_score, credit.score_band, credit.data.credit_utilization
    );
    for recommendation in &credit.recommendations {
        println!("  - {}", recommendation);
    }

    // One conversational turn through the RAG pipeline.
    let reply = advisor
        .handle_turn("demo-session", "How much can I claim under 80C?")
        .await?;

    println!("\n=== CHAT ===");
    println!("Answer ({} sources, {} confidence):", reply.sources_used, reply.confidence);
    println!("  {}", reply.answer);
    if let Some(follow_up) = &reply.follow_up {
        println!("Follow-up: {}", follow_up);
    }

    advisor
        .record_interaction("How much can I claim under 80C?", &reply.answer)
        .await?;

    Ok(())
}
