//! Keyword classifiers
//!
//! Two deterministic, zero-latency classifiers over ordered keyword tables:
//! - Transaction descriptions → spending/income category
//! - Free-text queries → knowledge topic for retrieval routing
//!
//! Both are total: any input, including empty or garbage text, maps to a
//! sentinel category. Earliest table entry with a matching keyword wins.

use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Transaction categories =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionCategory {
    Income,
    Emi,
    Sip,
    Rent,
    Insurance,
    Utilities,
    Food,
    Transport,
    Entertainment,
    Shopping,
    Medical,
    Education,
    OtherExpense,
    OtherIncome,
    Uncategorized,
}

/// Static keyword lists — zero allocation. Declaration order is the
/// tie-break: the first category with a matching keyword wins.
const TRANSACTION_KEYWORDS: &[(TransactionCategory, &[&str])] = &[
    (
        TransactionCategory::Income,
        &["salary", "freelance", "dividend", "interest", "bonus", "refund"],
    ),
    (
        TransactionCategory::Emi,
        &["emi", "loan", "mortgage", "car loan", "home loan", "personal loan"],
    ),
    (
        TransactionCategory::Sip,
        &["sip", "mutual fund", "systematic", "investment", "elss"],
    ),
    (
        TransactionCategory::Rent,
        &["rent", "house rent", "apartment", "accommodation"],
    ),
    (
        TransactionCategory::Insurance,
        &["insurance", "premium", "life insurance", "health insurance"],
    ),
    (
        TransactionCategory::Utilities,
        &["electricity", "gas", "water", "internet", "mobile", "phone"],
    ),
    (
        TransactionCategory::Food,
        &["restaurant", "food", "grocery", "supermarket", "dining"],
    ),
    (
        TransactionCategory::Transport,
        &["fuel", "petrol", "taxi", "uber", "ola", "metro", "bus"],
    ),
    (
        TransactionCategory::Entertainment,
        &["movie", "entertainment", "netflix", "spotify", "game"],
    ),
    (
        TransactionCategory::Shopping,
        &["shopping", "amazon", "flipkart", "clothing", "electronics"],
    ),
    (
        TransactionCategory::Medical,
        &["hospital", "doctor", "medical", "pharmacy", "medicine"],
    ),
    (
        TransactionCategory::Education,
        &["school", "college", "course", "book", "education", "tuition"],
    ),
];

const EXPENSE_HINTS: &[&str] = &["transfer", "payment", "debit"];
const INCOME_HINTS: &[&str] = &["credit", "deposit"];

impl TransactionCategory {
    /// Classify a statement description. Never fails; descriptions that
    /// match nothing fall through generic direction hints to
    /// `Uncategorized`.
    pub fn classify(description: &str) -> Self {
        let text = description.to_lowercase();

        for (category, keywords) in TRANSACTION_KEYWORDS {
            if keywords.iter().any(|kw| text.contains(kw)) {
                return *category;
            }
        }

        if EXPENSE_HINTS.iter().any(|kw| text.contains(kw)) {
            TransactionCategory::OtherExpense
        } else if INCOME_HINTS.iter().any(|kw| text.contains(kw)) {
            TransactionCategory::OtherIncome
        } else {
            TransactionCategory::Uncategorized
        }
    }

    /// Parse a label coming back from an LLM. Unknown labels coerce to
    /// `Uncategorized` rather than erroring.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "income" => TransactionCategory::Income,
            "emi" => TransactionCategory::Emi,
            "sip" => TransactionCategory::Sip,
            "rent" => TransactionCategory::Rent,
            "insurance" => TransactionCategory::Insurance,
            "utilities" => TransactionCategory::Utilities,
            "food" => TransactionCategory::Food,
            "transport" => TransactionCategory::Transport,
            "entertainment" => TransactionCategory::Entertainment,
            "shopping" => TransactionCategory::Shopping,
            "medical" | "healthcare" => TransactionCategory::Medical,
            "education" => TransactionCategory::Education,
            "other_expense" => TransactionCategory::OtherExpense,
            "other_income" => TransactionCategory::OtherIncome,
            _ => TransactionCategory::Uncategorized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionCategory::Income => "income",
            TransactionCategory::Emi => "emi",
            TransactionCategory::Sip => "sip",
            TransactionCategory::Rent => "rent",
            TransactionCategory::Insurance => "insurance",
            TransactionCategory::Utilities => "utilities",
            TransactionCategory::Food => "food",
            TransactionCategory::Transport => "transport",
            TransactionCategory::Entertainment => "entertainment",
            TransactionCategory::Shopping => "shopping",
            TransactionCategory::Medical => "medical",
            TransactionCategory::Education => "education",
            TransactionCategory::OtherExpense => "other_expense",
            TransactionCategory::OtherIncome => "other_income",
            TransactionCategory::Uncategorized => "uncategorized",
        }
    }
}

impl fmt::Display for TransactionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//
// ================= Query topics =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QueryTopic {
    RetirementPlanning,
    InvestmentAdvice,
    TaxRules,
    StockAnalysis,
    FinancialKnowledge,
}

const RETIREMENT_KEYWORDS: &[&str] = &[
    "retirement", "pension", "nps", "retire", "post-retirement",
    "retirement planning", "corpus", "withdrawal",
];

const INVESTMENT_KEYWORDS: &[&str] = &[
    "invest", "investment", "mutual fund", "sip", "portfolio", "returns",
    "risk", "elss", "ppf", "fd", "recurring deposit", "bonds",
    "diversification", "asset allocation", "rebalancing", "investment plan",
];

const TAX_KEYWORDS: &[&str] = &[
    "tax", "80c", "80d", "deduction", "exemption", "itr", "tds",
    "advance tax", "refund", "section", "income tax", "capital gains",
    "ltcg", "stcg", "rebate", "surcharge", "cess", "new regime",
    "old regime", "tax filing", "tax saving",
];

const STOCK_KEYWORDS: &[&str] = &[
    "stock", "share", "market", "nifty", "sensex", "ipo", "dividend",
    "pe ratio", "eps", "volatility", "sector", "blue chip", "small cap",
    "mid cap", "large cap", "nse", "bse",
];

const LITERACY_KEYWORDS: &[&str] = &[
    "financial literacy", "budgeting", "saving tips", "debt management",
    "credit score", "inflation", "finance laws",
];

impl QueryTopic {
    /// Route a free-text query to the topic domain whose knowledge
    /// collection should serve it. `FinancialKnowledge` is the catch-all.
    pub fn classify(query: &str) -> Self {
        let text = query.to_lowercase();

        let has_any = |keywords: &[&str]| keywords.iter().any(|kw| text.contains(kw));

        if has_any(RETIREMENT_KEYWORDS) {
            QueryTopic::RetirementPlanning
        } else if has_any(INVESTMENT_KEYWORDS) {
            QueryTopic::InvestmentAdvice
        } else if has_any(TAX_KEYWORDS) {
            QueryTopic::TaxRules
        } else if has_any(STOCK_KEYWORDS) {
            QueryTopic::StockAnalysis
        } else if has_any(LITERACY_KEYWORDS) {
            QueryTopic::FinancialKnowledge
        } else {
            QueryTopic::FinancialKnowledge
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryTopic::RetirementPlanning => "retirement_planning",
            QueryTopic::InvestmentAdvice => "investment_advice",
            QueryTopic::TaxRules => "tax_rules",
            QueryTopic::StockAnalysis => "stock_analysis",
            QueryTopic::FinancialKnowledge => "financial_knowledge",
        }
    }
}

impl fmt::Display for QueryTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
