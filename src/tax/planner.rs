//! Regime comparison and tax-saving recommendations
//!
//! Orchestrates the deduction extractor and the bracket engine across
//! both regimes and renders a deterministic, ordered recommendation list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::classifier::TransactionCategory;
use crate::error::{AdvisorError, Result};
use crate::models::Transaction;
use crate::tax::brackets::{total_tax_for_regime, TaxRegime, STANDARD_DEDUCTION};
use crate::tax::deductions::{extract_deductions, DeductionLedger, DeductionSection};

/// Marginal rate assumed when estimating the saving from filling unused
/// deduction headroom (top slab plus cess, rounded).
const ASSUMED_MARGINAL_RATE: f64 = 0.31;

/// Aggregate view of a transaction history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub total_income: f64,
    pub category_totals: BTreeMap<TransactionCategory, f64>,
}

/// One computation request's worth of output. Immutable once built;
/// serializable for persistence and report rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxComputationResult {
    pub total_income: f64,
    pub taxable_income: f64,
    pub old_regime_tax: f64,
    pub new_regime_tax: f64,
    pub recommended_regime: TaxRegime,
    pub tax_saved: f64,
    pub deductions: DeductionLedger,
    pub recommendations: Vec<String>,
}

pub struct TaxPlanner;

impl TaxPlanner {
    /// Sum salary-type credits into an income figure and bucket debit
    /// totals per category, for callers that only have a parsed
    /// statement.
    pub fn summarize(transactions: &[Transaction]) -> FinancialSummary {
        let mut total_income = 0.0;
        let mut category_totals: BTreeMap<TransactionCategory, f64> = BTreeMap::new();

        for txn in transactions {
            let category = txn
                .category
                .unwrap_or_else(|| TransactionCategory::classify(&txn.description));
            let description = txn.description.to_lowercase();

            if txn.is_credit()
                && (category == TransactionCategory::Income
                    && ["salary", "wage", "bonus"]
                        .iter()
                        .any(|kw| description.contains(kw)))
            {
                total_income += txn.amount;
            }

            if txn.is_debit() {
                *category_totals.entry(category).or_insert(0.0) += txn.amount;
            }
        }

        FinancialSummary {
            total_income,
            category_totals,
        }
    }

    /// Compute liability under both regimes and recommend the cheaper
    /// one. Rejects non-positive income outright rather than returning a
    /// zero-tax result that would mask upstream parsing bugs.
    pub fn recommend(
        total_income: f64,
        transactions: &[Transaction],
    ) -> Result<TaxComputationResult> {
        if !total_income.is_finite() || total_income <= 0.0 {
            return Err(AdvisorError::InvalidInput(format!(
                "Total income must be positive, got {}",
                total_income
            )));
        }
        for txn in transactions {
            txn.validate()?;
        }

        let deductions = extract_deductions(transactions);

        let taxable_old = (total_income - deductions.total() - STANDARD_DEDUCTION).max(0.0);
        let taxable_new = (total_income - STANDARD_DEDUCTION).max(0.0);

        let old_regime_tax = round_rupees(total_tax_for_regime(taxable_old, TaxRegime::Old));
        let new_regime_tax = round_rupees(total_tax_for_regime(taxable_new, TaxRegime::New));

        let recommended_regime = if old_regime_tax < new_regime_tax {
            TaxRegime::Old
        } else {
            TaxRegime::New
        };

        let recommendations = Self::build_recommendations(
            &deductions,
            taxable_old,
            old_regime_tax,
            new_regime_tax,
        );

        info!(
            total_income,
            old_regime_tax,
            new_regime_tax,
            regime = %recommended_regime,
            "Tax computation complete"
        );

        Ok(TaxComputationResult {
            total_income,
            taxable_income: taxable_old,
            old_regime_tax,
            new_regime_tax,
            recommended_regime,
            tax_saved: (old_regime_tax - new_regime_tax).abs(),
            deductions,
            recommendations,
        })
    }

    /// Ordered, deterministic suggestion list: per-section headroom
    /// first, then the regime choice, then the high-income note.
    fn build_recommendations(
        deductions: &DeductionLedger,
        taxable_income: f64,
        old_tax: f64,
        new_tax: f64,
    ) -> Vec<String> {
        let mut recommendations = Vec::new();

        if let Some(headroom) = deductions.headroom(DeductionSection::Section80C) {
            if headroom > 0.0 {
                recommendations.push(format!(
                    "Invest ₹{} more in ELSS/PPF/NSC to maximize your 80C benefits and save about ₹{} in taxes.",
                    format_rupees(headroom),
                    format_rupees(headroom * ASSUMED_MARGINAL_RATE)
                ));
            }
        }

        if let Some(headroom) = deductions.headroom(DeductionSection::Section80D) {
            if headroom > 0.0 {
                recommendations.push(format!(
                    "Consider health insurance worth ₹{} to claim the 80D deduction and save about ₹{} in taxes.",
                    format_rupees(headroom),
                    format_rupees(headroom * ASSUMED_MARGINAL_RATE)
                ));
            }
        }

        if deductions.amount(DeductionSection::Section24b) == 0.0 && taxable_income > 500_000.0 {
            recommendations.push(
                "Consider a home loan to claim up to ₹2,00,000 deduction on interest under section 24(b)."
                    .to_string(),
            );
        }

        if let Some(headroom) = deductions.headroom(DeductionSection::Section80Tta) {
            if headroom > 0.0 {
                recommendations.push(format!(
                    "Optimize savings account interest to claim the full ₹{} deduction under 80TTA.",
                    format_rupees(10_000.0)
                ));
            }
        }

        if old_tax < new_tax {
            recommendations.push(format!(
                "Stick with the Old Tax Regime to save ₹{} compared to the New Regime.",
                format_rupees(new_tax - old_tax)
            ));
        } else {
            recommendations.push(format!(
                "Switch to the New Tax Regime to save ₹{} compared to the Old Regime.",
                format_rupees(old_tax - new_tax)
            ));
        }

        if taxable_income > 1_000_000.0 {
            recommendations.push(
                "Consider tax-free bonds and NPS for additional benefits at your income level."
                    .to_string(),
            );
        }

        recommendations
    }
}

fn round_rupees(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Group a rupee amount with thousands separators, dropping paise.
fn format_rupees(amount: f64) -> String {
    let whole = amount.round() as i64;
    let digits = whole.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if whole < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
