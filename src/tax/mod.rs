//! Deterministic income-tax engines (FY 2024-25 tables)
//!
//! Three layers, LLM excluded from all of them:
//! - `brackets`: pure progressive slab walk + cess
//! - `deductions`: capped per-section accumulation from categorized
//!   transactions
//! - `planner`: regime comparison and tax-saving recommendations

pub mod brackets;
pub mod deductions;
pub mod planner;

pub use brackets::{compute_bracket_tax, total_tax_for_regime, TaxRegime, STANDARD_DEDUCTION};
pub use deductions::{extract_deductions, DeductionLedger, DeductionSection};
pub use planner::{FinancialSummary, TaxComputationResult, TaxPlanner};
