//! Capped per-section deduction accumulation
//!
//! Scans categorized transactions against a heuristic rule table and
//! builds a ledger where every running total is clipped at its statutory
//! limit. The clipped totals are order-independent: any permutation of
//! the same transactions yields the same ledger.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::classifier::TransactionCategory;
use crate::models::Transaction;

/// Fraction of a home-loan EMI treated as the interest component for
/// Section 24(b). A rough approximation, not an amortization schedule.
const HOME_LOAN_INTEREST_FRACTION: f64 = 0.70;

/// Health-insurance sub-caps inside Section 80D.
const LIMIT_80D_SELF: f64 = 25_000.0;
const LIMIT_80D_PARENTS: f64 = 50_000.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeductionSection {
    #[serde(rename = "80C")]
    Section80C,
    #[serde(rename = "80D")]
    Section80D,
    #[serde(rename = "24b")]
    Section24b,
    #[serde(rename = "80G")]
    Section80G,
    #[serde(rename = "80TTA")]
    Section80Tta,
    #[serde(rename = "80E")]
    Section80E,
}

impl DeductionSection {
    /// Statutory cap for the section; `None` means uncapped (80G, 80E).
    pub fn limit(&self) -> Option<f64> {
        match self {
            DeductionSection::Section80C => Some(150_000.0),
            DeductionSection::Section80D => Some(LIMIT_80D_SELF + LIMIT_80D_PARENTS),
            DeductionSection::Section24b => Some(200_000.0),
            DeductionSection::Section80G => None,
            DeductionSection::Section80Tta => Some(10_000.0),
            DeductionSection::Section80E => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeductionSection::Section80C => "80C",
            DeductionSection::Section80D => "80D",
            DeductionSection::Section24b => "24b",
            DeductionSection::Section80G => "80G",
            DeductionSection::Section80Tta => "80TTA",
            DeductionSection::Section80E => "80E",
        }
    }

    /// Fixed iteration order for deterministic reporting.
    pub const ALL: [DeductionSection; 6] = [
        DeductionSection::Section80C,
        DeductionSection::Section80D,
        DeductionSection::Section24b,
        DeductionSection::Section80G,
        DeductionSection::Section80Tta,
        DeductionSection::Section80E,
    ];
}

impl fmt::Display for DeductionSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Accumulated deduction amounts keyed by section, each clipped at the
/// section cap. 80D tracks its self/parents sub-caps independently and
/// reports the sum.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeductionLedger {
    totals: BTreeMap<DeductionSection, f64>,
    health_self: f64,
    health_parents: f64,
}

impl DeductionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an amount to a section, clipping the running total at the
    /// section cap. Overflow never carries to other sections.
    pub fn add(&mut self, section: DeductionSection, amount: f64) {
        debug_assert!(section != DeductionSection::Section80D, "use the 80D sub-cap methods");
        let entry = self.totals.entry(section).or_insert(0.0);
        *entry += amount;
        if let Some(limit) = section.limit() {
            *entry = entry.min(limit);
        }
    }

    pub fn add_health_self(&mut self, amount: f64) {
        self.health_self = (self.health_self + amount).min(LIMIT_80D_SELF);
        self.sync_80d();
    }

    pub fn add_health_parents(&mut self, amount: f64) {
        self.health_parents = (self.health_parents + amount).min(LIMIT_80D_PARENTS);
        self.sync_80d();
    }

    fn sync_80d(&mut self) {
        self.totals.insert(
            DeductionSection::Section80D,
            self.health_self + self.health_parents,
        );
    }

    pub fn amount(&self, section: DeductionSection) -> f64 {
        self.totals.get(&section).copied().unwrap_or(0.0)
    }

    /// Remaining headroom under a capped section; uncapped sections have
    /// no meaningful headroom figure.
    pub fn headroom(&self, section: DeductionSection) -> Option<f64> {
        section.limit().map(|limit| (limit - self.amount(section)).max(0.0))
    }

    pub fn total(&self) -> f64 {
        self.totals.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.values().all(|v| *v == 0.0)
    }

    /// Section → amount view for serialization and reporting.
    pub fn entries(&self) -> impl Iterator<Item = (DeductionSection, f64)> + '_ {
        DeductionSection::ALL
            .iter()
            .map(move |s| (*s, self.amount(*s)))
    }
}

/// Walk the transactions and apply the deduction rule table. Only debits
/// count as outgoing payments; savings interest is the one credited
/// deduction (80TTA).
pub fn extract_deductions(transactions: &[Transaction]) -> DeductionLedger {
    let mut ledger = DeductionLedger::new();

    for txn in transactions {
        let description = txn.description.to_lowercase();
        let category = txn
            .category
            .unwrap_or_else(|| TransactionCategory::classify(&txn.description));

        if txn.is_credit() {
            if description.contains("interest") && description.contains("savings") {
                ledger.add(DeductionSection::Section80Tta, txn.amount);
            }
            continue;
        }

        let is_investment = category == TransactionCategory::Sip || description.contains("sip");
        let is_insurance =
            category == TransactionCategory::Insurance || description.contains("insurance");

        // 80C instruments: ELSS SIPs plus the other common qualifying
        // payments (PPF, NSC, life-insurance premiums).
        let is_80c_instrument = (is_investment && description.contains("elss"))
            || description.contains("ppf")
            || description.contains("nsc")
            || description.contains("life insurance");

        if is_80c_instrument {
            ledger.add(DeductionSection::Section80C, txn.amount);
        } else if is_insurance
            && (description.contains("health") || description.contains("medical"))
        {
            if description.contains("parent") {
                ledger.add_health_parents(txn.amount);
            } else {
                ledger.add_health_self(txn.amount);
            }
        } else if category == TransactionCategory::Emi && description.contains("home loan") {
            let interest_portion = txn.amount * HOME_LOAN_INTEREST_FRACTION;
            ledger.add(DeductionSection::Section24b, interest_portion);
        } else if description.contains("donation") || description.contains("charity") {
            ledger.add(DeductionSection::Section80G, txn.amount);
        } else if description.contains("education loan") {
            ledger.add(DeductionSection::Section80E, txn.amount);
        }
    }

    ledger
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionKind;
    use chrono::Utc;

    fn debit(description: &str, amount: f64) -> Transaction {
        Transaction::new(Utc::now(), description, amount, TransactionKind::Debit)
    }

    fn credit(description: &str, amount: f64) -> Transaction {
        Transaction::new(Utc::now(), description, amount, TransactionKind::Credit)
    }

    #[test]
    fn test_80c_capped_at_limit() {
        let txns = vec![
            debit("SIP ELSS AXIS LONG TERM EQUITY", 90_000.0),
            debit("SIP ELSS MIRAE TAX SAVER", 90_000.0),
        ];
        let ledger = extract_deductions(&txns);
        assert_eq!(ledger.amount(DeductionSection::Section80C), 150_000.0);
        assert_eq!(ledger.headroom(DeductionSection::Section80C), Some(0.0));
    }

    #[test]
    fn test_cap_invariant_under_permutation() {
        let mut txns = vec![
            debit("SIP ELSS FUND A", 80_000.0),
            debit("SIP ELSS FUND B", 50_000.0),
            debit("SIP ELSS FUND C", 40_000.0),
            debit("HEALTH INSURANCE PREMIUM SELF", 30_000.0),
            debit("HOME LOAN EMI HDFC", 400_000.0),
            credit("SAVINGS ACCOUNT INTEREST", 14_000.0),
        ];

        let forward = extract_deductions(&txns);
        txns.reverse();
        let reversed = extract_deductions(&txns);

        for section in DeductionSection::ALL {
            assert_eq!(forward.amount(section), reversed.amount(section));
            if let Some(limit) = section.limit() {
                assert!(forward.amount(section) <= limit);
            }
        }
    }

    #[test]
    fn test_80d_sub_caps_independent() {
        let txns = vec![
            debit("HEALTH INSURANCE PREMIUM", 40_000.0),
            debit("HEALTH INSURANCE PARENTS PREMIUM", 60_000.0),
        ];
        let ledger = extract_deductions(&txns);
        // Self clips at 25k, parents at 50k; reported 80D is the sum.
        assert_eq!(ledger.amount(DeductionSection::Section80D), 75_000.0);
    }

    #[test]
    fn test_home_loan_interest_fraction() {
        let txns = vec![debit("HOME LOAN EMI SBI", 100_000.0)];
        let ledger = extract_deductions(&txns);
        assert_eq!(ledger.amount(DeductionSection::Section24b), 70_000.0);
    }

    #[test]
    fn test_24b_capped() {
        let txns = vec![
            debit("HOME LOAN EMI SBI", 200_000.0),
            debit("HOME LOAN EMI SBI", 200_000.0),
        ];
        let ledger = extract_deductions(&txns);
        assert_eq!(ledger.amount(DeductionSection::Section24b), 200_000.0);
    }

    #[test]
    fn test_uncapped_sections() {
        let txns = vec![
            debit("DONATION TO PM RELIEF FUND", 300_000.0),
            debit("EDUCATION LOAN INTEREST PAYMENT", 120_000.0),
        ];
        let ledger = extract_deductions(&txns);
        assert_eq!(ledger.amount(DeductionSection::Section80G), 300_000.0);
        assert_eq!(ledger.amount(DeductionSection::Section80E), 120_000.0);
    }

    #[test]
    fn test_80tta_only_from_credited_savings_interest() {
        let txns = vec![
            credit("SAVINGS ACCOUNT INTEREST CREDIT", 14_000.0),
            debit("SAVINGS ACCOUNT INTEREST REVERSAL", 2_000.0),
        ];
        let ledger = extract_deductions(&txns);
        assert_eq!(ledger.amount(DeductionSection::Section80Tta), 10_000.0);
    }

    #[test]
    fn test_empty_input() {
        let ledger = extract_deductions(&[]);
        assert!(ledger.is_empty());
        assert_eq!(ledger.total(), 0.0);
    }
}
